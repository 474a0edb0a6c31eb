use crate::error::{SourceError, SourceErrorKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Serialized form matches the CLI/config vocabulary (`as_label`), so
/// the emitted JSON and the accepted tokens stay one language.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RangeToken {
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
    #[serde(rename = "90days")]
    NinetyDays,
    #[serde(rename = "thisMonth")]
    ThisMonth,
}

impl RangeToken {
    pub fn as_label(self) -> &'static str {
        match self {
            RangeToken::SevenDays => "7days",
            RangeToken::ThirtyDays => "30days",
            RangeToken::NinetyDays => "90days",
            RangeToken::ThisMonth => "thisMonth",
        }
    }

    /// Window length for the fixed-length presets; `None` for the
    /// calendar-month token, whose length depends on the current date.
    pub fn fixed_days(self) -> Option<u64> {
        match self {
            RangeToken::SevenDays => Some(7),
            RangeToken::ThirtyDays => Some(30),
            RangeToken::NinetyDays => Some(90),
            RangeToken::ThisMonth => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_param(self) -> &'static str {
        match self {
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
            Granularity::Yearly => "YEARLY",
        }
    }
}

/// Current and previous reporting periods for one aggregation cycle.
/// For the fixed-length presets `previous_end == current_start`; the
/// calendar-month preset compares against the full prior month instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub current_start: NaiveDate,
    pub current_end: NaiveDate,
    pub previous_start: NaiveDate,
    pub previous_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    pub date: NaiveDate,
    pub amount: f64,
}

/// One slice of a cost breakdown (by service, region, ...). The backend
/// supplies `percentage`, but rankings always recompute shares locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionBreakdown {
    pub key: String,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub previous_period: PeriodSummary,
    pub current_period: PeriodSummary,
    pub change_amount: f64,
    #[serde(default)]
    pub change_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub resource_type: String,
    pub current_instance_type: String,
    pub recommended_instance_type: String,
    pub estimated_monthly_savings: f64,
    pub confidence_level: ConfidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCost {
    pub month: String,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_cost: f64,
    pub average_daily_cost: f64,
    pub min_daily_cost: f64,
    pub max_daily_cost: f64,
}

/// The data dimensions the dashboard fans out to. One provider per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Trends,
    Services,
    Regions,
    Comparison,
    Recommendations,
    MonthlySummary,
    Statistics,
    Forecast,
}

impl SourceKind {
    pub const ALL: [SourceKind; 8] = [
        SourceKind::Trends,
        SourceKind::Services,
        SourceKind::Regions,
        SourceKind::Comparison,
        SourceKind::Recommendations,
        SourceKind::MonthlySummary,
        SourceKind::Statistics,
        SourceKind::Forecast,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Trends => "trends",
            SourceKind::Services => "services",
            SourceKind::Regions => "regions",
            SourceKind::Comparison => "comparison",
            SourceKind::Recommendations => "recommendations",
            SourceKind::MonthlySummary => "monthly_summary",
            SourceKind::Statistics => "statistics",
            SourceKind::Forecast => "forecast",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceFailure {
    pub fn from_error(source: SourceKind, err: SourceError) -> Self {
        Self {
            source,
            kind: err.kind,
            message: err.message,
        }
    }
}

/// Per-source settled result. Every registered source appears in the
/// cycle's outcome map, success or not, so callers can always report
/// how many of the registered dimensions were available.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok { value: T },
    Failed { error: SourceFailure },
}

impl<T> Outcome<T> {
    pub fn failed(source: SourceKind, err: SourceError) -> Self {
        Outcome::Failed {
            error: SourceFailure::from_error(source, err),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ok { value } => Some(value),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&SourceFailure> {
        match self {
            Outcome::Ok { .. } => None,
            Outcome::Failed { error } => Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub total_cost: f64,
    pub avg_daily_cost: f64,
    pub data_points: usize,
    pub active_services: usize,
    pub top_services: Vec<DimensionBreakdown>,
    pub recommendation_count: usize,
    pub total_potential_savings: f64,
    /// `None` when the previous period total is zero: the change is
    /// undefined, not infinite.
    pub cost_change_percentage: Option<f64>,
}

/// Complete snapshot assembled by one aggregation cycle. A newer model
/// always replaces an older one wholesale; consumers never observe a
/// half-updated mix of two cycles.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardModel {
    pub account_id: u32,
    pub range: RangeToken,
    pub granularity: Granularity,
    pub window: DateWindow,
    pub generated_at: DateTime<Utc>,
    pub trends: Vec<CostPoint>,
    pub service_breakdown: Vec<DimensionBreakdown>,
    pub region_breakdown: Vec<DimensionBreakdown>,
    pub comparison: Outcome<ComparisonResult>,
    pub recommendations: Outcome<Vec<Recommendation>>,
    pub monthly_summary: Vec<MonthlyCost>,
    pub statistics: Outcome<StatisticsSummary>,
    pub forecast: Vec<CostPoint>,
    pub derived: DerivedMetrics,
    pub source_failures: Vec<SourceFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Savings,
    Resources,
}

/// A structured fact mined from free-text recommendation output. Lives
/// for a single render of one text; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub value: String,
    pub label: &'static str,
}
