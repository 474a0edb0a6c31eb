use crate::error::SourceError;
use crate::models::{
    ComparisonResult, CostPoint, DateWindow, DimensionBreakdown, Granularity, MonthlyCost,
    Recommendation, SourceKind, StatisticsSummary,
};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

pub mod billing;

/// Everything a provider needs for one fetch. Built fresh per cycle so a
/// provider can never observe a half-switched account or window.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub account_id: u32,
    pub window: DateWindow,
    pub granularity: Granularity,
    pub base_url: String,
    pub api_token: String,
    pub summary_months: u32,
}

/// Payload of one settled source fetch.
#[derive(Debug, Clone)]
pub enum SourceData {
    Trends(Vec<CostPoint>),
    Services(Vec<DimensionBreakdown>),
    Regions(Vec<DimensionBreakdown>),
    Comparison(ComparisonResult),
    Recommendations(Vec<Recommendation>),
    MonthlySummary(Vec<MonthlyCost>),
    Statistics(StatisticsSummary),
    Forecast(Vec<CostPoint>),
}

/// One independent, read-only data dimension of the billing backend.
/// Fetches are idempotent; a failed fetch is reported, not retried.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch(&self, client: &Client, ctx: &SourceContext)
        -> Result<SourceData, SourceError>;
}

/// The full provider set the dashboard fans out to, one per `SourceKind`.
pub fn default_providers() -> Vec<Arc<dyn SourceProvider>> {
    vec![
        Arc::new(billing::TrendsProvider),
        Arc::new(billing::ServiceBreakdownProvider),
        Arc::new(billing::RegionBreakdownProvider),
        Arc::new(billing::ComparisonProvider),
        Arc::new(billing::RecommendationsProvider),
        Arc::new(billing::MonthlySummaryProvider),
        Arc::new(billing::StatisticsProvider),
        Arc::new(billing::ForecastProvider),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_providers_cover_every_source_kind_exactly_once() {
        let providers = default_providers();
        assert_eq!(providers.len(), SourceKind::ALL.len());
        for kind in SourceKind::ALL {
            assert_eq!(
                providers.iter().filter(|p| p.kind() == kind).count(),
                1,
                "missing or duplicated provider for {kind:?}"
            );
        }
    }
}
