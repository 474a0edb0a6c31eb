//! HTTP providers for the billing backend's cost-explorer API. Each
//! provider wraps one read-only endpoint and maps its wire shape into
//! the dashboard's own types.

use crate::error::SourceError;
use crate::models::{
    ComparisonResult, CostPoint, DimensionBreakdown, MonthlyCost, Recommendation, SourceKind,
    StatisticsSummary,
};
use crate::providers::{SourceContext, SourceData, SourceProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

fn endpoint(ctx: &SourceContext, path: &str) -> String {
    format!(
        "{}/cost-explorer/accounts/{}/{}",
        ctx.base_url.trim_end_matches('/'),
        ctx.account_id,
        path
    )
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    ctx: &SourceContext,
    path: &str,
    query: &[(&str, String)],
) -> Result<T, SourceError> {
    let response = client
        .get(endpoint(ctx, path))
        .query(query)
        .bearer_auth(&ctx.api_token)
        .send()
        .await?
        .error_for_status()?;
    let payload = response.json::<T>().await?;
    Ok(payload)
}

fn window_query(ctx: &SourceContext) -> Vec<(&'static str, String)> {
    vec![
        ("start_date", ctx.window.current_start.to_string()),
        ("end_date", ctx.window.current_end.to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct TrendsBody {
    #[serde(default)]
    daily_costs: Vec<CostPoint>,
}

#[derive(Debug, Deserialize)]
struct ServiceRow {
    service_name: String,
    amount: f64,
    #[serde(default)]
    percentage: f64,
}

#[derive(Debug, Deserialize)]
struct ServicesBody {
    #[serde(default)]
    services: Vec<ServiceRow>,
}

#[derive(Debug, Deserialize)]
struct GroupsBody {
    #[serde(default)]
    groups: Vec<DimensionBreakdown>,
}

#[derive(Debug, Deserialize)]
struct MonthlyBody {
    #[serde(default)]
    monthly_data: Vec<MonthlyCost>,
}

#[derive(Debug, Deserialize)]
struct ForecastBody {
    #[serde(default)]
    forecast: Vec<CostPoint>,
}

pub struct TrendsProvider;

#[async_trait]
impl SourceProvider for TrendsProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Trends
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let mut query = window_query(ctx);
        query.push(("granularity", ctx.granularity.as_param().to_string()));
        let body: TrendsBody = get_json(client, ctx, "trends", &query).await?;
        Ok(SourceData::Trends(body.daily_costs))
    }
}

pub struct ServiceBreakdownProvider;

#[async_trait]
impl SourceProvider for ServiceBreakdownProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Services
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let body: ServicesBody = get_json(client, ctx, "services", &window_query(ctx)).await?;
        let services = body
            .services
            .into_iter()
            .map(|row| DimensionBreakdown {
                key: row.service_name,
                amount: row.amount,
                percentage: row.percentage,
            })
            .collect();
        Ok(SourceData::Services(services))
    }
}

/// Region figures come from the generic `detailed` endpoint grouped by
/// region; the response already uses key/amount/percentage rows.
pub struct RegionBreakdownProvider;

#[async_trait]
impl SourceProvider for RegionBreakdownProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Regions
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let mut query = window_query(ctx);
        query.push(("group_by", "REGION".to_string()));
        let body: GroupsBody = get_json(client, ctx, "detailed", &query).await?;
        Ok(SourceData::Regions(body.groups))
    }
}

pub struct ComparisonProvider;

#[async_trait]
impl SourceProvider for ComparisonProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Comparison
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let query = vec![
            ("current_start", ctx.window.current_start.to_string()),
            ("current_end", ctx.window.current_end.to_string()),
            ("previous_start", ctx.window.previous_start.to_string()),
            ("previous_end", ctx.window.previous_end.to_string()),
        ];
        let body: ComparisonResult = get_json(client, ctx, "comparison", &query).await?;
        Ok(SourceData::Comparison(body))
    }
}

pub struct RecommendationsProvider;

#[async_trait]
impl SourceProvider for RecommendationsProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Recommendations
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let body: Vec<Recommendation> = get_json(client, ctx, "recommendations", &[]).await?;
        Ok(SourceData::Recommendations(body))
    }
}

pub struct MonthlySummaryProvider;

#[async_trait]
impl SourceProvider for MonthlySummaryProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::MonthlySummary
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let query = vec![("months", ctx.summary_months.to_string())];
        let body: MonthlyBody = get_json(client, ctx, "monthly-summary", &query).await?;
        Ok(SourceData::MonthlySummary(body.monthly_data))
    }
}

pub struct StatisticsProvider;

#[async_trait]
impl SourceProvider for StatisticsProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Statistics
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let body: StatisticsSummary =
            get_json(client, ctx, "statistics", &window_query(ctx)).await?;
        Ok(SourceData::Statistics(body))
    }
}

pub struct ForecastProvider;

#[async_trait]
impl SourceProvider for ForecastProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Forecast
    }

    async fn fetch(
        &self,
        client: &Client,
        ctx: &SourceContext,
    ) -> Result<SourceData, SourceError> {
        let body: ForecastBody = get_json(client, ctx, "forecast", &window_query(ctx)).await?;
        Ok(SourceData::Forecast(body.forecast))
    }
}
