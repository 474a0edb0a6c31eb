//! The facade pages and CLI commands call. One `run_cycle` resolves the
//! date window, fans out to every source, and assembles a complete
//! `DashboardModel`; `start_auto_refresh` repeats that cycle on a timer
//! without surfacing transient errors.

use crate::aggregator::{self, CycleOutcomes};
use crate::config::{self, AppConfig};
use crate::error::{AppError, SourceError, SourceErrorKind};
use crate::metrics;
use crate::models::{DashboardModel, DateWindow, Granularity, Outcome, RangeToken, SourceKind};
use crate::providers::{default_providers, SourceContext, SourceData, SourceProvider};
use crate::scheduler::{RefreshScheduler, Tick};
use crate::window;
use chrono::Utc;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct DashboardService {
    client: Client,
    config: AppConfig,
    providers: Vec<Arc<dyn SourceProvider>>,
    per_source_timeout: Duration,
}

impl DashboardService {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let providers = default_providers();
        Self::with_providers(config, providers)
    }

    /// Builds the service around a custom provider set. The default set
    /// covers every `SourceKind`; a smaller set reports the missing
    /// dimensions as unavailable rather than omitting them.
    pub fn with_providers(
        config: AppConfig,
        providers: Vec<Arc<dyn SourceProvider>>,
    ) -> Result<Self, AppError> {
        let per_source_timeout = Duration::from_secs(config.source_timeout_seconds.max(1));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(per_source_timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            providers,
            per_source_timeout,
        })
    }

    /// One complete aggregation cycle for the given account and range.
    /// Individual source failures degrade their dimension and land in
    /// `source_failures`; only an unknown account or a missing token
    /// fails the call itself.
    pub async fn run_cycle(
        &self,
        account_id: u32,
        range: RangeToken,
        granularity: Granularity,
    ) -> Result<DashboardModel, AppError> {
        let account = self
            .config
            .account(account_id)
            .ok_or(AppError::UnknownAccount(account_id))?;
        let api_token = config::get_api_token(account_id)?;
        let window = window::resolve(range, Utc::now().date_naive());
        let ctx = SourceContext {
            account_id,
            window,
            granularity,
            base_url: self.config.account_base_url(account),
            api_token,
            summary_months: self.config.summary_months,
        };

        let outcomes =
            aggregator::fetch_all(&self.client, &self.providers, &ctx, self.per_source_timeout)
                .await;
        tracing::debug!(
            account_id,
            range = range.as_label(),
            available = outcomes.available(),
            registered = outcomes.registered(),
            "aggregation cycle settled"
        );

        Ok(assemble(account_id, range, granularity, window, outcomes))
    }

    /// Arms periodic refresh for one account/range selection and streams
    /// each completed model. Scheduled cycles suppress errors and keep
    /// the last good values for dimensions that fail transiently. Any
    /// change of selection means cancelling this handle and starting a
    /// new one; a cancelled handle commits nothing further.
    pub fn start_auto_refresh(
        self: &Arc<Self>,
        account_id: u32,
        range: RangeToken,
        granularity: Granularity,
        interval: Duration,
        seed: Option<DashboardModel>,
    ) -> (AutoRefreshHandle, mpsc::Receiver<DashboardModel>) {
        let (tx, rx) = mpsc::channel(8);
        let epoch = Arc::new(AtomicU64::new(0));
        let service = Arc::clone(self);
        let task_epoch = Arc::clone(&epoch);

        let task = tokio::spawn(async move {
            let mut scheduler = RefreshScheduler::new();
            scheduler.arm();
            let mut last_good = seed;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval's first tick resolves immediately; the first
            // scheduled cycle should wait a full period.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Tick::Run { generation } = scheduler.tick() else {
                    continue;
                };

                match service.run_cycle(account_id, range, granularity).await {
                    Ok(model) => {
                        let superseded = task_epoch.load(Ordering::SeqCst) != 0
                            || !scheduler.can_commit(generation);
                        if superseded {
                            break;
                        }
                        let merged = match &last_good {
                            Some(previous) => preserve_previous(model, previous),
                            None => model,
                        };
                        last_good = Some(merged.clone());
                        if tx.send(merged).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        // Scheduled runs never surface errors; the next
                        // tick retries naturally.
                        tracing::warn!(account_id, error = %err, "scheduled refresh cycle failed");
                    }
                }
                scheduler.complete(generation);
            }
        });

        (AutoRefreshHandle { epoch, task }, rx)
    }
}

/// Owner of one armed auto-refresh timer. Dropping or cancelling the
/// handle tears the timer down and invalidates any in-flight cycle, so
/// results for a stale selection can never be committed.
pub struct AutoRefreshHandle {
    epoch: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl AutoRefreshHandle {
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for AutoRefreshHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn unpolled<T>(source: SourceKind) -> Outcome<T> {
    Outcome::failed(
        source,
        SourceError::new(
            SourceErrorKind::NotFound,
            "source not registered for this cycle",
        ),
    )
}

/// Builds the cycle's snapshot from whatever settled. Failed list-shaped
/// dimensions come back empty rather than fabricated; failed single-value
/// dimensions keep their failure in place.
fn assemble(
    account_id: u32,
    range: RangeToken,
    granularity: Granularity,
    window: DateWindow,
    outcomes: CycleOutcomes,
) -> DashboardModel {
    let source_failures = outcomes.failures();

    let mut trends = Vec::new();
    let mut service_breakdown = Vec::new();
    let mut region_breakdown = Vec::new();
    let mut monthly_summary = Vec::new();
    let mut forecast = Vec::new();
    let mut comparison = unpolled(SourceKind::Comparison);
    let mut recommendations = unpolled(SourceKind::Recommendations);
    let mut statistics = unpolled(SourceKind::Statistics);

    for (kind, outcome) in outcomes.into_entries() {
        match outcome {
            Outcome::Ok { value } => match value {
                SourceData::Trends(v) => trends = v,
                SourceData::Services(v) => service_breakdown = v,
                SourceData::Regions(v) => region_breakdown = v,
                SourceData::Comparison(v) => comparison = Outcome::Ok { value: v },
                SourceData::Recommendations(v) => recommendations = Outcome::Ok { value: v },
                SourceData::MonthlySummary(v) => monthly_summary = v,
                SourceData::Statistics(v) => statistics = Outcome::Ok { value: v },
                SourceData::Forecast(v) => forecast = v,
            },
            Outcome::Failed { error } => match kind {
                SourceKind::Comparison => comparison = Outcome::Failed { error },
                SourceKind::Recommendations => recommendations = Outcome::Failed { error },
                SourceKind::Statistics => statistics = Outcome::Failed { error },
                _ => {}
            },
        }
    }

    let derived = metrics::derive(
        &trends,
        &service_breakdown,
        comparison.value(),
        recommendations.value().map(Vec::as_slice),
    );

    DashboardModel {
        account_id,
        range,
        granularity,
        window,
        generated_at: Utc::now(),
        trends,
        service_breakdown,
        region_breakdown,
        comparison,
        recommendations,
        monthly_summary,
        statistics,
        forecast,
        derived,
        source_failures,
    }
}

/// For scheduled cycles: carry the previous model's values forward for
/// every dimension that failed this time, then recompute the derived
/// metrics over the merged fields. The failures stay recorded.
fn preserve_previous(mut current: DashboardModel, previous: &DashboardModel) -> DashboardModel {
    for failure in &current.source_failures {
        match failure.source {
            SourceKind::Trends => current.trends = previous.trends.clone(),
            SourceKind::Services => {
                current.service_breakdown = previous.service_breakdown.clone();
            }
            SourceKind::Regions => current.region_breakdown = previous.region_breakdown.clone(),
            SourceKind::MonthlySummary => {
                current.monthly_summary = previous.monthly_summary.clone();
            }
            SourceKind::Forecast => current.forecast = previous.forecast.clone(),
            SourceKind::Comparison => {
                if previous.comparison.is_ok() {
                    current.comparison = previous.comparison.clone();
                }
            }
            SourceKind::Recommendations => {
                if previous.recommendations.is_ok() {
                    current.recommendations = previous.recommendations.clone();
                }
            }
            SourceKind::Statistics => {
                if previous.statistics.is_ok() {
                    current.statistics = previous.statistics.clone();
                }
            }
        }
    }

    current.derived = metrics::derive(
        &current.trends,
        &current.service_breakdown,
        current.comparison.value(),
        current.recommendations.value().map(Vec::as_slice),
    );
    current
}
