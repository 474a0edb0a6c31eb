//! Settle-all fan-out across the registered source providers. One cycle
//! asks every provider concurrently, waits until each has resolved or
//! timed out, and reports a per-source outcome map. A provider failure
//! degrades its own dimension only; the cycle itself cannot fail here.

use crate::error::SourceError;
use crate::models::{Outcome, SourceFailure, SourceKind};
use crate::providers::{SourceContext, SourceData, SourceProvider};
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Settled outcomes of one fan-out, keyed by provider identity in
/// registration order. Completion order is irrelevant to callers.
#[derive(Debug)]
pub struct CycleOutcomes {
    entries: Vec<(SourceKind, Outcome<SourceData>)>,
}

impl CycleOutcomes {
    pub fn get(&self, kind: SourceKind) -> Option<&Outcome<SourceData>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> Vec<SourceFailure> {
        self.entries
            .iter()
            .filter_map(|(_, outcome)| outcome.failure().cloned())
            .collect()
    }

    pub fn available(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_ok()).count()
    }

    pub fn registered(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<(SourceKind, Outcome<SourceData>)> {
        self.entries
    }
}

/// Fetches every provider in parallel, each under its own timeout. A
/// source that times out yields a timeout outcome without disturbing the
/// others.
pub async fn fetch_all(
    client: &Client,
    providers: &[Arc<dyn SourceProvider>],
    ctx: &SourceContext,
    per_source_timeout: Duration,
) -> CycleOutcomes {
    let fetches = providers.iter().map(|provider| {
        let provider = Arc::clone(provider);
        async move {
            let kind = provider.kind();
            let outcome = match timeout(per_source_timeout, provider.fetch(client, ctx)).await {
                Ok(Ok(data)) => Outcome::Ok { value: data },
                Ok(Err(err)) => Outcome::failed(kind, err),
                Err(_) => Outcome::failed(kind, SourceError::timeout(per_source_timeout)),
            };
            (kind, outcome)
        }
    });

    CycleOutcomes {
        entries: join_all(fetches).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorKind;
    use crate::models::{CostPoint, DateWindow, Granularity};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> SourceContext {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid test date");
        SourceContext {
            account_id: 1,
            window: DateWindow {
                current_start: date,
                current_end: date,
                previous_start: date,
                previous_end: date,
            },
            granularity: Granularity::Daily,
            base_url: "http://unused.invalid".to_string(),
            api_token: String::new(),
            summary_months: 6,
        }
    }

    enum Behavior {
        Succeed(f64),
        Fail(SourceErrorKind),
        Hang,
    }

    struct FakeProvider {
        kind: SourceKind,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(kind: SourceKind, behavior: Behavior) -> Arc<dyn SourceProvider> {
            Arc::new(Self {
                kind,
                behavior,
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl SourceProvider for FakeProvider {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(
            &self,
            _client: &Client,
            _ctx: &SourceContext,
        ) -> Result<SourceData, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Succeed(amount) => Ok(SourceData::Trends(vec![CostPoint {
                    date: NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid test date"),
                    amount: *amount,
                }])),
                Behavior::Fail(kind) => Err(SourceError::new(*kind, "backend said no")),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!("pending future never resolves")
                }
            }
        }
    }

    #[tokio::test]
    async fn every_registered_provider_appears_in_the_outcome_map() {
        let providers = vec![
            FakeProvider::new(SourceKind::Trends, Behavior::Succeed(1.0)),
            FakeProvider::new(SourceKind::Services, Behavior::Fail(SourceErrorKind::NotFound)),
        ];
        let outcomes = fetch_all(
            &Client::new(),
            &providers,
            &ctx(),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(outcomes.registered(), 2);
        assert_eq!(outcomes.available(), 1);
        assert!(outcomes.get(SourceKind::Trends).is_some_and(Outcome::is_ok));
        let failure = outcomes
            .get(SourceKind::Services)
            .and_then(Outcome::failure)
            .expect("services failure recorded");
        assert_eq!(failure.kind, SourceErrorKind::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn a_hanging_source_times_out_without_disturbing_the_rest() {
        let providers = vec![
            FakeProvider::new(SourceKind::Trends, Behavior::Succeed(2.0)),
            FakeProvider::new(SourceKind::Forecast, Behavior::Hang),
        ];
        let outcomes = fetch_all(
            &Client::new(),
            &providers,
            &ctx(),
            Duration::from_millis(100),
        )
        .await;

        assert!(outcomes.get(SourceKind::Trends).is_some_and(Outcome::is_ok));
        let failure = outcomes
            .get(SourceKind::Forecast)
            .and_then(Outcome::failure)
            .expect("forecast timed out");
        assert_eq!(failure.kind, SourceErrorKind::Timeout);
        assert_eq!(failure.source, SourceKind::Forecast);
    }

    #[tokio::test]
    async fn all_sources_failing_still_yields_a_complete_map() {
        let providers: Vec<_> = [SourceKind::Trends, SourceKind::Services, SourceKind::Regions]
            .into_iter()
            .map(|kind| FakeProvider::new(kind, Behavior::Fail(SourceErrorKind::Transport)))
            .collect();
        let outcomes = fetch_all(
            &Client::new(),
            &providers,
            &ctx(),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(outcomes.registered(), 3);
        assert_eq!(outcomes.available(), 0);
        assert_eq!(outcomes.failures().len(), 3);
    }
}
