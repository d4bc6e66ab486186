//! Wires the pieces together in the order a search runs:
//! aggregate -> show -> save -> refresh statistics.

use std::sync::Arc;
use tracing::debug;

use crate::{
    InsightError,
    backend::BackendApi,
    history::HistoryClient,
    model::{AggregatedCityRecord, CityQuery, GeoResult, SavedRecord, Statistics},
    persistence::PersistenceClient,
    pipeline::Aggregator,
    provider::Services,
    sequence::LatestSlot,
    session::Session,
    suggest::Suggester,
};

#[derive(Debug)]
pub struct SearchOutcome {
    pub record: Result<AggregatedCityRecord, InsightError>,
    /// False when a newer search started before this one finished.
    pub is_current: bool,
    pub saved: bool,
    /// Refreshed after a successful save.
    pub statistics: Option<Statistics>,
}

#[derive(Debug)]
pub struct Dashboard {
    aggregator: Aggregator,
    suggester: Suggester,
    persistence: Option<PersistenceClient>,
    history: Option<HistoryClient>,
    latest: LatestSlot<AggregatedCityRecord>,
}

impl Dashboard {
    /// A dashboard that only looks things up; nothing is persisted.
    pub fn new(services: Services) -> Self {
        Self {
            suggester: Suggester::new(services.geo.clone()),
            aggregator: Aggregator::new(services),
            persistence: None,
            history: None,
            latest: LatestSlot::new(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn BackendApi>, session: Arc<Session>) -> Self {
        self.persistence = Some(PersistenceClient::new(backend.clone(), session.clone()));
        self.history = Some(HistoryClient::new(backend, session));
        self
    }

    pub async fn search(&self, input: &str) -> SearchOutcome {
        let ticket = self.latest.issue();

        let record = match CityQuery::parse(input) {
            Ok(query) => self.aggregator.aggregate(&query).await,
            Err(err) => Err(err),
        };

        let is_current = match &record {
            Ok(record) => self.latest.apply(ticket, record.clone()),
            Err(_) => self.latest.is_latest(ticket),
        };
        if !is_current {
            debug!(ticket = ticket.number(), "search result superseded by a newer search");
        }

        let mut outcome = SearchOutcome {
            record,
            is_current,
            saved: false,
            statistics: None,
        };

        // Stale lookups are still real lookups, so they are saved too.
        if let (Ok(record), Some(persistence)) = (&outcome.record, &self.persistence) {
            outcome.saved = persistence.save(record).await;
            if outcome.saved {
                outcome.statistics = self.statistics().await;
            }
        }

        outcome
    }

    /// Most recent successful result of the latest search.
    pub fn current(&self) -> Option<AggregatedCityRecord> {
        self.latest.current()
    }

    /// Debounced suggestions; `None` if superseded by newer input.
    pub async fn suggest(&self, partial: &str) -> Option<Vec<GeoResult>> {
        self.suggester.suggest_debounced(partial).await
    }

    pub async fn statistics(&self) -> Option<Statistics> {
        match &self.history {
            Some(history) => history.fetch_statistics().await,
            None => None,
        }
    }

    pub async fn recent(&self, page: u32, limit: u32) -> Vec<SavedRecord> {
        match &self.history {
            Some(history) => history.fetch_records(page, limit).await,
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{ExchangeRate, StatsOverview},
        testing::{FakeBackend, FakeGeo, FakeRates, Fakes, berlin_geo, paris_geo},
    };
    use std::time::Duration;

    fn backend_with_stats() -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            stats: Some(Statistics {
                overview: StatsOverview { total_searches: 1, ..StatsOverview::default() },
                popular_cities: Vec::new(),
            }),
            ..FakeBackend::default()
        })
    }

    fn dashboard(fakes: &Fakes, backend: &Arc<FakeBackend>) -> Dashboard {
        Dashboard::new(fakes.services()).with_backend(backend.clone(), Arc::new(Session::new()))
    }

    #[tokio::test]
    async fn successful_search_saves_and_refreshes_statistics() {
        let fakes = Fakes::paris();
        let backend = backend_with_stats();

        let outcome = dashboard(&fakes, &backend).search("Paris").await;

        assert_eq!(outcome.record.unwrap().city(), "Paris");
        assert!(outcome.is_current);
        assert!(outcome.saved);
        assert_eq!(outcome.statistics.unwrap().overview.total_searches, 1);
        assert_eq!(backend.saved_count(), 1);
    }

    #[tokio::test]
    async fn not_found_never_reaches_persistence() {
        let fakes = Fakes::paris();
        let backend = backend_with_stats();

        let outcome = dashboard(&fakes, &backend).search("Zzzzzz").await;

        assert!(outcome.record.unwrap_err().is_not_found());
        assert!(!outcome.saved);
        assert_eq!(backend.saved_count(), 0);
        assert_eq!(backend.auth_calls(), 0);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_lookup() {
        let fakes = Fakes::paris();
        let outcome = Dashboard::new(fakes.services()).search("   ").await;

        assert!(matches!(outcome.record, Err(InsightError::InvalidQuery(_))));
        assert_eq!(fakes.geo.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exchange_outage_still_saves_record() {
        let fakes = Fakes {
            rates: Arc::new(FakeRates { reply: Err("timed out".into()), ..FakeRates::default() }),
            ..Fakes::paris()
        };
        let backend = backend_with_stats();

        let outcome = dashboard(&fakes, &backend).search("Paris").await;

        assert_eq!(outcome.record.unwrap().rate_to_usd(), ExchangeRate::Unavailable);
        assert!(outcome.saved);
        assert_eq!(backend.saved.lock().unwrap()[0].currency.rate_to_usd, 0.0);
    }

    #[tokio::test]
    async fn failed_save_skips_statistics_refresh() {
        let fakes = Fakes::paris();
        let backend = Arc::new(FakeBackend { save_fails: true, ..FakeBackend::default() });

        let outcome = dashboard(&fakes, &backend).search("Paris").await;

        assert!(outcome.record.is_ok());
        assert!(!outcome.saved);
        assert!(outcome.statistics.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_search_does_not_overwrite_newer_result() {
        let mut geo = FakeGeo::default();
        geo.replies.insert("Paris".into(), vec![paris_geo()]);
        geo.replies.insert("Berlin".into(), vec![berlin_geo()]);
        geo.delays.insert("Paris".into(), Duration::from_secs(2));
        let fakes = Fakes::with_geo(geo);

        let dashboard = Dashboard::new(fakes.services());

        let (paris, berlin) = tokio::join!(dashboard.search("Paris"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dashboard.search("Berlin").await
        });

        assert!(paris.record.is_ok());
        assert!(!paris.is_current);
        assert!(berlin.is_current);
        assert_eq!(dashboard.current().unwrap().city(), "Berlin");
    }

    #[tokio::test]
    async fn lookup_only_dashboard_has_no_history() {
        let fakes = Fakes::paris();
        let dashboard = Dashboard::new(fakes.services());

        let outcome = dashboard.search("Paris").await;
        assert!(outcome.record.is_ok());
        assert!(!outcome.saved);
        assert!(dashboard.statistics().await.is_none());
        assert!(dashboard.recent(1, 5).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn suggestions_are_debounced() {
        let fakes = Fakes::paris();
        let dashboard = Dashboard::new(fakes.services());

        let suggestions = dashboard.suggest("Pa").await.unwrap();
        assert_eq!(suggestions[0].city, "Paris");
    }
}
