use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    backend::BackendApi,
    model::{AggregatedCityRecord, SavePayload},
    session::Session,
};

/// Submits finished lookups to the backend.
///
/// Saving is not idempotent: every call creates a new backend entry, so a
/// caller that retries a save stores the lookup twice.
#[derive(Debug, Clone)]
pub struct PersistenceClient {
    backend: Arc<dyn BackendApi>,
    session: Arc<Session>,
}

impl PersistenceClient {
    pub fn new(backend: Arc<dyn BackendApi>, session: Arc<Session>) -> Self {
        Self { backend, session }
    }

    /// Returns whether the backend accepted the record. Never fails past here.
    pub async fn save(&self, record: &AggregatedCityRecord) -> bool {
        let token = match self.session.with_token(self.backend.as_ref()).await {
            Ok(token) => token,
            Err(err) => {
                warn!(city = record.city(), error = %err, "cannot save lookup without a token");
                return false;
            }
        };

        let payload = SavePayload::from(record);

        match self.backend.save(&token, &payload).await {
            Ok(receipt) => {
                info!(city = record.city(), id = %receipt.id, "lookup saved");
                true
            }
            Err(err) => {
                warn!(city = record.city(), error = %format!("{err:#}"), "failed to save lookup");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{ExchangeRate, paris_record},
        testing::FakeBackend,
    };

    fn client(backend: &Arc<FakeBackend>) -> PersistenceClient {
        PersistenceClient::new(backend.clone(), Arc::new(Session::new()))
    }

    #[tokio::test]
    async fn save_bootstraps_token_then_submits_payload() {
        let backend = Arc::new(FakeBackend::default());

        assert!(client(&backend).save(&paris_record(ExchangeRate::Available(1.08))).await);

        assert_eq!(backend.auth_calls(), 1);
        let saved = backend.saved.lock().unwrap();
        assert_eq!(saved[0].city, "Paris");
        assert_eq!(saved[0].population, 2_148_000);
        assert_eq!(saved[0].currency.rate_to_usd, 1.08);
        assert_eq!(*backend.tokens_seen.lock().unwrap(), vec!["token-1".to_string()]);
    }

    #[tokio::test]
    async fn unavailable_rate_is_saved_as_zero() {
        let backend = Arc::new(FakeBackend::default());

        assert!(client(&backend).save(&paris_record(ExchangeRate::Unavailable)).await);
        assert_eq!(backend.saved.lock().unwrap()[0].currency.rate_to_usd, 0.0);
    }

    #[tokio::test]
    async fn auth_failure_reports_unsaved() {
        let backend = Arc::new(FakeBackend { auth_fails: true, ..FakeBackend::default() });

        assert!(!client(&backend).save(&paris_record(ExchangeRate::Unavailable)).await);
        assert_eq!(backend.saved_count(), 0);
        assert!(backend.tokens_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_rejection_reports_unsaved() {
        let backend = Arc::new(FakeBackend { save_fails: true, ..FakeBackend::default() });

        assert!(!client(&backend).save(&paris_record(ExchangeRate::Unavailable)).await);
    }

    // Known limitation: there is no idempotency key, so saving the same record
    // twice stores two entries.
    #[tokio::test]
    async fn saving_twice_creates_two_entries() {
        let backend = Arc::new(FakeBackend::default());
        let client = client(&backend);
        let record = paris_record(ExchangeRate::Available(1.08));

        assert!(client.save(&record).await);
        assert!(client.save(&record).await);

        let saved = backend.saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0], saved[1]);
        assert_eq!(backend.auth_calls(), 1);
    }
}
