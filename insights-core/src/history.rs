use std::sync::Arc;
use tracing::warn;

use crate::{
    backend::BackendApi,
    model::{SavedRecord, Statistics},
    session::Session,
};

/// Read side of the backend: usage statistics and recent lookups.
///
/// Failures degrade to `None` / an empty list, which callers cannot tell
/// apart from "no data yet".
#[derive(Debug, Clone)]
pub struct HistoryClient {
    backend: Arc<dyn BackendApi>,
    session: Arc<Session>,
}

impl HistoryClient {
    pub fn new(backend: Arc<dyn BackendApi>, session: Arc<Session>) -> Self {
        Self { backend, session }
    }

    pub async fn fetch_statistics(&self) -> Option<Statistics> {
        let token = match self.session.with_token(self.backend.as_ref()).await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "cannot fetch statistics without a token");
                return None;
            }
        };

        match self.backend.statistics(&token).await {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to fetch statistics");
                None
            }
        }
    }

    /// Saved records, newest first. `page` starts at 1.
    pub async fn fetch_records(&self, page: u32, limit: u32) -> Vec<SavedRecord> {
        let token = match self.session.with_token(self.backend.as_ref()).await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "cannot fetch records without a token");
                return Vec::new();
            }
        };

        match self.backend.records(&token, page.max(1), limit).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to fetch records");
                Vec::new()
            }
        }
    }
}
