use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tracing::{debug, warn};

use crate::{model::GeoResult, provider::GeoLookup};

/// Partial input shorter than this never reaches the geo service.
pub const MIN_SUGGEST_LEN: usize = 2;
pub const SUGGESTION_LIMIT: usize = 5;
pub const SUGGEST_DEBOUNCE: Duration = Duration::from_millis(300);

/// Autocomplete candidates for partially typed city names. Advisory only:
/// failures come back as an empty list.
#[derive(Debug)]
pub struct Suggester {
    geo: Arc<dyn GeoLookup>,
    debounce: Duration,
    generation: AtomicU64,
}

impl Suggester {
    pub fn new(geo: Arc<dyn GeoLookup>) -> Self {
        Self {
            geo,
            debounce: SUGGEST_DEBOUNCE,
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub async fn suggest(&self, partial: &str) -> Vec<GeoResult> {
        let partial = partial.trim();
        if partial.chars().count() < MIN_SUGGEST_LEN {
            return Vec::new();
        }

        match self.geo.find_cities(partial, SUGGESTION_LIMIT).await {
            Ok(mut cities) => {
                cities.truncate(SUGGESTION_LIMIT);
                cities
            }
            Err(err) => {
                warn!(partial, error = %format!("{err:#}"), "city suggestions unavailable");
                Vec::new()
            }
        }
    }

    /// Wait out the debounce window, then suggest. Returns `None` when a newer
    /// call arrived during the wait; only the last keystroke hits the network.
    pub async fn suggest_debounced(&self, partial: &str) -> Option<Vec<GeoResult>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.debounce).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(partial, "suggestion superseded by newer input");
            return None;
        }

        Some(self.suggest(partial).await)
    }
}
