//! Core library for the `city-insights` dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the geo, country, weather and exchange-rate services
//! - The sequential aggregation pipeline and autocomplete suggestions
//! - Backend session, persistence and history clients
//!
//! It is used by `insights-cli`, but can also sit behind any other trusted
//! frontend.

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod favorites;
pub mod format;
pub mod history;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod provider;
pub mod sequence;
pub mod session;
pub mod suggest;

#[cfg(test)]
mod testing;

pub use backend::{BackendApi, HttpBackend};
pub use config::{BackendConfig, Config, ServiceConfig};
pub use dashboard::{Dashboard, SearchOutcome};
pub use error::InsightError;
pub use favorites::Favorites;
pub use model::{AggregatedCityRecord, CityQuery, ExchangeRate, GeoResult, SavedRecord, Statistics};
pub use pipeline::Aggregator;
pub use provider::{ServiceId, Services};
pub use session::{Session, TokenStore};
pub use suggest::Suggester;
