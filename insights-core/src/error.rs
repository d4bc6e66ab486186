use thiserror::Error;

use crate::provider::ServiceId;

/// Failures surfaced by the aggregation core.
///
/// A soft-failing step (the exchange rate) never produces one of these; the
/// pipeline substitutes a sentinel instead.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("No city found matching '{query}'")]
    NotFound { query: String },

    #[error("{service} returned an error: {message}")]
    Upstream { service: ServiceId, message: String },

    #[error("Network error while calling {service}: {message}")]
    Network { service: ServiceId, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InsightError {
    /// Classify an upstream client error. Anything with a transport error in
    /// its chain counts as a network failure.
    pub fn from_service(service: ServiceId, err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        if err.chain().any(|cause| cause.is::<reqwest::Error>()) {
            InsightError::Network { service, message }
        } else {
            InsightError::Upstream { service, message }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, InsightError::NotFound { .. })
    }

    /// Message fit for end users. Internal distinctions are collapsed.
    pub fn user_message(&self) -> &'static str {
        match self {
            InsightError::InvalidQuery(_) => "Please enter a city name.",
            InsightError::NotFound { .. } => "City not found. Please try a different city name.",
            InsightError::Upstream { .. } | InsightError::Network { .. } => {
                "Unable to fetch city data. Please check your connection and try again."
            }
            InsightError::Auth(_) => "Could not authenticate with the backend.",
            InsightError::Config(_) => "Configuration error. Please check your API keys.",
        }
    }
}
