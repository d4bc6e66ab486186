use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::provider::truncate_body;

use super::RateLookup;

const DEFAULT_BASE_URL: &str = "https://api.exchangerate.host";

/// exchangerate.host `convert` endpoint, always quoting against USD.
#[derive(Debug, Clone)]
pub struct ExchangeRateHostProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl ExchangeRateHostProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ErhError {
    #[serde(default)]
    info: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErhConvertResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<f64>,
    #[serde(default)]
    error: Option<ErhError>,
}

/// Parse a `convert` body. The service reports denials (bad key, quota) with
/// `success: false` and a 200 status.
pub(crate) fn parse_convert(body: &str) -> Result<f64> {
    let parsed: ErhConvertResponse =
        serde_json::from_str(body).context("Failed to parse exchangerate.host JSON")?;

    if !parsed.success {
        let reason = parsed
            .error
            .and_then(|e| e.info.or(e.kind))
            .unwrap_or_else(|| "no reason given".to_string());
        return Err(anyhow!("exchangerate.host denied the request: {reason}"));
    }

    parsed
        .result
        .ok_or_else(|| anyhow!("exchangerate.host response contained no result"))
}

#[async_trait]
impl RateLookup for ExchangeRateHostProvider {
    async fn rate_to_usd(&self, currency_code: &str) -> Result<f64> {
        let url = format!("{}/convert", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("from", currency_code),
                ("to", "USD"),
                ("amount", "1"),
                ("access_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to exchangerate.host")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read exchangerate.host response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "exchangerate.host request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_convert(&body)
    }
}
