use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    model::{CountryInfo, CurrencyInfo},
    provider::truncate_body,
};

use super::CountryLookup;

const DEFAULT_BASE_URL: &str = "https://restcountries.com";

/// REST Countries v3.1. No key required.
#[derive(Debug, Clone)]
pub struct RestCountriesProvider {
    base_url: String,
    http: Client,
}

impl RestCountriesProvider {
    pub fn new(http: Client) -> Self {
        Self {
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
struct RcName {
    common: String,
}

#[derive(Debug, Deserialize)]
struct RcCountry {
    name: RcName,
    // Kept as a JSON map so the key order of the response survives.
    #[serde(default)]
    currencies: Map<String, Value>,
}

/// `/alpha/{code}` answers with a one-element array; some mirrors send the
/// bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RcAlphaResponse {
    Many(Vec<RcCountry>),
    One(RcCountry),
}

/// Parse an `/alpha/{code}` body. Currencies keep the order the service
/// lists them in; a country without any is an error.
pub(crate) fn parse_country(body: &str) -> Result<CountryInfo> {
    let parsed: RcAlphaResponse =
        serde_json::from_str(body).context("Failed to parse REST Countries JSON")?;

    let country = match parsed {
        RcAlphaResponse::Many(countries) => countries.into_iter().next(),
        RcAlphaResponse::One(country) => Some(country),
    }
    .ok_or_else(|| anyhow!("REST Countries response contained no country"))?;

    let currencies: Vec<CurrencyInfo> = country
        .currencies
        .into_iter()
        .map(|(code, details)| {
            let name = details
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(code.as_str())
                .to_string();
            CurrencyInfo { code, name }
        })
        .collect();

    if currencies.is_empty() {
        return Err(anyhow!("Country '{}' has no currencies listed", country.name.common));
    }

    Ok(CountryInfo {
        name: country.name.common,
        currencies,
    })
}

#[async_trait]
impl CountryLookup for RestCountriesProvider {
    async fn country(&self, country_code: &str) -> Result<CountryInfo> {
        let url = format!("{}/v3.1/alpha/{}", self.base_url, country_code);

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to send request to REST Countries")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read REST Countries response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "REST Countries request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_country(&body)
    }
}
