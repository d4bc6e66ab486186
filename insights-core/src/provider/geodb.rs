use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::{model::GeoResult, provider::truncate_body};

use super::GeoLookup;

const DEFAULT_BASE_URL: &str = "https://wft-geo-db.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "wft-geo-db.p.rapidapi.com";

/// GeoDB Cities, served through RapidAPI.
#[derive(Debug, Clone)]
pub struct GeoDbProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeoDbProvider {
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

    /// Candidates come back in the service's default ranking.
    fn cities_request(&self, name_prefix: &str, limit: usize) -> RequestBuilder {
        self.http
            .get(format!("{}/v1/geo/cities", self.base_url))
            .header("X-RapidAPI-Key", self.api_key.as_str())
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(&[("namePrefix", name_prefix.to_string()), ("limit", limit.to_string())])
    }
}

#[derive(Debug, Deserialize)]
struct GeoDbCitiesResponse {
    #[serde(default)]
    data: Option<Vec<GeoResult>>,
}

/// Parse a `/v1/geo/cities` body. A missing `data` array means no matches.
pub(crate) fn parse_cities(body: &str) -> Result<Vec<GeoResult>> {
    let parsed: GeoDbCitiesResponse =
        serde_json::from_str(body).context("Failed to parse GeoDB cities JSON")?;

    Ok(parsed.data.unwrap_or_default())
}

#[async_trait]
impl GeoLookup for GeoDbProvider {
    async fn find_cities(&self, name_prefix: &str, limit: usize) -> Result<Vec<GeoResult>> {
        let res = self
            .cities_request(name_prefix, limit)
            .send()
            .await
            .context("Failed to send request to GeoDB (cities)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read GeoDB cities response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "GeoDB cities request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_cities(&body)
    }
}
