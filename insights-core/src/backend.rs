use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use crate::{
    config::BackendConfig,
    model::{AuthToken, SavePayload, SaveReceipt, SavedRecord, Statistics},
    provider::truncate_body,
};

/// Storage service that keeps lookups and computes usage statistics.
#[async_trait]
pub trait BackendApi: Send + Sync + Debug {
    /// Exchange the static API key for a session token.
    async fn authenticate(&self) -> Result<AuthToken>;

    async fn save(&self, token: &AuthToken, payload: &SavePayload) -> Result<SaveReceipt>;

    async fn statistics(&self, token: &AuthToken) -> Result<Statistics>;

    /// One page of saved records, newest first.
    async fn records(&self, token: &AuthToken, page: u32, limit: u32) -> Result<Vec<SavedRecord>>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    api_key: String,
    http: Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: &BackendConfig, http: Client) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Both credentials travel on every authorized call.
    fn authorized(&self, request: RequestBuilder, token: &AuthToken) -> RequestBuilder {
        request
            .bearer_auth(token.as_str())
            .header("X-API-Key", self.api_key.as_str())
    }

    fn records_request(&self, token: &AuthToken, page: u32, limit: u32) -> RequestBuilder {
        self.authorized(self.http.get(self.url("records")), token).query(&[
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("sortBy", "timestamp".to_string()),
            ("order", "desc".to_string()),
        ])
    }
}

/// `{ success, message?, data?, token? }`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    api_key: &'a str,
}

fn parse_envelope<T: DeserializeOwned>(body: &str, what: &str) -> Result<Envelope<T>> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .with_context(|| format!("Failed to parse backend {what} response"))?;

    if !envelope.success {
        return Err(anyhow!(
            "Backend {what} request was rejected: {}",
            envelope.message.as_deref().unwrap_or("no message")
        ));
    }

    Ok(envelope)
}

fn parse_data<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    parse_envelope::<T>(body, what)?
        .data
        .ok_or_else(|| anyhow!("Backend {what} response contained no data"))
}

fn parse_token(body: &str) -> Result<AuthToken> {
    parse_envelope::<serde_json::Value>(body, "auth")?
        .token
        .map(AuthToken::new)
        .ok_or_else(|| anyhow!("Backend auth response contained no token"))
}

async fn read_body(res: Response, what: &str) -> Result<String> {
    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read backend {what} response body"))?;

    // Application errors come back as JSON envelopes with non-2xx codes too;
    // prefer their message when there is one.
    if !status.is_success() {
        let parsed: serde_json::Result<Envelope<serde_json::Value>> = serde_json::from_str(&body);
        if let Ok(Envelope { message: Some(message), .. }) = parsed {
            return Err(anyhow!("Backend {what} request failed with status {status}: {message}"));
        }
        return Err(anyhow!(
            "Backend {what} request failed with status {}: {}",
            status,
            truncate_body(&body),
        ));
    }

    Ok(body)
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn authenticate(&self) -> Result<AuthToken> {
        let res = self
            .http
            .post(self.url("auth/token"))
            .json(&TokenRequest { api_key: &self.api_key })
            .send()
            .await
            .context("Failed to send request to backend (auth)")?;

        parse_token(&read_body(res, "auth").await?)
    }

    async fn save(&self, token: &AuthToken, payload: &SavePayload) -> Result<SaveReceipt> {
        let res = self
            .authorized(self.http.post(self.url("saveData")), token)
            .json(payload)
            .send()
            .await
            .context("Failed to send request to backend (save)")?;

        parse_data(&read_body(res, "save").await?, "save")
    }

    async fn statistics(&self, token: &AuthToken) -> Result<Statistics> {
        let res = self
            .authorized(self.http.get(self.url("stats")), token)
            .send()
            .await
            .context("Failed to send request to backend (stats)")?;

        parse_data(&read_body(res, "stats").await?, "stats")
    }

    async fn records(&self, token: &AuthToken, page: u32, limit: u32) -> Result<Vec<SavedRecord>> {
        let res = self
            .records_request(token, page, limit)
            .send()
            .await
            .context("Failed to send request to backend (records)")?;

        let body = read_body(res, "records").await?;
        // An empty history may come back without a data field.
        Ok(parse_envelope::<Vec<SavedRecord>>(&body, "records")?
            .data
            .unwrap_or_default())
    }
}
