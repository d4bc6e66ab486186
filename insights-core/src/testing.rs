//! In-memory stand-ins for the upstream services and the backend.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::{
    backend::BackendApi,
    model::{
        AuthToken, CountryInfo, CurrencyInfo, GeoResult, SavePayload, SaveReceipt, SavedRecord,
        Statistics, WeatherCondition, WeatherSnapshot,
    },
    provider::{CountryLookup, GeoLookup, RateLookup, Services, WeatherLookup},
};

pub(crate) fn paris_geo() -> GeoResult {
    GeoResult {
        city: "Paris".into(),
        country: "France".into(),
        country_code: "FR".into(),
        region: "Île-de-France".into(),
        latitude: 48.85,
        longitude: 2.35,
        population: 2_148_000,
        timezone: Some("Europe/Paris".into()),
    }
}

pub(crate) fn paris_texas_geo() -> GeoResult {
    GeoResult {
        city: "Paris".into(),
        country: "United States of America".into(),
        country_code: "US".into(),
        region: "Texas".into(),
        latitude: 33.66,
        longitude: -95.55,
        population: 24_171,
        timezone: Some("America/Chicago".into()),
    }
}

pub(crate) fn berlin_geo() -> GeoResult {
    GeoResult {
        city: "Berlin".into(),
        country: "Germany".into(),
        country_code: "DE".into(),
        region: "Berlin".into(),
        latitude: 52.52,
        longitude: 13.40,
        population: 3_645_000,
        timezone: Some("Europe/Berlin".into()),
    }
}

pub(crate) fn clear_weather() -> WeatherSnapshot {
    WeatherSnapshot {
        condition: WeatherCondition::Clear,
        description: "clear sky".into(),
        temperature_c: 18.3,
        feels_like_c: 17.9,
        humidity_pct: 55,
        observed_at: None,
    }
}

fn currency(code: &str, name: &str) -> CurrencyInfo {
    CurrencyInfo {
        code: code.into(),
        name: name.into(),
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeGeo {
    pub replies: HashMap<String, Vec<GeoResult>>,
    pub delays: HashMap<String, Duration>,
    pub fail: Option<String>,
    pub calls: AtomicUsize,
    pub limits: Mutex<Vec<usize>>,
}

#[async_trait]
impl GeoLookup for FakeGeo {
    async fn find_cities(&self, name_prefix: &str, limit: usize) -> Result<Vec<GeoResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.limits.lock().unwrap().push(limit);

        if let Some(delay) = self.delays.get(name_prefix) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(msg) = &self.fail {
            return Err(anyhow!(msg.clone()));
        }

        Ok(self.replies.get(name_prefix).cloned().unwrap_or_default())
    }
}

#[derive(Debug)]
pub(crate) struct FakeCountries {
    pub replies: HashMap<String, CountryInfo>,
    pub calls: AtomicUsize,
}

impl Default for FakeCountries {
    fn default() -> Self {
        let mut replies = HashMap::new();
        replies.insert(
            "FR".to_string(),
            CountryInfo {
                name: "France".into(),
                currencies: vec![currency("EUR", "Euro")],
            },
        );
        replies.insert(
            "DE".to_string(),
            CountryInfo {
                name: "Germany".into(),
                currencies: vec![currency("EUR", "Euro")],
            },
        );
        replies.insert(
            "US".to_string(),
            CountryInfo {
                name: "United States".into(),
                currencies: vec![currency("USD", "United States dollar")],
            },
        );
        Self {
            replies,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CountryLookup for FakeCountries {
    async fn country(&self, country_code: &str) -> Result<CountryInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(country_code)
            .cloned()
            .ok_or_else(|| anyhow!("REST Countries request failed with status 404 Not Found"))
    }
}

#[derive(Debug)]
pub(crate) struct FakeWeather {
    pub reply: Option<WeatherSnapshot>,
    pub calls: AtomicUsize,
    pub coordinates: Mutex<Vec<(f64, f64)>>,
}

impl Default for FakeWeather {
    fn default() -> Self {
        Self {
            reply: Some(clear_weather()),
            calls: AtomicUsize::new(0),
            coordinates: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WeatherLookup for FakeWeather {
    async fn current_weather(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.coordinates.lock().unwrap().push((latitude, longitude));
        self.reply
            .clone()
            .ok_or_else(|| anyhow!("OpenWeather current request failed with status 500"))
    }
}

#[derive(Debug)]
pub(crate) struct FakeRates {
    pub reply: std::result::Result<f64, String>,
    pub calls: AtomicUsize,
    pub codes: Mutex<Vec<String>>,
}

impl Default for FakeRates {
    fn default() -> Self {
        Self {
            reply: Ok(1.08),
            calls: AtomicUsize::new(0),
            codes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RateLookup for FakeRates {
    async fn rate_to_usd(&self, currency_code: &str) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.codes.lock().unwrap().push(currency_code.to_string());
        self.reply.clone().map_err(|msg| anyhow!(msg))
    }
}

/// Handles to each fake so tests can inspect calls after running the pipeline.
#[derive(Debug, Clone)]
pub(crate) struct Fakes {
    pub geo: Arc<FakeGeo>,
    pub countries: Arc<FakeCountries>,
    pub weather: Arc<FakeWeather>,
    pub rates: Arc<FakeRates>,
}

impl Fakes {
    /// Paris resolves to Paris, France; Berlin to Berlin; anything else finds nothing.
    pub fn paris() -> Self {
        let mut geo = FakeGeo::default();
        geo.replies.insert("Paris".into(), vec![paris_geo(), paris_texas_geo()]);
        geo.replies.insert("Berlin".into(), vec![berlin_geo()]);
        geo.replies.insert("Pa".into(), vec![paris_geo(), paris_texas_geo()]);
        Self::with_geo(geo)
    }

    pub fn with_geo(geo: FakeGeo) -> Self {
        Self {
            geo: Arc::new(geo),
            countries: Arc::new(FakeCountries::default()),
            weather: Arc::new(FakeWeather::default()),
            rates: Arc::new(FakeRates::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            geo: self.geo.clone(),
            countries: self.countries.clone(),
            weather: self.weather.clone(),
            rates: self.rates.clone(),
        }
    }

    pub fn downstream_calls(&self) -> usize {
        self.countries.calls.load(Ordering::SeqCst)
            + self.weather.calls.load(Ordering::SeqCst)
            + self.rates.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    pub auth_fails: bool,
    pub save_fails: bool,
    pub stats: Option<Statistics>,
    pub records: Vec<SavedRecord>,
    pub auth_calls: AtomicUsize,
    pub saved: Mutex<Vec<SavePayload>>,
    pub tokens_seen: Mutex<Vec<String>>,
    pub pages: Mutex<Vec<(u32, u32)>>,
}

impl FakeBackend {
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn saved_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn authenticate(&self) -> Result<AuthToken> {
        let n = self.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.auth_fails {
            return Err(anyhow!("Invalid API key"));
        }
        Ok(AuthToken::new(format!("token-{n}")))
    }

    async fn save(&self, token: &AuthToken, payload: &SavePayload) -> Result<SaveReceipt> {
        self.tokens_seen.lock().unwrap().push(token.as_str().to_string());
        if self.save_fails {
            return Err(anyhow!("Backend rejected the record: validation failed"));
        }

        let mut saved = self.saved.lock().unwrap();
        saved.push(payload.clone());
        Ok(SaveReceipt {
            id: format!("rec-{}", saved.len()),
        })
    }

    async fn statistics(&self, token: &AuthToken) -> Result<Statistics> {
        self.tokens_seen.lock().unwrap().push(token.as_str().to_string());
        self.stats.clone().ok_or_else(|| anyhow!("Backend stats request failed"))
    }

    async fn records(&self, token: &AuthToken, page: u32, limit: u32) -> Result<Vec<SavedRecord>> {
        self.tokens_seen.lock().unwrap().push(token.as_str().to_string());
        self.pages.lock().unwrap().push((page, limit));
        Ok(self.records.clone())
    }
}
