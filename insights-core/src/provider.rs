use crate::{
    Config,
    model::{CountryInfo, GeoResult, WeatherSnapshot},
    provider::{
        exchangerate::ExchangeRateHostProvider, geodb::GeoDbProvider,
        openweather::OpenWeatherProvider, restcountries::RestCountriesProvider,
    },
};
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod exchangerate;
pub mod geodb;
pub mod openweather;
pub mod restcountries;

/// Third-party services the aggregation pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    GeoDb,
    RestCountries,
    OpenWeather,
    ExchangeRate,
}

impl ServiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::GeoDb => "geodb",
            ServiceId::RestCountries => "restcountries",
            ServiceId::OpenWeather => "openweather",
            ServiceId::ExchangeRate => "exchangerate",
        }
    }

    pub const fn all() -> &'static [ServiceId] {
        &[
            ServiceId::GeoDb,
            ServiceId::RestCountries,
            ServiceId::OpenWeather,
            ServiceId::ExchangeRate,
        ]
    }

    /// The country-info service is public; the others need a key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ServiceId::RestCountries)
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "geodb" => Ok(ServiceId::GeoDb),
            "restcountries" => Ok(ServiceId::RestCountries),
            "openweather" => Ok(ServiceId::OpenWeather),
            "exchangerate" => Ok(ServiceId::ExchangeRate),
            _ => Err(anyhow::anyhow!(
                "Unknown service '{value}'. Supported services: geodb, restcountries, openweather, exchangerate."
            )),
        }
    }
}

/// Name -> ranked candidate cities.
#[async_trait]
pub trait GeoLookup: Send + Sync + Debug {
    async fn find_cities(&self, name_prefix: &str, limit: usize) -> anyhow::Result<Vec<GeoResult>>;
}

/// Country code -> country name and currencies.
#[async_trait]
pub trait CountryLookup: Send + Sync + Debug {
    async fn country(&self, country_code: &str) -> anyhow::Result<CountryInfo>;
}

/// Coordinates -> current conditions.
#[async_trait]
pub trait WeatherLookup: Send + Sync + Debug {
    async fn current_weather(&self, latitude: f64, longitude: f64) -> anyhow::Result<WeatherSnapshot>;
}

/// Currency code -> value of one unit in USD.
#[async_trait]
pub trait RateLookup: Send + Sync + Debug {
    async fn rate_to_usd(&self, currency_code: &str) -> anyhow::Result<f64>;
}

/// The four upstream collaborators, ready to hand to the pipeline.
#[derive(Debug, Clone)]
pub struct Services {
    pub geo: Arc<dyn GeoLookup>,
    pub countries: Arc<dyn CountryLookup>,
    pub weather: Arc<dyn WeatherLookup>,
    pub rates: Arc<dyn RateLookup>,
}

impl Services {
    /// Build HTTP clients for every service from config. All of them share one
    /// connection pool.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::new();

        let geo = geo_provider(config, http.clone())?;

        let mut countries = RestCountriesProvider::new(http.clone());
        if let Some(url) = config.service_base_url(ServiceId::RestCountries) {
            countries = countries.with_base_url(url);
        }

        let mut weather =
            OpenWeatherProvider::new(required_api_key(config, ServiceId::OpenWeather)?, http.clone());
        if let Some(url) = config.service_base_url(ServiceId::OpenWeather) {
            weather = weather.with_base_url(url);
        }

        let mut rates =
            ExchangeRateHostProvider::new(required_api_key(config, ServiceId::ExchangeRate)?, http);
        if let Some(url) = config.service_base_url(ServiceId::ExchangeRate) {
            rates = rates.with_base_url(url);
        }

        Ok(Self {
            geo: Arc::new(geo),
            countries: Arc::new(countries),
            weather: Arc::new(weather),
            rates: Arc::new(rates),
        })
    }
}

/// Only the geo service, for callers that just suggest city names and should
/// not need keys for the other three.
pub fn geo_from_config(config: &Config) -> anyhow::Result<Arc<dyn GeoLookup>> {
    Ok(Arc::new(geo_provider(config, Client::new())?))
}

fn geo_provider(config: &Config, http: Client) -> anyhow::Result<GeoDbProvider> {
    let geo = GeoDbProvider::new(required_api_key(config, ServiceId::GeoDb)?, http);
    Ok(match config.service_base_url(ServiceId::GeoDb) {
        Some(url) => geo.with_base_url(url),
        None => geo,
    })
}

fn required_api_key(config: &Config, id: ServiceId) -> anyhow::Result<String> {
    config.service_api_key(id).map(str::to_owned).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for service '{id}'.\n\
                 Hint: run `city-insights configure {id}` and enter your API key."
        )
    })
}

/// Keep upstream error bodies short enough for a log line.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
