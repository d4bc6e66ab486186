use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::{InsightError, format};

/// Trimmed, non-empty city name as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery(String);

impl CityQuery {
    pub fn parse(input: &str) -> Result<Self, InsightError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InsightError::InvalidQuery("city name must not be empty".into()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One candidate location returned by the geo lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoResult {
    pub city: String,
    #[serde(default)]
    pub country: String,
    pub country_code: String,
    #[serde(default)]
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub name: String,
}

/// Country name plus its currencies, in the order the country service lists them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryInfo {
    pub name: String,
    pub currencies: Vec<CurrencyInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Smoke,
    Haze,
    Fog,
    Other(String),
}

impl WeatherCondition {
    /// Never fails: unknown categories are kept verbatim as `Other`.
    pub fn from_category(category: &str) -> Self {
        match category {
            "Clear" => WeatherCondition::Clear,
            "Clouds" => WeatherCondition::Clouds,
            "Rain" => WeatherCondition::Rain,
            "Drizzle" => WeatherCondition::Drizzle,
            "Thunderstorm" => WeatherCondition::Thunderstorm,
            "Snow" => WeatherCondition::Snow,
            "Mist" => WeatherCondition::Mist,
            "Smoke" => WeatherCondition::Smoke,
            "Haze" => WeatherCondition::Haze,
            "Fog" => WeatherCondition::Fog,
            other => WeatherCondition::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::Clouds => "Clouds",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Mist => "Mist",
            WeatherCondition::Smoke => "Smoke",
            WeatherCondition::Haze => "Haze",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Other(s) => s,
        }
    }

    pub fn icon(&self) -> &'static str {
        format::weather_icon(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub condition: WeatherCondition,
    pub description: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Value of one unit of a currency in USD, or the sentinel when the rate
/// service could not deliver one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExchangeRate {
    Available(f64),
    Unavailable,
}

impl ExchangeRate {
    pub const UNAVAILABLE: &'static str = "Unavailable";

    pub fn is_available(&self) -> bool {
        matches!(self, ExchangeRate::Available(_))
    }

    /// Numeric view used when persisting; unavailable rates are stored as 0.
    pub fn value_or_zero(&self) -> f64 {
        match self {
            ExchangeRate::Available(rate) => *rate,
            ExchangeRate::Unavailable => 0.0,
        }
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeRate::Available(rate) => write!(f, "{rate:.4}"),
            ExchangeRate::Unavailable => f.write_str(Self::UNAVAILABLE),
        }
    }
}

impl Serialize for ExchangeRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Merged result of the geo, country, weather and exchange-rate lookups.
///
/// Built once by the pipeline and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedCityRecord {
    city: String,
    country: String,
    country_code: String,
    region: String,
    population: u64,
    population_display: String,
    weather: String,
    weather_main: String,
    weather_icon: &'static str,
    temp: i64,
    feels_like: i64,
    humidity: u8,
    currency_code: String,
    currency_name: String,
    #[serde(rename = "rateToUSD")]
    rate_to_usd: ExchangeRate,
    timezone: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl AggregatedCityRecord {
    pub fn assemble(
        geo: GeoResult,
        country: CountryInfo,
        currency: CurrencyInfo,
        weather: WeatherSnapshot,
        rate_to_usd: ExchangeRate,
    ) -> Self {
        Self {
            population_display: format::thousands(geo.population),
            weather_icon: weather.condition.icon(),
            weather_main: weather.condition.as_str().to_string(),
            weather: weather.description,
            temp: format::round_half_up(weather.temperature_c),
            feels_like: format::round_half_up(weather.feels_like_c),
            humidity: weather.humidity_pct,
            currency_code: currency.code,
            currency_name: currency.name,
            rate_to_usd,
            city: geo.city,
            country: country.name,
            country_code: geo.country_code,
            region: geo.region,
            population: geo.population,
            timezone: geo.timezone,
            latitude: geo.latitude,
            longitude: geo.longitude,
        }
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn population_display(&self) -> &str {
        &self.population_display
    }

    pub fn weather_description(&self) -> &str {
        &self.weather
    }

    pub fn weather_main(&self) -> &str {
        &self.weather_main
    }

    pub fn weather_icon(&self) -> &'static str {
        self.weather_icon
    }

    pub fn temperature_c(&self) -> i64 {
        self.temp
    }

    pub fn feels_like_c(&self) -> i64 {
        self.feels_like
    }

    pub fn humidity_pct(&self) -> u8 {
        self.humidity
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn currency_name(&self) -> &str {
        &self.currency_name
    }

    pub fn rate_to_usd(&self) -> ExchangeRate {
        self.rate_to_usd
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Opaque backend session credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub city: String,
    pub country: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherPayload {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub main: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPayload {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "rateToUSD", default)]
    pub rate_to_usd: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized form of a record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePayload {
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub weather: WeatherPayload,
    #[serde(default)]
    pub currency: CurrencyPayload,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl From<&AggregatedCityRecord> for SavePayload {
    fn from(record: &AggregatedCityRecord) -> Self {
        Self {
            city: record.city.clone(),
            country: record.country.clone(),
            population: record.population,
            weather: WeatherPayload {
                description: record.weather.clone(),
                temperature: record.temp as f64,
                feels_like: record.feels_like as f64,
                humidity: record.humidity,
                main: record.weather_main.clone(),
            },
            currency: CurrencyPayload {
                code: record.currency_code.clone(),
                name: record.currency_name.clone(),
                rate_to_usd: record.rate_to_usd.value_or_zero(),
            },
            coordinates: Coordinates {
                latitude: record.latitude,
                longitude: record.longitude,
            },
            timezone: record.timezone.clone(),
        }
    }
}

/// Entry returned by the backend history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub payload: SavePayload,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaveReceipt {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    #[serde(default)]
    pub total_searches: u64,
    #[serde(default)]
    pub unique_cities: u64,
    #[serde(default)]
    pub avg_temperature: Option<f64>,
    #[serde(default)]
    pub unique_countries: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularCity {
    #[serde(rename = "_id")]
    pub city: String,
    pub count: u64,
}

/// Usage statistics computed server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub overview: StatsOverview,
    #[serde(default)]
    pub popular_cities: Vec<PopularCity>,
}

#[cfg(test)]
pub(crate) fn paris_record(rate: ExchangeRate) -> AggregatedCityRecord {
    AggregatedCityRecord::assemble(
        GeoResult {
            city: "Paris".into(),
            country: "France".into(),
            country_code: "FR".into(),
            region: "Île-de-France".into(),
            latitude: 48.85,
            longitude: 2.35,
            population: 2_148_000,
            timezone: Some("Europe/Paris".into()),
        },
        CountryInfo {
            name: "France".into(),
            currencies: vec![CurrencyInfo { code: "EUR".into(), name: "Euro".into() }],
        },
        CurrencyInfo { code: "EUR".into(), name: "Euro".into() },
        WeatherSnapshot {
            condition: WeatherCondition::Clear,
            description: "clear sky".into(),
            temperature_c: 18.3,
            feels_like_c: 17.9,
            humidity_pct: 55,
            observed_at: None,
        },
        rate,
    )
}
