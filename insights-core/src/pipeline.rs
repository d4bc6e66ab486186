//! Sequential aggregation of the geo, country, weather and exchange-rate lookups.
//!
//! Each step consumes the output of the one before it, so the calls run strictly
//! in order: geo -> country -> weather -> exchange. Only the exchange-rate step
//! may fail softly.

use tracing::{debug, warn};

use crate::{
    InsightError,
    model::{AggregatedCityRecord, CityQuery, ExchangeRate},
    provider::{ServiceId, Services},
};

/// Number of geo candidates requested per lookup.
pub const GEO_CANDIDATE_LIMIT: usize = 5;

/// Outcome of one pipeline step.
#[derive(Debug)]
pub enum Stage<T> {
    Ok(T),
    /// Optional data is missing; the pipeline continues with a default.
    SoftFail {
        service: ServiceId,
        error: anyhow::Error,
    },
    /// Required data is missing; the pipeline stops.
    HardFail(InsightError),
}

impl<T> Stage<T> {
    pub fn required(service: ServiceId, result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Stage::Ok(value),
            Err(err) => Stage::HardFail(InsightError::from_service(service, &err)),
        }
    }

    pub fn optional(service: ServiceId, result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Stage::Ok(value),
            Err(error) => Stage::SoftFail { service, error },
        }
    }

    /// Value of a required step. A soft failure here is treated as hard.
    pub fn resolve(self) -> Result<T, InsightError> {
        match self {
            Stage::Ok(value) => Ok(value),
            Stage::SoftFail { service, error } => Err(InsightError::from_service(service, &error)),
            Stage::HardFail(err) => Err(err),
        }
    }

    /// Value of an optional step, substituting `fallback` on soft failure.
    pub fn resolve_or_else(self, fallback: impl FnOnce() -> T) -> Result<T, InsightError> {
        match self {
            Stage::Ok(value) => Ok(value),
            Stage::SoftFail { service, error } => {
                warn!(%service, error = %format!("{error:#}"), "optional lookup failed, using fallback");
                Ok(fallback())
            }
            Stage::HardFail(err) => Err(err),
        }
    }
}

/// First-result-wins: ambiguous city names and multi-currency countries both
/// resolve to whatever the upstream service ranked first.
pub fn select_first<T>(candidates: impl IntoIterator<Item = T>) -> Option<T> {
    candidates.into_iter().next()
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    services: Services,
}

impl Aggregator {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub async fn aggregate(&self, query: &CityQuery) -> Result<AggregatedCityRecord, InsightError> {
        debug!(city = %query, "looking up city candidates");
        let candidates = Stage::required(
            ServiceId::GeoDb,
            self.services.geo.find_cities(query.as_str(), GEO_CANDIDATE_LIMIT).await,
        )
        .resolve()?;

        let geo = select_first(candidates).ok_or_else(|| InsightError::NotFound {
            query: query.to_string(),
        })?;

        debug!(city = %geo.city, country_code = %geo.country_code, "resolving country");
        let country = Stage::required(
            ServiceId::RestCountries,
            self.services.countries.country(&geo.country_code).await,
        )
        .resolve()?;

        let currency = select_first(country.currencies.iter().cloned()).ok_or_else(|| {
            InsightError::Upstream {
                service: ServiceId::RestCountries,
                message: format!("Country '{}' has no currencies listed", country.name),
            }
        })?;

        debug!(lat = geo.latitude, lon = geo.longitude, "fetching current weather");
        let weather = Stage::required(
            ServiceId::OpenWeather,
            self.services.weather.current_weather(geo.latitude, geo.longitude).await,
        )
        .resolve()?;

        debug!(currency = %currency.code, "fetching exchange rate");
        let rate = Stage::optional(
            ServiceId::ExchangeRate,
            self.services
                .rates
                .rate_to_usd(&currency.code)
                .await
                .map(ExchangeRate::Available),
        )
        .resolve_or_else(|| ExchangeRate::Unavailable)?;

        Ok(AggregatedCityRecord::assemble(geo, country, currency, weather, rate))
    }
}
