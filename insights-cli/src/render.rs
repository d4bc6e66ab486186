use chrono::{DateTime, Utc};
use insights_core::{
    AggregatedCityRecord, ExchangeRate, GeoResult, SavedRecord, Statistics, format::relative_time,
    model::FavoriteEntry,
};

fn hemisphere(value: f64, positive: char, negative: char) -> String {
    let dir = if value >= 0.0 { positive } else { negative };
    format!("{:.2}°{}", value.abs(), dir)
}

pub fn record(record: &AggregatedCityRecord) -> String {
    let mut out = format!("{}, {}\n", record.city(), record.country());

    out.push_str(&format!(
        "{}, {}",
        hemisphere(record.latitude(), 'N', 'S'),
        hemisphere(record.longitude(), 'E', 'W'),
    ));
    if let Some(tz) = record.timezone() {
        out.push_str(&format!(" • {tz}"));
    }
    out.push_str("\n\n");

    out.push_str(&format!("  Population     {}\n", record.population_display()));
    out.push_str(&format!(
        "  Weather        {}°C  {} • Feels like {}°C • Humidity {}%\n",
        record.temperature_c(),
        record.weather_description(),
        record.feels_like_c(),
        record.humidity_pct(),
    ));
    out.push_str(&format!(
        "  Currency       {}  {}\n",
        record.currency_code(),
        record.currency_name()
    ));

    let rate = match record.rate_to_usd() {
        rate @ ExchangeRate::Available(_) => format!("1 {} = {} USD", record.currency_code(), rate),
        ExchangeRate::Unavailable => ExchangeRate::UNAVAILABLE.to_string(),
    };
    out.push_str(&format!("  Exchange rate  {rate}\n"));

    out
}

pub fn suggestions(cities: &[GeoResult]) -> String {
    if cities.is_empty() {
        return "No matching cities.\n".to_string();
    }

    cities
        .iter()
        .map(|city| format!("{}  ({}, {})\n", city.city, city.country, city.region))
        .collect()
}

pub fn statistics(stats: &Statistics) -> String {
    let overview = &stats.overview;

    let mut out = format!(
        "Total searches    {}\nUnique cities     {}\nUnique countries  {}\nAvg temperature   {}°C\n",
        overview.total_searches,
        overview.unique_cities,
        overview.unique_countries,
        overview.avg_temperature.unwrap_or(0.0),
    );

    if !stats.popular_cities.is_empty() {
        out.push_str("\nPopular cities\n");
        for city in &stats.popular_cities {
            out.push_str(&format!("  {:<20} {} searches\n", city.city, city.count));
        }
    }

    out
}

pub fn history(records: &[SavedRecord], now: DateTime<Utc>) -> String {
    if records.is_empty() {
        return "No recent searches yet. Search for a city to see history here.\n".to_string();
    }

    records
        .iter()
        .map(|record| {
            let when = record
                .timestamp
                .map(|ts| relative_time(ts, now))
                .unwrap_or_default();
            format!(
                "{:<20} {:<24} {:>5.0}°C  {}\n",
                record.payload.city, record.payload.country, record.payload.weather.temperature, when,
            )
        })
        .collect()
}

pub fn favorites(entries: &[FavoriteEntry]) -> String {
    if entries.is_empty() {
        return "No favorites yet.\n".to_string();
    }

    entries
        .iter()
        .map(|entry| {
            format!(
                "{}, {}  (added {})\n",
                entry.city,
                entry.country,
                entry.saved_at.format("%Y-%m-%d")
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use insights_core::model::{
        CountryInfo, CurrencyInfo, PopularCity, SavePayload, StatsOverview, WeatherCondition,
        WeatherSnapshot,
    };

    fn paris(rate: ExchangeRate) -> AggregatedCityRecord {
        let euro = CurrencyInfo { code: "EUR".into(), name: "Euro".into() };
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
            CountryInfo { name: "France".into(), currencies: vec![euro.clone()] },
            euro,
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

    #[test]
    fn record_card_shows_all_sections() {
        let out = record(&paris(ExchangeRate::Available(1.08)));

        assert!(out.starts_with("Paris, France\n48.85°N, 2.35°E • Europe/Paris"));
        assert!(out.contains("2,148,000"));
        assert!(out.contains("18°C  clear sky • Feels like 18°C • Humidity 55%"));
        assert!(out.contains("1 EUR = 1.0800 USD"));
    }

    #[test]
    fn record_card_shows_unavailable_rate() {
        let out = record(&paris(ExchangeRate::Unavailable));
        assert!(out.contains("Exchange rate  Unavailable"));
    }

    #[test]
    fn southern_and_western_coordinates() {
        assert_eq!(hemisphere(-33.87, 'N', 'S'), "33.87°S");
        assert_eq!(hemisphere(-70.5, 'E', 'W'), "70.50°W");
    }

    #[test]
    fn statistics_lists_popular_cities() {
        let stats = Statistics {
            overview: StatsOverview {
                total_searches: 7,
                unique_cities: 3,
                avg_temperature: Some(16.5),
                unique_countries: 2,
            },
            popular_cities: vec![PopularCity { city: "Paris".into(), count: 4 }],
        };

        let out = statistics(&stats);
        assert!(out.contains("Total searches    7"));
        assert!(out.contains("16.5°C"));
        assert!(out.contains("4 searches"));
    }

    #[test]
    fn history_uses_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let saved = SavedRecord {
            id: None,
            payload: SavePayload {
                city: "Tokyo".into(),
                country: "Japan".into(),
                population: 0,
                weather: Default::default(),
                currency: Default::default(),
                coordinates: Default::default(),
                timezone: None,
            },
            timestamp: Some(now - Duration::minutes(5)),
        };

        let out = history(&[saved], now);
        assert!(out.contains("Tokyo"));
        assert!(out.contains("5m ago"));
        assert!(history(&[], now).contains("No recent searches"));
    }

    #[test]
    fn suggestions_and_favorites_one_line_each() {
        let geo = paris(ExchangeRate::Unavailable);
        let cities = vec![
            GeoResult {
                city: geo.city().into(),
                country: geo.country().into(),
                country_code: geo.country_code().into(),
                region: geo.region().into(),
                latitude: geo.latitude(),
                longitude: geo.longitude(),
                population: geo.population(),
                timezone: None,
            };
            2
        ];
        assert_eq!(suggestions(&cities).lines().count(), 2);
        assert_eq!(suggestions(&[]), "No matching cities.\n");

        let saved_at = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let entries = vec![FavoriteEntry { city: "Paris".into(), country: "France".into(), saved_at }];
        assert_eq!(favorites(&entries), "Paris, France  (added 2024-05-10)\n");
        assert_eq!(favorites(&[]), "No favorites yet.\n");
    }
}
