use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::model::FavoriteEntry;

/// Locally kept list of favorite cities, unique by exact (city, country).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Favorites {
    #[serde(default, rename = "favorite")]
    entries: Vec<FavoriteEntry>,
}

impl Favorites {
    pub fn contains(&self, city: &str, country: &str) -> bool {
        self.entries.iter().any(|e| e.city == city && e.country == country)
    }

    /// Returns false if the city was already a favorite.
    pub fn add(&mut self, city: &str, country: &str, now: DateTime<Utc>) -> bool {
        if self.contains(city, country) {
            return false;
        }

        self.entries.push(FavoriteEntry {
            city: city.to_string(),
            country: country.to_string(),
            saved_at: now,
        });
        true
    }

    pub fn list(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read favorites file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse favorites file: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize favorites to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write favorites file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn add_dedups_on_city_and_country() {
        let mut favs = Favorites::default();

        assert!(favs.add("Paris", "France", now()));
        assert!(!favs.add("Paris", "France", now()));
        assert!(favs.add("Paris", "United States", now()));
        assert!(favs.add("paris", "France", now()));

        assert_eq!(favs.list().len(), 3);
    }

    #[test]
    fn roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.toml");

        let mut favs = Favorites::default();
        favs.add("Tokyo", "Japan", now());
        favs.save_to(&path).unwrap();

        let loaded = Favorites::load_from(&path).unwrap();
        assert_eq!(loaded, favs);
        assert_eq!(loaded.list()[0].saved_at, now());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let favs = Favorites::load_from(&dir.path().join("none.toml")).unwrap();
        assert!(favs.list().is_empty());
    }
}
