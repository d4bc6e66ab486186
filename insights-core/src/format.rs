//! Pure display transforms applied when a record is assembled or rendered.

use chrono::{DateTime, Utc};

pub const DEFAULT_WEATHER_ICON: &str = "fas fa-cloud";

/// Map a weather category (`"Clear"`, `"Rain"`, ...) to an icon class.
/// Unknown categories fall back to [`DEFAULT_WEATHER_ICON`].
pub fn weather_icon(category: &str) -> &'static str {
    match category {
        "Clear" => "fas fa-sun",
        "Clouds" => "fas fa-cloud",
        "Rain" | "Drizzle" => "fas fa-cloud-rain",
        "Thunderstorm" => "fas fa-bolt",
        "Snow" => "fas fa-snowflake",
        "Mist" | "Smoke" | "Haze" | "Fog" => "fas fa-smog",
        _ => DEFAULT_WEATHER_ICON,
    }
}

/// `2148000` -> `"2,148,000"`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

/// Round to the nearest integer, halves towards positive infinity
/// (`-2.5` -> `-2`, `2.5` -> `3`).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Short age of a timestamp: "Just now", "5m ago", "3h ago", "2d ago",
/// or the calendar date once it is a week old.
pub fn relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(ts);

    let mins = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{mins}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        ts.format("%Y-%m-%d").to_string()
    }
}
