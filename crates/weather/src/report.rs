use serde::{Deserialize, Serialize};

/// Current conditions for one place, in imperial units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// `City, CC` label.
    pub location: String,
    /// Wall-clock time at the place, `YYYY-MM-DD HH:MM`.
    pub local_time: String,
    /// °F.
    pub temperature: f64,
    /// °F.
    pub feels_like: f64,
    /// Percent.
    pub humidity: f64,
    /// mph.
    pub wind_speed: f64,
    pub description: String,
}

impl std::fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Weather in {} (local time {}): {}°F, {}. Feels like {}°F. Humidity: {}%, Wind: {} mph",
            self.location,
            self.local_time,
            self.temperature.round() as i64,
            self.description,
            self.feels_like.round() as i64,
            self.humidity,
            self.wind_speed,
        )
    }
}
