//! OpenWeather client: geocode a place, then fetch its current conditions.

use std::time::Duration;

use chrono::DateTime;
use reqwest::Url;
use serde::Deserialize;

use crate::{Error, Location, Result, WeatherReport};

pub const GEO_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";
pub const CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7);

/// Provider endpoints and credentials.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub geo_url: String,
    pub current_url: String,
    /// Bound on each of the two requests.
    pub timeout: Duration,
}

impl Config {
    /// OpenWeather endpoints with the default timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            geo_url: GEO_URL.to_string(),
            current_url: CURRENT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    /// Observation time, seconds since the epoch (UTC).
    dt: i64,
    /// Seconds east of UTC.
    #[serde(default)]
    timezone: i64,
    main: MainBlock,
    wind: WindBlock,
    weather: Vec<Summary>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Summary {
    description: String,
}

/// Weather provider client. Cheap to share; holds no per-request state.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `location` and return its current conditions.
    #[tracing::instrument(skip(self), fields(location = %location))]
    pub async fn current(&self, location: &Location) -> Result<WeatherReport> {
        let (lat, lon) = self.geocode(location).await?;
        tracing::debug!(lat, lon, "geocoded");

        let url = Url::parse_with_params(
            &self.config.current_url,
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", "imperial".to_string()),
                ("appid", self.config.api_key.clone()),
            ],
        )
        .map_err(|e| Error::Conditions(e.to_string()))?;

        let body = self.get(url).await.map_err(Error::Conditions)?;
        let conditions: Conditions = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "malformed conditions response");
            Error::UnexpectedFormat
        })?;

        build_report(location, conditions)
    }

    async fn geocode(&self, location: &Location) -> Result<(f64, f64)> {
        let url = Url::parse_with_params(
            &self.config.geo_url,
            &[
                ("q", location.query()),
                ("limit", "1".to_string()),
                ("appid", self.config.api_key.clone()),
            ],
        )
        .map_err(|e| Error::Geocoding(e.to_string()))?;

        let body = self.get(url).await.map_err(Error::Geocoding)?;
        let places: Vec<GeoPlace> = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "malformed geocoding response");
            Error::UnexpectedFormat
        })?;

        places
            .first()
            .map(|p| (p.lat, p.lon))
            .ok_or_else(|| Error::NotFound(location.to_string()))
    }

    /// GET `url` and return the body of a successful response.
    async fn get(&self, url: Url) -> std::result::Result<Vec<u8>, String> {
        let response = self
            .http
            .get(url)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| e.without_url().to_string())?;
        Ok(body.to_vec())
    }
}

fn build_report(location: &Location, conditions: Conditions) -> Result<WeatherReport> {
    let description = conditions
        .weather
        .into_iter()
        .next()
        .map(|s| s.description)
        .ok_or(Error::UnexpectedFormat)?;

    let local_time = DateTime::from_timestamp(conditions.dt + conditions.timezone, 0)
        .ok_or(Error::UnexpectedFormat)?
        .format("%Y-%m-%d %H:%M")
        .to_string();

    Ok(WeatherReport {
        location: location.to_string(),
        local_time,
        temperature: conditions.main.temp,
        feels_like: conditions.main.feels_like,
        humidity: conditions.main.humidity,
        wind_speed: conditions.wind.speed,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> Client {
        Client::new(Config {
            api_key: "test-key".into(),
            geo_url: format!("{}/geo/1.0/direct", server.uri()),
            current_url: format!("{}/data/2.5/weather", server.uri()),
            timeout: Duration::from_secs(2),
        })
    }

    fn conditions_body() -> serde_json::Value {
        json!({
            "dt": 1_700_000_000,
            "timezone": -14400,
            "main": {"temp": 86.3, "feels_like": 90.0, "humidity": 77},
            "wind": {"speed": 12},
            "weather": [{"description": "scattered clouds"}]
        })
    }

    #[tokio::test]
    async fn resolves_and_fetches_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "San Juan,PR"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"lat": 18.47, "lon": -66.1}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "imperial"))
            .and(query_param("lat", "18.47"))
            .respond_with(ResponseTemplate::new(200).set_body_json(conditions_body()))
            .expect(1)
            .mount(&server)
            .await;

        let location = Location::parse("San Juan, PR").unwrap();
        let report = client_for(&server).current(&location).await.unwrap();

        assert_eq!(report.location, "San Juan, PR");
        assert_eq!(report.local_time, "2023-11-14 18:13");
        assert_eq!(report.temperature, 86.3);
        assert_eq!(report.humidity, 77.0);
        assert_eq!(report.wind_speed, 12.0);
        assert_eq!(report.description, "scattered clouds");
    }

    #[tokio::test]
    async fn empty_geocode_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let location = Location::parse("NoSuchPlace, ZZ").unwrap();
        let err = client_for(&server).current(&location).await.unwrap_err();
        assert_eq!(err.to_string(), "Location not found: NoSuchPlace, ZZ");
    }

    #[tokio::test]
    async fn provider_status_maps_to_request_failure() {
        let server = MockServer::start().await;
        Mock::given(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"cod": 401})))
            .mount(&server)
            .await;

        let location = Location::parse("Paris, FR").unwrap();
        let err = client_for(&server).current(&location).await.unwrap_err();
        assert!(matches!(err, Error::Geocoding(ref m) if m.contains("401")), "{err}");
    }

    #[tokio::test]
    async fn malformed_conditions_are_reported() {
        let server = MockServer::start().await;
        Mock::given(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"lat": 48.85, "lon": 2.35}])))
            .mount(&server)
            .await;
        Mock::given(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dt": 1, "main": {}})))
            .mount(&server)
            .await;

        let location = Location::parse("Paris, FR").unwrap();
        let err = client_for(&server).current(&location).await.unwrap_err();
        assert_eq!(err, Error::UnexpectedFormat);
    }

    #[tokio::test]
    async fn unreachable_provider_fails_geocoding() {
        let client = Client::new(Config {
            api_key: "k".into(),
            geo_url: "http://127.0.0.1:9/geo".into(),
            current_url: "http://127.0.0.1:9/weather".into(),
            timeout: Duration::from_millis(500),
        });
        let location = Location::parse("Paris, FR").unwrap();
        let err = client.current(&location).await.unwrap_err();
        assert!(matches!(err, Error::Geocoding(_)), "{err}");
    }
}
