//! OpenWeatherMap client: geocoding, current conditions and daily forecasts

use super::WeatherProvider;
use super::location::{LocationInput, LocationParser};
use crate::config::{PROVIDER_MAX_FORECAST_DAYS, WeatherConfig};
use crate::error::Upstream;
use crate::models::forecast::daily_forecasts;
use crate::models::{
    CurrentWeather, ForecastSample, Location, WeatherCondition, WeatherData, WeatherForecast,
};
use crate::{Result, WeatherAgentError};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

const SOURCE: &str = "OpenWeatherMap";

/// Weather API client for OpenWeatherMap
pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    geocoding_url: String,
}

impl OpenWeatherClient {
    /// Create a new weather API client
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("weather-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherAgentError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            geocoding_url: config.geocoding_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| WeatherAgentError::unavailable(Upstream::Weather, "API key not configured"))
    }

    /// Resolve free-form location input into coordinates and a display name
    #[instrument(skip(self))]
    pub async fn resolve(&self, location: &str) -> Result<Location> {
        let resolved = match LocationParser::parse(location) {
            LocationInput::Coordinates(lat, lon) => self.resolve_coordinates(lat, lon).await?,
            LocationInput::PostalCode(postal) => self.resolve_postal_code(&postal).await?,
            LocationInput::Name(name) => self.resolve_name(&name).await?,
        };

        debug!(
            "Resolved location: {} at ({}, {})",
            resolved.name, resolved.latitude, resolved.longitude
        );
        Ok(resolved)
    }

    /// Name coordinates via reverse geocoding, falling back to a coordinate label
    async fn resolve_coordinates(&self, lat: f64, lon: f64) -> Result<Location> {
        let lat_param = lat.to_string();
        let lon_param = lon.to_string();
        let url = format!("{}/reverse", self.geocoding_url);
        let result: Result<Vec<GeocodingResult>> = self
            .get_json(
                &url,
                &[("lat", lat_param.as_str()), ("lon", lon_param.as_str()), ("limit", "1")],
                &format!("{lat:.4}, {lon:.4}"),
            )
            .await;

        match result {
            Ok(results) => Ok(results.into_iter().next().map_or_else(
                || {
                    debug!("No reverse geocoding results found, using coordinates as name");
                    Location::from_coordinates(lat, lon)
                },
                |found| Location {
                    latitude: lat,
                    longitude: lon,
                    ..Location::from(found)
                },
            )),
            // Credentials and outages still surface; only lookups degrade to a label.
            Err(e @ WeatherAgentError::Unavailable { .. }) => Err(e),
            Err(e) => {
                debug!("Reverse geocoding failed: {}, using coordinates as name", e);
                Ok(Location::from_coordinates(lat, lon))
            }
        }
    }

    /// Geocode a place name, first match wins
    async fn resolve_name(&self, name: &str) -> Result<Location> {
        let url = format!("{}/direct", self.geocoding_url);
        let results: Vec<GeocodingResult> = self
            .get_json(&url, &[("q", name), ("limit", "1")], name)
            .await?;

        let found = results.into_iter().next().ok_or_else(|| {
            warn!("No results found for location '{}'", name);
            WeatherAgentError::location_not_found(name)
        })?;

        debug!(
            "Found location: {} ({:.4}, {:.4})",
            found.name, found.lat, found.lon
        );
        Ok(Location::from(found))
    }

    /// Geocode a postal code, retrying as a place name when the zip lookup misses
    async fn resolve_postal_code(&self, postal: &str) -> Result<Location> {
        let url = format!("{}/zip", self.geocoding_url);
        let zip = LocationParser::zip_query(postal);
        let result: Result<ZipResult> = self.get_json(&url, &[("zip", zip.as_str())], postal).await;

        match result {
            Ok(found) => {
                debug!(
                    "Found location for postal code {}: {} ({:.4}, {:.4})",
                    postal, found.name, found.lat, found.lon
                );
                Ok(Location::with_country(
                    found.lat,
                    found.lon,
                    found.name,
                    found.country,
                ))
            }
            Err(WeatherAgentError::LocationNotFound { .. }) => {
                debug!("Postal code lookup missed, geocoding '{}' as a name", postal);
                self.resolve_name(postal).await
            }
            Err(e) => Err(e),
        }
    }

    /// GET a provider endpoint and decode its JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        subject: &str,
    ) -> Result<T> {
        let api_key = self.api_key()?;
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("appid", api_key)])
            .send()
            .await
            .map_err(|e| {
                // The URL carries the API key
                let e = e.without_url();
                warn!("Weather request to {} failed: {}", url, e);
                WeatherAgentError::from_transport(Upstream::Weather, &e)
            })?;

        let status = response.status();
        let duration = start_time.elapsed();
        debug!(
            "HTTP response received from {}: {} in {:.3}s",
            url,
            status,
            duration.as_secs_f64()
        );

        if duration.as_secs() > 5 {
            warn!("Slow weather API response: {:.3}s", duration.as_secs_f64());
        }

        if !status.is_success() {
            return Err(map_status(status, subject));
        }

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse weather response from {}: {}", url, e.without_url());
            WeatherAgentError::invalid_response(Upstream::Weather, "malformed payload")
        })
    }
}

fn map_status(status: StatusCode, subject: &str) -> WeatherAgentError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            warn!("Location not found (HTTP {}): {}", status.as_u16(), subject);
            WeatherAgentError::location_not_found(subject)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!("Weather API authentication failed (HTTP {})", status.as_u16());
            WeatherAgentError::unavailable(Upstream::Weather, "authentication failed")
        }
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Weather API rate limit exceeded (HTTP 429)");
            WeatherAgentError::unavailable(Upstream::Weather, "rate limit exceeded")
        }
        _ => {
            warn!("Weather API request failed with status {}", status);
            WeatherAgentError::unavailable(Upstream::Weather, format!("HTTP {}", status.as_u16()))
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn current_weather(&self, location: &str) -> Result<CurrentWeather> {
        self.api_key()?;
        info!("Getting current weather for '{}'", location);
        let start_time = Instant::now();

        let resolved = self.resolve(location).await?;
        let lat = resolved.latitude.to_string();
        let lon = resolved.longitude.to_string();
        let url = format!("{}/weather", self.base_url);
        let response: CurrentResponse = self
            .get_json(
                &url,
                &[("lat", lat.as_str()), ("lon", lon.as_str()), ("units", "metric")],
                &resolved.name,
            )
            .await?;

        let current = response.into_current_weather(resolved);
        info!(
            "Successfully retrieved current weather for {} in {:.3}s",
            current.location,
            start_time.elapsed().as_secs_f64()
        );
        Ok(current)
    }

    #[instrument(skip(self))]
    async fn forecast(&self, location: &str, days: u32) -> Result<WeatherForecast> {
        if !(1..=PROVIDER_MAX_FORECAST_DAYS).contains(&days) {
            return Err(WeatherAgentError::validation(format!(
                "Forecast days must be between 1 and {PROVIDER_MAX_FORECAST_DAYS}"
            )));
        }
        self.api_key()?;
        info!("Getting {}-day forecast for '{}'", days, location);
        let start_time = Instant::now();

        let resolved = self.resolve(location).await?;
        let lat = resolved.latitude.to_string();
        let lon = resolved.longitude.to_string();
        let url = format!("{}/forecast", self.base_url);
        let response: ForecastResponse = self
            .get_json(
                &url,
                &[("lat", lat.as_str()), ("lon", lon.as_str()), ("units", "metric")],
                &resolved.name,
            )
            .await?;

        let samples = response.samples();
        let daily = daily_forecasts(&samples, days as usize);
        if daily.len() < days as usize {
            error!(
                "Provider returned {} forecast days, {} requested",
                daily.len(),
                days
            );
            return Err(WeatherAgentError::invalid_response(
                Upstream::Weather,
                format!("only {} forecast days available", daily.len()),
            ));
        }

        info!(
            "Successfully retrieved forecast with {} days from {} samples in {:.3}s",
            daily.len(),
            samples.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(WeatherForecast {
            coordinates: resolved.coordinates(),
            location: resolved.name,
            country: resolved.country,
            forecast: daily,
            source: SOURCE.to_string(),
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/weather", self.base_url);
        let _: serde_json::Value = self.get_json(&url, &[("q", "London")], "London").await?;
        Ok(())
    }

    fn source(&self) -> &str {
        SOURCE
    }
}

/// Geocoding result from the direct and reverse endpoints
#[derive(Debug, Deserialize, Clone)]
struct GeocodingResult {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl From<GeocodingResult> for Location {
    fn from(geocoding: GeocodingResult) -> Self {
        Location {
            latitude: geocoding.lat,
            longitude: geocoding.lon,
            name: geocoding.name,
            country: geocoding.country,
            state: geocoding.state,
        }
    }
}

/// Result of the zip endpoint
#[derive(Debug, Deserialize)]
struct ZipResult {
    name: String,
    lat: f64,
    lon: f64,
    country: String,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    main: String,
    description: String,
    icon: String,
}

impl From<ApiCondition> for WeatherCondition {
    fn from(c: ApiCondition) -> Self {
        WeatherCondition {
            main: c.main,
            description: c.description,
            icon: c.icon,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    pressure: u32,
    humidity: u8,
}

#[derive(Debug, Deserialize, Default)]
struct Wind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    weather: Vec<ApiCondition>,
    main: MainReadings,
    #[serde(default)]
    visibility: Option<u32>,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    clouds: Option<Clouds>,
    dt: i64,
}

impl CurrentResponse {
    fn into_current_weather(self, location: Location) -> CurrentWeather {
        CurrentWeather {
            coordinates: location.coordinates(),
            location: location.name,
            country: location.country,
            current_weather: WeatherData {
                temperature: self.main.temp,
                feels_like: self.main.feels_like,
                humidity: self.main.humidity,
                pressure: self.main.pressure,
                visibility: self.visibility,
                wind_speed: self.wind.speed,
                wind_direction: self.wind.deg,
                cloud_cover: self.clouds.map(|c| c.all),
            },
            conditions: self.weather.into_iter().map(WeatherCondition::from).collect(),
            timestamp: DateTime::from_timestamp(self.dt, 0).unwrap_or_else(Utc::now),
            source: SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
    city: ForecastCity,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: MainReadings,
    #[serde(default)]
    weather: Vec<ApiCondition>,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastCity {
    /// Shift from UTC in seconds
    #[serde(default)]
    timezone: i32,
}

impl ForecastResponse {
    fn samples(self) -> Vec<ForecastSample> {
        let offset = FixedOffset::east_opt(self.city.timezone).unwrap_or_else(|| Utc.fix());

        self.list
            .into_iter()
            .filter_map(|item| {
                let timestamp = DateTime::from_timestamp(item.dt, 0)?;
                let condition = item
                    .weather
                    .into_iter()
                    .next()
                    .map_or_else(unknown_condition, WeatherCondition::from);
                Some(ForecastSample {
                    timestamp,
                    local_date: timestamp.with_timezone(&offset).date_naive(),
                    temperature: item.main.temp,
                    temperature_min: item.main.temp_min.unwrap_or(item.main.temp),
                    temperature_max: item.main.temp_max.unwrap_or(item.main.temp),
                    humidity: item.main.humidity,
                    wind_speed: item.wind.speed,
                    precipitation_probability: item.pop,
                    condition,
                })
            })
            .collect()
    }
}

fn unknown_condition() -> WeatherCondition {
    WeatherCondition {
        main: "Unknown".to_string(),
        description: "unknown conditions".to_string(),
        icon: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, api_key: Option<&str>) -> WeatherConfig {
        WeatherConfig {
            api_key: api_key.map(str::to_string),
            base_url: format!("{}/data/2.5", server.uri()),
            geocoding_url: format!("{}/geo/1.0", server.uri()),
            timeout_seconds: 5,
        }
    }

    async fn mount_paris_geocoding(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Paris"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "name": "Paris",
                "lat": 48.8566,
                "lon": 2.3522,
                "country": "FR",
                "state": "Ile-de-France"
            }])))
            .mount(server)
            .await;
    }

    fn forecast_body(days: i64) -> serde_json::Value {
        // 2024-06-01T00:00:00Z, 3-hourly, UTC+2
        let start = 1_717_200_000_i64;
        let list: Vec<_> = (0..days * 8)
            .map(|i| {
                json!({
                    "dt": start + i * 3 * 3600,
                    "main": {
                        "temp": 15.0 + (i % 8) as f64,
                        "feels_like": 14.0,
                        "temp_min": 14.0,
                        "temp_max": 23.0,
                        "pressure": 1012,
                        "humidity": 70
                    },
                    "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
                    "wind": {"speed": 3.0, "deg": 180},
                    "pop": 0.1
                })
            })
            .collect();
        json!({"cod": "200", "list": list, "city": {"name": "Paris", "country": "FR", "timezone": 7200}})
    }

    #[tokio::test]
    async fn test_current_weather_for_city() {
        let server = MockServer::start().await;
        mount_paris_geocoding(&server).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "metric"))
            .and(query_param("lat", "48.8566"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coord": {"lon": 2.3522, "lat": 48.8566},
                "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
                "main": {"temp": 22.5, "feels_like": 21.9, "pressure": 1013, "humidity": 65},
                "visibility": 10000,
                "wind": {"speed": 3.6, "deg": 200},
                "clouds": {"all": 0},
                "dt": 1_717_243_200,
                "name": "Paris"
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        let weather = client.current_weather("Paris").await.unwrap();

        assert_eq!(weather.location, "Paris");
        assert_eq!(weather.country.as_deref(), Some("FR"));
        assert_eq!(weather.current_weather.temperature, 22.5);
        assert_eq!(weather.current_weather.cloud_cover, Some(0));
        assert_eq!(weather.description(), "clear sky");
        assert_eq!(weather.source, "OpenWeatherMap");
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, None)).unwrap();
        assert!(!client.is_configured());

        let err = client.current_weather("Paris").await.unwrap_err();
        assert_eq!(err.code(), "weather_service_unavailable");
        let err = client.forecast("Paris", 3).await.unwrap_err();
        assert_eq!(err.code(), "weather_service_unavailable");
    }

    #[tokio::test]
    async fn test_unknown_location_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        let err = client.current_weather("Atlantis").await.unwrap_err();
        assert!(matches!(err, WeatherAgentError::LocationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_key_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"cod": 401})))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("bad-key"))).unwrap();
        let err = client.current_weather("Paris").await.unwrap_err();
        assert_eq!(err.code(), "weather_service_unavailable");
        assert!(!err.user_message().contains("bad-key"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_invalid_response() {
        let server = MockServer::start().await;
        mount_paris_geocoding(&server).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        let err = client.current_weather("Paris").await.unwrap_err();
        assert!(matches!(err, WeatherAgentError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_forecast_returns_exact_day_count() {
        let server = MockServer::start().await;
        mount_paris_geocoding(&server).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(5)))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        for days in [1, 3, 5] {
            let forecast = client.forecast("Paris", days).await.unwrap();
            assert_eq!(forecast.forecast.len(), days as usize);
            assert_eq!(forecast.location, "Paris");
        }
    }

    #[tokio::test]
    async fn test_forecast_groups_by_local_date() {
        let server = MockServer::start().await;
        mount_paris_geocoding(&server).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(5)))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        let forecast = client.forecast("Paris", 1).await.unwrap();
        let first = &forecast.forecast[0];

        // Local midnight is 22:00 UTC, so the first local day holds 00:00-21:00 UTC.
        assert_eq!(first.date.to_string(), "2024-06-01");
        assert_eq!(first.temperature_max, 23.0);
        assert_eq!(first.precipitation_probability, Some(10));
        assert_eq!(first.conditions.main, "Clear");
    }

    #[tokio::test]
    async fn test_forecast_short_upstream_is_invalid_response() {
        let server = MockServer::start().await;
        mount_paris_geocoding(&server).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [],
                "city": {"timezone": 0}
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        let err = client.forecast("Paris", 2).await.unwrap_err();
        assert!(matches!(err, WeatherAgentError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_forecast_days_out_of_range() {
        let server = MockServer::start().await;
        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        for days in [0, PROVIDER_MAX_FORECAST_DAYS + 1] {
            let err = client.forecast("Paris", days).await.unwrap_err();
            assert!(matches!(err, WeatherAgentError::Validation { .. }));
        }
    }

    #[tokio::test]
    async fn test_coordinates_fall_back_to_label() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        let location = client.resolve("46.8182,8.2275").await.unwrap();
        assert_eq!(location.name, "46.8182, 8.2275");
        assert_eq!(location.latitude, 46.8182);
    }

    #[tokio::test]
    async fn test_postal_code_falls_back_to_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/zip"))
            .and(query_param("zip", "8001,CH"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"cod": "404"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "CH-8001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "name": "Zurich", "lat": 47.37, "lon": 8.54, "country": "CH"
            }])))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(&config(&server, Some("test-key"))).unwrap();
        let location = client.resolve("CH-8001").await.unwrap();
        assert_eq!(location.name, "Zurich");
    }
}
