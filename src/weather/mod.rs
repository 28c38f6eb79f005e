//! Weather data access
//!
//! [`WeatherProvider`] is the seam between the agent/handlers and the
//! third-party weather API. [`OpenWeatherClient`] implements it against
//! OpenWeatherMap, including geocoding of free-form location input.

pub mod location;
pub mod openweather;

pub use location::{LocationInput, LocationParser, validate_location};
pub use openweather::OpenWeatherClient;

use crate::Result;
use crate::models::{CurrentWeather, WeatherForecast};
use async_trait::async_trait;

/// Source of current conditions and daily forecasts
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions for a free-form location (name, postal code or `lat,lon`)
    async fn current_weather(&self, location: &str) -> Result<CurrentWeather>;

    /// Daily forecast with exactly `days` entries
    async fn forecast(&self, location: &str, days: u32) -> Result<WeatherForecast>;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    /// Reachability check against the provider
    async fn health_check(&self) -> Result<()>;

    /// Name reported in payloads
    fn source(&self) -> &str;
}
