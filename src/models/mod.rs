//! Data models for the weather agent
//!
//! This module contains the request-scoped domain models organized by concern:
//! - Location: Geographic coordinates and metadata
//! - Weather: Current weather readings
//! - Forecast: Daily forecast aggregation
//! - Query: Natural-language query request, parsed intent and response

pub mod forecast;
pub mod location;
pub mod query;
pub mod weather;

// Re-export all public types for convenient access
pub use forecast::{DailyForecast, ForecastSample, WeatherForecast};
pub use location::{Coordinates, Location};
pub use query::{ParsedQuery, QueryRequest, QueryResponse, QueryType, WeatherPayload};
pub use weather::{CurrentWeather, WeatherCondition, WeatherData};
