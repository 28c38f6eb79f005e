//! Natural-language query request, parsed intent and response models

use super::forecast::WeatherForecast;
use super::weather::CurrentWeather;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for natural-language queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural language weather query
    pub query: String,
    /// Optional user identifier, only used for log correlation
    #[serde(default)]
    pub user_id: Option<String>,
    /// Optional session identifier, only used for log correlation
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Kind of question being asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    #[default]
    Current,
    Forecast,
    Historical,
    Comparison,
    /// Not a weather question
    Other,
    /// Processing failed before an intent was available
    Error,
}

impl QueryType {
    /// Lenient parse of a model-supplied label
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "forecast" => QueryType::Forecast,
            "historical" => QueryType::Historical,
            "comparison" => QueryType::Comparison,
            "other" => QueryType::Other,
            _ => QueryType::Current,
        }
    }
}

/// Structured data extracted from a natural-language query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Extracted location
    pub location: Option<String>,
    /// Extracted date/time reference
    pub date_time: Option<String>,
    /// Specific weather aspect requested
    pub weather_aspect: Option<String>,
    pub query_type: QueryType,
    /// Confidence score of the parsing (0-1)
    pub confidence: f32,
    /// Original user query
    pub original_query: String,
    /// Detected language code (en, fr, es, ...)
    pub language: String,
}

/// Weather data attached to a query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeatherPayload {
    Current(CurrentWeather),
    Forecast(WeatherForecast),
}

impl WeatherPayload {
    /// Resolved location name of the payload
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            WeatherPayload::Current(current) => &current.location,
            WeatherPayload::Forecast(forecast) => &forecast.location,
        }
    }

    /// Representative temperature: current reading, or the first day's average
    #[must_use]
    pub fn headline_temperature(&self) -> Option<f64> {
        match self {
            WeatherPayload::Current(current) => Some(current.current_weather.temperature),
            WeatherPayload::Forecast(forecast) => {
                forecast.forecast.first().map(|day| day.temperature_avg)
            }
        }
    }
}

/// Response for the natural-language query endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub parsed_query: ParsedQuery,
    /// Associated weather data, null when none could be fetched
    pub weather_data: Option<WeatherPayload>,
    /// Human-readable answer
    pub natural_response: String,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: f64,
}
