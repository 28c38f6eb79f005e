//! Weather agent - natural-language weather questions over HTTP
//!
//! This library parses free-form questions into a structured intent,
//! fetches current conditions or forecasts, and composes a reply in the
//! user's language.

pub mod agent;
pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod models;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use agent::WeatherAgent;
pub use api::AppState;
pub use calendar::{CalendarEvent, EventSource, FileEventSource};
pub use config::WeatherAgentConfig;
pub use error::{Upstream, WeatherAgentError};
pub use llm::{LanguageModel, OpenAiClient};
pub use models::{CurrentWeather, Location, ParsedQuery, QueryRequest, QueryResponse, WeatherForecast};
pub use weather::{OpenWeatherClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherAgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
