//! HTTP API: shared state and routes

pub mod calendar;
pub mod health;
pub mod query;
pub mod weather;

use crate::agent::WeatherAgent;
use crate::calendar::{EventSource, FileEventSource};
use crate::config::WeatherAgentConfig;
use crate::llm::{LanguageModel, OpenAiClient};
use crate::weather::{OpenWeatherClient, WeatherProvider};
use crate::{Result, WeatherAgentError};
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WeatherAgentConfig>,
    pub agent: Arc<WeatherAgent>,
    pub weather: Arc<dyn WeatherProvider>,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub calendar: Arc<dyn EventSource>,
}

impl AppState {
    /// Assemble state from already-built upstream clients. Calendar events
    /// come from the configured events file.
    pub fn new(
        config: WeatherAgentConfig,
        llm: Option<Arc<dyn LanguageModel>>,
        weather: Arc<dyn WeatherProvider>,
    ) -> Self {
        let agent = WeatherAgent::new(llm.clone(), weather.clone(), config.agent.clone());
        let calendar: Arc<dyn EventSource> = Arc::new(FileEventSource::new(&config.calendar));
        Self {
            config: Arc::new(config),
            agent: Arc::new(agent),
            weather,
            llm,
            calendar,
        }
    }

    /// Replace the calendar event source
    #[must_use]
    pub fn with_calendar(mut self, calendar: Arc<dyn EventSource>) -> Self {
        self.calendar = calendar;
        self
    }

    /// Build the upstream clients described by the configuration.
    ///
    /// The language model is left out when no key is configured so the
    /// agent runs on its rule-based parser.
    pub fn from_config(config: WeatherAgentConfig) -> Result<Self> {
        let llm: Option<Arc<dyn LanguageModel>> = if config.llm_configured() {
            info!("Language model enabled: {}", config.llm.model);
            Some(Arc::new(OpenAiClient::new(&config.llm)?))
        } else {
            None
        };
        let weather: Arc<dyn WeatherProvider> = Arc::new(OpenWeatherClient::new(&config.weather)?);

        Ok(Self::new(config, llm, weather))
    }

    /// Budget for the upstream work of one request
    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(u64::from(self.config.server.request_timeout_seconds))
    }

    /// Run upstream work under the request deadline, answering 503 with the
    /// error envelope when it expires
    pub async fn within_deadline<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = self.request_deadline();
        tokio::time::timeout(deadline, work).await.map_err(|_| {
            warn!("Request exceeded its {}s deadline", deadline.as_secs());
            WeatherAgentError::timeout(deadline.as_secs())
        })?
    }
}

/// All API routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/api", get(health::api_info))
        .route("/health", get(health::health))
        .route("/query", post(query::process_query))
        .route("/query/", post(query::process_query))
        .route("/query/parse", post(query::parse_query))
        .route("/query/health", get(query::agent_health))
        .route("/weather/current/{location}", get(weather::current_weather))
        .route("/weather/forecast/{location}", get(weather::forecast))
        .route("/weather/query", post(weather::structured_query))
        .route("/weather/health", get(weather::weather_health))
        .route("/calendar/weather-check", post(calendar::weather_check))
        .route("/calendar/events", get(calendar::events))
        .route("/calendar/outdoor-events", get(calendar::outdoor_events))
        .route("/calendar/health", get(calendar::calendar_health))
        .with_state(state)
}
