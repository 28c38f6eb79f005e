//! Query processing agent
//!
//! A query runs through three steps in order:
//!
//! - **think**: extract an intent with the language model, or the rule-based
//!   parser when none is configured
//! - **act**: fetch current weather or a forecast for the extracted location
//! - **observe**: write the reply, grounded in the fetched data

pub mod composer;
pub mod intent;

pub use composer::Outcome;
pub use intent::{Action, Thought};

use crate::config::AgentConfig;
use crate::llm::{CompletionOptions, LanguageModel};
use crate::models::{ParsedQuery, QueryRequest, QueryResponse, QueryType, WeatherPayload};
use crate::weather::{WeatherProvider, validate_location};
use crate::{Result, WeatherAgentError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// Longest accepted query, in characters
pub const MAX_QUERY_LENGTH: usize = 1000;

/// Trim and check a natural-language query
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(WeatherAgentError::validation("Query cannot be empty"));
    }
    if trimmed.chars().count() > MAX_QUERY_LENGTH {
        return Err(WeatherAgentError::validation(format!(
            "Query cannot exceed {MAX_QUERY_LENGTH} characters"
        )));
    }
    Ok(trimmed)
}

/// Natural-language weather agent
pub struct WeatherAgent {
    llm: Option<Arc<dyn LanguageModel>>,
    weather: Arc<dyn WeatherProvider>,
    settings: AgentConfig,
}

impl WeatherAgent {
    /// Create an agent. Without a language model the rule-based parser and
    /// templates are used.
    pub fn new(
        llm: Option<Arc<dyn LanguageModel>>,
        weather: Arc<dyn WeatherProvider>,
        settings: AgentConfig,
    ) -> Self {
        Self {
            llm,
            weather,
            settings,
        }
    }

    /// Answer a natural-language query
    pub async fn process(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let query = validate_query(&request.query)?;
        let span = info_span!(
            "process_query",
            user_id = request.user_id.as_deref().unwrap_or("-"),
            session_id = request.session_id.as_deref().unwrap_or("-"),
        );

        async move {
            let start_time = Instant::now();
            info!("Processing query: '{}'", query);

            let thought = self.think(query).await?;
            info!(
                weather_related = thought.is_weather_related,
                language = thought.language(),
                confidence = thought.parsed.confidence,
                "Think: {}",
                thought.reasoning
            );

            let outcome = self.act(&thought).await?;
            let natural_response = self.observe(&thought, &outcome).await;

            let processing_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
            info!(
                weather_data = outcome.payload().is_some(),
                "Query processed in {:.1}ms", processing_time_ms
            );

            Ok(QueryResponse {
                parsed_query: thought.parsed,
                weather_data: outcome.into_payload(),
                natural_response,
                timestamp: Utc::now(),
                processing_time_ms,
            })
        }
        .instrument(span)
        .await
    }

    /// Extract the intent of a query without fetching anything
    pub async fn parse(&self, query: &str) -> Result<ParsedQuery> {
        let query = validate_query(query)?;
        Ok(self.think(query).await?.parsed)
    }

    async fn think(&self, query: &str) -> Result<Thought> {
        let Some(llm) = &self.llm else {
            debug!("No language model configured, using rule-based parser");
            return Ok(intent::rule_based(query));
        };

        match llm
            .complete(intent::THINK_SYSTEM_PROMPT, query, CompletionOptions::structured())
            .await
        {
            Ok(completion) => Ok(intent::thought_from_completion(query, &completion)
                .unwrap_or_else(|| {
                    warn!("Language model returned no usable intent, using rule-based parser");
                    intent::rule_based(query)
                })),
            Err(WeatherAgentError::InvalidResponse { message, .. }) => {
                warn!("Invalid language model response ({}), using rule-based parser", message);
                Ok(intent::rule_based(query))
            }
            Err(e) => Err(e),
        }
    }

    async fn act(&self, thought: &Thought) -> Result<Outcome> {
        let wants_forecast = thought.actions.contains(&Action::GetWeatherForecast);
        let wants_current = thought.actions.contains(&Action::GetCurrentWeather);

        if !thought.is_weather_related || !(wants_forecast || wants_current) {
            debug!("Act: no weather lookup planned");
            return Ok(if thought.is_weather_related {
                Outcome::Unclear
            } else {
                Outcome::Conversational
            });
        }

        let Some(location) = thought.parsed.location.as_deref() else {
            info!("Act: weather question without a location");
            return Ok(Outcome::NoLocation);
        };

        if thought.parsed.confidence < self.settings.min_confidence {
            info!(
                "Act: confidence {:.2} below {:.2}, asking to rephrase",
                thought.parsed.confidence, self.settings.min_confidence
            );
            return Ok(Outcome::Unclear);
        }

        let Ok(location) = validate_location(location) else {
            warn!("Act: extracted location is not usable: '{}'", location);
            return Ok(Outcome::LocationNotFound(location.trim().to_string()));
        };

        let fetched = if wants_forecast || thought.parsed.query_type == QueryType::Forecast {
            let days = self.forecast_days(&thought.parsed);
            info!("Act: fetching {}-day forecast for '{}'", days, location);
            self.weather
                .forecast(location, days)
                .await
                .map(WeatherPayload::Forecast)
        } else {
            info!("Act: fetching current weather for '{}'", location);
            self.weather
                .current_weather(location)
                .await
                .map(WeatherPayload::Current)
        };

        match fetched {
            Ok(payload) => Ok(Outcome::Weather(payload)),
            Err(WeatherAgentError::LocationNotFound { .. }) => {
                info!("Act: location '{}' not found by provider", location);
                Ok(Outcome::LocationNotFound(location.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn forecast_days(&self, parsed: &ParsedQuery) -> u32 {
        let reference = parsed.date_time.as_deref().map(str::to_lowercase);
        let days = match reference.as_deref() {
            Some("today" | "tonight" | "aujourd'hui" | "hoy") => 1,
            Some("tomorrow" | "demain" | "mañana") => 2,
            _ => self.settings.default_forecast_days,
        };
        days.clamp(1, self.settings.max_forecast_days.max(1))
    }

    async fn observe(&self, thought: &Thought, outcome: &Outcome) -> String {
        let language = thought.language();
        let Some(llm) = &self.llm else {
            return composer::template_reply(language, outcome);
        };

        let context = match outcome {
            Outcome::Weather(payload) => serde_json::json!({
                "original_query": thought.parsed.original_query,
                "user_language": language,
                "parsed_query": thought.parsed,
                "weather_data": payload,
                "highlights": composer::highlights(payload),
            }),
            Outcome::Conversational => serde_json::json!({
                "original_query": thought.parsed.original_query,
                "user_language": language,
                "is_weather_related": false,
            }),
            // Failure replies stay deterministic
            _ => return composer::template_reply(language, outcome),
        };

        let user_prompt = format!(
            "Context: {context}\n\nGenerate a natural, helpful response in the user's language ({language})."
        );
        match llm
            .complete(
                &composer::observe_system_prompt(language),
                &user_prompt,
                CompletionOptions::conversational(),
            )
            .await
        {
            Ok(reply) => match outcome.payload() {
                Some(payload) => composer::ground(&reply, language, payload),
                None if reply.trim().is_empty() => composer::template_reply(language, outcome),
                None => reply.trim().to_string(),
            },
            Err(e) => {
                warn!("Language model reply failed ({}), using template", e);
                composer::template_reply(language, outcome)
            }
        }
    }
}
