//! OpenAI-compatible chat completion client

use super::{CompletionOptions, LanguageModel};
use crate::config::LlmConfig;
use crate::error::Upstream;
use crate::{Result, WeatherAgentError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Client for `POST {base_url}/chat/completions`
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client from the language-model settings.
    ///
    /// A missing key is allowed; every call then fails as unavailable
    /// without touching the network.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("weather-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherAgentError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            WeatherAgentError::unavailable(Upstream::LanguageModel, "API key not configured")
        })
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.base_url);
        let start_time = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("Language model request failed: {}", e);
                WeatherAgentError::from_transport(Upstream::LanguageModel, &e)
            })?;

        let status = response.status();
        let duration = start_time.elapsed();
        debug!(
            "Language model responded {} in {:.3}s",
            status,
            duration.as_secs_f64()
        );

        if duration.as_secs() > 5 {
            warn!(
                "Slow language model response: {:.3}s",
                duration.as_secs_f64()
            );
        }

        if !status.is_success() {
            return Err(map_status(status));
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            error!("Failed to parse language model response: {}", e);
            WeatherAgentError::invalid_response(Upstream::LanguageModel, e.to_string())
        })
    }
}

fn map_status(status: StatusCode) -> WeatherAgentError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!("Language model authentication failed (HTTP {})", status.as_u16());
            WeatherAgentError::unavailable(Upstream::LanguageModel, "authentication failed")
        }
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Language model rate limit exceeded (HTTP 429)");
            WeatherAgentError::unavailable(Upstream::LanguageModel, "rate limit exceeded")
        }
        _ => {
            warn!("Language model request failed with status {}", status);
            WeatherAgentError::unavailable(
                Upstream::LanguageModel,
                format!("HTTP {}", status.as_u16()),
            )
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let completion = self.send(&request).await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                WeatherAgentError::invalid_response(Upstream::LanguageModel, "empty completion")
            })?;

        info!("Language model completion received ({} chars)", content.len());
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: "Test",
            }],
            temperature: 0.0,
            max_tokens: 10,
            response_format: None,
        };

        let completion = self.send(&request).await?;
        if completion.choices.is_empty() {
            return Err(WeatherAgentError::invalid_response(
                Upstream::LanguageModel,
                "empty completion",
            ));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
