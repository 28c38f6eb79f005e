//! Language-model access
//!
//! The agent only talks to the [`LanguageModel`] trait so handlers and tests
//! can swap in any completion backend. [`OpenAiClient`] speaks the
//! OpenAI-compatible chat completion protocol.

pub mod openai;

pub use openai::OpenAiClient;

use crate::Result;
use async_trait::async_trait;

/// Per-call completion settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for a JSON object response
    pub json_mode: bool,
}

impl CompletionOptions {
    /// Low-temperature JSON output for intent extraction
    #[must_use]
    pub fn structured() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 500,
            json_mode: true,
        }
    }

    /// Free text for conversational replies
    #[must_use]
    pub fn conversational() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 300,
            json_mode: false,
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::conversational()
    }
}

/// Text completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `user` under the `system` instructions and return the text
    async fn complete(&self, system: &str, user: &str, options: CompletionOptions)
    -> Result<String>;

    /// Model identifier reported in health output
    fn model(&self) -> &str;

    /// Cheap reachability check
    async fn health_check(&self) -> Result<()>;
}

/// Extract the outermost JSON object from a completion.
///
/// Models wrap JSON in markdown fences or prose often enough that the raw
/// text cannot be handed to `serde_json` directly.
#[must_use]
pub fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}
