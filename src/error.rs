//! Error types and HTTP error mapping for the weather agent

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Upstream dependency an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    /// Language-model completion API
    LanguageModel,
    /// Weather-data provider
    Weather,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::LanguageModel => write!(f, "language model"),
            Upstream::Weather => write!(f, "weather"),
        }
    }
}

/// Main error type for the weather agent
#[derive(Error, Debug)]
pub enum WeatherAgentError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The weather provider could not resolve a location
    #[error("Location not found: {location}")]
    LocationNotFound { location: String },

    /// Upstream missing credentials, unreachable, timing out or failing
    #[error("{upstream} service unavailable: {message}")]
    Unavailable { upstream: Upstream, message: String },

    /// The request ran past its deadline while waiting on upstreams
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Upstream answered with a payload we could not use
    #[error("Invalid {upstream} response: {message}")]
    InvalidResponse { upstream: Upstream, message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Anything else
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl WeatherAgentError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new location-not-found error
    pub fn location_not_found<S: Into<String>>(location: S) -> Self {
        Self::LocationNotFound {
            location: location.into(),
        }
    }

    /// Create a new upstream-unavailable error
    pub fn unavailable<S: Into<String>>(upstream: Upstream, message: S) -> Self {
        Self::Unavailable {
            upstream,
            message: message.into(),
        }
    }

    /// Create a new request-deadline error
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Create a new invalid-upstream-response error
    pub fn invalid_response<S: Into<String>>(upstream: Upstream, message: S) -> Self {
        Self::InvalidResponse {
            upstream,
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Map a reqwest transport error from the given upstream
    pub fn from_transport(upstream: Upstream, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::unavailable(upstream, "request timed out")
        } else if err.is_connect() {
            Self::unavailable(upstream, "connection failed")
        } else if err.is_decode() {
            Self::invalid_response(upstream, err.to_string())
        } else {
            Self::unavailable(upstream, err.to_string())
        }
    }

    /// Stable machine-readable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            WeatherAgentError::Config { .. } => "configuration_error",
            WeatherAgentError::Validation { .. } => "invalid_input",
            WeatherAgentError::LocationNotFound { .. } => "location_not_found",
            WeatherAgentError::Unavailable {
                upstream: Upstream::LanguageModel,
                ..
            } => "language_model_unavailable",
            WeatherAgentError::Unavailable {
                upstream: Upstream::Weather,
                ..
            } => "weather_service_unavailable",
            WeatherAgentError::Timeout { .. } => "request_timeout",
            WeatherAgentError::InvalidResponse { .. } => "upstream_invalid_response",
            WeatherAgentError::Io { .. } | WeatherAgentError::Internal { .. } => "internal_error",
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            WeatherAgentError::Validation { .. } => StatusCode::BAD_REQUEST,
            WeatherAgentError::LocationNotFound { .. } => StatusCode::NOT_FOUND,
            WeatherAgentError::Unavailable { .. }
            | WeatherAgentError::Timeout { .. }
            | WeatherAgentError::InvalidResponse { .. } => StatusCode::SERVICE_UNAVAILABLE,
            WeatherAgentError::Config { .. }
            | WeatherAgentError::Io { .. }
            | WeatherAgentError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherAgentError::Validation { message } => format!("Invalid input: {message}"),
            WeatherAgentError::LocationNotFound { location } => {
                format!("Weather data not found for location: {location}")
            }
            WeatherAgentError::Unavailable { upstream, .. }
            | WeatherAgentError::InvalidResponse { upstream, .. } => {
                format!("The {upstream} service is currently unavailable. Please try again later.")
            }
            WeatherAgentError::Timeout { .. } => {
                "Upstream services took too long to answer. Please try again later.".to_string()
            }
            WeatherAgentError::Config { .. }
            | WeatherAgentError::Io { .. }
            | WeatherAgentError::Internal { .. } => {
                "Internal server error while processing your request".to_string()
            }
        }
    }
}

/// JSON error envelope returned to callers
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

impl IntoResponse for WeatherAgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed: {}", self);
        } else {
            tracing::debug!(code = self.code(), "request rejected: {}", self);
        }

        let body = ErrorBody {
            error: self.code(),
            detail: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = WeatherAgentError::config("missing section");
        assert!(matches!(config_err, WeatherAgentError::Config { .. }));

        let unavailable = WeatherAgentError::unavailable(Upstream::Weather, "no key");
        assert!(matches!(
            unavailable,
            WeatherAgentError::Unavailable {
                upstream: Upstream::Weather,
                ..
            }
        ));

        let validation_err = WeatherAgentError::validation("empty query");
        assert!(matches!(validation_err, WeatherAgentError::Validation { .. }));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WeatherAgentError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WeatherAgentError::location_not_found("Atlantis").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WeatherAgentError::unavailable(Upstream::LanguageModel, "timeout").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            WeatherAgentError::invalid_response(Upstream::Weather, "bad json").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            WeatherAgentError::timeout(30).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            WeatherAgentError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_messages_are_sanitized() {
        let err = WeatherAgentError::unavailable(Upstream::Weather, "401 for appid=secret");
        assert!(!err.user_message().contains("secret"));
        assert!(err.user_message().contains("weather service"));

        let internal = WeatherAgentError::internal("stack trace here");
        assert!(!internal.user_message().contains("stack trace"));

        let validation_err = WeatherAgentError::validation("Query cannot be empty");
        assert!(validation_err.user_message().contains("Query cannot be empty"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            WeatherAgentError::unavailable(Upstream::LanguageModel, "x").code(),
            "language_model_unavailable"
        );
        assert_eq!(
            WeatherAgentError::unavailable(Upstream::Weather, "x").code(),
            "weather_service_unavailable"
        );
        assert_eq!(WeatherAgentError::validation("x").code(), "invalid_input");
        assert_eq!(WeatherAgentError::timeout(1).code(), "request_timeout");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WeatherAgentError = io_err.into();
        assert!(matches!(err, WeatherAgentError::Io { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
