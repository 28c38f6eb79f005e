//! Configuration management for the weather agent
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WeatherAgentError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "weather-agent.toml";

/// Largest forecast horizon the weather provider serves, in days
pub const PROVIDER_MAX_FORECAST_DAYS: u32 = 5;

/// Longest calendar look-ahead accepted from callers, in days
pub const MAX_CALENDAR_DAYS: u32 = 30;

/// Root configuration structure for the weather agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherAgentConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Language-model API configuration
    pub llm: LlmConfig,
    /// Weather API configuration
    pub weather: WeatherConfig,
    /// Query processing settings
    pub agent: AgentConfig,
    /// Calendar event source and recommendation settings
    pub calendar: CalendarConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Whole-request timeout in seconds
    pub request_timeout_seconds: u32,
    /// Maximum accepted request body in KB
    pub body_limit_kb: u32,
    /// Deployment environment name reported by /health
    pub environment: String,
    /// Directory holding the static chat frontend, if any
    pub frontend_dir: Option<String>,
}

/// Language-model API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key; the rule-based parser is used when absent
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key; weather endpoints answer 503 when absent
    pub api_key: Option<String>,
    /// Base URL for weather data
    pub base_url: String,
    /// Base URL for geocoding
    pub geocoding_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Query processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Parsed intents below this confidence are not acted upon
    pub min_confidence: f32,
    /// Forecast length when neither caller nor query names one
    pub default_forecast_days: u32,
    /// Largest forecast length accepted from callers
    pub max_forecast_days: u32,
}

/// Calendar settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// JSON file holding the calendar events; the calendar is unconfigured without it
    pub events_file: Option<String>,
    /// Location checked when a calendar request names none
    pub default_location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u32 {
    30
}

fn default_body_limit() -> u32 {
    64
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u32 {
    20
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_geocoding_url() -> String {
    "https://api.openweathermap.org/geo/1.0".to_string()
}

fn default_weather_timeout() -> u32 {
    10
}

fn default_min_confidence() -> f32 {
    0.25
}

fn default_forecast_days() -> u32 {
    5
}

fn default_calendar_location() -> String {
    "New York".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            body_limit_kb: default_body_limit(),
            environment: default_environment(),
            frontend_dir: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            geocoding_url: default_geocoding_url(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            default_forecast_days: default_forecast_days(),
            max_forecast_days: PROVIDER_MAX_FORECAST_DAYS,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            events_file: None,
            default_location: default_calendar_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Which fallback-eligible settings the file or `WEATHER_AGENT_*` set explicitly
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitSettings {
    pub port: bool,
    pub environment: bool,
}

impl WeatherAgentConfig {
    /// Load configuration from the given (or default) file and the process environment
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_layered(config_path, None)
    }

    /// Layer the TOML file under `WEATHER_AGENT_*` variables. `env` replaces
    /// the process environment when given.
    fn load_layered(
        config_path: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. WEATHER_AGENT_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("WEATHER_AGENT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env.clone()),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let explicit = ExplicitSettings {
            port: settings.get::<u16>("server.port").is_ok(),
            environment: settings.get_string("server.environment").is_ok(),
        };

        let mut config: WeatherAgentConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to deserialize configuration from {}", config_file.display()))?;

        match &env {
            Some(vars) => config.apply_env_fallbacks(|name| vars.get(name).cloned(), explicit),
            None => config.apply_env_fallbacks(|name| std::env::var(name).ok(), explicit),
        }
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Fill unset values from the conventional environment variables
    /// (`OPENAI_API_KEY`, `OPENWEATHER_API_KEY`, `PORT`, `ENVIRONMENT`).
    /// `PORT` and `ENVIRONMENT` never replace values set in the file or by
    /// `WEATHER_AGENT_*` variables.
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F, explicit: ExplicitSettings)
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_blank(self.llm.api_key.as_deref()) {
            self.llm.api_key = lookup("OPENAI_API_KEY");
        }
        if is_blank(self.weather.api_key.as_deref()) {
            self.weather.api_key = lookup("OPENWEATHER_API_KEY");
        }
        if !explicit.port {
            if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
                self.server.port = port;
            }
        }
        if !explicit.environment {
            if let Some(environment) = lookup("ENVIRONMENT") {
                if !environment.trim().is_empty() {
                    self.server.environment = environment.trim().to_string();
                }
            }
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if is_blank(self.llm.api_key.as_deref()) {
            self.llm.api_key = None;
        }
        if is_blank(self.weather.api_key.as_deref()) {
            self.weather.api_key = None;
        }
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.server.body_limit_kb == 0 {
            self.server.body_limit_kb = default_body_limit();
        }
        if self.server.environment.is_empty() {
            self.server.environment = default_environment();
        }
        if self.llm.base_url.is_empty() {
            self.llm.base_url = default_llm_base_url();
        }
        if self.llm.model.is_empty() {
            self.llm.model = default_llm_model();
        }
        if self.llm.timeout_seconds == 0 {
            self.llm.timeout_seconds = default_llm_timeout();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.geocoding_url.is_empty() {
            self.weather.geocoding_url = default_geocoding_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.agent.default_forecast_days == 0 {
            self.agent.default_forecast_days = default_forecast_days();
        }
        if self.agent.max_forecast_days == 0 {
            self.agent.max_forecast_days = PROVIDER_MAX_FORECAST_DAYS;
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Whether a language-model key is configured
    #[must_use]
    pub fn llm_configured(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Whether a weather key is configured
    #[must_use]
    pub fn weather_configured(&self) -> bool {
        self.weather.api_key.is_some()
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(WeatherAgentError::config("Server port cannot be 0").into());
        }

        if self.server.request_timeout_seconds > 300 {
            return Err(
                WeatherAgentError::config("Request timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.llm.timeout_seconds > 300 || self.weather.timeout_seconds > 300 {
            return Err(
                WeatherAgentError::config("Upstream timeout cannot exceed 300 seconds").into(),
            );
        }

        if !(0.0..=1.0).contains(&self.agent.min_confidence) {
            return Err(WeatherAgentError::config(
                "Minimum confidence must be between 0.0 and 1.0",
            )
            .into());
        }

        if self.agent.max_forecast_days > PROVIDER_MAX_FORECAST_DAYS {
            return Err(WeatherAgentError::config(format!(
                "Maximum forecast days cannot exceed {PROVIDER_MAX_FORECAST_DAYS}"
            ))
            .into());
        }

        if self.agent.default_forecast_days > self.agent.max_forecast_days {
            return Err(WeatherAgentError::config(
                "Default forecast days cannot exceed maximum forecast days",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherAgentError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherAgentError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("LLM base URL", &self.llm.base_url),
            ("Weather API base URL", &self.weather.base_url),
            ("Geocoding API base URL", &self.weather.geocoding_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WeatherAgentError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = WeatherAgentConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.agent.max_forecast_days, PROVIDER_MAX_FORECAST_DAYS);
        assert_eq!(config.logging.level, "info");
        assert!(config.llm.api_key.is_none());
        assert!(config.weather.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_fallbacks_fill_missing_keys() {
        let mut config = WeatherAgentConfig::default();
        config.apply_env_fallbacks(
            lookup_from(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENWEATHER_API_KEY", "owm-test"),
                ("PORT", "9090"),
                ("ENVIRONMENT", "production"),
            ]),
            ExplicitSettings::default(),
        );

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.weather.api_key.as_deref(), Some("owm-test"));
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.environment, "production");
        assert!(config.llm_configured());
        assert!(config.weather_configured());
    }

    #[test]
    fn test_env_fallbacks_do_not_override_explicit_values() {
        let mut config = WeatherAgentConfig::default();
        config.weather.api_key = Some("from-file".to_string());
        config.server.port = 7000;
        config.apply_env_fallbacks(
            lookup_from(&[("OPENWEATHER_API_KEY", "from-env"), ("PORT", "9090")]),
            ExplicitSettings {
                port: true,
                ..ExplicitSettings::default()
            },
        );

        assert_eq!(config.weather.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_blank_keys_count_as_absent() {
        let mut config = WeatherAgentConfig::default();
        config.llm.api_key = Some("   ".to_string());
        config.weather.api_key = Some(String::new());
        config.apply_defaults();

        assert!(!config.llm_configured());
        assert!(!config.weather_configured());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = WeatherAgentConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = WeatherAgentConfig::default();
        config.server.request_timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = WeatherAgentConfig::default();
        config.agent.max_forecast_days = 10;
        assert!(config.validate().is_err());

        let mut config = WeatherAgentConfig::default();
        config.agent.min_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_urls() {
        let mut config = WeatherAgentConfig::default();
        config.llm.base_url = "ftp://example.com".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("LLM base URL"));
    }

    #[test]
    fn test_apply_defaults_fills_zeroes() {
        let mut config = WeatherAgentConfig::default();
        config.server.request_timeout_seconds = 0;
        config.weather.timeout_seconds = 0;
        config.agent.default_forecast_days = 0;
        config.logging.format = String::new();
        config.apply_defaults();

        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(config.weather.timeout_seconds, 10);
        assert_eq!(config.agent.default_forecast_days, 5);
        assert_eq!(config.logging.format, "pretty");
    }

    fn write_toml(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("weather-agent.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn env_map(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_prefixed_env_overrides_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_toml(
            &dir,
            r#"
[server]
port = 8000

[llm]
model = "file-model"

[logging]
format = "json"
"#,
        );
        let env = env_map(&[
            ("WEATHER_AGENT_SERVER__PORT", "9001"),
            ("WEATHER_AGENT_WEATHER__API_KEY", "abc123"),
            ("PORT", "7777"),
        ]);

        let config = WeatherAgentConfig::load_layered(Some(path), Some(env)).unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.llm.model, "file-model");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.weather.api_key.as_deref(), Some("abc123"));
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_explicit_default_port_survives_port_variable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_toml(&dir, "[server]\nport = 8000\nenvironment = \"staging\"\n");
        let env = env_map(&[("PORT", "9090"), ("ENVIRONMENT", "production")]);

        let config = WeatherAgentConfig::load_layered(Some(path), Some(env)).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.environment, "staging");
    }

    #[test]
    fn test_port_variable_applies_when_file_is_silent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_toml(&dir, "[llm]\nmodel = \"file-model\"\n");
        let env = env_map(&[("PORT", "9090"), ("OPENAI_API_KEY", "sk-env")]);

        let config = WeatherAgentConfig::load_layered(Some(path), Some(env)).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_invalid_toml_value_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_toml(&dir, "[logging]\nlevel = \"loud\"\n");

        let result = WeatherAgentConfig::load_layered(Some(path), Some(HashMap::new()));
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config =
            WeatherAgentConfig::load_from_path(Some(PathBuf::from("does-not-exist.toml")))
                .expect("defaults should load");
        assert_eq!(config.weather.geocoding_url, "https://api.openweathermap.org/geo/1.0");
        assert!(config.validate().is_ok());
    }
}
