//! Direct weather endpoints

use super::AppState;
use crate::models::{CurrentWeather, WeatherForecast, WeatherPayload};
use crate::weather::validate_location;
use crate::{Result, WeatherAgentError};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub days: Option<u32>,
}

/// Body of POST /weather/query
#[derive(Debug, Deserialize)]
pub struct WeatherQueryRequest {
    pub location: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub weather_type: Option<String>,
}

/// GET /weather/current/{location}
pub async fn current_weather(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<CurrentWeather>> {
    let location = validate_location(&location)?;
    let weather = state
        .within_deadline(state.weather.current_weather(location))
        .await?;
    Ok(Json(weather))
}

/// GET /weather/forecast/{location}?days=N
pub async fn forecast(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<WeatherForecast>> {
    let location = validate_location(&location)?;
    let max_days = state.config.agent.max_forecast_days;
    let days = params
        .days
        .unwrap_or(state.config.agent.default_forecast_days);
    if !(1..=max_days).contains(&days) {
        return Err(WeatherAgentError::validation(format!(
            "days must be between 1 and {max_days}"
        )));
    }

    let forecast = state
        .within_deadline(state.weather.forecast(location, days))
        .await?;
    Ok(Json(forecast))
}

/// POST /weather/query: current conditions, or a forecast running through
/// `date` when it names a future day
pub async fn structured_query(
    State(state): State<AppState>,
    Json(request): Json<WeatherQueryRequest>,
) -> Result<Json<WeatherPayload>> {
    let location = validate_location(&request.location)?;
    if let Some(weather_type) = &request.weather_type {
        debug!(weather_type = %weather_type, "weather_type does not narrow the payload");
    }

    let days = match request.date.as_deref() {
        Some(date) => days_through(
            date,
            Utc::now().date_naive(),
            state.config.agent.max_forecast_days,
        )?,
        None => None,
    };

    let payload = match days {
        Some(days) => {
            debug!("Structured query for {}-day forecast of '{}'", days, location);
            let forecast = state
                .within_deadline(state.weather.forecast(location, days))
                .await?;
            WeatherPayload::Forecast(forecast)
        }
        None => {
            let current = state
                .within_deadline(state.weather.current_weather(location))
                .await?;
            WeatherPayload::Current(current)
        }
    };
    Ok(Json(payload))
}

/// Forecast length needed to cover `date`, or `None` for today.
///
/// Accepts `YYYY-MM-DD`, "today", "now" and "tomorrow".
pub fn days_through(date: &str, today: NaiveDate, max_days: u32) -> Result<Option<u32>> {
    let date = date.trim().to_lowercase();
    let target = match date.as_str() {
        "" | "today" | "now" => return Ok(None),
        "tomorrow" => today.succ_opt().unwrap_or(today),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            WeatherAgentError::validation(format!(
                "date must be YYYY-MM-DD, today or tomorrow, got '{other}'"
            ))
        })?,
    };

    let offset = (target - today).num_days();
    if offset < 0 {
        return Err(WeatherAgentError::validation(
            "historical weather is not available",
        ));
    }
    if offset == 0 {
        return Ok(None);
    }
    let days = u32::try_from(offset + 1).unwrap_or(u32::MAX);
    if days > max_days {
        return Err(WeatherAgentError::validation(format!(
            "date must be within the next {} days",
            max_days.saturating_sub(1)
        )));
    }
    Ok(Some(days))
}

/// GET /weather/health
pub async fn weather_health(State(state): State<AppState>) -> impl IntoResponse {
    let configured = state.weather.is_configured();
    let (status_code, status, detail) = if !configured {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            Some("weather API key is not configured".to_string()),
        )
    } else {
        match state.weather.health_check().await {
            Ok(()) => (StatusCode::OK, "healthy", None),
            Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(e.user_message())),
        }
    };

    let body = serde_json::json!({
        "service": "weather",
        "status": status,
        "source": state.weather.source(),
        "api_key_configured": configured,
        "detail": detail,
        "timestamp": Utc::now(),
    });
    (status_code, Json(body))
}
