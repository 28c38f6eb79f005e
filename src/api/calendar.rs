//! Calendar endpoints: events and weather advice for them

use super::AppState;
use crate::agent::composer::format_temperature;
use crate::agent::validate_query;
use crate::calendar::{self, CalendarEvent};
use crate::config::MAX_CALENDAR_DAYS;
use crate::weather::validate_location;
use crate::{Result, WeatherAgentError};
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Look-ahead when the caller names none, in days
const DEFAULT_CALENDAR_DAYS: u32 = 7;

/// Body of POST /calendar/weather-check
#[derive(Debug, Deserialize)]
pub struct CalendarWeatherRequest {
    pub query: String,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    /// Where to check the weather; the configured default otherwise
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    fn ahead(from: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: from,
            end: from + Duration::days(i64::from(days)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CalendarWeatherResponse {
    pub events: Vec<CalendarEvent>,
    pub weather_recommendations: String,
    pub natural_response: String,
    pub location: String,
    pub date_range: DateRange,
}

#[derive(Debug, Deserialize)]
pub struct DaysParams {
    pub days: Option<u32>,
}

/// Window named by a free-form range: tomorrow, or the coming week
fn window_for(date_range: Option<&str>, now: DateTime<Utc>) -> (DateRange, &'static str) {
    let tomorrow = date_range.is_some_and(|range| range.to_lowercase().contains("tomorrow"));
    if tomorrow {
        (DateRange::ahead(now + Duration::days(1), 1), "tomorrow")
    } else {
        (DateRange::ahead(now, DEFAULT_CALENDAR_DAYS), "the next week")
    }
}

fn look_ahead(params: &DaysParams) -> Result<u32> {
    let days = params.days.unwrap_or(DEFAULT_CALENDAR_DAYS);
    if !(1..=MAX_CALENDAR_DAYS).contains(&days) {
        return Err(WeatherAgentError::validation(format!(
            "days must be between 1 and {MAX_CALENDAR_DAYS}"
        )));
    }
    Ok(days)
}

/// POST /calendar/weather-check: advice for upcoming outdoor events
pub async fn weather_check(
    State(state): State<AppState>,
    Json(request): Json<CalendarWeatherRequest>,
) -> Result<Json<CalendarWeatherResponse>> {
    validate_query(&request.query)?;
    let location = match request.location.as_deref() {
        Some(location) => validate_location(location)?,
        None => state.config.calendar.default_location.as_str(),
    };
    if let Some(calendar_id) = &request.calendar_id {
        debug!(calendar_id = %calendar_id, "single event source, calendar_id ignored");
    }

    let (range, period) = window_for(request.date_range.as_deref(), Utc::now());
    let (events, weather) = state
        .within_deadline(async {
            tokio::try_join!(
                state.calendar.events(range.start, range.end),
                state.weather.current_weather(location),
            )
        })
        .await?;

    for event in calendar::outdoor_events(&events) {
        debug!("Outdoor event: {}", event);
    }
    let weather_recommendations = calendar::recommendations(&events, &weather);
    info!(
        "Calendar check for {}: {} events in {}",
        weather.location,
        events.len(),
        period
    );

    let natural_response = format!(
        "I found {} events in your calendar for {}.\n\
         Here are my weather-based recommendations:\n\n\
         {}\n\n\
         Current weather in {}: {}°C, {}",
        events.len(),
        period,
        weather_recommendations,
        weather.location,
        format_temperature(weather.current_weather.temperature),
        weather.description()
    );

    Ok(Json(CalendarWeatherResponse {
        events,
        weather_recommendations,
        natural_response,
        location: weather.location,
        date_range: range,
    }))
}

/// GET /calendar/events?days=N
pub async fn events(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<Json<serde_json::Value>> {
    let range = DateRange::ahead(Utc::now(), look_ahead(&params)?);
    let events = state
        .within_deadline(state.calendar.events(range.start, range.end))
        .await?;

    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
        "date_range": range,
    })))
}

/// GET /calendar/outdoor-events?days=N
pub async fn outdoor_events(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<Json<serde_json::Value>> {
    let range = DateRange::ahead(Utc::now(), look_ahead(&params)?);
    let events = state
        .within_deadline(state.calendar.events(range.start, range.end))
        .await?;
    let outdoor = calendar::outdoor_events(&events);

    Ok(Json(serde_json::json!({
        "total_events": events.len(),
        "outdoor_count": outdoor.len(),
        "outdoor_events": outdoor,
        "date_range": range,
    })))
}

/// GET /calendar/health
pub async fn calendar_health(State(state): State<AppState>) -> impl IntoResponse {
    let calendar_status = async {
        if state.calendar.is_configured() {
            Some(state.calendar.health_check().await.is_ok())
        } else {
            None
        }
    };
    let weather_status = async {
        if state.weather.is_configured() {
            Some(state.weather.health_check().await.is_ok())
        } else {
            None
        }
    };
    let (calendar_ok, weather_ok) = tokio::join!(calendar_status, weather_status);

    let label = |outcome: Option<bool>| match outcome {
        Some(true) => "healthy",
        Some(false) => "unhealthy",
        None => "not_configured",
    };
    let status = match (calendar_ok, weather_ok) {
        (Some(true), Some(true)) => "healthy",
        (Some(false), _) | (_, Some(false)) => "unhealthy",
        _ => "degraded",
    };

    Json(serde_json::json!({
        "service": "calendar",
        "status": status,
        "components": {
            "calendar": label(calendar_ok),
            "weather": label(weather_ok),
        },
        "calendar_configured": state.calendar.is_configured(),
        "weather_configured": state.weather.is_configured(),
        "timestamp": Utc::now(),
    }))
}
