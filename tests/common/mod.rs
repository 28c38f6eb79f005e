//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use weather_agent::config::WeatherAgentConfig;
use weather_agent::llm::{CompletionOptions, LanguageModel};
use weather_agent::models::{
    Coordinates, CurrentWeather, DailyForecast, WeatherCondition, WeatherData, WeatherForecast,
};
use weather_agent::{
    AppState, CalendarEvent, EventSource, Result, Upstream, WeatherAgentError, WeatherProvider,
    web,
};

/// Provider that knows Paris only
pub struct StaticWeather {
    pub configured: bool,
}

fn clear_sky() -> WeatherCondition {
    WeatherCondition {
        main: "Clear".to_string(),
        description: "clear sky".to_string(),
        icon: "01d".to_string(),
    }
}

fn paris_coordinates() -> Coordinates {
    Coordinates {
        lat: 48.8566,
        lon: 2.3522,
    }
}

impl StaticWeather {
    fn check(&self, location: &str) -> Result<()> {
        if !self.configured {
            return Err(WeatherAgentError::unavailable(
                Upstream::Weather,
                "weather API key is not configured",
            ));
        }
        if !location.eq_ignore_ascii_case("paris") {
            return Err(WeatherAgentError::location_not_found(location));
        }
        Ok(())
    }
}

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn current_weather(&self, location: &str) -> Result<CurrentWeather> {
        self.check(location)?;
        Ok(CurrentWeather {
            location: "Paris".to_string(),
            country: Some("FR".to_string()),
            coordinates: paris_coordinates(),
            current_weather: WeatherData {
                temperature: 22.5,
                feels_like: 21.9,
                humidity: 65,
                pressure: 1013,
                visibility: Some(10_000),
                wind_speed: 3.6,
                wind_direction: Some(200),
                cloud_cover: Some(0),
            },
            conditions: vec![clear_sky()],
            timestamp: Utc::now(),
            source: "static".to_string(),
        })
    }

    async fn forecast(&self, location: &str, days: u32) -> Result<WeatherForecast> {
        self.check(location)?;
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        Ok(WeatherForecast {
            location: "Paris".to_string(),
            country: Some("FR".to_string()),
            coordinates: paris_coordinates(),
            forecast: (0..days)
                .map(|d| DailyForecast {
                    date: start + Duration::days(i64::from(d)),
                    temperature_min: 14.0,
                    temperature_max: 25.0,
                    temperature_avg: 19.5,
                    humidity: 60,
                    wind_speed_max: 4.2,
                    precipitation_probability: Some(10),
                    conditions: clear_sky(),
                })
                .collect(),
            source: "static".to_string(),
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn health_check(&self) -> Result<()> {
        if self.configured {
            Ok(())
        } else {
            Err(WeatherAgentError::unavailable(Upstream::Weather, "no key"))
        }
    }

    fn source(&self) -> &str {
        "static"
    }
}

/// Model that always returns the same text
pub struct CannedModel(pub String);

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(&self, _: &str, _: &str, _: CompletionOptions) -> Result<String> {
        Ok(self.0.clone())
    }

    fn model(&self) -> &str {
        "canned"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Model that answers only after a delay
pub struct SlowModel(pub std::time::Duration);

#[async_trait]
impl LanguageModel for SlowModel {
    async fn complete(&self, _: &str, _: &str, _: CompletionOptions) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }

    fn model(&self) -> &str {
        "slow"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Event source serving a fixed list
pub struct StaticEvents(pub Vec<CalendarEvent>);

#[async_trait]
impl EventSource for StaticEvents {
    async fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .0
            .iter()
            .filter(|e| e.has_overlap(start, end))
            .cloned()
            .collect())
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Event starting `hours` from now and lasting one hour
pub fn event_in(hours: i64, summary: &str, location: Option<&str>) -> CalendarEvent {
    let start = Utc::now() + Duration::hours(hours);
    CalendarEvent {
        id: Some(format!("{summary}-{hours}")),
        summary: summary.to_string(),
        start_time: start,
        end_time: start + Duration::hours(1),
        location: location.map(str::to_string),
        description: None,
    }
}

pub fn app(llm: Option<Arc<dyn LanguageModel>>, weather: Arc<dyn WeatherProvider>) -> Router {
    app_with_config(WeatherAgentConfig::default(), llm, weather)
}

pub fn app_with_config(
    config: WeatherAgentConfig,
    llm: Option<Arc<dyn LanguageModel>>,
    weather: Arc<dyn WeatherProvider>,
) -> Router {
    web::build_app(AppState::new(config, llm, weather))
}

/// Rule-based agent over Paris weather and the given events
pub fn calendar_app(events: Vec<CalendarEvent>) -> Router {
    let state = AppState::new(
        WeatherAgentConfig::default(),
        None,
        Arc::new(StaticWeather { configured: true }),
    )
    .with_calendar(Arc::new(StaticEvents(events)));
    web::build_app(state)
}

/// Rule-based agent with a configured static provider
pub fn rule_based_app() -> Router {
    app(None, Arc::new(StaticWeather { configured: true }))
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}
