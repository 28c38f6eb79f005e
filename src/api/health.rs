//! Service health and API info

use super::AppState;
use crate::VERSION;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct DependencyStatus {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct Dependencies {
    pub language_model: DependencyStatus,
    pub weather: DependencyStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub dependencies: Dependencies,
}

/// GET /health: configuration-only check, never calls upstreams
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let language_model = state.llm.is_some();
    let weather = state.weather.is_configured();

    Json(HealthResponse {
        status: if language_model && weather {
            "healthy"
        } else {
            "degraded"
        },
        service: "weather-agent",
        version: VERSION,
        environment: state.config.server.environment.clone(),
        timestamp: Utc::now(),
        dependencies: Dependencies {
            language_model: DependencyStatus {
                configured: language_model,
            },
            weather: DependencyStatus {
                configured: weather,
            },
        },
    })
}

/// GET /api
pub async fn api_info() -> Json<serde_json::Value> {
    Json(info_body())
}

/// GET /: the chat page for browsers, API info otherwise
pub async fn root(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let wants_html = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));

    if wants_html {
        if let Some(dir) = &state.config.server.frontend_dir {
            let index = Path::new(dir).join("index.html");
            match tokio::fs::read_to_string(&index).await {
                Ok(page) => return Html(page).into_response(),
                Err(e) => warn!("Could not read {}: {}", index.display(), e),
            }
        }
    }

    Json(info_body()).into_response()
}

fn info_body() -> serde_json::Value {
    serde_json::json!({
        "message": "Weather Agent API",
        "version": VERSION,
        "health": "/health",
        "endpoints": {
            "weather": "/weather",
            "query": "/query",
            "calendar": "/calendar",
        },
    })
}
