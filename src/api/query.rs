//! Natural-language query endpoints

use super::AppState;
use crate::models::{ParsedQuery, QueryRequest, QueryResponse};
use crate::Result;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// POST /query/: answer a natural-language weather question
pub async fn process_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let response = state
        .within_deadline(state.agent.process(&request))
        .await?;
    Ok(Json(response))
}

/// Body of POST /query/parse
#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub query: String,
    pub parsed_query: ParsedQuery,
}

/// POST /query/parse: extract the intent only
pub async fn parse_query(
    State(state): State<AppState>,
    Json(request): Json<ParseRequest>,
) -> Result<Json<ParseResponse>> {
    let parsed_query = state
        .within_deadline(state.agent.parse(&request.query))
        .await?;
    Ok(Json(ParseResponse {
        query: request.query,
        parsed_query,
    }))
}

#[derive(Debug, Serialize)]
struct ComponentStatus {
    configured: bool,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

/// GET /query/health: check the agent's upstreams
pub async fn agent_health(State(state): State<AppState>) -> impl IntoResponse {
    let llm_status = async {
        match &state.llm {
            Some(llm) => Some(llm.health_check().await.is_ok()),
            None => None,
        }
    };
    let weather_status = async {
        if state.weather.is_configured() {
            Some(state.weather.health_check().await.is_ok())
        } else {
            None
        }
    };
    let (llm_ok, weather_ok) = tokio::join!(llm_status, weather_status);

    let label = |outcome: Option<bool>| match outcome {
        Some(true) => "healthy",
        Some(false) => "unhealthy",
        None => "not_configured",
    };

    let status = match (llm_ok, weather_ok) {
        (_, Some(false)) | (Some(false), _) => "unhealthy",
        (Some(true), Some(true)) => "healthy",
        _ => "degraded",
    };

    let body = serde_json::json!({
        "service": "agent",
        "status": status,
        "mode": if state.llm.is_some() { "language_model" } else { "rule_based" },
        "components": {
            "language_model": ComponentStatus {
                configured: state.llm.is_some(),
                status: label(llm_ok),
                model: state.llm.as_ref().map(|llm| llm.model().to_string()),
            },
            "weather": ComponentStatus {
                configured: state.weather.is_configured(),
                status: label(weather_ok),
                model: None,
            },
        },
        "timestamp": Utc::now(),
    });

    (StatusCode::OK, Json(body))
}
