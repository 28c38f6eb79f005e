use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::ServerConfig;

/// Slack between the handler deadline and the outer timeout layer
const DEADLINE_GRACE_SECONDS: u64 = 5;

/// Routes plus the HTTP middleware stack
pub fn build_app(state: AppState) -> Router {
    let server = state.config.server.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = api::router(state);
    if let Some(dir) = &server.frontend_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(RequestBodyLimitLayer::new(server.body_limit_kb as usize * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            outer_deadline(&server),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Backstop for work outside the handlers' own deadline, which fires first
fn outer_deadline(server: &ServerConfig) -> Duration {
    Duration::from_secs(u64::from(server.request_timeout_seconds) + DEADLINE_GRACE_SECONDS)
}

/// Bind and serve until Ctrl-C or SIGTERM
pub async fn serve(state: AppState) -> Result<()> {
    let ServerConfig { host, port, .. } = state.config.server.clone();
    let app = build_app(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Weather agent listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
