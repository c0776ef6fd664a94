//! HTTP surface: three JSON operations plus a health probe.

use crate::app::App;
use crate::models::{DescribeResponse, FormattedPrompt, OptimizeResponse};
use crate::{validation, Error, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    app: Arc<App>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let envelope = self.envelope();
        let status =
            StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }

        (status, Json(envelope)).into_response()
    }
}

pub fn router(app: Arc<App>, max_body_bytes: usize) -> Router {
    let state = AppState { app };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/optimize", post(optimize_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/describe", post(describe_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(app: App, addr: SocketAddr, max_body_bytes: usize) -> Result<()> {
    let app = router(Arc::new(app), max_body_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "describeBackend": state.app.describe_backend(),
        "completionConfigured": state.app.completion_configured(),
        "describeConfigured": state.app.describe_configured(),
    }))
}

async fn optimize_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OptimizeResponse>> {
    let payload = validation::parse_body(&body)?;
    Ok(Json(state.app.optimize(&payload).await?))
}

async fn generate_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FormattedPrompt>> {
    let payload = validation::parse_body(&body)?;
    Ok(Json(state.app.generate(&payload).await?))
}

async fn describe_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DescribeResponse>> {
    let payload = validation::parse_body(&body)?;
    Ok(Json(state.app.describe(&payload).await?))
}
