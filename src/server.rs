use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::llm::{ChatCompletionsDriver, LlmSettings};
use crate::relay;

/// Request bodies above this size are rejected before parsing.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the relay router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(relay::api_chat))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: LlmSettings) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        provider = ?settings.provider,
        timeout_secs = settings.timeout.as_secs(),
        "LLM configuration loaded"
    );

    if settings.api_key.is_none() {
        tracing::warn!(
            name: "llm.config.missing_key",
            "No API key configured; chat requests will fail with a configuration error"
        );
    }

    let state = AppState {
        llm: Arc::new(ChatCompletionsDriver::new(settings)),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// GET /health - Liveness probe.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.llm.model(),
    }))
}
