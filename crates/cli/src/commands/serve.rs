//! Serve command handler.
//!
//! HTTP surface over the dispatcher:
//! - `GET /` health check
//! - `POST /ask` with `{"question": "..."}`
//!
//! Each `/ask` call runs under the configured engine timeout. Engine failures
//! and timeouts answer 503 with a JSON error body; they are never turned into
//! an answer.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use spark_core::{config::AppConfig, AppError, AppResult};
use spark_mediation::{build_dispatcher, AnswerDispatcher};
use std::sync::Arc;
use std::time::Duration;

const AGENT_NAME: &str = "Spark";

/// Serve the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides server.bind from config)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    dispatcher: Arc<AnswerDispatcher>,
    timeout: Duration,
}

impl ServerState {
    pub fn new(dispatcher: Arc<AnswerDispatcher>, timeout: Duration) -> Self {
        Self {
            dispatcher,
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    answer: String,
    agent: &'static str,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        config.validate()?;

        let bind = self.bind.as_deref().unwrap_or(&config.server.bind);
        let state = ServerState::new(
            Arc::new(build_dispatcher(config)?),
            Duration::from_secs(config.engine.timeout_secs),
        );

        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", bind, e)))?;

        tracing::info!("Listening on http://{}", bind);

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Build the HTTP router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/ask", post(ask))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// GET /
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "agent": AGENT_NAME }))
}

/// POST /ask
async fn ask(State(state): State<ServerState>, Json(req): Json<AskRequest>) -> Response {
    match super::respond_within(&state.dispatcher, &req.question, state.timeout).await {
        Ok(answer) => {
            tracing::debug!(source = ?answer.source, "Answered /ask request");
            Json(AskResponse {
                answer: answer.text,
                agent: AGENT_NAME,
            })
            .into_response()
        }
        Err(AppError::EngineUnavailable(message)) => {
            tracing::warn!("Engine unavailable: {}", message);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "engine_unavailable", "message": message })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to answer: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
