//! HTTP API over the query orchestrator.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service banner |
//! | `GET`  | `/health` | Version and index size |
//! | `POST` | `/query` | Answer a question from the indexed documents |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500), `embedding_failed` (502),
//! `generation_failed` (502), `timeout` (504). A low-confidence answer is a
//! normal 200 response.

use std::future::Future;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::error::QueryError;
use crate::models::{QueryRequest, QueryResponse};
use crate::services::RagService;

pub const SERVICE_NAME: &str = "kassist";

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    rag: RagService,
    default_top_k: usize,
    request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(rag: RagService, default_top_k: usize) -> Self {
        Self {
            rag,
            default_top_k,
            request_timeout: None,
        }
    }

    /// Bound each `/query` round trip; a zero duration disables the bound.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/query", post(handle_query))
        .layer(cors)
        .with_state(state)
}

/// Bind `bind` and serve until `shutdown` resolves.
pub async fn run_server<F>(bind: &str, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let local = listener.local_addr()?;

    tracing::info!(
        addr = %local,
        indexed_chunks = state.rag.index().len(),
        "server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Handler error rendered as `{ "error": { code, message } }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn timeout_error(after: Duration) -> ApiError {
    ApiError {
        status: StatusCode::GATEWAY_TIMEOUT,
        code: "timeout",
        message: format!("query did not complete within {}s", after.as_secs()),
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let (status, code) = match &err {
            QueryError::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_failed"),
            QueryError::Generation(_) => (StatusCode::BAD_GATEWAY, "generation_failed"),
            QueryError::Index(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        ApiError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET / ============

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub service: &'static str,
}

pub async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}

// ============ GET /health ============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub indexed_chunks: usize,
    pub dimension: usize,
}

pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let index = state.rag.index();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        indexed_chunks: index.len(),
        dimension: index.dim(),
    })
}

// ============ POST /query ============

pub async fn handle_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;

    let question = request.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let top_k = match request.top_k {
        Some(0) => return Err(bad_request("top_k must be at least 1")),
        Some(k) => k as usize,
        None => state.default_top_k,
    };

    let start = Instant::now();
    let query = state.rag.query(question, top_k);

    let result = match state.request_timeout {
        Some(limit) => match tokio::time::timeout(limit, query).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = limit.as_secs(), "query timed out");
                return Err(timeout_error(limit));
            }
        },
        None => query.await,
    };

    let result = result.map_err(|e| {
        tracing::error!(error = %e, "query failed");
        ApiError::from(e)
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        top_k,
        contexts = result.contexts.len(),
        duration_ms,
        "answered query"
    );

    Ok(Json(QueryResponse::new(question, result, duration_ms)))
}
