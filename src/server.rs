//! HTTP API for the assistant dashboard.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/api/stats` | Knowledge-base counters |
//! | `GET`    | `/api/documents` | Documents, newest first |
//! | `POST`   | `/api/documents?name=&category=&impact=` | Upload a raw document body |
//! | `DELETE` | `/api/documents/{id}` | Delete a document and its chunks |
//! | `POST`   | `/api/chat` | Ask a question: `{ "message": "..." }` |
//! | `GET`    | `/api/history?limit=` | Recent questions and answers |
//!
//! Uploads are sent as the raw request body; the `Content-Type` header is
//! the document's media type.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `extraction_failed` (422), `internal` (500). Bodies or query strings
//! that fail to deserialize are `bad_request`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser dashboard
//! served from another origin can call the API.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use ragdesk_core::assistant::AskResponse;
use ragdesk_core::error::Error;
use ragdesk_core::ingest::{IngestReport, IngestRequest};
use ragdesk_core::models::{Document, QueryLogEntry, StoreStats};

use crate::app::App;
use crate::config::Config;
use crate::extract::MIME_TEXT;
use crate::history::DEFAULT_HISTORY_LIMIT;

const MAX_HISTORY_LIMIT: i64 = 500;

/// Starts the HTTP server.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = Arc::new(App::open(config).await?);
    let router = router(app, config.server.max_upload_bytes);

    tracing::info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Build the route table over an opened [`App`].
pub fn router(app: Arc<App>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/stats", get(handle_stats))
        .route(
            "/api/documents",
            get(handle_list_documents)
                .post(handle_upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/documents/{id}", delete(handle_delete_document))
        .route("/api/chat", post(handle_chat))
        .route("/api/history", get(handle_history))
        .layer(cors)
        .with_state(app)
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

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(err: impl std::fmt::Display) -> AppError {
    tracing::error!("request failed: {}", err);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "internal error".to_string(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRequest(message) => bad_request(message),
            Error::Extraction(message) => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "extraction_failed",
                message,
            },
            other => internal(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        internal(err)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ GET /api/stats ============

async fn handle_stats(State(app): State<Arc<App>>) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(app.store.stats().await?))
}

// ============ /api/documents ============

async fn handle_list_documents(
    State(app): State<Arc<App>>,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(app.store.list_documents().await?))
}

#[derive(Deserialize)]
struct UploadParams {
    name: Option<String>,
    category: Option<String>,
    impact: Option<String>,
}

async fn handle_upload(
    State(app): State<Arc<App>>,
    params: Result<Query<UploadParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestReport>), AppError> {
    let Query(params) = params?;
    let name = params
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| bad_request("name query parameter is required"))?;
    if body.is_empty() {
        return Err(bad_request("request body is empty"));
    }
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(MIME_TEXT)
        .to_string();

    let mut request = IngestRequest::new(name, media_type, body.to_vec());
    request.category = params.category;
    request.impact = params.impact;

    let report = app.pipeline.ingest(request).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn handle_delete_document(
    State(app): State<Arc<App>>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !app.store.delete_document(id).await? {
        return Err(not_found(format!("no document with id {}", id)));
    }
    tracing::info!(document_id = id, "document deleted");
    Ok(Json(DeleteResponse { success: true }))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

async fn handle_chat(
    State(app): State<Arc<App>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = payload?;
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    Ok(Json(app.assistant.ask(&req.message).await?))
}

// ============ GET /api/history ============

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

async fn handle_history(
    State(app): State<Arc<App>>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<QueryLogEntry>>, AppError> {
    let Query(params) = params?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(app.store.list_query_log(limit).await?))
}
