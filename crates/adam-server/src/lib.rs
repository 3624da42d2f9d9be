//! ============================================================================
//! ADAM :: HTTP Service
//! ============================================================================
//! Thin axum layer over the RAG pipeline:
//!   POST /rag                 {"query"} -> {"response"}
//!   POST /stt-rag             multipart audio -> {"transcription", "response"}
//!   POST /load-conversations  multipart export -> {"loaded", "total", "percent"}
//!   GET  /health
//!
//! Services are built once in `main` and shared through `AppState`.
//! ============================================================================

use adam_core::{ConversationExport, PipelineError, RagPipeline};
use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RagRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RagResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SttRagResponse {
    pub transcription: String,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadResponse {
    pub loaded: u64,
    pub total: u64,
    pub percent: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub memories: u64,
    pub vector_store: bool,
    pub transcriber: bool,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Handler failures, mapped onto HTTP statuses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) => match e {
                PipelineError::EmptyQuery => StatusCode::BAD_REQUEST,
                PipelineError::SttUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Generation(_) => StatusCode::BAD_GATEWAY,
                PipelineError::Transcription(_) | PipelineError::Other(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the router with permissive CORS, request tracing and an upload cap
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/rag", post(rag_handler))
        .route("/stt-rag", post(stt_rag_handler))
        .route("/load-conversations", post(load_conversations_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn rag_handler(
    State(state): State<AppState>,
    payload: Result<Json<RagRequest>, JsonRejection>,
) -> Result<Json<RagResponse>, ApiError> {
    let Json(request) = payload?;
    debug!("[HTTP] /rag query: {}", request.query);

    let response = state.pipeline.answer(&request.query).await?;
    Ok(Json(RagResponse { response }))
}

async fn stt_rag_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SttRagResponse>, ApiError> {
    if !state.pipeline.has_transcriber() {
        return Err(PipelineError::SttUnavailable.into());
    }

    let audio = read_upload(multipart).await?;
    info!("[HTTP] /stt-rag received {} bytes of audio", audio.len());

    let answer = state.pipeline.answer_audio(&audio).await?;
    Ok(Json(SttRagResponse {
        transcription: answer.transcription,
        response: answer.response,
    }))
}

async fn load_conversations_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<LoadResponse>, ApiError> {
    let contents = read_upload(multipart).await?;
    info!("[HTTP] /load-conversations received {} bytes", contents.len());

    let export = ConversationExport::from_slice(&contents)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let report = state.pipeline.load_conversations(&export).await?;
    Ok(Json(LoadResponse {
        loaded: report.loaded,
        total: report.total,
        percent: report.percent,
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let memory = state.pipeline.memory();

    let vector_store = memory.health_check().await.unwrap_or(false);
    let memories = match memory.stats().await {
        Ok(stats) => stats.points_count,
        Err(e) => {
            warn!("Failed to read memory stats: {}", e);
            0
        }
    };

    Json(HealthResponse {
        status: if vector_store { "ok" } else { "degraded" }.to_string(),
        memories,
        vector_store,
        transcriber: state.pipeline.has_transcriber(),
        model: state.pipeline.llm().model_name().to_string(),
    })
}

/// Bytes of the uploaded file: the field named `file`, else the first
/// field that carries a filename.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        return Ok(bytes.to_vec());
    }

    Err(ApiError::BadRequest("No file field in upload".to_string()))
}
