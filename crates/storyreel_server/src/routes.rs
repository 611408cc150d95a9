//! HTTP routes and error-to-status mapping.

use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use storyreel_core::{JobProgress, JobRecord, JobStatus, StoryRequest};
use storyreel_error::{PipelineErrorKind, StoryreelError, StoryreelErrorKind};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the API router over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/jobs", post(submit_job))
        .route("/v1/jobs/:job_id", get(job_status))
        .route("/v1/jobs/:job_id/download", get(download_job))
        .layer(cors_layer())
        .with_state(state)
}

/// CORS policy from `ALLOWED_ORIGINS`, a comma-separated origin list.
/// Unset means any origin, for local development.
fn cors_layer() -> CorsLayer {
    let origin = match std::env::var("ALLOWED_ORIGINS") {
        Ok(raw) => {
            let origins: Vec<HeaderValue> = raw
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            AllowOrigin::list(origins)
        }
        Err(_) => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Shape of job records on the wire. Internal paths stay server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    /// Token to poll and download with.
    pub job_id: String,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Failure reason, for failed jobs.
    pub error: Option<String>,
    /// Stage and scene counters.
    pub progress: JobProgress,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<JobRecord> for JobResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.job_id,
            status: record.status,
            error: record.error,
            progress: record.progress,
            created_at: record.created_at,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "has_keys": storyreel_adapters::has_all_keys(),
    }))
}

async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<StoryRequest>,
) -> Response {
    match state.orchestrator.submit(request).await {
        Ok(record) => Json(JobResponse::from(record)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.orchestrator.status(&job_id).await {
        Ok(record) => Json(JobResponse::from(record)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn download_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.orchestrator.download(&job_id).await {
        Ok((bytes, filename)) => (
            [
                (header::CONTENT_TYPE, "video/mp4".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Map an error to its HTTP status, with the message in a JSON body.
fn error_response(error: StoryreelError) -> Response {
    let status = match error.kind() {
        StoryreelErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
        StoryreelErrorKind::Pipeline(e) => match &e.kind {
            PipelineErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineErrorKind::NotReady(_) => StatusCode::CONFLICT,
            PipelineErrorKind::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(%status, error = %error, "Request failed");
    }
    (status, Json(json!({"error": error.to_string()}))).into_response()
}
