//! HTTP endpoints.
//!
//! - `POST /data` - ingest a telemetry batch
//! - `GET /data-snapshot` - full session snapshot (`GET /get_data` is kept as an alias)
//! - `GET /health` - liveness and store sizes

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use relay_core::SnapshotPayload;

use crate::ingest::{ingest_batch, TagRouter};
use crate::store::SharedIngestStore;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Telemetry accumulator.
    pub store: SharedIngestStore,
    /// Record tag routing.
    pub router: Arc<TagRouter>,
}

impl AppState {
    /// Create handler state.
    #[must_use]
    pub fn new(store: SharedIngestStore, router: TagRouter) -> Self {
        Self {
            store,
            router: Arc::new(router),
        }
    }
}

/// Body returned by `POST /data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    /// `"success"` or `"error"`.
    pub status: String,
    /// Reason for an error response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IngestResponse {
    /// Acknowledgment for a decodable batch.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    /// Rejection with a reason.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/data", post(receive_data))
        .route("/data-snapshot", get(get_snapshot))
        .route("/get_data", get(get_snapshot))
        .route("/health", get(health_check))
        .with_state(state)
}

/// The body is read raw so producers that omit `Content-Type` are accepted.
async fn receive_data(State(state): State<AppState>, body: Bytes) -> Response {
    match ingest_batch(&state.store, &state.router, &body) {
        Ok(_) => (StatusCode::OK, Json(IngestResponse::success())).into_response(),
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Rejecting telemetry batch");
            (
                StatusCode::BAD_REQUEST,
                Json(IngestResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn get_snapshot(State(state): State<AppState>) -> Json<SnapshotPayload> {
    Json(state.store.snapshot())
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (motion, audio) = state.store.lens();
    Json(serde_json::json!({
        "status": "ok",
        "motion_samples": motion,
        "audio_samples": audio,
    }))
}
