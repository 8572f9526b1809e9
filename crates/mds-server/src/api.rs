//! HTTP API: submit a download, poll its progress, fetch the finished file.


use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use url::Url;

use mds_core::deliver::{self, DeliverError};
use mds_core::fetch::FetchEngine;
use mds_core::job::{DownloadRequest, JobId, JobStatus, JobStore, MediaKind};
use mds_core::runner::{self, RunnerSettings};

/// Shared handler state; cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub engine: Arc<dyn FetchEngine>,
    pub settings: Arc<RunnerSettings>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/download", post(submit))
        .route("/api/progress/{id}", get(progress))
        .route("/api/file/{id}", get(file))
        .route("/api/default-folder", get(default_folder))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn home() -> impl IntoResponse {
    Json(json!({ "message": "Server is running. Use POST /api/download" }))
}

async fn default_folder(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "folder": state.settings.download_dir.display().to_string() }))
}

/// Resolution may arrive as a JSON number or a string ("720").
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Resolution {
    Number(u32),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    resolution: Option<Resolution>,
    filename: Option<String>,
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Admission: validate the input, allocate a job, spawn its runner task,
/// and return the id without waiting for the fetch.
async fn submit(State(state): State<AppState>, Json(body): Json<SubmitRequest>) -> Response {
    let url = match body.url.as_deref().filter(|u| !u.is_empty()) {
        Some(u) => u,
        None => return bad_request("Missing URL"),
    };
    if Url::parse(url).is_err() {
        return bad_request("Invalid URL");
    }

    let kind = match body.kind.as_deref() {
        Some("audio") => MediaKind::Audio,
        Some("video") => MediaKind::Video,
        Some(_) => return bad_request("Invalid type"),
        None => return bad_request("Missing type"),
    };

    let resolution = match body.resolution {
        None => None,
        Some(Resolution::Number(h)) => Some(h),
        Some(Resolution::Text(s)) => match s.trim().parse::<u32>() {
            Ok(h) => Some(h),
            Err(_) => return bad_request("Invalid resolution"),
        },
    };

    let request = DownloadRequest {
        url: url.to_string(),
        kind,
        resolution,
        filename: body.filename,
    };

    let id = state.store.allocate(request);
    tracing::info!(job = %id, url, "download accepted");
    // The task is tracked only through the store; the handle is dropped.
    let _ = runner::spawn(
        Arc::clone(&state.store),
        Arc::clone(&state.engine),
        state.settings.as_ref().clone(),
        id,
    );

    (StatusCode::OK, Json(json!({ "success": true, "id": id }))).into_response()
}

#[derive(Debug, Serialize)]
struct ProgressResponse {
    status: &'static str,
    progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Starting => "starting",
        JobStatus::Downloading => "downloading",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Error => "error",
    }
}

/// Polling: unknown ids get a default "unknown" body, not an error code.
async fn progress(State(state): State<AppState>, Path(id): Path<String>) -> Json<ProgressResponse> {
    let snapshot = JobId::parse(&id).and_then(|id| state.store.get(id));
    let response = match snapshot {
        Some(snap) => ProgressResponse {
            status: status_label(snap.status),
            progress: snap.progress,
            error: snap.error,
        },
        None => ProgressResponse {
            status: "unknown",
            progress: 0.0,
            error: None,
        },
    };
    Json(response)
}

fn content_type_for(display_name: &str) -> &'static str {
    if display_name.ends_with(".mp3") {
        "audio/mpeg"
    } else {
        "video/mp4"
    }
}

/// One-shot file retrieval through the delivery gate.
async fn file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(id) = JobId::parse(&id) else {
        return bad_request("Unknown job");
    };

    match deliver::claim(&state.store, id).await {
        Ok(delivery) => {
            let headers = [
                (header::CONTENT_TYPE, content_type_for(&delivery.display_name).to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", delivery.display_name),
                ),
                (header::CONTENT_LENGTH, delivery.len.to_string()),
            ];
            let body = Body::from_stream(ReaderStream::new(delivery.file));
            (headers, body).into_response()
        }
        Err(DeliverError::NotFound) => bad_request("Unknown job"),
        Err(DeliverError::NotReady) => bad_request("Download not completed"),
        Err(DeliverError::Gone) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "File missing on disk" })),
        )
            .into_response(),
    }
}
