// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers and router for the slide conversion service.
//!
//! Every route sits behind the request gate; the access log wraps the gate
//! so that rejected requests pass through the same log filter.

use crate::access_log::{access_log_middleware, AccessLogFilter};
use crate::admission::AdmissionController;
use crate::classifier::SuspiciousPathSet;
use crate::config::Config;
use crate::convert::{accepted_extension, sanitize_filename, ConvertError, SlideRenderer};
use crate::error::{fallback, not_found, AppError};
use crate::gate::{gate_middleware, RequestGate};
use crate::metrics::Metrics;
use crate::retention::ArtifactRetentionScheduler;
use crate::workspace::{Workspace, WorkspaceManager};
use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    handler::HandlerWithoutStateExt,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

/// Route prefix the public directory is served under.
pub const STATIC_PREFIX: &str = "/static";

/// Shared application state.
pub struct AppState {
    pub gate: RequestGate,
    pub access_log: AccessLogFilter,
    pub workspaces: WorkspaceManager,
    pub retention: ArtifactRetentionScheduler,
    pub renderer: Arc<dyn SlideRenderer>,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, renderer: Arc<dyn SlideRenderer>) -> prometheus::Result<Self> {
        let metrics = Metrics::new()?;
        let suspicious = SuspiciousPathSet::default();

        Ok(Self {
            gate: RequestGate::new(
                AdmissionController::new(config.admission.clone()),
                suspicious.clone(),
            ),
            access_log: AccessLogFilter::new(suspicious),
            workspaces: WorkspaceManager::new(&config.storage.work_dir),
            retention: ArtifactRetentionScheduler::new(&config.storage.static_dir, STATIC_PREFIX)
                .with_eviction_counter(metrics.artifacts_evicted.clone()),
            renderer,
            metrics,
            config,
        })
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.storage.static_dir)
        .not_found_service(fallback.into_service());

    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/convert/pptx-to-jpeg/", post(convert))
        .nest_service(STATIC_PREFIX, static_files);

    if state.config.debug_endpoints {
        app = app
            .route("/debug/static", get(debug_static))
            .route("/debug/static/:filename", get(debug_static_file));
    }
    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.fallback(fallback)
        .layer(DefaultBodyLimit::max(state.config.conversion.max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), gate_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access_log_middleware,
        ))
        .layer(TraceLayer::new_for_http().on_request(()).on_response(()))
        .with_state(state)
}

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// One converted slide.
#[derive(Debug, Serialize)]
pub struct Slide {
    pub slide_number: usize,
    pub image_url: String,
}

/// Successful conversion response.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub status: &'static str,
    pub message: String,
    pub slide_count: usize,
    pub slides: Vec<Slide>,
    pub original_filename: String,
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct StaticDirResponse {
    pub static_dir_path: String,
    pub static_dir_exists: bool,
    pub static_dir_is_directory: bool,
    pub files_count: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StaticFileResponse {
    pub filename: String,
    pub exists: bool,
    pub is_file: bool,
    pub size: u64,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Slide conversion service is running",
        status: "healthy",
    })
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Convert an uploaded deck into one public JPEG per slide.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, AppError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        return convert_upload(&state, &mut field).await.map(Json);
    }
    Err(AppError::BadRequest("No file uploaded."))
}

/// The workspace is released on every exit from this function, by `Drop` if
/// the request is cancelled. Published images are evicted after the
/// retention window regardless of what the client does next.
async fn convert_upload(
    state: &AppState,
    field: &mut Field<'_>,
) -> Result<ConvertResponse, AppError> {
    let original_filename = match field.file_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(AppError::BadRequest("No file uploaded.")),
    };
    if accepted_extension(&original_filename).is_none() {
        return Err(AppError::BadRequest("Only PPTX or PPT files are supported."));
    }

    let mut workspace = state.workspaces.acquire().await?;
    let result = convert_in(state, &workspace, field, &original_filename).await;
    workspace.release().await;

    let urls = result?;
    let ttl = state.config.storage.retention();

    let slide_count = urls.len();
    info!(
        original_filename = %original_filename,
        slide_count,
        "Conversion completed"
    );

    Ok(ConvertResponse {
        status: "success",
        message: format!("Successfully converted {} slides", slide_count),
        slide_count,
        slides: urls
            .into_iter()
            .enumerate()
            .map(|(i, image_url)| Slide {
                slide_number: i + 1,
                image_url,
            })
            .collect(),
        original_filename,
        note: format!(
            "Images will be automatically cleaned up after {} seconds",
            ttl.as_secs()
        ),
    })
}

/// Store the upload, render it and publish the images. Returns public URLs.
async fn convert_in(
    state: &AppState,
    workspace: &Workspace,
    field: &mut Field<'_>,
    original_filename: &str,
) -> Result<Vec<String>, AppError> {
    let input = workspace.join(sanitize_filename(original_filename));
    let mut file = tokio::fs::File::create(&input).await?;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    let images = match render(state.renderer.as_ref(), &input, workspace.path()).await {
        Ok(images) => images,
        Err(err) => {
            state.metrics.conversions_failed.inc();
            warn!(workspace = %workspace.id(), error = %err, "Conversion failed");
            return Err(err.into());
        }
    };

    let published = state
        .retention
        .publish(&images, state.config.storage.retention())
        .await?;
    state
        .metrics
        .artifacts_published
        .inc_by(published.urls.len() as u64);
    Ok(published.urls)
}

async fn render(
    renderer: &dyn SlideRenderer,
    input: &std::path::Path,
    out_dir: &std::path::Path,
) -> Result<Vec<PathBuf>, ConvertError> {
    let document = renderer.render_to_document(input, out_dir).await?;
    renderer.render_to_images(&document, out_dir).await
}

/// List the public directory (first ten names).
pub async fn debug_static(State(state): State<Arc<AppState>>) -> Json<StaticDirResponse> {
    let dir = state.retention.public_dir();
    let metadata = tokio::fs::metadata(dir).await.ok();
    let is_dir = metadata.as_ref().map_or(false, |m| m.is_dir());

    let mut files = Vec::new();
    if is_dir {
        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.file_type().await.map_or(false, |t| t.is_file()) {
                    files.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
        }
    }
    files.sort();
    let files_count = files.len();
    files.truncate(10);

    Json(StaticDirResponse {
        static_dir_path: dir.display().to_string(),
        static_dir_exists: metadata.is_some(),
        static_dir_is_directory: is_dir,
        files_count,
        files,
    })
}

/// Report whether one published file exists.
pub async fn debug_static_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    if filename.contains('/') || filename.contains('\\') || filename.starts_with('.') {
        return not_found();
    }
    let metadata = tokio::fs::metadata(state.retention.public_dir().join(&filename))
        .await
        .ok();
    let is_file = metadata.as_ref().map_or(false, |m| m.is_file());

    Json(StaticFileResponse {
        filename,
        exists: metadata.is_some(),
        is_file,
        size: metadata.filter(|m| m.is_file()).map_or(0, |m| m.len()),
    })
    .into_response()
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
