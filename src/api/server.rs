//! HTTP server implementation for the API

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use std::sync::Arc;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeFile,
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::models::{ApiResponse, CancelResponse, ClipForm, RunRequest};
use super::{handlers, pages};
use crate::error::PipelineError;
use crate::pipeline::ClipPipeline;
use crate::state::RunTracker;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ClipPipeline>,
    pub tracker: RunTracker,
}

impl AppState {
    pub fn new(pipeline: Arc<ClipPipeline>, tracker: RunTracker) -> Self {
        Self { pipeline, tracker }
    }

    fn default_duration(&self) -> u32 {
        self.pipeline.config().clips.default_duration_seconds
    }
}

/// Build the application with routes
pub fn router(app_state: AppState) -> Router {
    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Browser front end
        .route("/", get(form_handler).post(submit_form_handler))
        .route("/download", get(downloads_handler))
        .route("/files/:run_id/:name", get(download_file_handler))

        .route("/health", get(health_handler))

        // JSON API
        .route("/api/runs", get(list_runs_handler).post(create_run_handler))
        .route("/api/runs/cancel", post(cancel_run_handler))
        .route("/api/status", get(status_handler))

        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(app_state: AppState, host: &str, port: u16) -> Result<()> {
    let app = router(app_state);

    let address = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("🌐 Keyword Clipper listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP status for a pipeline error
pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::Busy | PipelineError::Cancelled { .. } => StatusCode::CONFLICT,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: PipelineError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!("Request failed: {}", error);
    }
    (status, Json(ApiResponse::<()>::error(error.to_string()))).into_response()
}

async fn form_handler(State(state): State<AppState>) -> Html<String> {
    Html(pages::form_page(None, &ClipForm::default(), state.default_duration()))
}

/// Run the pipeline for a form submission, then send the browser to the
/// listing. On failure the form comes back with the message and the
/// submitted values.
async fn submit_form_handler(State(state): State<AppState>, Form(form): Form<ClipForm>) -> Response {
    let result = match form.into_job(state.default_duration()) {
        Ok(job) => handlers::start_run(&state, job).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Redirect::to("/download").into_response(),
        Err(e) => {
            let page = pages::form_page(Some(&e.to_string()), &form, state.default_duration());
            (status_for(&e), Html(page)).into_response()
        }
    }
}

async fn downloads_handler(State(state): State<AppState>) -> Html<String> {
    Html(pages::downloads_page(&handlers::list_runs(&state)))
}

/// Stream a clip back as an attachment. The path comes only from
/// [`OutputLibrary::resolve`](crate::outputs::OutputLibrary::resolve).
async fn download_file_handler(
    State(state): State<AppState>,
    Path((run_id, name)): Path<(String, String)>,
    request: Request,
) -> Response {
    let path = match handlers::resolve_clip(&state, &run_id, &name) {
        Ok(path) => path,
        Err(e) => {
            let status = status_for(&e);
            return (status, [(header::CONTENT_TYPE, "text/plain")], e.to_string()).into_response();
        }
    };

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new).into_response();
    if response.status().is_success() {
        match HeaderValue::from_str(&handlers::attachment_disposition(&name)) {
            Ok(value) => {
                response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
            }
            Err(e) => warn!("Unusable download name {:?}: {}", name, e),
        }
    }
    response
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check(&state).await))
}

async fn create_run_handler(State(state): State<AppState>, Json(request): Json<RunRequest>) -> Response {
    let job = match request.into_job(state.default_duration()) {
        Ok(job) => job,
        Err(e) => return error_response(e),
    };

    match handlers::start_run(&state, job).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_runs_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(handlers::list_runs(&state)))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(handlers::run_status(&state)))
}

async fn cancel_run_handler(State(state): State<AppState>) -> impl IntoResponse {
    let cancel_requested = handlers::cancel_run(&state);
    Json(ApiResponse::success(CancelResponse { cancel_requested }))
}
