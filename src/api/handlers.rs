//! API request handlers

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::models::StatusResponse;
use super::server::AppState;
use crate::error::{PipelineError, Result};
use crate::outputs::RunListing;
use crate::pipeline::{ClipJob, RunReport};

/// Handle health check requests
pub async fn health_check(state: &AppState) -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "keyword-clipper",
        "version": env!("CARGO_PKG_VERSION"),
        "busy": state.tracker.is_busy(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Claim the run slot and execute `job` to completion.
///
/// The run is driven on its own task so a client that disconnects midway
/// does not abandon it.
pub async fn start_run(state: &AppState, job: ClipJob) -> Result<RunReport> {
    let guard = state.tracker.begin()?;
    info!("📥 Accepted run {} for keyword {:?}", guard.id(), job.keyword);

    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move { pipeline.run(&job, &guard).await })
        .await
        .map_err(|e| PipelineError::Internal(format!("run task ended abnormally: {}", e)))?
}

pub fn list_runs(state: &AppState) -> Vec<RunListing> {
    state.pipeline.library().list()
}

pub fn run_status(state: &AppState) -> StatusResponse {
    let status = state.tracker.status();
    StatusResponse {
        busy: status.active.is_some(),
        active: status.active,
        last: status.last,
    }
}

pub fn cancel_run(state: &AppState) -> bool {
    state.tracker.cancel()
}

/// Locate a downloadable clip
pub fn resolve_clip(state: &AppState, run_id: &str, name: &str) -> Result<PathBuf> {
    state.pipeline.library().resolve(run_id, name)
}

/// `Content-Disposition` value for downloading `name`: a quoted ASCII
/// fallback plus the exact name percent-encoded as `filename*`
pub fn attachment_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_disposition() {
        assert_eq!(
            attachment_disposition("clip_1.mp4"),
            "attachment; filename=\"clip_1.mp4\"; filename*=UTF-8''clip_1.mp4"
        );
    }

    #[test]
    fn test_disposition_escapes_quotes_and_unicode() {
        let value = attachment_disposition("say \"osoto\" é.mp4");
        assert_eq!(
            value,
            "attachment; filename=\"say _osoto_ _.mp4\"; filename*=UTF-8''say%20%22osoto%22%20%C3%A9.mp4"
        );
        assert!(axum::http::HeaderValue::from_str(&value).is_ok());
    }
}
