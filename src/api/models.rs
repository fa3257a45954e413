//! API data models

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pipeline::ClipJob;
use crate::state::RunSnapshot;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// JSON body of `POST /api/runs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub source: String,
    pub keyword: String,
    #[serde(default)]
    pub subtitles: bool,
    pub duration: Option<u32>,
}

impl RunRequest {
    pub fn into_job(self, default_duration: u32) -> Result<ClipJob> {
        ClipJob::new(
            &self.source,
            &self.keyword,
            self.subtitles,
            self.duration.unwrap_or(default_duration),
        )
    }
}

/// Fields of the HTML form. Everything arrives as text; an unchecked
/// checkbox is simply absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipForm {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub keyword: String,
    pub subtitles: Option<String>,
    pub duration: Option<String>,
}

impl ClipForm {
    pub fn burn_subtitles(&self) -> bool {
        matches!(self.subtitles.as_deref(), Some("on" | "true" | "1" | "yes"))
    }

    pub fn into_job(&self, default_duration: u32) -> Result<ClipJob> {
        let duration = match self.duration.as_deref().map(str::trim) {
            None | Some("") => default_duration,
            Some(value) => value.parse().map_err(|_| {
                PipelineError::InvalidInput(format!("duration must be a whole number of seconds, got {:?}", value))
            })?,
        };

        ClipJob::new(&self.source, &self.keyword, self.burn_subtitles(), duration)
    }
}

/// Body of `GET /api/status`
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub busy: bool,
    pub active: Option<RunSnapshot>,
    pub last: Option<RunSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancel_requested: bool,
}
