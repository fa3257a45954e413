//! Error taxonomy for a clip run.

use crate::state::RunStage;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error types for pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fetching failed: {0}")]
    Acquisition(String),

    #[error("Duration probe failed: {0}")]
    Probe(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Cutting clip {index} failed: {message}")]
    Transcode { index: usize, message: String },

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: RunStage, seconds: u64 },

    #[error("Run cancelled at {stage}")]
    Cancelled { stage: RunStage },

    #[error("Another run is already in progress")]
    Busy,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
