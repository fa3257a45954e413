//! Keyword Clipper - Rust Implementation
//!
//! Fetches a video and transcribes it with Whisper. Every segment that
//! mentions a keyword becomes a non-overlapping clip, optionally with
//! burned-in subtitles.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod fetch;
pub mod matcher;
pub mod outputs;
pub mod pipeline;
pub mod planner;
pub mod selection;
pub mod state;
pub mod transcription;
pub mod video;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{PipelineError, Result};
pub use crate::matcher::{find_matches, MatchSpan};
pub use crate::outputs::{OutputLibrary, RunListing};
pub use crate::pipeline::{ClipJob, ClipPipeline, Collaborators, RunReport};
pub use crate::planner::{plan_clips, ClipRequest};
pub use crate::selection::{select_windows, ClipWindow};
pub use crate::state::{RunGuard, RunId, RunManifest, RunOutcome, RunStage, RunTracker};
pub use crate::transcription::{format_timestamp, SrtDocument, TimedSegment, Transcriber};
