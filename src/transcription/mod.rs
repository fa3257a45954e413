pub mod whisper;
pub mod srt;

pub use whisper::WhisperTranscriber;
pub use srt::{format_timestamp, SrtCue, SrtDocument};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// A unit of transcribed speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text
    pub text: String,
}

impl TimedSegment {
    pub fn new(start: f64, end: f64, text: &str) -> Self {
        Self {
            start,
            end,
            text: text.to_string(),
        }
    }
}

/// Speech-to-text backend.
///
/// Implementations must return segments in chronological order; the
/// pipeline still re-sorts through [`ensure_chronological`] if they don't.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> anyhow::Result<Vec<TimedSegment>>;
}

/// Stable-sort segments by start time when they arrive out of order
pub fn ensure_chronological(mut segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    let ordered = segments.windows(2).all(|pair| pair[0].start <= pair[1].start);

    if !ordered {
        warn!("⚠️  Transcript segments were out of order, sorting by start time");
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    segments
}
