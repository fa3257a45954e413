use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

use super::TimedSegment;
use crate::error::Result;

/// SRT (SubRip Subtitle) cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrtCue {
    /// Sequential number, starting at 1
    pub index: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Cue text
    pub text: String,
}

impl SrtCue {
    pub fn new(index: usize, start: f64, end: f64, text: &str) -> Self {
        Self {
            index,
            start,
            end,
            text: text.trim().to_string(),
        }
    }
}

impl fmt::Display for SrtCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Captions document built from a transcript, one cue per segment in input order
#[derive(Debug, Clone, Default)]
pub struct SrtDocument {
    cues: Vec<SrtCue>,
}

impl SrtDocument {
    pub fn from_segments(segments: &[TimedSegment]) -> Self {
        let cues = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| SrtCue::new(i + 1, segment.start, segment.end, &segment.text))
            .collect();

        Self { cues }
    }

    /// Render the document: numbered cues separated by blank lines
    pub fn render(&self) -> String {
        let mut content = String::new();

        for cue in &self.cues {
            content.push_str(&cue.to_string());
            content.push('\n');
        }

        content
    }

    /// Save the rendered document as UTF-8
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tokio::fs::write(path.as_ref(), self.render()).await?;
        info!("💾 Captions saved: {} ({} cues)", path.as_ref().display(), self.cues.len());
        Ok(())
    }

    pub fn cues(&self) -> &[SrtCue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// Format fractional seconds as an SRT timestamp (HH:MM:SS,mmm).
///
/// The value is rounded to the microsecond first and then truncated to the
/// millisecond, so `1.001` renders as `,001` and not `,000`. Hours are not
/// wrapped: 100 hours renders as `100:00:00,000`. Negative and non-finite
/// input renders as zero.
pub fn format_timestamp(seconds: f64) -> String {
    let micros = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1_000_000.0).round() as u64
    } else {
        0
    };

    let total_millis = micros / 1000;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
