//! Greedy selection of non-overlapping clip windows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::matcher::MatchSpan;

/// Half-open interval `[start, end)` of source media to extract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub start: f64,
    pub end: f64,
}

impl ClipWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Reduce match spans to chronologically ordered clip windows.
///
/// Each accepted match opens an exclusion zone of exactly `clip_duration`
/// seconds from its start; later matches starting inside it (inclusive of
/// the boundary) are skipped. The zone uses the unclamped end even when the
/// window itself is clamped to `media_duration`. Negative starts are ignored
/// without touching the zone, and candidates that would be empty after
/// clamping are dropped the same way.
pub fn select_windows(
    matches: &[MatchSpan],
    clip_duration: f64,
    media_duration: f64,
) -> Result<Vec<ClipWindow>> {
    if !clip_duration.is_finite() || clip_duration <= 0.0 {
        return Err(PipelineError::InvalidInput(format!(
            "clip duration must be positive, got {}",
            clip_duration
        )));
    }
    if !media_duration.is_finite() || media_duration < 0.0 {
        return Err(PipelineError::InvalidInput(format!(
            "media duration must be non-negative, got {}",
            media_duration
        )));
    }

    let mut windows = Vec::new();
    let mut exclusion_end: Option<f64> = None;

    for span in matches {
        let start = span.start;

        if !start.is_finite() || start < 0.0 {
            continue;
        }
        if exclusion_end.map_or(false, |boundary| start <= boundary) {
            continue;
        }

        let planned_end = start + clip_duration;
        let end = planned_end.min(media_duration);
        if start >= end {
            debug!("Dropping empty window at {:.3}s (media ends at {:.3}s)", start, media_duration);
            continue;
        }

        windows.push(ClipWindow { start, end });
        exclusion_end = Some(planned_end);
    }

    debug!("Selected {} windows from {} matches", windows.len(), matches.len());
    Ok(windows)
}
