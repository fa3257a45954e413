//! Keyword matching over timed transcript segments.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::transcription::TimedSegment;

/// Time span of a segment whose text contains the keyword
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: f64,
    pub end: f64,
}

/// Return the span of every segment whose text contains `keyword`.
///
/// Matching is a case-insensitive substring test with no word boundaries, so
/// "guard" also matches "guarded". Order is preserved and adjacent matches
/// are not merged.
pub fn find_matches(segments: &[TimedSegment], keyword: &str) -> Result<Vec<MatchSpan>> {
    if keyword.trim().is_empty() {
        return Err(PipelineError::InvalidInput("keyword must not be empty".to_string()));
    }

    let needle = keyword.to_lowercase();
    let matches: Vec<MatchSpan> = segments
        .iter()
        .filter(|segment| segment.text.to_lowercase().contains(&needle))
        .map(|segment| MatchSpan {
            start: segment.start,
            end: segment.end,
        })
        .collect();

    debug!("Keyword {:?} matched {} of {} segments", keyword, matches.len(), segments.len());
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<TimedSegment> {
        vec![
            TimedSegment::new(0.0, 2.0, "Hello World"),
            TimedSegment::new(2.0, 4.0, "nothing to see"),
            TimedSegment::new(4.0, 6.0, "say HELLO again"),
            TimedSegment::new(6.0, 8.0, "othello is a play"),
        ]
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let matches = find_matches(&segments()[..1], "hello").unwrap();
        assert_eq!(matches, vec![MatchSpan { start: 0.0, end: 2.0 }]);
    }

    #[test]
    fn test_substring_inside_longer_word_matches() {
        let matches = find_matches(&segments(), "hello").unwrap();
        let starts: Vec<f64> = matches.iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0.0, 4.0, 6.0]);
    }

    #[test]
    fn test_adjacent_matches_are_kept() {
        let segments = vec![
            TimedSegment::new(0.0, 1.0, "armbar"),
            TimedSegment::new(1.0, 2.0, "another armbar"),
        ];
        assert_eq!(find_matches(&segments, "armbar").unwrap().len(), 2);
    }

    #[test]
    fn test_no_matches_is_empty() {
        assert!(find_matches(&segments(), "triangle").unwrap().is_empty());
    }

    #[test]
    fn test_empty_keyword_is_rejected() {
        assert!(matches!(find_matches(&segments(), ""), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(find_matches(&segments(), "   "), Err(PipelineError::InvalidInput(_))));
    }
}
