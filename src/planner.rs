use serde::{Deserialize, Serialize};

use crate::selection::ClipWindow;

/// One clip to cut, consumed exactly once by the transcoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    pub window: ClipWindow,
    /// 1-based ordinal within the run
    pub index: usize,
    pub burn_subtitles: bool,
    pub output_name: String,
}

/// Turn selected windows into numbered requests named `clip_<n>.<extension>`
pub fn plan_clips(windows: &[ClipWindow], burn_subtitles: bool, extension: &str) -> Vec<ClipRequest> {
    windows
        .iter()
        .enumerate()
        .map(|(i, window)| ClipRequest {
            window: *window,
            index: i + 1,
            burn_subtitles,
            output_name: format!("clip_{}.{}", i + 1, extension),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan() {
        assert!(plan_clips(&[], true, "mp4").is_empty());
    }

    #[test]
    fn test_requests_are_numbered_in_order() {
        let windows = vec![
            ClipWindow { start: 0.0, end: 90.0 },
            ClipWindow { start: 95.0, end: 185.0 },
            ClipWindow { start: 200.0, end: 250.0 },
        ];

        let requests = plan_clips(&windows, false, "mp4");

        assert_eq!(requests.len(), 3);
        for (i, request) in requests.iter().enumerate() {
            assert_eq!(request.index, i + 1);
            assert_eq!(request.window, windows[i]);
            assert_eq!(request.output_name, format!("clip_{}.mp4", i + 1));
            assert!(!request.burn_subtitles);
        }
    }

    #[test]
    fn test_subtitle_flag_and_extension_propagate() {
        let requests = plan_clips(&[ClipWindow { start: 1.0, end: 2.0 }], true, "mkv");
        assert!(requests[0].burn_subtitles);
        assert_eq!(requests[0].output_name, "clip_1.mkv");
    }
}
