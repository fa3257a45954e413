use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{ClipConfig, TranscodeConfig};
use crate::selection::ClipWindow;

/// Media probing and cutting backend
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Container duration in seconds
    async fn probe_duration(&self, media_path: &Path) -> Result<f64>;

    /// Cut `window` out of `media_path` into `output_path`, burning in
    /// `subtitles` when given
    async fn cut(
        &self,
        media_path: &Path,
        window: &ClipWindow,
        subtitles: Option<&Path>,
        output_path: &Path,
    ) -> Result<PathBuf>;
}

/// Transcoder using the ffprobe / ffmpeg command-line tools
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    tools: TranscodeConfig,
    clips: ClipConfig,
}

impl FfmpegTranscoder {
    pub fn new(tools: TranscodeConfig, clips: ClipConfig) -> Self {
        Self { tools, clips }
    }

    fn build_cut_command(
        &self,
        media_path: &Path,
        window: &ClipWindow,
        subtitles: Option<&Path>,
        output_path: &Path,
    ) -> Command {
        let mut cmd = Command::new(&self.tools.ffmpeg_binary);
        // Seek after -i so filter timestamps stay aligned with the source,
        // which the subtitles filter relies on
        cmd.arg("-y")
            .arg("-i").arg(media_path)
            .arg("-ss").arg(format!("{:.3}", window.start))
            .arg("-to").arg(format!("{:.3}", window.end));

        if let Some(subtitles) = subtitles {
            cmd.arg("-vf").arg(subtitles_filter(subtitles));
        }

        if let Some(video_codec) = &self.clips.video_codec {
            cmd.arg("-c:v").arg(video_codec);
        }

        cmd.arg("-c:a").arg(&self.clips.audio_codec)
            .args(["-loglevel", "error"])
            .arg(output_path);
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe_duration(&self, media_path: &Path) -> Result<f64> {
        let output = Command::new(&self.tools.ffprobe_binary)
            .args(["-v", "quiet", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(media_path)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.tools.ffprobe_binary))?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", media_path.display()));
        }

        let duration = parse_duration_output(&String::from_utf8_lossy(&output.stdout))?;
        info!("📹 Probed {}: {:.1}s", media_path.display(), duration);
        Ok(duration)
    }

    async fn cut(
        &self,
        media_path: &Path,
        window: &ClipWindow,
        subtitles: Option<&Path>,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let mut cmd = self.build_cut_command(media_path, window, subtitles, output_path);
        debug!("Executing command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.tools.ffmpeg_binary))?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        info!("✂️ Cut {:.1}s-{:.1}s -> {}", window.start, window.end, output_path.display());
        Ok(output_path.to_path_buf())
    }
}

/// Parse ffprobe's `format=duration` CSV output
pub fn parse_duration_output(stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    let duration: f64 = value
        .parse()
        .map_err(|_| anyhow!("unparseable duration {:?}", value))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(anyhow!("invalid duration {}", duration));
    }

    Ok(duration)
}

/// Build the `subtitles` filter for a captions file.
///
/// The path is escaped twice: once as a filter option value and once for the
/// filtergraph.
pub fn subtitles_filter(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let option_level = escape_chars(&raw, &['\\', '\'', ':']);
    let graph_level = escape_chars(&option_level, &['\\', '\'', '[', ']', ',', ';']);
    format!("subtitles={}", graph_level)
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
