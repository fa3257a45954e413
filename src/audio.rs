use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::AudioConfig;

/// Produces a transcription-ready audio track from a media file
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract_audio(&self, media_path: &Path, output_path: &Path) -> Result<PathBuf>;
}

/// Audio extractor using the ffmpeg command line
#[derive(Debug, Clone)]
pub struct FfmpegAudioExtractor {
    config: AudioConfig,
}

impl FfmpegAudioExtractor {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn build_command(&self, media_path: &Path, output_path: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.config.ffmpeg_binary);
        cmd.arg("-i").arg(media_path)
            .args(["-vn"]) // No video stream
            .args(["-acodec", "pcm_s16le"]) // 16-bit PCM
            .arg("-ar").arg(self.config.sample_rate.to_string())
            .arg("-ac").arg(self.config.channels.to_string())
            .args(["-loglevel", "error"])
            .arg("-y")
            .arg(output_path);
        cmd.kill_on_drop(true);
        cmd
    }
}

impl Default for FfmpegAudioExtractor {
    fn default() -> Self {
        Self::new(AudioConfig::default())
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract_audio(&self, media_path: &Path, output_path: &Path) -> Result<PathBuf> {
        info!("🎵 Extracting audio for transcription: {}", media_path.display());

        let mut cmd = self.build_command(media_path, output_path);
        debug!("Executing command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.ffmpeg_binary))?;

        if !output.status.success() {
            return Err(anyhow!(
                "Audio extraction failed for {}: {}",
                media_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        info!("✅ Audio extracted: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }
}
