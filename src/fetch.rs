//! Video acquisition through yt-dlp.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::FetchConfig;

/// Local copy of a fetched source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedMedia {
    pub path: PathBuf,
    pub title: String,
}

/// Resolves a source locator to a local media file
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `locator` into `dest_dir`
    async fn fetch(&self, locator: &str, dest_dir: &Path) -> Result<FetchedMedia>;
}

/// Fetcher backed by the yt-dlp command-line tool
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    config: FetchConfig,
}

/// Name of the downloaded file inside the run workspace
const MEDIA_FILE: &str = "source.mp4";

impl YtDlpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, locator: &str, output: &Path) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-f").arg(&self.config.format)
            .arg("--merge-output-format").arg("mp4")
            .arg("-o").arg(output)
            .arg("--dump-json") // Info JSON on stdout, for the title
            .arg("--no-simulate")
            .arg("--no-warnings")
            .arg("--no-progress");

        if self.config.no_playlist {
            cmd.arg("--no-playlist");
        }

        if let Some(user_agent) = &self.config.user_agent {
            cmd.arg("--user-agent").arg(user_agent);
        }

        cmd.arg("--").arg(locator);
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, locator: &str, dest_dir: &Path) -> Result<FetchedMedia> {
        let output_path = dest_dir.join(MEDIA_FILE);

        info!("📥 Downloading {}", locator);
        let mut cmd = self.build_command(locator, &output_path);
        debug!("Executing command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.config.binary,
                output.status,
                stderr.trim()
            ));
        }

        if !output_path.exists() {
            return Err(anyhow!("download produced no media file for {}", locator));
        }

        let title = parse_title(&String::from_utf8_lossy(&output.stdout))
            .unwrap_or_else(|| locator.to_string());

        info!("✅ Downloaded: {}", title);
        Ok(FetchedMedia {
            path: output_path,
            title,
        })
    }
}

/// Pull the title out of yt-dlp's info JSON (first JSON line on stdout)
fn parse_title(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter(|line| line.trim_start().starts_with('{'))
        .find_map(|line| {
            let info: serde_json::Value = serde_json::from_str(line).ok()?;
            info["title"].as_str().map(str::to_string)
        })
}
