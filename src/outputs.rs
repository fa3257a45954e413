//! Persistent clip output area: one subdirectory per run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::state::{RunId, RunManifest, MANIFEST_FILE};

/// File extensions listed as clips
const CLIP_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "mov", "webm", "m4v"];

/// A run directory and the clips found in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunListing {
    pub run_id: String,
    pub manifest: Option<RunManifest>,
    pub clips: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OutputLibrary {
    base_dir: PathBuf,
}

impl OutputLibrary {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn run_dir(&self, id: &RunId) -> PathBuf {
        self.base_dir.join(id.as_str())
    }

    /// All runs, newest first. A missing base directory lists as empty.
    pub fn list(&self) -> Vec<RunListing> {
        if !self.base_dir.exists() {
            return Vec::new();
        }

        let mut listings: Vec<RunListing> = WalkDir::new(&self.base_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable output entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| self.describe_run(entry.path()))
            .collect();

        listings.sort_by(|a, b| b.run_id.cmp(&a.run_id));
        listings
    }

    fn describe_run(&self, dir: &Path) -> RunListing {
        let run_id = dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            match RunManifest::load(&manifest_path) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    warn!("Unreadable manifest {}: {}", manifest_path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let mut clips: Vec<String> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_clip(entry.path()))
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        clips.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));

        RunListing { run_id, manifest, clips }
    }

    /// Resolve a downloadable clip, refusing anything but plain names
    pub fn resolve(&self, run_id: &str, name: &str) -> Result<PathBuf> {
        let run_id = RunId::parse(run_id)?;

        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().map_or(false, |n| n == name);
        if !plain {
            return Err(PipelineError::InvalidInput(format!("invalid file name: {:?}", name)));
        }

        let path = self.run_dir(&run_id).join(name);
        if !path.is_file() || !is_clip(&path) {
            return Err(PipelineError::NotFound(format!("{}/{}", run_id, name)));
        }

        Ok(path)
    }
}

fn is_clip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| CLIP_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Orders `clip_2` before `clip_10`
fn natural_key(name: &str) -> (String, u64, String) {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = stem[prefix.len()..].parse().unwrap_or(0);
    (prefix.to_string(), number, name.to_string())
}
