use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::selection::ClipWindow;

/// File name of the manifest written into every run's output directory
pub const MANIFEST_FILE: &str = "run.json";

/// Unique identifier of one pipeline run.
///
/// Ids start with a millisecond UTC timestamp, so sorting them lexically
/// sorts runs by start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S%3f"), &suffix[..8]))
    }

    /// Accept an externally supplied id (e.g. from a URL) if it is a plain token
    pub fn parse(value: &str) -> Result<Self> {
        let valid = !value.is_empty()
            && value.len() <= 64
            && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(PipelineError::InvalidInput(format!("invalid run id: {:?}", value)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stages of a clip run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Idle,
    Fetching,
    ProbingDuration,
    ExtractingAudio,
    Transcribing,
    SerializingSubtitles,
    Matching,
    SelectingWindows,
    Planning,
    Cutting,
    CleaningUp,
    Done,
    Failed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::Idle => "Idle",
            RunStage::Fetching => "Fetching",
            RunStage::ProbingDuration => "Probing duration",
            RunStage::ExtractingAudio => "Extracting audio",
            RunStage::Transcribing => "Transcribing",
            RunStage::SerializingSubtitles => "Serializing subtitles",
            RunStage::Matching => "Matching",
            RunStage::SelectingWindows => "Selecting windows",
            RunStage::Planning => "Planning",
            RunStage::Cutting => "Cutting",
            RunStage::CleaningUp => "Cleaning up",
            RunStage::Done => "Done",
            RunStage::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Done | RunStage::Failed)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Point-in-time view of a run, as reported by the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub stage: RunStage,
    pub started_at: DateTime<Utc>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub active: Option<RunSnapshot>,
    pub last: Option<RunSnapshot>,
}

#[derive(Debug)]
struct ActiveRun {
    snapshot: RunSnapshot,
    cancel: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct TrackerState {
    active: Option<ActiveRun>,
    last: Option<RunSnapshot>,
}

/// Single-flight guard and progress board for pipeline runs.
///
/// At most one run is active at a time. [`RunTracker::begin`] hands out the
/// [`RunGuard`] that the pipeline requires; the slot frees up again when the
/// guard is dropped.
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the run slot, or fail with [`PipelineError::Busy`]
    pub fn begin(&self) -> Result<RunGuard> {
        let mut state = self.state.lock();
        if state.active.is_some() {
            return Err(PipelineError::Busy);
        }

        let id = RunId::generate();
        let cancel = Arc::new(AtomicBool::new(false));
        state.active = Some(ActiveRun {
            snapshot: RunSnapshot {
                run_id: id.clone(),
                stage: RunStage::Idle,
                started_at: Utc::now(),
                error: None,
            },
            cancel: Arc::clone(&cancel),
        });

        debug!("Run slot claimed by {}", id);
        Ok(RunGuard {
            id,
            tracker: self.clone(),
            cancel,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Ask the active run to stop at its next checkpoint. Returns false when idle.
    pub fn cancel(&self) -> bool {
        match &self.state.lock().active {
            Some(active) => {
                active.cancel.store(true, Ordering::SeqCst);
                info!("🛑 Cancellation requested for run {}", active.snapshot.run_id);
                true
            }
            None => false,
        }
    }

    pub fn status(&self) -> TrackerStatus {
        let state = self.state.lock();
        TrackerStatus {
            active: state.active.as_ref().map(|a| a.snapshot.clone()),
            last: state.last.clone(),
        }
    }

    fn update(&self, id: &RunId, apply: impl FnOnce(&mut RunSnapshot)) {
        let mut state = self.state.lock();
        if let Some(active) = state.active.as_mut() {
            if &active.snapshot.run_id == id {
                apply(&mut active.snapshot);
            }
        }
    }

    fn current_stage(&self, id: &RunId) -> RunStage {
        let state = self.state.lock();
        state
            .active
            .as_ref()
            .filter(|a| &a.snapshot.run_id == id)
            .map_or(RunStage::Idle, |a| a.snapshot.stage)
    }

    fn release(&self, id: &RunId) {
        let mut state = self.state.lock();
        let owned = state.active.as_ref().map_or(false, |a| &a.snapshot.run_id == id);
        if owned {
            let finished = state.active.take();
            state.last = finished.map(|a| a.snapshot);
            debug!("Run slot released by {}", id);
        }
    }
}

/// Proof that the caller holds the run slot; required to execute a run
#[derive(Debug)]
pub struct RunGuard {
    id: RunId,
    tracker: RunTracker,
    cancel: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn stage(&self) -> RunStage {
        self.tracker.current_stage(&self.id)
    }

    /// Record a stage transition
    pub fn enter(&self, stage: RunStage) {
        info!("▶️  [{}] {}", self.id, stage);
        self.tracker.update(&self.id, |snapshot| snapshot.stage = stage);
    }

    /// Record the terminal failure of the run
    pub fn fail(&self, error: &PipelineError) {
        warn!("❌ [{}] Failed: {}", self.id, error);
        let message = error.to_string();
        self.tracker.update(&self.id, |snapshot| {
            snapshot.stage = RunStage::Failed;
            snapshot.error = Some(message);
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Cooperative cancellation point between stages
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled { stage: self.stage() });
        }
        Ok(())
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.tracker.release(&self.id);
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Running,
    Completed,
    Failed { stage: Option<RunStage>, message: String },
}

/// Persistent record of a run, stored next to its clips.
///
/// A failed run's clips stay on disk; this manifest is what tells them apart
/// from a complete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub source: String,
    pub keyword: String,
    pub title: Option<String>,
    pub burn_subtitles: bool,
    pub clip_duration_seconds: u32,
    pub media_duration: Option<f64>,
    pub windows: Vec<ClipWindow>,
    pub clips: Vec<String>,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunManifest {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(dir);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        debug!("Manifest written: {}", path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}
