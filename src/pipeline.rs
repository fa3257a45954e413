//! End-to-end orchestration of one clip run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::{AudioExtractor, FfmpegAudioExtractor};
use crate::config::{Config, TimeoutConfig};
use crate::error::{PipelineError, Result};
use crate::fetch::{Fetcher, YtDlpFetcher};
use crate::matcher::find_matches;
use crate::outputs::OutputLibrary;
use crate::planner::plan_clips;
use crate::selection::{select_windows, ClipWindow};
use crate::state::{RunGuard, RunId, RunManifest, RunOutcome, RunStage, RunTracker};
use crate::transcription::{ensure_chronological, SrtDocument, Transcriber, WhisperTranscriber};
use crate::video::{FfmpegTranscoder, Transcoder};

const AUDIO_FILE: &str = "audio.wav";
const CAPTIONS_FILE: &str = "captions.srt";

/// Validated run request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipJob {
    pub source: String,
    pub keyword: String,
    pub burn_subtitles: bool,
    pub clip_duration_seconds: u32,
}

impl ClipJob {
    /// Trim and check the request before any stage runs
    pub fn new(source: &str, keyword: &str, burn_subtitles: bool, clip_duration_seconds: u32) -> Result<Self> {
        let source = source.trim();
        let keyword = keyword.trim();

        if source.is_empty() {
            return Err(PipelineError::InvalidInput("a video source is required".to_string()));
        }
        if keyword.is_empty() {
            return Err(PipelineError::InvalidInput("a keyword is required".to_string()));
        }
        if clip_duration_seconds == 0 {
            return Err(PipelineError::InvalidInput("clip duration must be greater than 0".to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            keyword: keyword.to_string(),
            burn_subtitles,
            clip_duration_seconds,
        })
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub title: Option<String>,
    pub media_duration: Option<f64>,
    pub windows: Vec<ClipWindow>,
    pub output_dir: PathBuf,
    pub clips: Vec<String>,
}

/// External capabilities the pipeline drives
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub audio: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub transcoder: Arc<dyn Transcoder>,
}

impl Collaborators {
    /// Subprocess-backed collaborators: yt-dlp, ffmpeg, Whisper
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetcher: Arc::new(YtDlpFetcher::new(config.fetch.clone())),
            audio: Arc::new(FfmpegAudioExtractor::new(config.audio.clone())),
            transcriber: Arc::new(WhisperTranscriber::new(config.transcription.clone())),
            transcoder: Arc::new(FfmpegTranscoder::new(config.transcode.clone(), config.clips.clone())),
        }
    }
}

/// Transient files of one run, all inside a uniquely named directory
struct RunWorkspace {
    dir: tempfile::TempDir,
    artifacts: Vec<PathBuf>,
}

impl RunWorkspace {
    fn create(parent: &Path, id: &RunId) -> Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("keyword-clipper-{}-", id))
            .tempdir_in(parent)?;

        debug!("Run workspace: {}", dir.path().display());
        Ok(Self {
            dir,
            artifacts: Vec::new(),
        })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn track(&mut self, path: &Path) {
        if !self.artifacts.iter().any(|p| p == path) {
            self.artifacts.push(path.to_path_buf());
        }
    }

    /// Delete every tracked artifact and the workspace itself. Failures are
    /// logged and swallowed.
    async fn cleanup(self) {
        let mut removed = 0;

        for artifact in &self.artifacts {
            if !artifact.exists() {
                continue;
            }
            match tokio::fs::remove_file(artifact).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove temp file {}: {}", artifact.display(), e),
            }
        }

        let dir_path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove workspace {}: {}", dir_path.display(), e);
        }

        info!("🧹 Cleaned up {} transient files", removed);
    }
}

/// What a run has produced so far; survives a failure for the manifest
#[derive(Debug, Default)]
struct RunProgress {
    title: Option<String>,
    media_duration: Option<f64>,
    windows: Vec<ClipWindow>,
    clips: Vec<String>,
}

/// Keyword clip pipeline.
///
/// Stages run strictly one after another. Every collaborator call is bounded
/// by its configured timeout, and cancellation is checked between stages and
/// before each cut. Transient files live in a per-run workspace that is
/// removed on every exit path; clips go to `<output>/<run_id>/` together with
/// a `run.json` manifest.
pub struct ClipPipeline {
    config: Config,
    collaborators: Collaborators,
    library: OutputLibrary,
}

impl ClipPipeline {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let library = OutputLibrary::new(config.output.base_dir.clone());
        Self {
            config,
            collaborators,
            library,
        }
    }

    pub fn from_config(config: Config) -> Self {
        let collaborators = Collaborators::from_config(&config);
        Self::new(config, collaborators)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> &OutputLibrary {
        &self.library
    }

    /// Claim the run slot on `tracker` and execute `job`
    pub async fn submit(&self, tracker: &RunTracker, job: &ClipJob) -> Result<RunReport> {
        let guard = tracker.begin()?;
        self.run(job, &guard).await
    }

    /// Execute one run. Holding `guard` is the caller's proof that no other
    /// run shares the slot.
    pub async fn run(&self, job: &ClipJob, guard: &RunGuard) -> Result<RunReport> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        info!("🚀 [{}] Clipping {:?} from {}", guard.id(), job.keyword, job.source);

        let mut workspace = match RunWorkspace::create(&self.config.output.work_dir, guard.id()) {
            Ok(workspace) => workspace,
            Err(e) => {
                guard.fail(&e);
                return Err(e);
            }
        };

        let output_dir = self.library.run_dir(guard.id());
        let mut progress = RunProgress::default();
        let result = self
            .execute(job, guard, &mut workspace, &output_dir, &mut progress)
            .await;
        let failed_at = guard.stage();

        guard.enter(RunStage::CleaningUp);
        workspace.cleanup().await;

        let outcome = match &result {
            Ok(()) => RunOutcome::Completed,
            Err(e) => RunOutcome::Failed {
                stage: Some(failed_at),
                message: e.to_string(),
            },
        };
        self.write_manifest(job, guard.id(), &progress, outcome, started_at, &output_dir)
            .await;

        match result {
            Ok(()) => {
                guard.enter(RunStage::Done);
                info!(
                    "🎉 [{}] Finished in {:.1}s: {} clips",
                    guard.id(),
                    start_time.elapsed().as_secs_f64(),
                    progress.clips.len()
                );
                Ok(RunReport {
                    run_id: guard.id().clone(),
                    title: progress.title,
                    media_duration: progress.media_duration,
                    windows: progress.windows,
                    output_dir,
                    clips: progress.clips,
                })
            }
            Err(e) => {
                guard.fail(&e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        job: &ClipJob,
        guard: &RunGuard,
        workspace: &mut RunWorkspace,
        output_dir: &Path,
        progress: &mut RunProgress,
    ) -> Result<()> {
        let timeouts = &self.config.timeouts;
        let c = &self.collaborators;

        guard.checkpoint()?;
        guard.enter(RunStage::Fetching);
        let fetched = bounded(
            RunStage::Fetching,
            timeouts.fetch_seconds,
            c.fetcher.fetch(&job.source, workspace.path()),
        )
        .await?
        .map_err(|e| PipelineError::Acquisition(format!("{:#}", e)))?;
        workspace.track(&fetched.path);
        if !fetched.path.is_file() {
            return Err(PipelineError::Acquisition(format!(
                "no local media file at {}",
                fetched.path.display()
            )));
        }
        info!("📹 Source: {}", fetched.title);
        progress.title = Some(fetched.title);
        let media = fetched.path;

        guard.checkpoint()?;
        guard.enter(RunStage::ProbingDuration);
        let media_duration = bounded(
            RunStage::ProbingDuration,
            timeouts.probe_seconds,
            c.transcoder.probe_duration(&media),
        )
        .await?
        .map_err(|e| PipelineError::Probe(format!("{:#}", e)))?;
        if !media_duration.is_finite() || media_duration < 0.0 {
            return Err(PipelineError::Probe(format!("invalid media duration {}", media_duration)));
        }
        progress.media_duration = Some(media_duration);

        guard.checkpoint()?;
        guard.enter(RunStage::ExtractingAudio);
        let audio_target = workspace.path().join(AUDIO_FILE);
        workspace.track(&audio_target);
        let audio = bounded(
            RunStage::ExtractingAudio,
            timeouts.audio_seconds,
            c.audio.extract_audio(&media, &audio_target),
        )
        .await?
        .map_err(|e| PipelineError::Transcription(format!("audio extraction: {:#}", e)))?;
        workspace.track(&audio);

        guard.checkpoint()?;
        guard.enter(RunStage::Transcribing);
        let segments = bounded(
            RunStage::Transcribing,
            timeouts.transcription_seconds,
            c.transcriber.transcribe(&audio),
        )
        .await?
        .map_err(|e| PipelineError::Transcription(format!("{:#}", e)))?;
        let segments = ensure_chronological(segments);
        info!("📝 Transcript has {} segments", segments.len());

        let subtitles = if job.burn_subtitles {
            guard.checkpoint()?;
            guard.enter(RunStage::SerializingSubtitles);
            let path = workspace.path().join(CAPTIONS_FILE);
            workspace.track(&path);
            SrtDocument::from_segments(&segments).save(&path).await?;
            Some(path)
        } else {
            None
        };

        guard.checkpoint()?;
        guard.enter(RunStage::Matching);
        let matches = find_matches(&segments, &job.keyword)?;
        info!("🔍 {} segments mention {:?}", matches.len(), job.keyword);

        guard.enter(RunStage::SelectingWindows);
        let windows = select_windows(&matches, f64::from(job.clip_duration_seconds), media_duration)?;
        progress.windows = windows.clone();

        guard.enter(RunStage::Planning);
        let requests = plan_clips(&windows, job.burn_subtitles, &self.config.clips.container);
        if requests.is_empty() {
            info!("No occurrences of {:?}, nothing to cut", job.keyword);
            return Ok(());
        }

        guard.checkpoint()?;
        guard.enter(RunStage::Cutting);
        tokio::fs::create_dir_all(output_dir).await?;

        for request in &requests {
            guard.checkpoint()?;
            let output_path = output_dir.join(&request.output_name);
            let captions = if request.burn_subtitles { subtitles.as_deref() } else { None };

            info!(
                "✂️ Clip {}/{}: {:.1}s-{:.1}s",
                request.index,
                requests.len(),
                request.window.start,
                request.window.end
            );

            bounded(
                RunStage::Cutting,
                timeouts.cut_seconds,
                c.transcoder.cut(&media, &request.window, captions, &output_path),
            )
            .await
            .map_err(|e| PipelineError::Transcode {
                index: request.index,
                message: e.to_string(),
            })?
            .map_err(|e| PipelineError::Transcode {
                index: request.index,
                message: format!("{:#}", e),
            })?;

            progress.clips.push(request.output_name.clone());
        }

        Ok(())
    }

    async fn write_manifest(
        &self,
        job: &ClipJob,
        run_id: &RunId,
        progress: &RunProgress,
        outcome: RunOutcome,
        started_at: chrono::DateTime<Utc>,
        output_dir: &Path,
    ) {
        let manifest = RunManifest {
            run_id: run_id.clone(),
            source: job.source.clone(),
            keyword: job.keyword.clone(),
            title: progress.title.clone(),
            burn_subtitles: job.burn_subtitles,
            clip_duration_seconds: job.clip_duration_seconds,
            media_duration: progress.media_duration,
            windows: progress.windows.clone(),
            clips: progress.clips.clone(),
            outcome,
            started_at,
            finished_at: Some(Utc::now()),
        };

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            warn!("Failed to create output directory {}: {}", output_dir.display(), e);
            return;
        }
        if let Err(e) = manifest.save(output_dir).await {
            warn!("Failed to write run manifest: {}", e);
        }
    }
}

/// Await `fut`, failing with [`PipelineError::Timeout`] once `seconds` pass
async fn bounded<T, F>(stage: RunStage, seconds: u64, fut: F) -> Result<anyhow::Result<T>>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match TimeoutConfig::limit(seconds) {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| PipelineError::Timeout { stage, seconds }),
        None => Ok(fut.await),
    }
}
