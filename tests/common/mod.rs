//! In-memory collaborators for driving the pipeline without external tools

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use keyword_clipper::audio::AudioExtractor;
use keyword_clipper::config::TimeoutConfig;
use keyword_clipper::fetch::{FetchedMedia, Fetcher};
use keyword_clipper::video::Transcoder;
use keyword_clipper::{
    ClipPipeline, ClipWindow, Collaborators, Config, ConfigBuilder, OutputLibrary, RunManifest, RunTracker,
    TimedSegment, Transcriber,
};

#[derive(Default)]
pub struct FakeFetcher {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
    pub skip_file: bool,
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, _locator: &str, dest_dir: &Path) -> Result<FetchedMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let path = dest_dir.join("source.mp4");
        if !self.skip_file {
            tokio::fs::write(&path, b"fake media").await?;
        }
        Ok(FetchedMedia {
            path,
            title: "Closed Guard Fundamentals".to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeAudio {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl AudioExtractor for FakeAudio {
    async fn extract_audio(&self, _media_path: &Path, output_path: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("no audio stream"));
        }
        tokio::fs::write(output_path, b"fake pcm").await?;
        Ok(output_path.to_path_buf())
    }
}

pub struct FakeTranscriber {
    pub segments: Vec<TimedSegment>,
    pub calls: AtomicUsize,
    pub fail: bool,
    /// Requests cancellation of the active run while transcribing
    pub cancel_on: Option<RunTracker>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<Vec<TimedSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(tracker) = &self.cancel_on {
            tracker.cancel();
        }
        if self.fail {
            return Err(anyhow!("model file missing"));
        }
        Ok(self.segments.clone())
    }
}

/// One recorded `cut` call
#[derive(Debug, Clone)]
pub struct CutCall {
    pub window: ClipWindow,
    pub subtitles: Option<PathBuf>,
    /// Contents of the subtitle file at the time of the cut
    pub subtitles_text: Option<String>,
    pub output: PathBuf,
}

pub struct FakeTranscoder {
    pub duration: f64,
    /// 1-based cut that fails
    pub fail_on: Option<usize>,
    pub cut_delay: Option<Duration>,
    pub probes: AtomicUsize,
    pub cuts: Mutex<Vec<CutCall>>,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn probe_duration(&self, _media_path: &Path) -> Result<f64> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.duration)
    }

    async fn cut(
        &self,
        _media_path: &Path,
        window: &ClipWindow,
        subtitles: Option<&Path>,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let attempt = {
            let mut cuts = self.cuts.lock();
            cuts.push(CutCall {
                window: *window,
                subtitles: subtitles.map(Path::to_path_buf),
                subtitles_text: subtitles.and_then(|p| std::fs::read_to_string(p).ok()),
                output: output_path.to_path_buf(),
            });
            cuts.len()
        };

        if let Some(delay) = self.cut_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_on == Some(attempt) {
            return Err(anyhow!("encoder crashed"));
        }

        tokio::fs::write(output_path, b"fake clip").await?;
        Ok(output_path.to_path_buf())
    }
}

pub struct Harness {
    pub temp_dir: TempDir,
    pub fetcher: Arc<FakeFetcher>,
    pub audio: Arc<FakeAudio>,
    pub transcriber: Arc<FakeTranscriber>,
    pub transcoder: Arc<FakeTranscoder>,
    pub tracker: RunTracker,
}

impl Harness {
    pub fn new(segments: Vec<TimedSegment>, duration: f64) -> Self {
        let tracker = RunTracker::new();
        Self {
            temp_dir: TempDir::new().expect("temp dir"),
            fetcher: Arc::new(FakeFetcher::default()),
            audio: Arc::new(FakeAudio::default()),
            transcriber: Arc::new(FakeTranscriber {
                segments,
                calls: AtomicUsize::new(0),
                fail: false,
                cancel_on: None,
            }),
            transcoder: Arc::new(FakeTranscoder {
                duration,
                fail_on: None,
                cut_delay: None,
                probes: AtomicUsize::new(0),
                cuts: Mutex::new(Vec::new()),
            }),
            tracker,
        }
    }

    pub fn failing_cut(mut self, index: usize) -> Self {
        self.transcoder = Arc::new(FakeTranscoder {
            duration: self.transcoder.duration,
            fail_on: Some(index),
            cut_delay: None,
            probes: AtomicUsize::new(0),
            cuts: Mutex::new(Vec::new()),
        });
        self
    }

    pub fn slow_fetch(mut self, delay: Duration) -> Self {
        self.fetcher = Arc::new(FakeFetcher {
            delay: Some(delay),
            ..FakeFetcher::default()
        });
        self
    }

    pub fn missing_media(mut self) -> Self {
        self.fetcher = Arc::new(FakeFetcher {
            skip_file: true,
            ..FakeFetcher::default()
        });
        self
    }

    pub fn cancel_while_transcribing(mut self) -> Self {
        self.transcriber = Arc::new(FakeTranscriber {
            segments: self.transcriber.segments.clone(),
            calls: AtomicUsize::new(0),
            fail: false,
            cancel_on: Some(self.tracker.clone()),
        });
        self
    }

    pub fn failing_audio(mut self) -> Self {
        self.audio = Arc::new(FakeAudio {
            fail: true,
            ..FakeAudio::default()
        });
        self
    }

    pub fn failing_transcriber(mut self) -> Self {
        self.transcriber = Arc::new(FakeTranscriber {
            segments: Vec::new(),
            calls: AtomicUsize::new(0),
            fail: true,
            cancel_on: None,
        });
        self
    }

    pub fn slow_cut(mut self, delay: Duration) -> Self {
        self.transcoder = Arc::new(FakeTranscoder {
            duration: self.transcoder.duration,
            fail_on: None,
            cut_delay: Some(delay),
            probes: AtomicUsize::new(0),
            cuts: Mutex::new(Vec::new()),
        });
        self
    }

    /// Manifest of the single run written so far
    pub fn only_manifest(&self) -> RunManifest {
        let listings = OutputLibrary::new(self.output_dir()).list();
        assert_eq!(listings.len(), 1, "expected exactly one run directory");
        listings[0].manifest.clone().expect("run.json present")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("clips")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.temp_dir.path().join("work")
    }

    pub fn config(&self, timeouts: TimeoutConfig) -> Config {
        ConfigBuilder::new()
            .with_output_dir(self.output_dir())
            .with_work_dir(self.work_dir())
            .with_timeouts(timeouts)
            .build()
    }

    pub fn pipeline(&self) -> ClipPipeline {
        self.pipeline_with_timeouts(TimeoutConfig::default())
    }

    pub fn pipeline_with_timeouts(&self, timeouts: TimeoutConfig) -> ClipPipeline {
        let collaborators = Collaborators {
            fetcher: self.fetcher.clone(),
            audio: self.audio.clone(),
            transcriber: self.transcriber.clone(),
            transcoder: self.transcoder.clone(),
        };
        ClipPipeline::new(self.config(timeouts), collaborators)
    }

    /// Entries left behind in the work directory
    pub fn leftover_workspaces(&self) -> usize {
        match std::fs::read_dir(self.work_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    pub fn cut_calls(&self) -> Vec<CutCall> {
        self.transcoder.cuts.lock().clone()
    }
}

/// Transcript with "guard" mentioned at 0, 30, 95 and 200 seconds
pub fn guard_transcript() -> Vec<TimedSegment> {
    vec![
        TimedSegment::new(0.0, 4.0, "Welcome, today we work the closed guard."),
        TimedSegment::new(12.0, 18.0, "Keep your posture tall."),
        TimedSegment::new(30.0, 35.0, "From GUARD you break them down."),
        TimedSegment::new(95.0, 99.0, "Now open the guard and hip out."),
        TimedSegment::new(150.0, 155.0, "Drill it both sides."),
        TimedSegment::new(200.0, 204.0, "Back to guard to finish."),
    ]
}
