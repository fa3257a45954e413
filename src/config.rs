use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the keyword clipper
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Clip selection and rendering settings
    pub clips: ClipConfig,

    /// Video acquisition settings
    pub fetch: FetchConfig,

    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Transcription settings
    pub transcription: TranscriptionConfig,

    /// Probing and cutting settings
    pub transcode: TranscodeConfig,

    /// Output and storage settings
    pub output: OutputConfig,

    /// Per-stage time limits
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Clip length used when a request does not specify one
    pub default_duration_seconds: u32,

    /// Output container / file extension
    pub container: String,

    /// Audio codec for cut clips
    pub audio_codec: String,

    /// Video codec for cut clips (ffmpeg default when unset)
    pub video_codec: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// yt-dlp executable
    pub binary: String,

    /// yt-dlp format selector
    pub format: String,

    /// User agent sent by the downloader
    pub user_agent: Option<String>,

    /// Download a single video even when the locator points into a playlist
    pub no_playlist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub ffmpeg_binary: String,

    /// Target sample rate for transcription
    pub sample_rate: u32,

    pub channels: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Whisper model name
    pub model: String,

    /// Directory holding ggml model files for whisper.cpp
    pub model_dir: PathBuf,

    /// Language hint; auto-detect when unset
    pub language: Option<String>,

    /// Enable GPU acceleration for Python Whisper
    pub use_gpu: bool,

    /// Worker threads for whisper.cpp
    pub threads: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub ffmpeg_binary: String,
    pub ffprobe_binary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Persistent directory for produced clips, one subdirectory per run
    pub base_dir: PathBuf,

    /// Parent directory for run-scoped transient files
    pub work_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

/// Time limits per stage in seconds; 0 disables the limit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub fetch_seconds: u64,
    pub probe_seconds: u64,
    pub audio_seconds: u64,
    pub transcription_seconds: u64,
    pub cut_seconds: u64,
}

impl TimeoutConfig {
    pub fn limit(seconds: u64) -> Option<Duration> {
        (seconds > 0).then(|| Duration::from_secs(seconds))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            default_duration_seconds: 90,
            container: "mp4".to_string(),
            audio_codec: "aac".to_string(),
            video_codec: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            no_playlist: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            sample_rate: 16000, // Optimal for Whisper
            channels: 1,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            model_dir: PathBuf::from("models"),
            language: None,
            use_gpu: false,
            threads: 4,
        }
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./clips"),
            work_dir: std::env::temp_dir(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            fetch_seconds: 1800,
            probe_seconds: 60,
            audio_seconds: 900,
            transcription_seconds: 3600, // 60 minutes for long videos
            cut_seconds: 900,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path or the standard locations,
    /// falling back to defaults, then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::from_standard_locations(),
        };

        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn from_standard_locations() -> Self {
        let config_paths = [
            "keyword-clipper.toml",
            "config/keyword-clipper.toml",
            "/etc/keyword-clipper/config.toml",
        ];

        for path in &config_paths {
            let path = Path::new(path);
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("{:#}", e),
            }
        }

        Self::default()
    }

    /// Override settings from `KEYCLIP_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("KEYCLIP_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("KEYCLIP_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid KEYCLIP_PORT: {}", port),
            }
        }

        if let Ok(output_dir) = std::env::var("KEYCLIP_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(work_dir) = std::env::var("KEYCLIP_WORK_DIR") {
            self.output.work_dir = PathBuf::from(work_dir);
        }

        if let Ok(model) = std::env::var("KEYCLIP_MODEL") {
            self.transcription.model = model;
        }

        if let Ok(language) = std::env::var("KEYCLIP_LANGUAGE") {
            self.transcription.language = Some(language);
        }

        if let Ok(log_level) = std::env::var("KEYCLIP_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(duration) = std::env::var("KEYCLIP_CLIP_DURATION") {
            match duration.parse() {
                Ok(duration) => self.clips.default_duration_seconds = duration,
                Err(_) => tracing::warn!("Ignoring invalid KEYCLIP_CLIP_DURATION: {}", duration),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.clips.default_duration_seconds == 0 {
            return Err(anyhow!("clips.default_duration_seconds must be greater than 0"));
        }

        if self.clips.container.trim().is_empty() {
            return Err(anyhow!("clips.container must not be empty"));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow!("audio.sample_rate must be greater than 0"));
        }

        let binaries = [
            ("fetch.binary", &self.fetch.binary),
            ("audio.ffmpeg_binary", &self.audio.ffmpeg_binary),
            ("transcode.ffmpeg_binary", &self.transcode.ffmpeg_binary),
            ("transcode.ffprobe_binary", &self.transcode.ffprobe_binary),
        ];
        for (name, value) in binaries {
            if value.trim().is_empty() {
                return Err(anyhow!("{} must not be empty", name));
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Keyword Clipper Configuration:\n\
            - Listen: {}:{}\n\
            - Default Clip Duration: {}s\n\
            - Container: {}\n\
            - Whisper Model: {}\n\
            - Output Directory: {}\n\
            - Work Directory: {}",
            self.server.host,
            self.server.port,
            self.clips.default_duration_seconds,
            self.clips.container,
            self.transcription.model,
            self.output.base_dir.display(),
            self.output.work_dir.display()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.work_dir = dir;
        self
    }

    pub fn with_default_duration(mut self, seconds: u32) -> Self {
        self.config.clips.default_duration_seconds = seconds;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.transcription.model = model.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
