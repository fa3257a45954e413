use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{TimedSegment, Transcriber};
use crate::config::TranscriptionConfig;

/// Whisper backends in order of preference
const BACKENDS: [(&str, Backend); 3] = [
    ("whisper-cli", Backend::Cpp),  // whisper.cpp via Homebrew
    ("whisper-cpp", Backend::Cpp),  // whisper.cpp
    ("whisper", Backend::Python),   // OpenAI Whisper (fallback)
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Backend {
    Cpp,
    Python,
}

/// Transcriber that shells out to whichever Whisper backend is installed
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Find the first available backend
    async fn detect_backend() -> Result<(&'static str, Backend)> {
        for (cmd_name, backend) in BACKENDS {
            if check_command_available(cmd_name).await {
                info!("✅ Found {} backend, using it for transcription", cmd_name);
                return Ok((cmd_name, backend));
            }
            debug!("{} not available", cmd_name);
        }

        Err(anyhow!("No Whisper backend found. Please install whisper.cpp or openai-whisper"))
    }

    /// whisper.cpp: writes `<output_base>.json`
    fn whisper_cpp_command(&self, cmd_name: &str, audio_path: &Path, output_base: &Path) -> Command {
        let mut cmd = Command::new(cmd_name);
        cmd.arg("-f").arg(audio_path)
            .arg("-oj") // JSON output
            .arg("-of").arg(output_base)
            .arg("-t").arg(self.config.threads.to_string())
            .arg("-m").arg(self.config.model_dir.join(format!("ggml-{}.bin", self.config.model)));

        if let Some(language) = &self.config.language {
            cmd.arg("-l").arg(language);
        }

        cmd
    }

    /// Python Whisper: writes `<output_dir>/<audio stem>.json`
    fn python_whisper_command(&self, audio_path: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new("whisper");
        cmd.arg(audio_path)
            .arg("--model").arg(&self.config.model)
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json")
            .arg("--verbose").arg("False")
            .arg("--fp16").arg("False");

        if let Some(language) = &self.config.language {
            cmd.arg("--language").arg(language);
        }

        if !self.config.use_gpu {
            cmd.arg("--device").arg("cpu");
        }

        cmd
    }

    async fn execute(&self, mut cmd: Command, backend_name: &str) -> Result<()> {
        cmd.kill_on_drop(true);
        debug!("Executing command: {:?}", cmd);

        let start_time = std::time::Instant::now();
        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to spawn {} command", backend_name))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            if !line.trim().is_empty() {
                debug!("Whisper stderr: {}", line);
            }
        }

        if !output.status.success() {
            return Err(anyhow!("{} transcription failed with exit code: {}", backend_name, output.status));
        }

        info!("✅ {} finished in {:.1}s", backend_name, start_time.elapsed().as_secs_f64());
        Ok(())
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TimedSegment>> {
        info!("🎤 Starting Whisper transcription for: {}", audio_path.display());
        info!("⚙️  Model: {}", self.config.model);

        let work_dir = audio_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("whisper");
        tokio::fs::create_dir_all(&work_dir).await?;

        let stem = audio_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let (cmd_name, backend) = Self::detect_backend().await?;
        let cmd = match backend {
            Backend::Cpp => self.whisper_cpp_command(cmd_name, audio_path, &work_dir.join(&stem)),
            Backend::Python => self.python_whisper_command(audio_path, &work_dir),
        };
        self.execute(cmd, cmd_name).await?;

        let json_path = find_json_output(&work_dir).await?;
        let json_content = tokio::fs::read_to_string(&json_path).await?;
        let segments = parse_whisper_json(&json_content)?;

        info!("🎉 Transcription completed: {} segments", segments.len());
        Ok(segments)
    }
}

/// Check if a command is available
async fn check_command_available(cmd_name: &str) -> bool {
    Command::new(cmd_name)
        .arg("--help")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

async fn find_json_output(dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            return Ok(path);
        }
    }

    Err(anyhow!("No Whisper JSON output found in {}", dir.display()))
}

/// Parse any of the JSON layouts the Whisper backends emit
pub fn parse_whisper_json(json: &str) -> Result<Vec<TimedSegment>> {
    let output: WhisperOutput = serde_json::from_str(json).context("Failed to parse Whisper JSON")?;

    let segments: Vec<TimedSegment> = if !output.transcription.is_empty() {
        // whisper.cpp: offsets in milliseconds
        output
            .transcription
            .into_iter()
            .map(|seg| TimedSegment {
                start: seg.offsets.from as f64 / 1000.0,
                end: seg.offsets.to as f64 / 1000.0,
                text: seg.text.trim().to_string(),
            })
            .collect()
    } else {
        let raw = match output.result {
            Some(result) if !result.segments.is_empty() => result.segments,
            _ => output.segments,
        };

        raw.into_iter()
            .map(|seg| TimedSegment {
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect()
    };

    if segments.is_empty() {
        warn!("⚠️  Whisper output contained no segments");
    }

    Ok(segments)
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    transcription: Vec<WhisperTranscriptionSegment>,
    #[serde(default)]
    result: Option<WhisperResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperResult {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperTranscriptionSegment {
    offsets: WhisperOffsets,
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcriber_creation() {
        let transcriber = WhisperTranscriber::new(TranscriptionConfig::default());
        assert_eq!(transcriber.model(), "base");
    }

    #[test]
    fn test_parse_python_whisper_json() {
        let json = r#"{
            "text": " Hello there. General Kenobi.",
            "language": "en",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.5, "text": " Hello there."},
                {"id": 1, "start": 2.5, "end": 4.0, "text": " General Kenobi."}
            ]
        }"#;

        let segments = parse_whisper_json(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], TimedSegment::new(0.0, 2.5, "Hello there."));
        assert_eq!(segments[1].text, "General Kenobi.");
    }

    #[test]
    fn test_parse_whisper_cpp_json() {
        let json = r#"{
            "result": {"language": "en"},
            "transcription": [
                {
                    "timestamps": {"from": "00:00:00,000", "to": "00:00:03,120"},
                    "offsets": {"from": 0, "to": 3120},
                    "text": " Grip the collar."
                },
                {
                    "timestamps": {"from": "00:00:03,120", "to": "00:00:07,000"},
                    "offsets": {"from": 3120, "to": 7000},
                    "text": " Now break posture."
                }
            ]
        }"#;

        let segments = parse_whisper_json(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], TimedSegment::new(3.12, 7.0, "Now break posture."));
    }

    #[test]
    fn test_parse_result_wrapped_json() {
        let json = r#"{"result": {"language": "en", "segments": [{"start": 1.0, "end": 2.0, "text": "hi"}]}}"#;
        assert_eq!(parse_whisper_json(json).unwrap(), vec![TimedSegment::new(1.0, 2.0, "hi")]);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_whisper_json("not json").is_err());
    }

    #[test]
    fn test_whisper_cpp_command_uses_model_dir() {
        let transcriber = WhisperTranscriber::new(TranscriptionConfig::default());
        let cmd = transcriber.whisper_cpp_command("whisper-cli", Path::new("audio.wav"), Path::new("out/audio"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        let model = args.iter().position(|a| a == "-m").unwrap();
        assert_eq!(args[model + 1], Path::new("models").join("ggml-base.bin").to_string_lossy());
    }
}
