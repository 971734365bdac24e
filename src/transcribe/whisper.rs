use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::Transcriber;
use crate::command::ToolCommand;
use crate::config::{ModelSize, TranscriberConfig};
use crate::error::{Result, SubtitlerError, ToolFailure};
use crate::subtitle::parse_srt;

/// Whisper is asked to translate, so cues always come out in English
const TASK: &str = "translate";
const OUTPUT_FORMAT: &str = "srt";

/// Drives the OpenAI `whisper` command line tool
pub struct WhisperTranscriber {
    config: TranscriberConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    /// Build the whisper invocation for one audio file
    pub fn build_command(
        &self,
        audio_path: &Path,
        output_dir: &Path,
        language: &str,
        model: ModelSize,
    ) -> ToolCommand {
        ToolCommand::new(&self.config.binary_path, "Transcription")
            .path(audio_path)
            .option("--model", model.as_str())
            .option("--language", language)
            .option("--task", TASK)
            .arg("--output_dir")
            .path(output_dir)
            .option("--output_format", OUTPUT_FORMAT)
            .args(self.config.extra_args.iter().map(String::as_str))
    }

    /// Whisper names its output after the audio file stem
    fn produced_artifact(audio_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let stem = audio_path.file_stem().ok_or_else(|| {
            SubtitlerError::Transcription(ToolFailure::InvalidInput(format!(
                "invalid audio filename: {}",
                audio_path.display()
            )))
        })?;

        let mut file_name = stem.to_os_string();
        file_name.push(".");
        file_name.push(OUTPUT_FORMAT);
        Ok(output_dir.join(file_name))
    }

    /// Reject artifacts that are empty, unparsable or hold no cue with text
    async fn validate_artifact(path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            SubtitlerError::Transcription(ToolFailure::Unparsable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

        let cues = parse_srt(&content).map_err(|e| {
            SubtitlerError::Transcription(ToolFailure::Unparsable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

        let spoken = cues.iter().filter(|cue| !cue.text.trim().is_empty()).count();
        if spoken == 0 {
            return Err(SubtitlerError::Transcription(ToolFailure::NoSpeech(path.to_path_buf())));
        }

        Ok(spoken)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        subtitle_path: &Path,
        language: &str,
        model: ModelSize,
    ) -> Result<PathBuf> {
        info!(
            "Transcribing audio {} using whisper model '{}' for language '{}'",
            audio_path.display(),
            model,
            language
        );

        match fs::metadata(audio_path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            _ => {
                return Err(SubtitlerError::Transcription(ToolFailure::InvalidInput(format!(
                    "audio file missing or empty: {}",
                    audio_path.display()
                ))));
            }
        }

        let output_dir = subtitle_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        self.build_command(audio_path, output_dir, language, model)
            .execute()
            .await
            .map_err(SubtitlerError::Transcription)?;

        let produced = Self::produced_artifact(audio_path, output_dir)?;
        if !produced.is_file() {
            return Err(SubtitlerError::Transcription(ToolFailure::MissingOutput(produced)));
        }

        if produced != subtitle_path {
            debug!("Moving {} to {}", produced.display(), subtitle_path.display());
            fs::rename(&produced, subtitle_path).await?;
        }

        let cue_count = Self::validate_artifact(subtitle_path).await?;
        info!("Transcription completed with {} cues: {}", cue_count, subtitle_path.display());

        Ok(subtitle_path.to_path_buf())
    }

    async fn check_availability(&self) -> Result<()> {
        ToolCommand::new(&self.config.binary_path, "Version check")
            .arg("--help")
            .execute()
            .await
            .map_err(SubtitlerError::Transcription)?;

        debug!("Transcriber is available");
        Ok(())
    }
}
