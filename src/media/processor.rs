use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{AudioExtractor, MediaCommandBuilder, VideoComposer};
use crate::config::MediaConfig;
use crate::error::{Result, SubtitlerError, ToolFailure};
use crate::style::RenderParameters;

/// Concrete implementation of both media adapters (FFmpeg-based)
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    /// First line of `ffmpeg -version`
    pub async fn version_info(&self) -> std::result::Result<String, ToolFailure> {
        let output = self.command_builder.version_check().execute().await?;
        let version_info = String::from_utf8_lossy(&output.stdout);
        Ok(version_info.lines().next().unwrap_or("Unknown version").to_string())
    }

    async fn check(&self) -> std::result::Result<(), ToolFailure> {
        let version = self.version_info().await?;
        debug!("Media processor is available: {}", version);
        Ok(())
    }
}

#[async_trait]
impl AudioExtractor for FfmpegProcessor {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        if !video_path.is_file() {
            return Err(SubtitlerError::Extraction(ToolFailure::InvalidInput(format!(
                "video file not found: {}",
                video_path.display()
            ))));
        }

        let command = self.command_builder.extract_audio(
            video_path,
            audio_path,
            self.config.sample_rate,
            self.config.channels,
        );

        if let Err(failure) = command.execute().await {
            if failure.process_ran() {
                remove_partial(audio_path).await;
            }
            return Err(SubtitlerError::Extraction(failure));
        }

        if !is_non_empty_file(audio_path).await {
            remove_partial(audio_path).await;
            return Err(SubtitlerError::Extraction(ToolFailure::MissingOutput(
                audio_path.to_path_buf(),
            )));
        }

        info!("Audio extraction completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        self.check().await.map_err(SubtitlerError::Extraction)
    }
}

#[async_trait]
impl VideoComposer for FfmpegProcessor {
    async fn compose(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        params: &RenderParameters,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Burning subtitles from {} into {} -> {}",
            subtitle_path.display(),
            video_path.display(),
            output_path.display()
        );

        for input in [video_path, subtitle_path] {
            if !input.is_file() {
                return Err(SubtitlerError::Composition(ToolFailure::InvalidInput(format!(
                    "file not found: {}",
                    input.display()
                ))));
            }
        }

        if video_path == output_path {
            return Err(SubtitlerError::Composition(ToolFailure::InvalidInput(
                "output would overwrite the input video".to_string(),
            )));
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let command = self.command_builder.burn_subtitles(
            video_path,
            subtitle_path,
            params,
            output_path,
            &self.config.video_codec,
            &self.config.encoding_options,
        );

        if let Err(failure) = command.execute().await {
            if failure.process_ran() {
                remove_partial(output_path).await;
            }
            return Err(SubtitlerError::Composition(failure));
        }

        if !is_non_empty_file(output_path).await {
            remove_partial(output_path).await;
            return Err(SubtitlerError::Composition(ToolFailure::MissingOutput(
                output_path.to_path_buf(),
            )));
        }

        info!("Subtitle burning completed successfully");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        self.check().await.map_err(SubtitlerError::Composition)
    }
}

async fn is_non_empty_file(path: &Path) -> bool {
    matches!(fs::metadata(path).await, Ok(meta) if meta.is_file() && meta.len() > 0)
}

/// Delete whatever a failed invocation left at `path`
async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}
