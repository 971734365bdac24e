// Media processing adapters
//
// Two capabilities of the media tool are consumed by the workflow, each
// behind its own trait so tests can substitute them:
// - AudioExtractor: video -> mono WAV for the transcriber
// - VideoComposer: video + subtitles -> new video with burned-in subtitles
//
// Both are implemented by the ffmpeg-based FfmpegProcessor.

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::style::RenderParameters;

/// Extracts the audio track of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Write the audio of `video_path` to `audio_path`. Leaves no partial file on failure.
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Check that the underlying tool can be started
    async fn check_availability(&self) -> Result<()>;
}

/// Burns subtitles into a copy of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoComposer: Send + Sync {
    /// Write a re-encoded copy of `video_path` with the cues of
    /// `subtitle_path` rendered in, to `output_path`. Removes partial output
    /// on failure.
    async fn compose(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        params: &RenderParameters,
        output_path: &Path,
    ) -> Result<()>;

    /// Check that the underlying tool can be started
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media adapter instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default audio extractor (FFmpeg-based)
    pub fn create_extractor(config: MediaConfig) -> Box<dyn AudioExtractor> {
        Box::new(FfmpegProcessor::new(config))
    }

    /// Create the default video composer (FFmpeg-based)
    pub fn create_composer(config: MediaConfig) -> Box<dyn VideoComposer> {
        Box::new(FfmpegProcessor::new(config))
    }
}
