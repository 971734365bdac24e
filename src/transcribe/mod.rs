// Transcription/translation adapters
//
// The workflow only needs one capability from the recognition tool: turn an
// audio file into an English SRT artifact. It is consumed through the
// Transcriber trait; WhisperTranscriber drives the OpenAI whisper CLI.
//
// To add another recognition backend, implement Transcriber for it, add it to
// TranscriberImplementation and update the factory.

pub mod whisper;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use whisper::WhisperTranscriber;
use crate::config::{ModelSize, TranscriberConfig};
use crate::error::Result;

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio_path` and translate it to English, writing SRT to
    /// `subtitle_path`. Fails when no cue was recognized.
    async fn transcribe(
        &self,
        audio_path: &Path,
        subtitle_path: &Path,
        language: &str,
        model: ModelSize,
    ) -> Result<PathBuf>;

    /// Check that the underlying tool can be started
    async fn check_availability(&self) -> Result<()>;
}

/// Transcriber implementation type
#[derive(Debug, Clone)]
pub enum TranscriberImplementation {
    Whisper,
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on implementation type
    pub fn create_transcriber(
        implementation: TranscriberImplementation,
        config: TranscriberConfig,
    ) -> Box<dyn Transcriber> {
        match implementation {
            TranscriberImplementation::Whisper => Box::new(WhisperTranscriber::new(config)),
        }
    }

    /// Create with default implementation
    pub fn create_default(config: TranscriberConfig) -> Box<dyn Transcriber> {
        Self::create_transcriber(TranscriberImplementation::Whisper, config)
    }
}
