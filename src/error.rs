use std::path::PathBuf;
use thiserror::Error;

/// Number of stderr lines shown in the short form of a tool failure
const SUMMARY_LINES: usize = 5;

/// Failure of one of the external tools (ffmpeg, whisper)
#[derive(Error, Debug)]
pub enum ToolFailure {
    #[error("`{program}` was not found on the execution path")]
    NotFound { program: String },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {}{}", describe_status(.status), summarize(.stderr))]
    Exited {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("input is not usable: {0}")]
    InvalidInput(String),

    #[error("expected output {} was not produced", .0.display())]
    MissingOutput(PathBuf),

    #[error("no speech was recognized ({} contains no cues)", .0.display())]
    NoSpeech(PathBuf),

    #[error("output {} could not be parsed: {reason}", .path.display())]
    Unparsable { path: PathBuf, reason: String },
}

impl ToolFailure {
    /// Full captured stderr of the failing process, if any
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ToolFailure::Exited { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }

    /// Whether the process ran at all (and may have left partial output behind)
    pub fn process_ran(&self) -> bool {
        !matches!(
            self,
            ToolFailure::NotFound { .. } | ToolFailure::Spawn { .. } | ToolFailure::InvalidInput(_)
        )
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

fn summarize(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    let tail = &lines[lines.len().saturating_sub(SUMMARY_LINES)..];
    format!(": {}", tail.join(" | "))
}

#[derive(Error, Debug)]
pub enum SubtitlerError {
    #[error("Invalid job: {0}")]
    Validation(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(ToolFailure),

    #[error("Transcription failed: {0}")]
    Transcription(ToolFailure),

    #[error("Subtitle format error: {0}")]
    SubtitleFormat(String),

    #[error("Video composition failed: {0}")]
    Composition(ToolFailure),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubtitlerError {
    /// Process exit code for this failure category
    pub fn exit_code(&self) -> u8 {
        match self {
            SubtitlerError::Io(_) | SubtitlerError::Config(_) => 1,
            SubtitlerError::Validation(_) => 2,
            SubtitlerError::Extraction(_) => 3,
            SubtitlerError::Transcription(_) => 4,
            SubtitlerError::SubtitleFormat(_) => 5,
            SubtitlerError::Composition(_) => 6,
        }
    }

    /// Captured tool stderr, shown in full only in verbose mode
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            SubtitlerError::Extraction(failure)
            | SubtitlerError::Transcription(failure)
            | SubtitlerError::Composition(failure) => failure.diagnostics(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubtitlerError>;
