use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SubtitlerError};
use crate::style::SubtitleStyle;

/// Config file picked up from the current directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "subtitler.toml";

/// Suffix appended to the input file stem to form the default output path
const OUTPUT_SUFFIX: &str = "_subtitled";

/// Tool-level settings, loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub media: MediaConfig,
    pub style: StyleConfig,
    pub subtitles: SubtitleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the whisper binary
    pub binary_path: String,
    /// Extra arguments appended to every whisper invocation (e.g. ["--fp16", "False"])
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Sample rate of the extracted audio
    pub sample_rate: u32,
    /// Channel count of the extracted audio
    pub channels: u32,
    /// Video encoder used when burning subtitles
    pub video_codec: String,
    /// Additional encoding options for subtitle burning
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub encoding_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Text colour name (white, black, yellow, red, green, blue, cyan, magenta)
    pub font_color: String,
    /// Outline colour name
    pub outline_color: String,
    pub outline_width: f32,
    /// Vertical margin from the frame edge, in pixels
    pub margin_v: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Shift applied to every cue, in milliseconds (may be negative)
    pub offset_ms: i64,
    /// Factor applied to every timestamp before the offset
    pub time_scale: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            sample_rate: 16000,
            channels: 1,
            video_codec: "libx264".to_string(),
            encoding_options: vec![
                // Example encoding options users can customize:
                // "-preset".to_string(), "medium".to_string(),  // Encoding speed (ultrafast, fast, medium, slow, veryslow)
                // "-crf".to_string(), "23".to_string(),         // Quality (0-51, lower = better quality)
            ],
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_color: "white".to_string(),
            outline_color: "black".to_string(),
            outline_width: 1.0,
            margin_v: 30,
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            offset_ms: 0,
            time_scale: 1.0,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubtitlerError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubtitlerError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubtitlerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubtitlerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load the explicit config file, else `subtitler.toml` in the current directory, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.transcriber.binary_path.trim().is_empty() {
            return Err(SubtitlerError::Config("transcriber.binary_path must not be empty".to_string()));
        }
        if self.media.binary_path.trim().is_empty() {
            return Err(SubtitlerError::Config("media.binary_path must not be empty".to_string()));
        }
        if self.media.sample_rate == 0 || self.media.channels == 0 {
            return Err(SubtitlerError::Config(
                "media.sample_rate and media.channels must be positive".to_string(),
            ));
        }
        if !(self.subtitles.time_scale.is_finite() && self.subtitles.time_scale > 0.0) {
            return Err(SubtitlerError::Config(format!(
                "subtitles.time_scale must be a positive number, got {}",
                self.subtitles.time_scale
            )));
        }
        Ok(())
    }
}

/// Whisper model size, trading accuracy for speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one run needs to know, fixed at startup
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub language: String,
    pub model: ModelSize,
    pub style: SubtitleStyle,
    pub keep_temp: bool,
}

impl JobConfig {
    /// Build a job, resolving the output path from the input when not given
    pub fn new(
        input: PathBuf,
        output: Option<PathBuf>,
        language: String,
        model: ModelSize,
        style: SubtitleStyle,
    ) -> Self {
        let output = output.unwrap_or_else(|| default_output_path(&input));

        Self {
            input,
            output,
            language,
            model,
            style,
            keep_temp: false,
        }
    }

    /// Check the job before any stage runs. The input is opened for reading but never read.
    pub fn validate(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.input).map_err(|_| {
            SubtitlerError::Validation(format!("input file not found: {}", self.input.display()))
        })?;

        if !metadata.is_file() {
            return Err(SubtitlerError::Validation(format!(
                "input is not a regular file: {}",
                self.input.display()
            )));
        }

        std::fs::File::open(&self.input).map_err(|e| {
            SubtitlerError::Validation(format!("input file is not readable: {}: {}", self.input.display(), e))
        })?;

        if self.output.as_os_str().is_empty() {
            return Err(SubtitlerError::Validation("output path is empty".to_string()));
        }

        if same_file(&self.input, &self.output) {
            return Err(SubtitlerError::Validation(format!(
                "output path must differ from the input: {}",
                self.output.display()
            )));
        }

        if self.output.is_dir() {
            return Err(SubtitlerError::Validation(format!(
                "output path is a directory: {}",
                self.output.display()
            )));
        }

        if self.style.font_size == 0 {
            return Err(SubtitlerError::Validation("font size must be a positive integer".to_string()));
        }

        let language_ok = (2..=3).contains(&self.language.len())
            && self.language.chars().all(|c| c.is_ascii_alphabetic());
        if !language_ok {
            return Err(SubtitlerError::Validation(format!(
                "language must be a two or three letter code (e.g. de, fr), got '{}'",
                self.language
            )));
        }

        Ok(())
    }
}

/// `clip.mp4` -> `clip_subtitled.mp4`, next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };

    input.with_file_name(file_name)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
