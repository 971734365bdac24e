use clap::Parser;
use std::path::PathBuf;

use crate::config::{JobConfig, ModelSize};
use crate::style::{Position, SubtitleStyle};

/// Add English subtitles to videos with non-English audio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input video file
    #[arg(required_unless_present = "write_config")]
    pub video_file: Option<PathBuf>,

    /// Path to the output video file (default: <input>_subtitled.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Whisper model to use for transcription
    #[arg(short, long, value_enum, default_value_t = ModelSize::Medium)]
    pub model: ModelSize,

    /// Keep temporary files after processing
    #[arg(short, long)]
    pub keep_temp: bool,

    /// Font size for subtitles
    #[arg(short, long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..))]
    pub font_size: u32,

    /// Position of subtitles
    #[arg(short, long, value_enum, default_value_t = Position::LowerCenter)]
    pub position: Position,

    /// Source language code (e.g. de for German, fr for French)
    #[arg(short, long, default_value = "de")]
    pub language: String,

    /// Configuration file path (default: ./subtitler.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the effective configuration as a TOML template to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with = "video_file")]
    pub write_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Turn the parsed arguments into the job description; `None` without a video file
    pub fn to_job(&self) -> Option<JobConfig> {
        let video_file = self.video_file.clone()?;
        let style = SubtitleStyle {
            font_size: self.font_size,
            position: self.position,
        };

        let mut job = JobConfig::new(
            video_file,
            self.output.clone(),
            self.language.to_lowercase(),
            self.model,
            style,
        );
        job.keep_temp = self.keep_temp;
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["subtitler", "lecture.mp4"]).unwrap();
        let job = args.to_job().unwrap();

        assert_eq!(job.input, PathBuf::from("lecture.mp4"));
        assert_eq!(job.output, PathBuf::from("lecture_subtitled.mp4"));
        assert_eq!(job.model, ModelSize::Medium);
        assert_eq!(job.language, "de");
        assert_eq!(job.style, SubtitleStyle::default());
        assert!(!job.keep_temp);
        assert!(!args.verbose);
        assert!(args.write_config.is_none());
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "subtitler", "film.mkv", "-o", "out/film_en.mkv", "-m", "small", "-k", "-f", "30", "-p", "upper_left",
            "-l", "FR", "-v",
        ])
        .unwrap();
        let job = args.to_job().unwrap();

        assert_eq!(job.output, PathBuf::from("out/film_en.mkv"));
        assert_eq!(job.model, ModelSize::Small);
        assert_eq!(job.style.font_size, 30);
        assert_eq!(job.style.position, Position::UpperLeft);
        assert_eq!(job.language, "fr");
        assert!(job.keep_temp);
        assert!(args.verbose);
    }

    #[test]
    fn test_write_config_without_video() {
        let args = Args::try_parse_from(["subtitler", "--write-config", "subtitler.toml"]).unwrap();
        assert_eq!(args.write_config, Some(PathBuf::from("subtitler.toml")));
        assert!(args.to_job().is_none());

        assert!(Args::try_parse_from(["subtitler", "a.mp4", "--write-config", "subtitler.toml"]).is_err());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Args::try_parse_from(["subtitler", "a.mp4", "-m", "huge"]).is_err());
        assert!(Args::try_parse_from(["subtitler", "a.mp4", "-p", "middle"]).is_err());
        assert!(Args::try_parse_from(["subtitler", "a.mp4", "-f", "0"]).is_err());
        assert!(Args::try_parse_from(["subtitler", "a.mp4", "-f", "-3"]).is_err());
        assert!(Args::try_parse_from(["subtitler"]).is_err());
    }

    #[test]
    fn test_version_flag() {
        let err = Args::try_parse_from(["subtitler", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
