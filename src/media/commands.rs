use std::path::Path;

use crate::command::ToolCommand;
use crate::style::RenderParameters;

/// Builder for the ffmpeg invocations the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    fn command<S: Into<String>>(&self, description: S) -> ToolCommand {
        ToolCommand::new(&self.binary_path, description).arg("-hide_banner")
    }

    /// Build audio extraction command: PCM 16-bit, given rate and channel count
    pub fn extract_audio<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: Q,
        sample_rate: u32,
        channels: u32,
    ) -> ToolCommand {
        self.command("Audio extraction")
            .arg("-i")
            .path(video_path)
            .arg("-vn")
            .option("-c:a", "pcm_s16le")
            .option("-ar", sample_rate.to_string())
            .option("-ac", channels.to_string())
            .arg("-y")
            .path(audio_path)
    }

    /// Build subtitle burning command
    pub fn burn_subtitles<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: Q,
        params: &RenderParameters,
        output_path: R,
        video_codec: &str,
        additional_options: &[String],
    ) -> ToolCommand {
        self.command("Subtitle burning")
            .arg("-y")
            .arg("-i")
            .path(video_path)
            .option("-vf", subtitles_filter(subtitle_path.as_ref(), params))
            .option("-c:v", video_codec)
            .option("-c:a", "copy")
            .args(additional_options.iter().map(String::as_str))
            .path(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

/// `subtitles` filter expression with the styling applied
pub fn subtitles_filter(subtitle_path: &Path, params: &RenderParameters) -> String {
    format!(
        "subtitles={}:force_style='{}'",
        escape_filter_path(subtitle_path),
        params.force_style()
    )
}

/// Quote a path for use as a filter option value. Colons (Windows drive
/// letters) would otherwise split the option list.
pub fn escape_filter_path(path: &Path) -> String {
    let value = path.to_string_lossy().replace('\\', "/").replace(':', "\\:");
    format!("'{}'", value)
}
