//! Subtitle styling: screen placement, font size and colours, rendered as
//! an ASS `force_style` expression for ffmpeg's `subtitles` filter.

use clap::ValueEnum;
use std::fmt;

use crate::config::StyleConfig;

/// Screen placement of the subtitle block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Position {
    #[default]
    #[value(name = "lower_center")]
    LowerCenter,
    #[value(name = "lower_left")]
    LowerLeft,
    #[value(name = "lower_right")]
    LowerRight,
    #[value(name = "upper_center")]
    UpperCenter,
    #[value(name = "upper_left")]
    UpperLeft,
    #[value(name = "upper_right")]
    UpperRight,
}

impl Position {
    /// ASS alignment code (numpad layout: 1-3 bottom row, 7-9 top row)
    pub fn alignment(&self) -> u8 {
        match self {
            Position::LowerLeft => 1,
            Position::LowerCenter => 2,
            Position::LowerRight => 3,
            Position::UpperLeft => 7,
            Position::UpperCenter => 8,
            Position::UpperRight => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::LowerCenter => "lower_center",
            Position::LowerLeft => "lower_left",
            Position::LowerRight => "lower_right",
            Position::UpperCenter => "upper_center",
            Position::UpperLeft => "upper_left",
            Position::UpperRight => "upper_right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job styling chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleStyle {
    pub font_size: u32,
    pub position: Position,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_size: 24,
            position: Position::LowerCenter,
        }
    }
}

/// Placement descriptor handed to the composition stage
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParameters {
    pub alignment: u8,
    pub font_size: u32,
    /// ASS colours are BGR hex
    pub primary_colour: String,
    pub outline_colour: String,
    pub outline_width: f32,
    pub margin_v: u32,
}

impl RenderParameters {
    pub fn new(style: &SubtitleStyle, config: &StyleConfig) -> Self {
        Self {
            alignment: style.position.alignment(),
            font_size: style.font_size,
            primary_colour: colour_to_bgr_hex(&config.font_color).to_string(),
            outline_colour: colour_to_bgr_hex(&config.outline_color).to_string(),
            outline_width: config.outline_width,
            margin_v: config.margin_v,
        }
    }

    /// Value for the `force_style` option of ffmpeg's `subtitles` filter
    pub fn force_style(&self) -> String {
        format!(
            "Alignment={},FontSize={},PrimaryColour=&H{},OutlineColour=&H{},BorderStyle=1,Outline={},MarginV={}",
            self.alignment,
            self.font_size,
            self.primary_colour,
            self.outline_colour,
            self.outline_width,
            self.margin_v
        )
    }
}

/// Map a colour name to ASS BGR hex; unknown names fall back to white
pub fn colour_to_bgr_hex(name: &str) -> &'static str {
    match name.trim().to_lowercase().as_str() {
        "white" => "FFFFFF",
        "black" => "000000",
        "yellow" => "00FFFF",
        "red" => "0000FF",
        "green" => "00FF00",
        "blue" => "FF0000",
        "cyan" => "FFFF00",
        "magenta" => "FF00FF",
        _ => "FFFFFF",
    }
}
