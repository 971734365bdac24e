//! Subtitler - burn English subtitles into videos with non-English audio
//!
//! Extracts the audio track with ffmpeg, has whisper transcribe and
//! translate it to an SRT file, normalizes the cues and burns them into a
//! re-encoded copy of the video with ffmpeg.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod media;
pub mod observer;
pub mod style;
pub mod subtitle;
pub mod transcribe;
pub mod workflow;
pub mod workspace;
