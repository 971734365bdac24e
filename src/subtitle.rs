use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::config::{StyleConfig, SubtitleConfig};
use crate::error::{Result, SubtitlerError};
use crate::style::{RenderParameters, SubtitleStyle};

/// One timed subtitle entry. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl Cue {
    pub fn new<S: Into<String>>(index: usize, start_ms: u64, end_ms: u64, text: S) -> Self {
        Self {
            index,
            start_ms,
            end_ms,
            text: text.into(),
        }
    }
}

/// Result of timing normalization
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub cues: Vec<Cue>,
    /// Cues whose start was moved to the end of the previous cue
    pub clamped: usize,
    /// Cues removed because they had no text or no duration left
    pub dropped: usize,
}

/// Parse SRT content into cues.
///
/// Accepts CRLF line endings, a leading BOM, a missing index line and `.`
/// as the millisecond separator. Anything else that is not a cue block is
/// an error.
pub fn parse_srt(content: &str) -> Result<Vec<Cue>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();

    for (block_no, block) in split_blocks(&content).into_iter().enumerate() {
        let mut lines = block.iter().copied();

        let first = lines.next().unwrap_or_default();
        let (index, timing) = if first.contains("-->") {
            (block_no + 1, first)
        } else {
            let index = first.trim().parse::<usize>().map_err(|_| {
                SubtitlerError::SubtitleFormat(format!(
                    "block {}: invalid subtitle index '{}'",
                    block_no + 1,
                    first.trim()
                ))
            })?;
            let timing = lines.next().ok_or_else(|| {
                SubtitlerError::SubtitleFormat(format!("block {}: missing timing line", block_no + 1))
            })?;
            (index, timing)
        };

        let (start_ms, end_ms) = parse_timing_line(timing).ok_or_else(|| {
            SubtitlerError::SubtitleFormat(format!(
                "block {}: invalid timestamp line '{}'",
                block_no + 1,
                timing.trim()
            ))
        })?;

        let text = lines.map(str::trim).collect::<Vec<_>>().join("\n");
        cues.push(Cue::new(index, start_ms, end_ms, text));
    }

    Ok(cues)
}

/// Read and parse an SRT file
pub async fn parse_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<Cue>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await.map_err(|e| {
        SubtitlerError::SubtitleFormat(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_srt(&content)
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn parse_timing_line(line: &str) -> Option<(u64, u64)> {
    let (start, rest) = line.split_once("-->")?;
    // Anything after the end timestamp (position hints) is ignored
    let end = rest.split_whitespace().next()?;
    Some((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// Parse `HH:MM:SS,mmm` into milliseconds
pub fn parse_timestamp(value: &str) -> Option<u64> {
    let (clock, millis) = value.split_once([',', '.'])?;
    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    if millis.is_empty() || millis.len() > 3 || !millis.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // "5" after the separator means 500 ms
    let millis: u64 = format!("{:0<3}", millis).parse().ok()?;

    // Overflow makes the timestamp invalid
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

/// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt_time(total_milliseconds: u64) -> String {
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render cues as SRT, numbering them from 1
pub fn to_srt(cues: &[Cue]) -> String {
    let mut srt_content = String::new();

    for (index, cue) in cues.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(cue.start_ms),
            format_srt_time(cue.end_ms),
            cue.text.trim()
        ));
    }

    srt_content
}

/// Write cues to an SRT file
pub async fn write_srt<P: AsRef<Path>>(cues: &[Cue], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    debug!("Writing {} cues to {}", cues.len(), output_path.display());

    fs::write(output_path, to_srt(cues)).await?;
    Ok(())
}

/// Shift and scale every timestamp, never going below zero
pub fn adjust_timing(cues: &mut [Cue], offset_ms: i64, scale: f64) {
    if offset_ms == 0 && scale == 1.0 {
        return;
    }

    let adjust = |t: u64| -> u64 {
        let scaled = (t as f64 * scale).round() as i64;
        scaled.saturating_add(offset_ms).max(0) as u64
    };

    for cue in cues.iter_mut() {
        cue.start_ms = adjust(cue.start_ms);
        cue.end_ms = adjust(cue.end_ms);
    }
}

/// Order cues by start, resolve overlaps by clamping the later start to the
/// earlier end, and drop cues without text or duration. Cues in the result
/// have strictly increasing starts and never overlap.
pub fn normalize_cues(mut cues: Vec<Cue>) -> Normalized {
    let mut report = Normalized::default();

    cues.sort_by_key(|cue| cue.start_ms);

    for mut cue in cues {
        cue.text = cue.text.trim().to_string();
        if cue.text.is_empty() {
            report.dropped += 1;
            continue;
        }

        if let Some(previous) = report.cues.last() {
            if cue.start_ms < previous.end_ms {
                cue.start_ms = previous.end_ms;
                report.clamped += 1;
            }
        }

        if cue.end_ms <= cue.start_ms {
            debug!("Dropping cue {} with no remaining duration", cue.index);
            report.dropped += 1;
            continue;
        }

        report.cues.push(cue);
    }

    for (i, cue) in report.cues.iter_mut().enumerate() {
        cue.index = i + 1;
    }

    report
}

/// Validates and rewrites the subtitle artifact, and turns job styling into
/// render parameters for the composition stage
pub struct SubtitleProcessor {
    timing: SubtitleConfig,
    style: StyleConfig,
}

impl SubtitleProcessor {
    pub fn new(timing: SubtitleConfig, style: StyleConfig) -> Self {
        Self { timing, style }
    }

    /// Normalize the artifact at `subtitle_path` in place
    pub async fn normalize(&self, subtitle_path: &Path, style: &SubtitleStyle) -> Result<RenderParameters> {
        info!("Normalizing subtitles: {}", subtitle_path.display());

        let mut cues = parse_srt_file(subtitle_path).await?;
        let parsed = cues.len();

        adjust_timing(&mut cues, self.timing.offset_ms, self.timing.time_scale);
        let normalized = normalize_cues(cues);

        if normalized.cues.is_empty() {
            return Err(SubtitlerError::SubtitleFormat(format!(
                "{} contains no usable cues ({} parsed)",
                subtitle_path.display(),
                parsed
            )));
        }

        info!(
            "Subtitles normalized: {} cues kept, {} clamped, {} dropped",
            normalized.cues.len(),
            normalized.clamped,
            normalized.dropped
        );

        write_srt(&normalized.cues, subtitle_path).await?;

        Ok(RenderParameters::new(style, &self.style))
    }
}
