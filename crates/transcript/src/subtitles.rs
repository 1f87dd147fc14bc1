//! Subtitle generation and parsing in SRT and VTT formats.

use std::path::Path;

use captioner_common::error::{CaptionError, CaptionResult};
use captioner_model::segment::{RawSegment, Segment};

/// Generate SRT subtitle content from segments.
pub fn generate_srt(segments: &[Segment]) -> String {
    let mut output = String::new();

    for (i, segment) in segments.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(segment.start),
            format_srt_time(segment.end),
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content from segments.
pub fn generate_vtt(segments: &[Segment]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for segment in segments {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end),
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }

    output
}

fn split_millis(secs: f64) -> (u64, u64, u64, u64) {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Parse `[HH:]MM:SS(,|.)mmm` into seconds.
fn parse_timestamp(value: &str) -> Option<f64> {
    let (clock, millis) = value.trim().rsplit_once([',', '.'])?;
    if millis.is_empty() || !millis.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let fraction = format!("0.{millis}").parse::<f64>().ok()?;

    let parts: Vec<u64> = clock
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<_>>()?;
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some((hours * 3600 + minutes * 60 + seconds) as f64 + fraction)
}

/// Parse a `start --> end [settings]` cue timing line.
fn parse_timing(line: &str, line_no: usize) -> CaptionResult<(f64, f64)> {
    let malformed = || CaptionError::validation(format!("line {line_no}: malformed cue timing '{line}'"));
    let (start, rest) = line.split_once("-->").ok_or_else(malformed)?;
    // VTT cue settings may follow the end time.
    let end = rest.split_whitespace().next().ok_or_else(malformed)?;
    Ok((
        parse_timestamp(start).ok_or_else(malformed)?,
        parse_timestamp(end).ok_or_else(malformed)?,
    ))
}

/// Cue blocks as (first line number, lines).
fn blocks(content: &str) -> Vec<(usize, Vec<&str>)> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut first_line = 0;
    for (i, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push((first_line, std::mem::take(&mut current)));
            }
            continue;
        }
        if current.is_empty() {
            first_line = i + 1;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push((first_line, current));
    }
    blocks
}

fn cues(blocks: Vec<(usize, Vec<&str>)>) -> CaptionResult<Vec<RawSegment>> {
    let mut segments = Vec::new();
    for (first_line, lines) in blocks {
        // An optional identifier line precedes the timing line.
        let Some(timing_at) = lines.iter().take(2).position(|l| l.contains("-->")) else {
            return Err(CaptionError::validation(format!(
                "line {first_line}: cue without a timing line"
            )));
        };
        let (start, end) = parse_timing(lines[timing_at], first_line + timing_at)?;
        let text = lines[timing_at + 1..]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join(" ");
        segments.push(RawSegment::new(start, end, text));
    }
    Ok(segments)
}

/// Parse SRT content into raw segments.
pub fn parse_srt(content: &str) -> CaptionResult<Vec<RawSegment>> {
    let content = content.trim_start_matches('\u{feff}');
    cues(blocks(content))
}

/// Parse WebVTT content into raw segments.
///
/// `NOTE`, `STYLE`, and `REGION` blocks are skipped.
pub fn parse_vtt(content: &str) -> CaptionResult<Vec<RawSegment>> {
    let content = content.trim_start_matches('\u{feff}');
    let mut all = blocks(content).into_iter();
    match all.next() {
        Some((_, header)) if header[0].starts_with("WEBVTT") => {}
        _ => return Err(CaptionError::validation("missing WEBVTT header")),
    }

    let cue_blocks = all
        .filter(|(_, lines)| {
            !["NOTE", "STYLE", "REGION"]
                .iter()
                .any(|kw| lines[0] == *kw || lines[0].starts_with(&format!("{kw} ")))
        })
        .collect();
    cues(cue_blocks)
}

/// Save subtitles to a file. The format follows the extension (SRT by default).
pub fn save_subtitles(segments: &[Segment], path: &Path) -> CaptionResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(segments),
        _ => generate_srt(segments), // default to SRT
    };
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), cues = segments.len(), "Saved subtitles");
    Ok(())
}
