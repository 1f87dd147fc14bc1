//! Captioner Transcript Boundary
//!
//! Everything that turns outside transcript data into segments and back:
//! - **Transcription responses:** the `{ "segments": [...] }` JSON a
//!   transcription service returns
//! - **Subtitles:** SRT/WebVTT generation and parsing

pub mod subtitles;
pub mod transcription;

pub use subtitles::*;
pub use transcription::*;

use std::path::Path;

use captioner_common::error::{CaptionError, CaptionResult};
use captioner_model::segment::{RawSegment, SegmentStore};

/// Read raw segments from a `.json`, `.srt`, or `.vtt` file.
pub fn read_raw_segments(path: &Path) -> CaptionResult<Vec<RawSegment>> {
    if !path.exists() {
        return Err(CaptionError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let raw = match extension.as_deref() {
        Some("srt") => parse_srt(&content)?,
        Some("vtt") => parse_vtt(&content)?,
        _ => TranscriptionResponse::from_json(&content)?.into_raw_segments(),
    };
    tracing::debug!(path = %path.display(), segments = raw.len(), "Read transcript file");
    Ok(raw)
}

/// Read and normalize a transcript file into a [`SegmentStore`].
pub fn load_segments(path: &Path) -> CaptionResult<SegmentStore> {
    let store = SegmentStore::load(read_raw_segments(path)?)?;
    tracing::info!(
        path = %path.display(),
        segments = store.len(),
        clipped = store.clipped_count(),
        "Loaded transcript"
    );
    Ok(store)
}
