//! Transcription service responses.
//!
//! The service answers with `{ "segments": [{ "start", "end", "text" }] }`.
//! Bare segment arrays are accepted too, so hand-edited transcripts can
//! skip the wrapper.

use serde::{Deserialize, Serialize};

use captioner_common::error::CaptionResult;
use captioner_model::script::ScriptHint;
use captioner_model::segment::{RawSegment, SegmentStore};

/// A single transcribed segment with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    /// Start time in seconds.
    #[serde(alias = "start_secs")]
    pub start: f64,
    /// End time in seconds.
    #[serde(alias = "end_secs")]
    pub end: f64,
    /// Transcribed text.
    pub text: String,
    /// Script hint, when the service detected one.
    #[serde(default, alias = "scriptHint", skip_serializing_if = "Option::is_none")]
    pub script_hint: Option<ScriptHint>,
    /// Confidence score [0.0, 1.0] (if available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl From<TranscriptionSegment> for RawSegment {
    fn from(segment: TranscriptionSegment) -> Self {
        RawSegment {
            start: segment.start,
            end: segment.end,
            text: segment.text,
            script_hint: segment.script_hint,
        }
    }
}

/// Body of a transcription response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub segments: Vec<TranscriptionSegment>,

    /// Detected language, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseShape {
    Wrapped(TranscriptionResponse),
    Bare(Vec<TranscriptionSegment>),
}

impl TranscriptionResponse {
    /// Parse a response body (wrapped or bare array).
    pub fn from_json(body: &str) -> CaptionResult<Self> {
        let shape: ResponseShape = serde_json::from_str(body)?;
        Ok(match shape {
            ResponseShape::Wrapped(response) => response,
            ResponseShape::Bare(segments) => Self {
                segments,
                language: None,
            },
        })
    }

    pub fn into_raw_segments(self) -> Vec<RawSegment> {
        self.segments.into_iter().map(RawSegment::from).collect()
    }

    /// Validate and normalize into a store.
    pub fn into_store(self) -> CaptionResult<SegmentStore> {
        SegmentStore::load(self.into_raw_segments())
    }
}
