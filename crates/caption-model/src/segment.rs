//! Transcript segments and the normalized segment store.
//!
//! The transcription collaborator hands over [`RawSegment`]s in whatever
//! order and shape it produced them. [`SegmentStore::load`] validates,
//! sorts, and clips them into the invariant every consumer relies on:
//! sorted by `start`, non-overlapping, `end > start`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use captioner_common::error::{CaptionError, CaptionResult};

use crate::script::ScriptHint;

/// A transcript record as received from the transcription service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// UTF-8 text, possibly mixing scripts.
    pub text: String,
    /// Optional script hint; detected from the text when absent.
    #[serde(default, alias = "scriptHint", skip_serializing_if = "Option::is_none")]
    pub script_hint: Option<ScriptHint>,
}

impl RawSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            script_hint: None,
        }
    }
}

/// A normalized, immutable transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds (inclusive).
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
    /// Trimmed caption text.
    pub text: String,
    /// Script content of `text`.
    pub script_hint: ScriptHint,
}

impl Segment {
    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` falls in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Sorted, non-overlapping transcript segments.
///
/// Built once per transcription; a new transcription produces a new
/// store rather than mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    content_hash: String,
    clipped: usize,
}

impl SegmentStore {
    /// Validate and normalize raw transcript records.
    ///
    /// Fails with a validation error when any record has a non-finite or
    /// negative time, when `end <= start`, or when two records share a
    /// start time (clipping would leave one of them empty).
    pub fn load(raw: Vec<RawSegment>) -> CaptionResult<Self> {
        let mut indexed = Vec::with_capacity(raw.len());
        for (i, record) in raw.into_iter().enumerate() {
            if !record.start.is_finite() || !record.end.is_finite() {
                return Err(CaptionError::validation(format!(
                    "segment {i} has a non-finite time ({}..{})",
                    record.start, record.end
                )));
            }
            if record.start < 0.0 {
                return Err(CaptionError::validation(format!(
                    "segment {i} starts at negative time {}s",
                    record.start
                )));
            }
            if record.end <= record.start {
                return Err(CaptionError::validation(format!(
                    "segment {i} ends at {}s, not after its start {}s",
                    record.end, record.start
                )));
            }

            let text = record.text.trim().to_string();
            let script_hint = record
                .script_hint
                .unwrap_or_else(|| ScriptHint::detect(&text));
            indexed.push((
                i,
                Segment {
                    start: record.start,
                    end: record.end,
                    text,
                    script_hint,
                },
            ));
        }

        let was_sorted = indexed
            .windows(2)
            .all(|pair| pair[0].1.start <= pair[1].1.start);
        if !was_sorted {
            tracing::debug!(segments = indexed.len(), "Reordering segments by start time");
            indexed.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));
        }

        let mut clipped = 0;
        for i in 1..indexed.len() {
            let (next_index, next_start) = (indexed[i].0, indexed[i].1.start);
            let (prev_index, prev) = &mut indexed[i - 1];
            if prev.end <= next_start {
                continue;
            }
            if next_start <= prev.start {
                return Err(CaptionError::validation(format!(
                    "segments {prev_index} and {next_index} both start at {next_start}s"
                )));
            }
            tracing::warn!(
                segment = *prev_index,
                end = prev.end,
                clipped_to = next_start,
                "Clipping overlapping transcript segment"
            );
            prev.end = next_start;
            clipped += 1;
        }

        let segments: Vec<Segment> = indexed.into_iter().map(|(_, seg)| seg).collect();
        let content_hash = hash_segments(&segments);

        Ok(Self {
            segments,
            content_hash,
            clipped,
        })
    }

    /// A store with no segments (transcription pending or empty).
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            content_hash: hash_segments(&[]),
            clipped: 0,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Index of the segment whose `[start, end)` contains `t`.
    ///
    /// Binary search over the sorted starts: O(log n).
    pub fn index_at(&self, t: f64) -> Option<usize> {
        if !t.is_finite() {
            return None;
        }
        let after = self.segments.partition_point(|s| s.start <= t);
        let candidate = after.checked_sub(1)?;
        self.segments[candidate].contains(t).then_some(candidate)
    }

    /// The segment visible at `t`, if any.
    pub fn segment_at(&self, t: f64) -> Option<&Segment> {
        self.index_at(t).map(|i| &self.segments[i])
    }

    /// End of the last segment (0 when empty).
    pub fn end_secs(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// SHA-256 (hex) of the normalized segments.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// How many segments were clipped to remove overlaps.
    pub fn clipped_count(&self) -> usize {
        self.clipped
    }
}

impl Default for SegmentStore {
    fn default() -> Self {
        Self::empty()
    }
}

fn hash_segments(segments: &[Segment]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((segments.len() as u64).to_le_bytes());
    for seg in segments {
        hasher.update(seg.start.to_bits().to_le_bytes());
        hasher.update(seg.end.to_bits().to_le_bytes());
        hasher.update((seg.text.len() as u64).to_le_bytes());
        hasher.update(seg.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(start: f64, end: f64, text: &str) -> RawSegment {
        RawSegment::new(start, end, text)
    }

    #[test]
    fn test_load_sorts_and_detects_scripts() {
        let store = SegmentStore::load(vec![
            raw(2.0, 4.0, " दुनिया "),
            raw(0.0, 2.0, "Hello"),
        ])
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.segments()[0].text, "Hello");
        assert_eq!(store.segments()[0].script_hint, ScriptHint::Latin);
        assert_eq!(store.segments()[1].text, "दुनिया");
        assert_eq!(store.segments()[1].script_hint, ScriptHint::Devanagari);
        assert_eq!(store.clipped_count(), 0);
    }

    #[test]
    fn test_explicit_hint_is_kept() {
        let mut record = raw(0.0, 1.0, "namaste");
        record.script_hint = Some(ScriptHint::Mixed);
        let store = SegmentStore::load(vec![record]).unwrap();
        assert_eq!(store.segments()[0].script_hint, ScriptHint::Mixed);
    }

    #[test]
    fn test_overlap_is_clipped() {
        let store = SegmentStore::load(vec![raw(0.0, 2.5, "a"), raw(2.0, 4.0, "b")]).unwrap();
        assert_eq!(store.segments()[0].end, 2.0);
        assert_eq!(store.clipped_count(), 1);
    }

    #[test]
    fn test_rejects_malformed_records() {
        assert!(matches!(
            SegmentStore::load(vec![raw(1.0, 1.0, "zero length")]),
            Err(CaptionError::Validation { .. })
        ));
        assert!(SegmentStore::load(vec![raw(2.0, 1.0, "backwards")]).is_err());
        assert!(SegmentStore::load(vec![raw(-0.5, 1.0, "negative")]).is_err());
        assert!(SegmentStore::load(vec![raw(f64::NAN, 1.0, "nan")]).is_err());
        assert!(SegmentStore::load(vec![raw(0.0, f64::INFINITY, "inf")]).is_err());
    }

    #[test]
    fn test_rejects_shared_start() {
        let err = SegmentStore::load(vec![raw(1.0, 2.0, "a"), raw(1.0, 3.0, "b")]).unwrap_err();
        assert!(err.to_string().contains("both start at"));
    }

    #[test]
    fn test_segment_at_uses_half_open_ranges() {
        let store = SegmentStore::load(vec![raw(1.0, 3.0, "a"), raw(5.0, 6.0, "b")]).unwrap();
        assert!(store.segment_at(0.99).is_none());
        assert_eq!(store.segment_at(1.0).unwrap().text, "a");
        assert_eq!(store.segment_at(2.999).unwrap().text, "a");
        assert!(store.segment_at(3.0).is_none());
        assert!(store.segment_at(4.0).is_none());
        assert_eq!(store.index_at(5.5), Some(1));
        assert!(store.segment_at(6.0).is_none());
        assert!(store.segment_at(f64::NAN).is_none());
        assert_eq!(store.end_secs(), 6.0);
    }

    #[test]
    fn test_content_hash_tracks_content() {
        let a = SegmentStore::load(vec![raw(0.0, 1.0, "hi")]).unwrap();
        let b = SegmentStore::load(vec![raw(0.0, 1.0, "hi")]).unwrap();
        let c = SegmentStore::load(vec![raw(0.0, 1.0, "hey")]).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(a.content_hash().len(), 64);
        assert_ne!(SegmentStore::empty().content_hash(), a.content_hash());
    }

    #[test]
    fn test_raw_segment_accepts_camel_case_hint() {
        let json = r#"{"start":0,"end":1.5,"text":"नमस्ते","scriptHint":"devanagari"}"#;
        let record: RawSegment = serde_json::from_str(json).unwrap();
        assert_eq!(record.script_hint, Some(ScriptHint::Devanagari));
    }

    fn arb_segments() -> impl Strategy<Value = Vec<RawSegment>> {
        prop::collection::vec((1u32..50, 1u32..50), 0..40).prop_map(|pairs| {
            let mut t = 0.0;
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (gap, len))| {
                    let start = t + gap as f64 / 10.0;
                    let end = start + len as f64 / 10.0;
                    t = end;
                    RawSegment::new(start, end, format!("segment {i}"))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_binary_search_matches_linear_scan(raw in arb_segments(), t in 0.0f64..300.0) {
            let store = SegmentStore::load(raw).unwrap();
            let linear = store.segments().iter().position(|s| s.contains(t));
            prop_assert_eq!(store.index_at(t), linear);
        }

        #[test]
        fn prop_loaded_store_is_sorted_and_disjoint(mut raw in arb_segments(), seed in any::<u64>()) {
            let len = raw.len().max(1);
            raw.rotate_left((seed as usize) % len);
            let store = SegmentStore::load(raw).unwrap();
            for pair in store.segments().windows(2) {
                prop_assert!(pair[0].start < pair[1].start);
                prop_assert!(pair[0].end <= pair[1].start);
            }
        }
    }
}
