//! Frame index -> active caption state.
//!
//! The mapping is a pure function of `(store, frame, fps)`. The frame's
//! timestamp is computed from its index every time; no state survives
//! between calls, so scrubbing backwards costs the same as playing forward
//! and always yields the same answer.

use captioner_common::clock::{FrameIndex, FrameRate};
use captioner_model::segment::{Segment, SegmentStore};

/// The caption visible on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionState<'a> {
    /// Frame this state was computed for.
    pub frame: FrameIndex,

    /// Timestamp of the frame in seconds.
    pub time_secs: f64,

    /// Index of the active segment in the store.
    pub segment_index: usize,

    /// The active segment.
    pub segment: &'a Segment,

    /// Position within the segment, in `[0, 1]`. Drives animation.
    pub progress: f64,
}

/// Map a frame to the caption visible on it.
///
/// Returns `None` when no segment covers the frame; that is the common
/// case between sentences and after the transcript ends, not an error.
pub fn map_frame(store: &SegmentStore, frame: FrameIndex, fps: FrameRate) -> Option<CaptionState<'_>> {
    let time_secs = fps.time_of_frame(frame);
    let segment_index = store.index_at(time_secs)?;
    let segment = store.get(segment_index)?;
    let progress = ((time_secs - segment.start) / segment.duration()).clamp(0.0, 1.0);

    Some(CaptionState {
        frame,
        time_secs,
        segment_index,
        segment,
        progress,
    })
}

/// Map a timestamp to the caption on the frame that shows it.
///
/// The timestamp is floored onto the frame grid first, so every time
/// inside a frame's interval yields that frame's state.
pub fn map_time(store: &SegmentStore, secs: f64, fps: FrameRate) -> Option<CaptionState<'_>> {
    map_frame(store, fps.frame_at(secs), fps)
}
