//! Frame-by-frame caption planning for export.
//!
//! Export runs exactly the preview pipeline (FrameMapper then Compositor)
//! for every frame of the output, so an exported frame always matches the
//! preview of the same frame index. Consecutive frames with identical
//! plans are merged into spans that an encoder can draw in one pass.

use std::ops::Range;

use captioner_common::clock::FrameIndex;
use captioner_engine::{map_frame, Compositor, DrawPlan};

use crate::backend::ExportPayload;

/// A run of frames that all draw the same plan.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSpan {
    /// First frame showing `plan` (inclusive).
    pub first_frame: FrameIndex,
    /// Last frame showing `plan` (inclusive).
    pub last_frame: FrameIndex,
    pub plan: DrawPlan,
}

impl CaptionSpan {
    pub fn frame_count(&self) -> u64 {
        self.last_frame - self.first_frame + 1
    }
}

/// The plan for one export frame.
pub fn frame_plan(payload: &ExportPayload, compositor: &Compositor, frame: FrameIndex) -> DrawPlan {
    let state = map_frame(&payload.segments, frame, payload.fps);
    compositor.compose(state.as_ref(), &payload.style, payload.canvas)
}

/// Plans for every frame in `frames`, in order.
pub fn frame_plans<'a>(
    payload: &'a ExportPayload,
    compositor: &'a Compositor,
    frames: Range<FrameIndex>,
) -> impl Iterator<Item = DrawPlan> + 'a {
    frames.map(move |frame| frame_plan(payload, compositor, frame))
}

/// Non-empty caption spans over the first `total_frames` frames.
///
/// Only frames near each segment are composed; caption-free stretches
/// are skipped. Spans come out in frame order and never overlap.
pub fn caption_spans(
    payload: &ExportPayload,
    compositor: &Compositor,
    total_frames: u64,
) -> Vec<CaptionSpan> {
    let fps = payload.fps;
    let mut spans: Vec<CaptionSpan> = Vec::new();

    for (index, segment) in payload.segments.iter().enumerate() {
        if total_frames == 0 {
            break;
        }
        let first = fps.frame_at(segment.start);
        let last = fps.frame_at(segment.end).saturating_add(1).min(total_frames - 1);
        if first > last {
            continue;
        }

        for frame in first..=last {
            let Some(state) = map_frame(&payload.segments, frame, fps) else {
                continue;
            };
            if state.segment_index != index {
                continue;
            }
            let plan = compositor.compose(Some(&state), &payload.style, payload.canvas);
            if plan.is_empty() {
                continue;
            }

            match spans.last_mut() {
                Some(span) if span.last_frame + 1 == frame && span.plan.same_visual(&plan) => {
                    span.last_frame = frame;
                }
                _ => spans.push(CaptionSpan {
                    first_frame: frame,
                    last_frame: frame,
                    plan,
                }),
            }
        }
    }

    tracing::debug!(
        segments = payload.segments.len(),
        spans = spans.len(),
        total_frames,
        "Planned caption spans"
    );
    spans
}
