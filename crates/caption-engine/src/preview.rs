//! Interactive preview scheduling.
//!
//! The host player calls in once per frame tick and once per seek. Frames
//! may arrive in any order and repeat; each call maps and composes from
//! scratch, so there is no playback position to keep in sync.

use std::sync::Arc;

use parking_lot::RwLock;

use captioner_common::clock::{FrameIndex, FrameRate};
use captioner_common::error::CaptionResult;
use captioner_model::segment::SegmentStore;
use captioner_model::style::StyleRegistry;

use crate::compositor::Compositor;
use crate::frame_mapper::map_frame;
use crate::plan::{Canvas, DrawPlan};

/// Drives FrameMapper -> Compositor for a preview surface.
#[derive(Debug)]
pub struct PreviewScheduler {
    registry: Arc<StyleRegistry>,
    compositor: Compositor,
    canvas: Canvas,

    /// Current transcript; `None` while transcription is pending.
    segments: RwLock<Option<Arc<SegmentStore>>>,
}

impl PreviewScheduler {
    pub fn new(registry: Arc<StyleRegistry>, compositor: Compositor, canvas: Canvas) -> Self {
        Self {
            registry,
            compositor,
            canvas,
            segments: RwLock::new(None),
        }
    }

    /// Swap in a whole new transcript.
    pub fn replace_segments(&self, store: Arc<SegmentStore>) {
        tracing::debug!(
            segments = store.len(),
            hash = %store.content_hash(),
            "Preview transcript replaced"
        );
        *self.segments.write() = Some(store);
    }

    /// Forget the transcript (e.g. a new video was opened).
    pub fn clear_segments(&self) {
        *self.segments.write() = None;
    }

    /// The transcript currently previewed, if any.
    pub fn segments(&self) -> Option<Arc<SegmentStore>> {
        self.segments.read().clone()
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Draw plan for `frame`.
    ///
    /// Fails only for an unknown style key. Without a transcript, or on
    /// frames no segment covers, the plan is empty.
    pub fn frame(&self, frame: FrameIndex, fps: FrameRate, style_key: &str) -> CaptionResult<DrawPlan> {
        let style = self.registry.resolve(style_key)?;
        let Some(store) = self.segments() else {
            return Ok(DrawPlan::empty(self.canvas));
        };

        let state = map_frame(&store, frame, fps);
        Ok(self.compositor.compose(state.as_ref(), &style, self.canvas))
    }

    /// Draw plan for the frame showing `secs` (seek by time).
    pub fn at_time(&self, secs: f64, fps: FrameRate, style_key: &str) -> CaptionResult<DrawPlan> {
        self.frame(fps.frame_at(secs), fps, style_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use captioner_common::error::CaptionError;
    use captioner_model::segment::RawSegment;

    fn scheduler() -> PreviewScheduler {
        PreviewScheduler::new(
            Arc::new(StyleRegistry::with_builtins()),
            Compositor::estimated(),
            Canvas::hd(),
        )
    }

    fn transcript() -> Arc<SegmentStore> {
        Arc::new(
            SegmentStore::load(vec![
                RawSegment::new(0.0, 2.0, "Hello"),
                RawSegment::new(2.0, 4.0, "दुनिया"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_pending_transcript_is_blank() {
        let preview = scheduler();
        let fps = FrameRate::new(30).unwrap();
        let plan = preview.frame(10, fps, "bottom-centered").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_unknown_style_is_an_error() {
        let preview = scheduler();
        preview.replace_segments(transcript());
        let fps = FrameRate::new(30).unwrap();
        assert!(matches!(
            preview.frame(10, fps, "neon"),
            Err(CaptionError::UnknownStyle { .. })
        ));
    }

    #[test]
    fn test_scrubbing_backward_matches_forward() {
        let preview = scheduler();
        preview.replace_segments(transcript());
        let fps = FrameRate::new(30).unwrap();

        let forward = preview.frame(75, fps, "centered-fade").unwrap();
        let _ = preview.frame(110, fps, "centered-fade").unwrap();
        let _ = preview.frame(3, fps, "centered-fade").unwrap();
        let again = preview.frame(75, fps, "centered-fade").unwrap();
        assert_eq!(forward, again);
    }

    #[test]
    fn test_seek_by_time() {
        let preview = scheduler();
        preview.replace_segments(transcript());
        let fps = FrameRate::new(30).unwrap();

        let plan = preview.at_time(2.5, fps, "bottom-centered").unwrap();
        assert_eq!(plan.frame, Some(75));
        assert_eq!(plan.lines(), vec!["दुनिया".to_string()]);
    }

    #[test]
    fn test_replace_and_clear() {
        let preview = scheduler();
        let fps = FrameRate::new(30).unwrap();
        preview.replace_segments(transcript());
        assert!(!preview.frame(0, fps, "bottom-centered").unwrap().is_empty());

        let replacement =
            Arc::new(SegmentStore::load(vec![RawSegment::new(5.0, 6.0, "later")]).unwrap());
        preview.replace_segments(replacement);
        assert!(preview.frame(0, fps, "bottom-centered").unwrap().is_empty());

        preview.clear_segments();
        assert!(preview.segments().is_none());
    }
}
