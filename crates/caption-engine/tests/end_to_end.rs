use std::sync::Arc;

use captioner_common::clock::FrameRate;
use captioner_engine::{Canvas, Compositor, PreviewScheduler};
use captioner_model::script::Script;
use captioner_model::segment::{RawSegment, SegmentStore};
use captioner_model::style::{Anchor, StyleRegistry, DEVANAGARI_FAMILY, LATIN_FAMILY};

fn hello_world_preview() -> PreviewScheduler {
    let preview = PreviewScheduler::new(
        Arc::new(StyleRegistry::with_builtins()),
        Compositor::estimated(),
        Canvas::hd(),
    );
    let store = SegmentStore::load(vec![
        RawSegment::new(0.0, 2.0, "Hello"),
        RawSegment::new(2.0, 4.0, "दुनिया"),
    ])
    .expect("fixture segments should load");
    preview.replace_segments(Arc::new(store));
    preview
}

#[test]
fn hello_world_bilingual_timeline() {
    let preview = hello_world_preview();
    let fps = FrameRate::new(30).unwrap();
    let registry = StyleRegistry::with_builtins();
    let style = registry.resolve("bottom-centered").unwrap();
    assert_eq!(style.anchor, Anchor::BottomCenter);

    for frame in 0..60 {
        let plan = preview.frame(frame, fps, "bottom-centered").unwrap();
        assert_eq!(plan.lines(), vec!["Hello".to_string()], "frame {frame}");
        let run = &plan.runs[0];
        assert_eq!(run.font_family, LATIN_FAMILY);
        assert!((run.x + run.width / 2.0 - 640.0).abs() < 1e-9);
        assert!(run.y + run.height <= 720.0);
        assert!(run.y > 360.0, "caption should sit in the lower half");
    }

    for frame in 60..120 {
        let plan = preview.frame(frame, fps, "bottom-centered").unwrap();
        assert_eq!(plan.lines(), vec!["दुनिया".to_string()], "frame {frame}");
        assert_eq!(plan.runs[0].script, Script::Devanagari);
        assert_eq!(plan.runs[0].font_family, DEVANAGARI_FAMILY);
    }

    for frame in [120, 121, 500, 10_000] {
        assert!(preview.frame(frame, fps, "bottom-centered").unwrap().is_empty());
    }
}

#[test]
fn shuffled_requests_match_sequential_playback() {
    let preview = hello_world_preview();
    let fps = FrameRate::new(30).unwrap();

    let sequential: Vec<_> = (0..130)
        .map(|f| preview.frame(f, fps, "karaoke-style").unwrap())
        .collect();

    // A deterministic scrub pattern: jumps back and forth, repeats frames.
    let mut frame = 0u64;
    for _ in 0..500 {
        frame = (frame * 37 + 11) % 130;
        let plan = preview.frame(frame, fps, "karaoke-style").unwrap();
        assert_eq!(plan, sequential[frame as usize]);
    }
}
