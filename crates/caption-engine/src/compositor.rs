//! Caption compositor: caption state + style + canvas -> draw plan.
//!
//! Steps, all pure:
//! 1. Greedy line breaking at whitespace to fit `max_width_fraction` of
//!    the canvas. A word wider than a line is cut between clusters only.
//! 2. Each line is split into script runs, each run set in the family the
//!    style assigns to its script (or the fallback family).
//! 3. Lines are aligned horizontally and the block is placed vertically
//!    per the style's anchor.
//! 4. Segment progress drives opacity (fade) or a vertical offset (slide).

use std::sync::Arc;

use captioner_common::error::CaptionError;
use captioner_model::script::Script;
use captioner_model::style::{Animation, HorizontalAlign, StyleDefinition, VerticalAlign};

use crate::cluster::{clusters, script_runs};
use crate::frame_mapper::CaptionState;
use crate::layout::{EstimatedTextLayout, TextLayout};
use crate::plan::{Canvas, DrawPlan, TextRun};

/// Fraction of the segment spent fading in (and, mirrored, fading out).
const FADE_EDGE: f64 = 0.1;

/// Progress at which a slide-up caption has settled.
const SLIDE_SETTLE: f64 = 0.15;

/// Slide-up start offset, in line heights below the resting position.
const SLIDE_DISTANCE_LINES: f64 = 0.5;

/// Lays out captions through a [`TextLayout`] capability.
#[derive(Clone)]
pub struct Compositor {
    layout: Arc<dyn TextLayout>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor").finish_non_exhaustive()
    }
}

impl Compositor {
    pub fn new(layout: Arc<dyn TextLayout>) -> Self {
        Self { layout }
    }

    /// A compositor using [`EstimatedTextLayout`] metrics.
    pub fn estimated() -> Self {
        Self::new(Arc::new(EstimatedTextLayout::default()))
    }

    pub fn layout(&self) -> &dyn TextLayout {
        self.layout.as_ref()
    }

    /// Build the draw plan for one frame.
    ///
    /// `None` (no caption on this frame) yields an empty plan. A script
    /// without a usable font family is drawn in the fallback family and
    /// logged; it never aborts the frame.
    pub fn compose(
        &self,
        state: Option<&CaptionState<'_>>,
        style: &StyleDefinition,
        canvas: Canvas,
    ) -> DrawPlan {
        let Some(state) = state else {
            return DrawPlan::empty(canvas);
        };

        let font_size = style.typography.font_size_px;
        let line_height = style.line_height_px();
        let max_width = style.max_width_fraction * canvas.width as f64;

        let mut fonts = FontResolver::new(style, self.layout.as_ref());
        let lines = self.wrap_lines(&state.segment.text, &mut fonts, font_size, max_width);
        if lines.is_empty() {
            return DrawPlan {
                frame: Some(state.frame),
                ..DrawPlan::empty(canvas)
            };
        }

        let (opacity, y_offset) = animate(style.animation, state.progress, line_height);

        let width = canvas.width as f64;
        let height = canvas.height as f64;
        let margin_x = style.margin_fraction * width;
        let margin_y = style.margin_fraction * height;
        let block_height = lines.len() as f64 * line_height;
        let top = match style.anchor.vertical() {
            VerticalAlign::Top => margin_y,
            VerticalAlign::Middle => (height - block_height) / 2.0,
            VerticalAlign::Bottom => height - margin_y - block_height,
        };

        let mut runs = Vec::new();
        for (line_index, line) in lines.iter().enumerate() {
            let pieces: Vec<(Script, &str, String, bool, f64)> = script_runs(line)
                .into_iter()
                .map(|(script, text)| {
                    let (family, fallback) = fonts.family(script);
                    let advance = self.layout.advance(text, &family, font_size);
                    (script, text, family, fallback, advance)
                })
                .collect();
            let line_width: f64 = pieces.iter().map(|p| p.4).sum();

            let mut x = match style.anchor.horizontal() {
                HorizontalAlign::Left => margin_x,
                HorizontalAlign::Center => (width - line_width) / 2.0,
                HorizontalAlign::Right => width - margin_x - line_width,
            };
            let y = top + line_index as f64 * line_height + y_offset;

            for (script, text, font_family, fallback, advance) in pieces {
                runs.push(TextRun {
                    text: text.to_string(),
                    script,
                    font_family,
                    font_size_px: font_size,
                    x,
                    y,
                    width: advance,
                    height: line_height,
                    line_index,
                    fill_color: style.fill_color.clone(),
                    stroke_color: style.stroke_color.clone(),
                    stroke_width_px: style.stroke_width_px,
                    fallback,
                });
                x += advance;
            }
        }

        tracing::trace!(
            frame = state.frame,
            style = %style.key,
            lines = lines.len(),
            opacity,
            "Composed caption frame"
        );

        DrawPlan {
            canvas,
            frame: Some(state.frame),
            opacity,
            y_offset,
            runs,
        }
    }

    /// Width of `text` with each script run in its resolved family.
    fn measure(&self, text: &str, fonts: &mut FontResolver<'_>, font_size: f64) -> f64 {
        script_runs(text)
            .into_iter()
            .map(|(script, run)| {
                let (family, _) = fonts.family(script);
                self.layout.advance(run, &family, font_size)
            })
            .sum()
    }

    /// Greedy whitespace line breaking.
    fn wrap_lines(
        &self,
        text: &str,
        fonts: &mut FontResolver<'_>,
        font_size: f64,
        max_width: f64,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            if !current.is_empty() {
                let candidate = format!("{current} {word}");
                if self.measure(&candidate, fonts, font_size) <= max_width {
                    current = candidate;
                    continue;
                }
                lines.push(std::mem::take(&mut current));
            }

            if self.measure(word, fonts, font_size) <= max_width {
                current = word.to_string();
                continue;
            }

            // Too wide for any line: cut between clusters, keeping at
            // least one cluster per line.
            let mut piece = String::new();
            for cluster in clusters(word) {
                if !piece.is_empty() {
                    let candidate = format!("{piece}{cluster}");
                    if self.measure(&candidate, fonts, font_size) > max_width {
                        lines.push(std::mem::take(&mut piece));
                    }
                }
                piece.push_str(cluster);
            }
            current = piece;
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Resolves (and memoizes, per frame) the family used for each script.
struct FontResolver<'a> {
    style: &'a StyleDefinition,
    layout: &'a dyn TextLayout,
    resolved: Vec<(Script, String, bool)>,
}

impl<'a> FontResolver<'a> {
    fn new(style: &'a StyleDefinition, layout: &'a dyn TextLayout) -> Self {
        Self {
            style,
            layout,
            resolved: Vec::with_capacity(2),
        }
    }

    /// `(family, used_fallback)` for `script`.
    fn family(&mut self, script: Script) -> (String, bool) {
        if let Some((_, family, fallback)) = self.resolved.iter().find(|(s, _, _)| *s == script) {
            return (family.clone(), *fallback);
        }

        let typography = &self.style.typography;
        let resolved = match typography.family_for(script) {
            Some(family) if self.layout.has_family(family) => (family.to_string(), false),
            wanted => {
                let err = CaptionError::UnsupportedScript {
                    script: script.to_string(),
                    family: wanted.unwrap_or("<unassigned>").to_string(),
                };
                tracing::warn!(
                    error = %err,
                    style = %self.style.key,
                    fallback = %typography.fallback_family,
                    "Drawing run with fallback font family"
                );
                (typography.fallback_family.clone(), true)
            }
        };

        self.resolved
            .push((script, resolved.0.clone(), resolved.1));
        resolved
    }
}

/// Smoothstep ease on `[0, 1]`.
fn ease(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Cubic ease-out on `[0, 1]`.
fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// `(opacity, y_offset)` for an animation at `progress`.
pub fn animate(animation: Animation, progress: f64, line_height: f64) -> (f64, f64) {
    let progress = progress.clamp(0.0, 1.0);
    match animation {
        Animation::None => (1.0, 0.0),
        Animation::Fade => {
            let opacity = if progress < FADE_EDGE {
                ease(progress / FADE_EDGE)
            } else if progress > 1.0 - FADE_EDGE {
                ease((1.0 - progress) / FADE_EDGE)
            } else {
                1.0
            };
            (opacity, 0.0)
        }
        Animation::SlideUp => {
            let distance = SLIDE_DISTANCE_LINES * line_height;
            let offset = if progress >= SLIDE_SETTLE {
                0.0
            } else {
                distance * (1.0 - ease_out(progress / SLIDE_SETTLE))
            };
            (1.0, offset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::is_devanagari_mark;
    use captioner_model::segment::{RawSegment, SegmentStore};
    use captioner_model::style::{Anchor, StyleRegistry, DEVANAGARI_FAMILY, LATIN_FAMILY};
    use proptest::prelude::*;

    fn style(key: &str) -> Arc<StyleDefinition> {
        StyleRegistry::with_builtins().resolve(key).unwrap()
    }

    fn single(text: &str) -> SegmentStore {
        SegmentStore::load(vec![RawSegment::new(0.0, 10.0, text)]).unwrap()
    }

    fn state<'a>(store: &'a SegmentStore, progress: f64) -> CaptionState<'a> {
        let segment = store.get(0).unwrap();
        CaptionState {
            frame: 42,
            time_secs: segment.start + progress * segment.duration(),
            segment_index: 0,
            segment,
            progress,
        }
    }

    #[test]
    fn test_no_caption_is_empty_plan() {
        let plan = Compositor::estimated().compose(None, &style("bottom-centered"), Canvas::hd());
        assert!(plan.is_empty());
        assert_eq!(plan.frame, None);
    }

    #[test]
    fn test_whitespace_only_text_draws_nothing() {
        let store = single("   ");
        let plan =
            Compositor::estimated().compose(Some(&state(&store, 0.5)), &style("bottom-centered"), Canvas::hd());
        assert!(plan.is_empty());
        assert_eq!(plan.frame, Some(42));
    }

    #[test]
    fn test_bottom_centered_single_line() {
        let store = single("Hello");
        let style = style("bottom-centered");
        let plan = Compositor::estimated().compose(Some(&state(&store, 0.5)), &style, Canvas::hd());

        assert_eq!(plan.runs.len(), 1);
        let run = &plan.runs[0];
        assert_eq!(run.text, "Hello");
        assert_eq!(run.font_family, LATIN_FAMILY);
        assert!(!run.fallback);
        assert!((run.x + run.width / 2.0 - 640.0).abs() < 1e-9);
        let expected_top = 720.0 - 0.08 * 720.0 - style.line_height_px();
        assert!((run.y - expected_top).abs() < 1e-9);
        assert_eq!(plan.opacity, 1.0);
    }

    #[test]
    fn test_mixed_script_line_has_contiguous_runs() {
        let store = single("Hello दुनिया");
        let plan = Compositor::estimated().compose(
            Some(&state(&store, 0.5)),
            &style("bottom-centered"),
            Canvas::hd(),
        );

        assert_eq!(plan.runs.len(), 2);
        assert_eq!(plan.runs[0].script, Script::Latin);
        assert_eq!(plan.runs[1].script, Script::Devanagari);
        assert_eq!(plan.runs[1].font_family, DEVANAGARI_FAMILY);
        assert!((plan.runs[0].x + plan.runs[0].width - plan.runs[1].x).abs() < 1e-9);
        assert_eq!(plan.lines(), vec!["Hello दुनिया".to_string()]);
    }

    #[test]
    fn test_long_text_wraps_within_width() {
        let text = "this caption is far too long to ever fit on a single line of a small canvas";
        let store = single(text);
        let style = style("bottom-centered");
        let canvas = Canvas::new(640, 360).unwrap();
        let plan = Compositor::estimated().compose(Some(&state(&store, 0.5)), &style, canvas);

        assert!(plan.line_count() > 1);
        assert_eq!(plan.lines().join(" "), text);

        let max_width = style.max_width_fraction * 640.0;
        for line in 0..plan.line_count() {
            let width: f64 = plan
                .runs
                .iter()
                .filter(|r| r.line_index == line)
                .map(|r| r.width)
                .sum();
            assert!(width <= max_width + 1e-9);
        }

        // Bottom anchored: the last line sits on the margin.
        let last = plan.runs.last().unwrap();
        assert!((last.y + last.height - (360.0 - 0.08 * 360.0)).abs() < 1e-9);
    }

    #[test]
    fn test_anchor_placement() {
        let store = single("Hi");
        let compositor = Compositor::estimated();
        let canvas = Canvas::hd();

        let top = compositor.compose(Some(&state(&store, 0.5)), &style("top-centered"), canvas);
        assert!((top.runs[0].y - 0.08 * 720.0).abs() < 1e-9);

        let center = compositor.compose(Some(&state(&store, 0.5)), &style("centered-fade"), canvas);
        let run = &center.runs[0];
        assert!((run.y + run.height / 2.0 - 360.0).abs() < 1e-9);

        let left = compositor.compose(Some(&state(&store, 0.5)), &style("lower-left"), canvas);
        assert!((left.runs[0].x - 0.06 * 1280.0).abs() < 1e-9);

        let mut right_style = (*style("lower-left")).clone();
        right_style.anchor = Anchor::BottomRight;
        let right = compositor.compose(Some(&state(&store, 0.5)), &right_style, canvas);
        let run = &right.runs[0];
        assert!((run.x + run.width - (1280.0 - 0.06 * 1280.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_family_falls_back() {
        let store = single("नमस्ते world");
        let mut style = (*style("bottom-centered")).clone();
        style.typography.families.remove(&Script::Devanagari);

        let plan = Compositor::estimated().compose(Some(&state(&store, 0.5)), &style, Canvas::hd());
        assert_eq!(plan.runs.len(), 2);
        assert!(plan.runs[0].fallback);
        assert_eq!(plan.runs[0].font_family, LATIN_FAMILY);
        assert!(!plan.runs[1].fallback);
    }

    #[test]
    fn test_family_unknown_to_layout_falls_back() {
        let store = single("दुनिया");
        let layout = Arc::new(EstimatedTextLayout::new([LATIN_FAMILY]));
        let plan = Compositor::new(layout).compose(
            Some(&state(&store, 0.5)),
            &style("bottom-centered"),
            Canvas::hd(),
        );
        assert!(plan.runs[0].fallback);
        assert_eq!(plan.runs[0].font_family, LATIN_FAMILY);
    }

    #[test]
    fn test_fade_curve() {
        let (o, y) = animate(Animation::Fade, 0.0, 50.0);
        assert_eq!((o, y), (0.0, 0.0));
        assert!((animate(Animation::Fade, 0.05, 50.0).0 - 0.5).abs() < 1e-9);
        assert_eq!(animate(Animation::Fade, 0.1, 50.0).0, 1.0);
        assert_eq!(animate(Animation::Fade, 0.5, 50.0).0, 1.0);
        assert_eq!(animate(Animation::Fade, 0.9, 50.0).0, 1.0);
        assert!((animate(Animation::Fade, 0.95, 50.0).0 - 0.5).abs() < 1e-9);
        assert_eq!(animate(Animation::Fade, 1.0, 50.0).0, 0.0);
    }

    #[test]
    fn test_slide_up_settles_by_fifteen_percent() {
        assert_eq!(animate(Animation::SlideUp, 0.0, 50.0), (1.0, 25.0));
        assert_eq!(animate(Animation::SlideUp, 0.15, 50.0), (1.0, 0.0));
        assert_eq!(animate(Animation::SlideUp, 0.8, 50.0), (1.0, 0.0));
        let mut previous = f64::INFINITY;
        for step in 0..=15 {
            let (_, offset) = animate(Animation::SlideUp, step as f64 / 100.0, 50.0);
            assert!(offset <= previous);
            previous = offset;
        }
    }

    #[test]
    fn test_slide_offset_is_applied_to_runs() {
        let store = single("Hey");
        let compositor = Compositor::estimated();
        let style = style("karaoke-style");
        let start = compositor.compose(Some(&state(&store, 0.0)), &style, Canvas::hd());
        let settled = compositor.compose(Some(&state(&store, 0.5)), &style, Canvas::hd());
        assert!((start.runs[0].y - settled.runs[0].y - start.y_offset).abs() < 1e-9);
        assert!(start.y_offset > 0.0);
    }

    const CONSONANTS: &[&str] = &["क", "ष", "त", "र", "न", "द", "ह", "श", "य", "म"];
    const MATRAS: &[&str] = &["", "ा", "ि", "ी", "ु", "े", "ं"];

    fn arb_syllable() -> impl Strategy<Value = String> {
        (
            prop::sample::select(CONSONANTS),
            prop::option::of(prop::sample::select(CONSONANTS)),
            prop::sample::select(MATRAS),
        )
            .prop_map(|(c, conjunct, matra)| match conjunct {
                Some(second) => format!("{c}\u{094D}{second}{matra}"),
                None => format!("{c}{matra}"),
            })
    }

    fn arb_devanagari_text() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::collection::vec(arb_syllable(), 1..14), 1..6)
            .prop_map(|words| {
                words
                    .into_iter()
                    .map(|w| w.concat())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
    }

    proptest! {
        #[test]
        fn prop_never_splits_a_cluster(text in arb_devanagari_text(), fraction in 0.01f64..=1.0) {
            let store = single(&text);
            let mut style = (*style("bottom-centered")).clone();
            style.max_width_fraction = fraction;
            let plan = Compositor::estimated().compose(
                Some(&state(&store, 0.5)),
                &style,
                Canvas::new(320, 240).unwrap(),
            );

            let lines = plan.lines();
            for line in &lines {
                let first = line.chars().next().unwrap();
                prop_assert!(!is_devanagari_mark(first), "line {:?} starts mid-cluster", line);
                prop_assert!(!line.ends_with('\u{094D}'), "line {:?} ends on a virama", line);
            }

            let original: Vec<&str> = clusters(&text).into_iter().filter(|c| !c.trim().is_empty()).collect();
            let rebuilt: Vec<&str> = lines
                .iter()
                .flat_map(|line| clusters(line))
                .filter(|c| !c.trim().is_empty())
                .collect();
            prop_assert_eq!(rebuilt, original);
        }

        #[test]
        fn prop_compose_is_deterministic(progress in 0.0f64..1.0) {
            let store = single("Hello दुनिया, kaise ho?");
            let style = style("centered-fade");
            let compositor = Compositor::estimated();
            let a = compositor.compose(Some(&state(&store, progress)), &style, Canvas::hd());
            let b = compositor.compose(Some(&state(&store, progress)), &style, Canvas::hd());
            prop_assert_eq!(a, b);
        }
    }
}
