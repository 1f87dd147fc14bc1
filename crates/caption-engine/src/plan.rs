//! Draw plans: renderer-agnostic instructions for one frame.

use serde::{Deserialize, Serialize};

use captioner_common::clock::FrameIndex;
use captioner_common::error::{CaptionError, CaptionResult};
use captioner_model::script::Script;

/// Output canvas geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> CaptionResult<Self> {
        if width == 0 || height == 0 {
            return Err(CaptionError::validation(format!(
                "canvas {width}x{height} must have a non-zero size"
            )));
        }
        Ok(Self { width, height })
    }

    /// The 1280x720 canvas shared by preview and export by default.
    pub fn hd() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// One single-script, single-font piece of a caption line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub script: Script,
    pub font_family: String,
    pub font_size_px: f64,

    /// Left edge in canvas pixels.
    pub x: f64,
    /// Top of the line box in canvas pixels (animation offset applied).
    pub y: f64,
    pub width: f64,
    /// Line box height.
    pub height: f64,

    /// Zero-based line number within the caption block.
    pub line_index: usize,

    pub fill_color: String,
    pub stroke_color: String,
    pub stroke_width_px: f64,

    /// Drawn with the style's fallback family because the script's own
    /// family was unavailable.
    pub fallback: bool,
}

/// Everything to draw for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawPlan {
    pub canvas: Canvas,

    /// Frame the plan was composed for (`None` when nothing is visible).
    pub frame: Option<FrameIndex>,

    /// Caption opacity in `[0, 1]`.
    pub opacity: f64,

    /// Vertical animation offset already applied to every run.
    pub y_offset: f64,

    /// Runs in reading order, line by line.
    pub runs: Vec<TextRun>,
}

impl DrawPlan {
    /// Nothing to draw.
    pub fn empty(canvas: Canvas) -> Self {
        Self {
            canvas,
            frame: None,
            opacity: 0.0,
            y_offset: 0.0,
            runs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.runs
            .iter()
            .map(|run| run.line_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// The text of each line, runs concatenated.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![String::new(); self.line_count()];
        for run in &self.runs {
            lines[run.line_index].push_str(&run.text);
        }
        lines
    }

    /// Whether two plans draw the same pixels, ignoring which frame they
    /// were composed for.
    pub fn same_visual(&self, other: &DrawPlan) -> bool {
        self.canvas == other.canvas
            && self.opacity == other.opacity
            && self.y_offset == other.y_offset
            && self.runs == other.runs
    }
}
