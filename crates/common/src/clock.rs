//! Frame-grid timing.
//!
//! Every frame's timestamp is derived directly from its index and the
//! frame rate; nothing is accumulated from the previous frame, so long
//! videos at fractional rates (29.97, 23.976) never drift.

use serde::{Deserialize, Serialize};

use crate::error::{CaptionError, CaptionResult};

/// A discrete frame position on the frame grid.
pub type FrameIndex = u64;

/// Tolerance (in frames) applied before flooring a time onto the grid.
///
/// `0.7 * 30.0` evaluates to `20.999999999999996`; without the nudge
/// that timestamp would land one frame early.
const FRAME_EPSILON: f64 = 1e-9;

/// A rational frame rate (`num / den` frames per second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    num: u32,
    den: u32,
}

impl FrameRate {
    /// Integer frame rate, e.g. `FrameRate::new(30)`.
    pub fn new(fps: u32) -> CaptionResult<Self> {
        Self::rational(fps, 1)
    }

    /// Rational frame rate, e.g. `FrameRate::rational(30000, 1001)` for 29.97.
    pub fn rational(num: u32, den: u32) -> CaptionResult<Self> {
        if num == 0 || den == 0 {
            return Err(CaptionError::validation(format!(
                "frame rate {num}/{den} must be positive"
            )));
        }
        Ok(Self { num, den })
    }

    pub fn numerator(&self) -> u32 {
        self.num
    }

    pub fn denominator(&self) -> u32 {
        self.den
    }

    /// Frames per second as a float.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Timestamp (seconds) of the start of `frame`.
    pub fn time_of_frame(&self, frame: FrameIndex) -> f64 {
        frame as f64 * self.den as f64 / self.num as f64
    }

    /// The frame showing at `secs`, rounded toward zero.
    ///
    /// Negative or non-finite times map to frame 0.
    pub fn frame_at(&self, secs: f64) -> FrameIndex {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        let frames = secs * self.num as f64 / self.den as f64;
        (frames + FRAME_EPSILON).floor() as FrameIndex
    }

    /// Number of frames needed to cover `duration_secs`.
    pub fn frame_count(&self, duration_secs: f64) -> u64 {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return 0;
        }
        let frames = duration_secs * self.num as f64 / self.den as f64;
        (frames - FRAME_EPSILON).ceil().max(0.0) as u64
    }

    /// ffmpeg-style rate string (`30` or `30000/1001`).
    pub fn to_ffmpeg_string(&self) -> String {
        if self.den == 1 {
            self.num.to_string()
        } else {
            format!("{}/{}", self.num, self.den)
        }
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{} fps", self.num)
        } else {
            write!(f, "{:.3} fps", self.as_f64())
        }
    }
}
