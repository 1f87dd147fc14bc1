//! Captioner Engine: caption timing and composition
//!
//! Turns a frame index into a draw plan:
//! - **Frame Mapping:** frame index + frame rate -> active segment and progress
//! - **Clusters & Layout:** grapheme-safe, script-aware line breaking
//! - **Compositor:** anchored, animated, layout-resolved text runs
//! - **Preview:** stateless per-frame scheduling for interactive scrubbing
//!
//! This crate is pure computation with no I/O and no platform dependencies.
//! Identical inputs always produce identical plans, whether frames are
//! requested in order (export) or out of order (scrubbing).

pub mod cluster;
pub mod compositor;
pub mod frame_mapper;
pub mod layout;
pub mod plan;
pub mod preview;

pub use compositor::Compositor;
pub use frame_mapper::{map_frame, map_time, CaptionState};
pub use layout::{EstimatedTextLayout, TextLayout};
pub use plan::{Canvas, DrawPlan, TextRun};
pub use preview::PreviewScheduler;
