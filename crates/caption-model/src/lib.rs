//! Captioner Model
//!
//! Defines the core data contracts shared by preview and export:
//! - **Segments:** Time-coded transcript spans, normalized into a sorted,
//!   non-overlapping [`SegmentStore`]
//! - **Scripts:** Writing-system classification (Latin / Devanagari)
//! - **Styles:** Immutable, key-addressed [`StyleDefinition`]s held in a
//!   [`StyleRegistry`]
//! - **Jobs:** [`RenderJob`] records owned by the render coordinator
//!
//! Everything here is immutable after construction so it can be shared
//! between preview and export without locking.

pub mod job;
pub mod script;
pub mod segment;
pub mod style;

pub use job::*;
pub use script::*;
pub use segment::*;
pub use style::*;
