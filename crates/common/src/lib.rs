//! Captioner Common Utilities
//!
//! Shared infrastructure for all Captioner crates:
//! - Error types and result aliases
//! - Frame-grid timing (frame rates, frame index <-> seconds)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
