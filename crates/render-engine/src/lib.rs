//! Captioner Render Engine
//!
//! Export path that burns captions into a video through an external
//! encode backend, coordinated as explicit render jobs.
//!
//! # Pipeline Architecture
//!
//! ```text
//! SegmentStore ──┐
//!                ├── submit() ── snapshot ──► ExportPayload
//! StyleRegistry ─┘                                │
//!                                                 ├── FrameMapper → Compositor (per frame)
//!                                                 │           │
//!                                                 │     caption spans
//!                                                 │           │
//! source.mp4 ─────────────────────────────────────┴──► EncodeBackend (ffmpeg drawtext)
//!                                                             │
//!                                poll() / await_job() ◄───────┤
//!                                                             ▼
//!                                                      captioned.mp4
//! ```

pub mod backend;
pub mod coordinator;
pub mod export;
pub mod ffmpeg;

pub use backend::*;
pub use coordinator::*;
pub use export::*;
pub use ffmpeg::FfmpegBackend;
