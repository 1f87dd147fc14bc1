//! Encode backend abstraction.
//!
//! Any encoder that can burn captions into a video and report on its
//! progress sits behind [`EncodeBackend`]. The coordinator only ever
//! speaks to this trait, so tests can substitute a scripted backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use captioner_common::clock::FrameRate;
use captioner_common::error::CaptionResult;
use captioner_engine::Canvas;
use captioner_model::job::{ResultHandle, VideoHandle};
use captioner_model::segment::SegmentStore;
use captioner_model::style::StyleDefinition;

/// Everything a backend needs to render one job.
///
/// Built once at submission. The segments and style are shared
/// immutable snapshots, so later edits to the caller's transcript never
/// reach a job already in flight.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub video: VideoHandle,
    pub segments: Arc<SegmentStore>,
    pub style: Arc<StyleDefinition>,
    pub canvas: Canvas,
    pub fps: FrameRate,
}

impl ExportPayload {
    pub fn segments_hash(&self) -> &str {
        self.segments.content_hash()
    }

    pub fn style_key(&self) -> &str {
        &self.style.key
    }
}

/// Backend-side identifier of a submitted encode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendHandle(pub String);

impl BackendHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the backend reports about one encode.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendStatus {
    Queued,
    /// `progress` is in `[0, 1]` when the backend can estimate it.
    Running { progress: f64 },
    Succeeded,
    Failed { error: String },
    Cancelled,
}

impl BackendStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BackendStatus::Succeeded | BackendStatus::Failed { .. } | BackendStatus::Cancelled
        )
    }
}

/// An external encoder.
///
/// `status` errors mean the backend could not be reached; a failed
/// encode is reported as `Ok(BackendStatus::Failed { .. })`.
#[async_trait]
pub trait EncodeBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Start encoding `payload`.
    async fn submit(&self, payload: ExportPayload) -> CaptionResult<BackendHandle>;

    async fn status(&self, handle: &BackendHandle) -> CaptionResult<BackendStatus>;

    /// The artifact of a succeeded encode.
    async fn fetch_result(&self, handle: &BackendHandle) -> CaptionResult<ResultHandle>;

    /// Stop an encode. Cancelling something already finished is not an error.
    async fn cancel(&self, handle: &BackendHandle) -> CaptionResult<()>;
}
