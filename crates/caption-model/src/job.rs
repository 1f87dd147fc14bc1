//! Render job records.
//!
//! A [`RenderJob`] moves `Queued -> Running -> {Succeeded | Failed | Cancelled}`
//! and never changes again once terminal. The transition methods enforce
//! that: every call on a terminal record is a no-op returning `false`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use captioner_common::error::{CaptionError, CaptionResult};

/// Unique render job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> CaptionResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|e| CaptionError::validation(format!("invalid job id '{value}': {e}")))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque reference to the source video (path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoHandle(pub String);

impl VideoHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to the encoded artifact (path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultHandle(pub String);

impl ResultHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Snapshot of a render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub id: JobId,
    pub status: JobStatus,

    /// Encode progress in `[0, 1]`.
    pub progress_fraction: f64,

    /// Set when the job succeeded.
    pub result: Option<ResultHandle>,

    /// Opaque backend failure description, set when the job failed.
    pub error: Option<String>,

    /// Source video the job was submitted for.
    pub video: VideoHandle,

    /// Caption style the job was submitted with.
    pub style_key: String,

    /// Content hash of the submitted segments.
    pub segments_hash: String,

    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    /// A fresh job in the `Queued` state.
    pub fn queued(
        video: VideoHandle,
        style_key: impl Into<String>,
        segments_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            progress_fraction: 0.0,
            result: None,
            error: None,
            video,
            style_key: style_key.into(),
            segments_hash: segments_hash.into(),
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `Queued -> Running`.
    pub fn mark_running(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        true
    }

    /// Record progress. Progress never moves backwards.
    pub fn set_progress(&mut self, fraction: f64) -> bool {
        if self.is_terminal() || !fraction.is_finite() {
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction <= self.progress_fraction {
            return false;
        }
        self.progress_fraction = fraction;
        true
    }

    pub fn mark_succeeded(&mut self, result: ResultHandle) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Succeeded;
        self.progress_fraction = 1.0;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        true
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
        true
    }

    pub fn mark_cancelled(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.finished_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> RenderJob {
        RenderJob::queued(VideoHandle::new("talk.mp4"), "bottom-centered", "abc")
    }

    #[test]
    fn test_happy_path() {
        let mut job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.mark_running());
        assert!(job.set_progress(0.4));
        assert!(!job.set_progress(0.2));
        assert!(job.mark_succeeded(ResultHandle::new("out.mp4")));
        assert_eq!(job.progress_fraction, 1.0);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_terminal_records_are_frozen() {
        let mut job = job();
        job.mark_running();
        job.mark_succeeded(ResultHandle::new("out.mp4"));
        let before = job.clone();

        assert!(!job.mark_cancelled());
        assert!(!job.mark_failed("late failure"));
        assert!(!job.set_progress(0.5));
        assert!(!job.mark_running());
        assert_eq!(job, before);
    }

    #[test]
    fn test_cancel_from_queued() {
        let mut job = job();
        assert!(job.mark_cancelled());
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(!job.mark_running());
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        assert_eq!(JobId::parse(&id.to_string()).unwrap(), id);
        assert!(JobId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_record_serializes_for_host_persistence() {
        let mut job = job();
        job.mark_running();
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"status\":\"running\""));
        let back: RenderJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
