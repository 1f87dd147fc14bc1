//! Render job coordination.
//!
//! Owns the job table and drives the encode backend. Submissions of the
//! same (video, segments, style) while a job is still live collapse into
//! that job. Job state only moves forward; once a job is terminal every
//! poll returns the same record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use captioner_common::clock::FrameRate;
use captioner_common::config::AppConfig;
use captioner_common::error::{CaptionError, CaptionResult};
use captioner_engine::Canvas;
use captioner_model::job::{JobId, JobStatus, RenderJob, VideoHandle};
use captioner_model::segment::SegmentStore;
use captioner_model::style::StyleRegistry;

use crate::backend::{BackendHandle, BackendStatus, EncodeBackend, ExportPayload};

/// Coordinator settings.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Export canvas. Must match the preview canvas.
    pub canvas: Canvas,
    /// Export frame grid. Must match the preview frame rate.
    pub fps: FrameRate,
    /// Delay between backend polls while awaiting a job.
    pub poll_interval: Duration,
}

impl CoordinatorConfig {
    pub fn from_app_config(config: &AppConfig) -> CaptionResult<Self> {
        Ok(Self {
            canvas: Canvas::new(config.render.canvas_width, config.render.canvas_height)?,
            fps: FrameRate::rational(config.render.fps, config.render.fps_den)?,
            poll_interval: config.export.poll_interval(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    video: VideoHandle,
    segments_hash: String,
    style_key: String,
}

#[derive(Debug)]
struct JobEntry {
    record: RenderJob,
    key: DedupKey,
    /// `None` until the backend accepts the submission.
    handle: Option<BackendHandle>,
    /// The job was cancelled but the backend has not acknowledged it.
    cancel_pending: bool,
}

#[derive(Debug, Default)]
struct JobTable {
    jobs: HashMap<JobId, JobEntry>,
    live: HashMap<DedupKey, JobId>,
}

impl JobTable {
    fn entry(&self, id: JobId) -> CaptionResult<&JobEntry> {
        self.jobs.get(&id).ok_or_else(|| unknown_job(id))
    }

    fn entry_mut(&mut self, id: JobId) -> CaptionResult<&mut JobEntry> {
        self.jobs.get_mut(&id).ok_or_else(|| unknown_job(id))
    }

    /// Drop a terminal job from the dedup index.
    fn settle(&mut self, id: JobId) {
        let Some(entry) = self.jobs.get(&id) else {
            return;
        };
        if entry.record.is_terminal() && self.live.get(&entry.key) == Some(&id) {
            self.live.remove(&entry.key);
        }
    }
}

/// Fails a job whose submission future was dropped before the backend
/// answered, so its dedup key does not stay claimed forever.
struct PendingSubmission<'a> {
    table: &'a Mutex<JobTable>,
    id: JobId,
    armed: bool,
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut table = self.table.lock();
        if let Some(entry) = table.jobs.get_mut(&self.id) {
            if entry
                .record
                .mark_failed("submission abandoned before the backend answered")
            {
                tracing::warn!(job_id = %self.id, "Render job submission abandoned");
            }
        }
        table.settle(self.id);
    }
}

fn unknown_job(id: JobId) -> CaptionError {
    CaptionError::UnknownJob {
        job_id: id.to_string(),
    }
}

/// Submits, tracks, and cancels render jobs against one backend.
pub struct RenderJobCoordinator {
    backend: Arc<dyn EncodeBackend>,
    registry: Arc<StyleRegistry>,
    config: CoordinatorConfig,
    table: Mutex<JobTable>,
}

impl std::fmt::Debug for RenderJobCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderJobCoordinator")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RenderJobCoordinator {
    pub fn new(
        backend: Arc<dyn EncodeBackend>,
        registry: Arc<StyleRegistry>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            config,
            table: Mutex::new(JobTable::default()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Start rendering `segments` onto `video` with the style `style_key`.
    ///
    /// An unknown style fails before anything reaches the backend. If an
    /// identical submission is still live, that job is returned instead
    /// of starting a second encode.
    pub async fn submit(
        &self,
        video: VideoHandle,
        segments: Arc<SegmentStore>,
        style_key: &str,
    ) -> CaptionResult<RenderJob> {
        let style = self.registry.resolve(style_key)?;
        if segments.is_empty() {
            return Err(CaptionError::validation("no caption segments to render"));
        }

        let key = DedupKey {
            video: video.clone(),
            segments_hash: segments.content_hash().to_string(),
            style_key: style.key.clone(),
        };

        let job = {
            let mut table = self.table.lock();
            if let Some(existing) = table.live.get(&key).and_then(|id| table.jobs.get(id)) {
                tracing::info!(
                    job_id = %existing.record.id,
                    status = ?existing.record.status,
                    "Duplicate submission joined live render job"
                );
                return Ok(existing.record.clone());
            }

            let record = RenderJob::queued(video.clone(), style.key.clone(), key.segments_hash.clone());
            table.live.insert(key.clone(), record.id);
            table.jobs.insert(
                record.id,
                JobEntry {
                    record: record.clone(),
                    key,
                    handle: None,
                    cancel_pending: false,
                },
            );
            record
        };

        tracing::info!(
            job_id = %job.id,
            video = %job.video,
            style = %job.style_key,
            segments = segments.len(),
            backend = self.backend.name(),
            "Render job queued"
        );

        let payload = ExportPayload {
            video,
            segments,
            style,
            canvas: self.config.canvas,
            fps: self.config.fps,
        };

        let mut pending = PendingSubmission {
            table: &self.table,
            id: job.id,
            armed: true,
        };
        let submitted = self.backend.submit(payload).await;
        pending.armed = false;

        match submitted {
            Ok(handle) => {
                let cancel_now = {
                    let mut table = self.table.lock();
                    let entry = table.entry_mut(job.id)?;
                    entry.handle = Some(handle.clone());
                    entry.cancel_pending = entry.record.status == JobStatus::Cancelled;
                    entry.cancel_pending
                };
                tracing::debug!(job_id = %job.id, handle = %handle, "Backend accepted render job");
                if cancel_now {
                    self.request_backend_cancel(job.id, &handle).await;
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Backend rejected render job");
                let mut table = self.table.lock();
                table
                    .entry_mut(job.id)?
                    .record
                    .mark_failed(format!("submission failed: {e}"));
                table.settle(job.id);
            }
        }

        self.snapshot(job.id)
    }

    /// Refresh a job from the backend and return its current state.
    ///
    /// A backend that cannot be reached leaves the job as last seen; only
    /// a failure the backend itself reports fails the job.
    pub async fn poll(&self, id: JobId) -> CaptionResult<RenderJob> {
        let (handle, terminal, cancel_pending) = {
            let table = self.table.lock();
            let entry = table.entry(id)?;
            (
                entry.handle.clone(),
                entry.record.is_terminal(),
                entry.cancel_pending,
            )
        };

        let Some(handle) = handle else {
            return self.snapshot(id);
        };
        if terminal {
            if cancel_pending {
                self.request_backend_cancel(id, &handle).await;
            }
            return self.snapshot(id);
        }

        let status = match self.backend.status(&handle).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    job_id = %id,
                    error = %e,
                    "Backend status unavailable; keeping last known job state"
                );
                return self.snapshot(id);
            }
        };

        let result = match status {
            BackendStatus::Succeeded => Some(self.backend.fetch_result(&handle).await),
            _ => None,
        };

        let mut table = self.table.lock();
        let entry = table.entry_mut(id)?;
        let record = &mut entry.record;
        let changed = match (status, result) {
            (BackendStatus::Queued, _) => false,
            (BackendStatus::Running { progress }, _) => {
                let started = record.mark_running();
                record.set_progress(progress) || started
            }
            (BackendStatus::Succeeded, Some(Ok(result))) => record.mark_succeeded(result),
            (BackendStatus::Succeeded, Some(Err(e))) => {
                record.mark_failed(format!("encoded output unavailable: {e}"))
            }
            (BackendStatus::Succeeded, None) => false,
            (BackendStatus::Failed { error }, _) => record.mark_failed(error),
            (BackendStatus::Cancelled, _) => record.mark_cancelled(),
        };

        if changed && record.is_terminal() {
            tracing::info!(
                job_id = %id,
                status = ?record.status,
                result = ?record.result,
                error = ?record.error,
                "Render job finished"
            );
        }
        let snapshot = record.clone();
        table.settle(id);
        Ok(snapshot)
    }

    /// Cancel a job.
    ///
    /// The job is marked cancelled right away and the backend is asked to
    /// stop. If that request fails it is retried on later polls. Jobs that
    /// already finished are returned unchanged.
    pub async fn cancel(&self, id: JobId) -> CaptionResult<RenderJob> {
        let handle = {
            let mut table = self.table.lock();
            let entry = table.entry_mut(id)?;
            if entry.record.is_terminal() {
                tracing::debug!(job_id = %id, status = ?entry.record.status, "Cancel ignored for finished job");
                return Ok(entry.record.clone());
            }
            entry.record.mark_cancelled();
            entry.cancel_pending = entry.handle.is_some();
            let handle = entry.handle.clone();
            table.settle(id);
            handle
        };

        tracing::info!(job_id = %id, "Render job cancelled");
        if let Some(handle) = handle {
            self.request_backend_cancel(id, &handle).await;
        }
        self.snapshot(id)
    }

    /// Poll until the job is terminal or `timeout` elapses.
    ///
    /// Timing out is an error for the caller only; the job keeps running
    /// and can be awaited again.
    pub async fn await_job(&self, id: JobId, timeout: Duration) -> CaptionResult<RenderJob> {
        self.await_job_with(id, timeout, |_| {}).await
    }

    /// Like [`await_job`](Self::await_job), calling `on_update` with every
    /// polled snapshot.
    pub async fn await_job_with<F>(
        &self,
        id: JobId,
        timeout: Duration,
        mut on_update: F,
    ) -> CaptionResult<RenderJob>
    where
        F: FnMut(&RenderJob) + Send,
    {
        let waiting = async {
            loop {
                let job = self.poll(id).await?;
                on_update(&job);
                if job.is_terminal() {
                    return Ok(job);
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, waiting).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(job_id = %id, waited = ?timeout, "Timed out awaiting render job");
                Err(CaptionError::Timeout {
                    job_id: id.to_string(),
                    waited: timeout,
                })
            }
        }
    }

    /// Current record for `id` without contacting the backend.
    pub fn snapshot(&self, id: JobId) -> CaptionResult<RenderJob> {
        Ok(self.table.lock().entry(id)?.record.clone())
    }

    /// All known jobs, oldest first.
    pub fn jobs(&self) -> Vec<RenderJob> {
        let mut jobs: Vec<RenderJob> = self
            .table
            .lock()
            .jobs
            .values()
            .map(|entry| entry.record.clone())
            .collect();
        jobs.sort_by_key(|job| job.submitted_at);
        jobs
    }

    async fn request_backend_cancel(&self, id: JobId, handle: &BackendHandle) {
        match self.backend.cancel(handle).await {
            Ok(()) => {
                if let Some(entry) = self.table.lock().jobs.get_mut(&id) {
                    entry.cancel_pending = false;
                }
                tracing::debug!(job_id = %id, handle = %handle, "Backend acknowledged cancel");
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %id,
                    error = %e,
                    "Backend cancel failed; retrying on next poll"
                );
            }
        }
    }
}
