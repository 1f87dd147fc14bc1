//! Burn captions into a video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use captioner_common::config::AppConfig;
use captioner_common::error::CaptionError;
use captioner_engine::Compositor;
use captioner_model::job::{JobStatus, VideoHandle};
use captioner_render_engine::{CoordinatorConfig, FfmpegBackend, RenderJobCoordinator};
use captioner_transcript::load_segments;

use crate::RenderOptions;

pub async fn run(
    mut config: AppConfig,
    video: PathBuf,
    segments: PathBuf,
    output: Option<PathBuf>,
    timeout: Option<u64>,
    render: RenderOptions,
) -> anyhow::Result<()> {
    println!("Exporting captions onto: {}", video.display());

    if let Some(dir) = output {
        config.render.output_dir = dir;
    }
    let style = render
        .style
        .clone()
        .unwrap_or_else(|| config.render.default_style.clone());
    let mut coordinator_config = CoordinatorConfig::from_app_config(&config)?;
    coordinator_config.fps = super::frame_rate(&config, render.fps.as_deref())?;

    let registry = Arc::new(super::load_registry(&config)?);
    let store = Arc::new(
        load_segments(&segments).map_err(|e| anyhow::anyhow!("Failed to load transcript: {e}"))?,
    );

    let backend = FfmpegBackend::from_config(&config, Compositor::estimated());
    if !backend.is_available() {
        anyhow::bail!(
            "{} not found on PATH; run `captioner check`",
            config.export.ffmpeg_binary
        );
    }
    let coordinator = RenderJobCoordinator::new(Arc::new(backend), registry, coordinator_config);

    println!("  Style: {style}");
    println!(
        "  Canvas: {}x{} @ {}",
        coordinator_config.canvas.width, coordinator_config.canvas.height, coordinator_config.fps
    );
    println!("  Segments: {}", store.len());

    let video = VideoHandle::new(video.display().to_string());
    let job = coordinator.submit(video, store, &style).await?;
    println!("  Job: {}", job.id);

    let wait = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.export.await_timeout());

    let outcome = tokio::select! {
        result = coordinator.await_job_with(job.id, wait, |job| {
            print!("\r  Progress: {:.1}%  ", job.progress_fraction * 100.0);
            let _ = std::io::stdout().flush();
        }) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted; cancelling export...");
            coordinator.cancel(job.id).await
        }
    };

    let finished = match outcome {
        Ok(job) => job,
        Err(CaptionError::Timeout { waited, .. }) => {
            coordinator.cancel(job.id).await?;
            anyhow::bail!("Export did not finish within {waited:?}; cancelled");
        }
        Err(e) => return Err(e.into()),
    };

    match finished.status {
        JobStatus::Succeeded => {
            let result = finished
                .result
                .map(|r| r.to_string())
                .unwrap_or_default();
            println!("\nExport complete: {result}");
        }
        JobStatus::Cancelled => println!("\nExport cancelled."),
        JobStatus::Failed => {
            println!();
            anyhow::bail!(
                "Export failed: {}",
                finished.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        JobStatus::Queued | JobStatus::Running => {
            println!("\nExport still {:?}", finished.status);
        }
    }

    Ok(())
}
