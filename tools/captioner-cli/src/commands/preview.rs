//! Print the draw plan for one frame.

use std::path::PathBuf;
use std::sync::Arc;

use captioner_common::config::AppConfig;
use captioner_engine::{Canvas, Compositor, PreviewScheduler};
use captioner_transcript::load_segments;

use crate::RenderOptions;

pub fn run(
    config: &AppConfig,
    segments: PathBuf,
    frame: Option<u64>,
    time: Option<f64>,
    render: RenderOptions,
) -> anyhow::Result<()> {
    let registry = Arc::new(super::load_registry(config)?);
    let fps = super::frame_rate(config, render.fps.as_deref())?;
    let canvas = Canvas::new(config.render.canvas_width, config.render.canvas_height)?;
    let style = render
        .style
        .unwrap_or_else(|| config.render.default_style.clone());

    let store = load_segments(&segments)?;
    let preview = PreviewScheduler::new(registry, Compositor::estimated(), canvas);
    preview.replace_segments(Arc::new(store));

    let plan = match (frame, time) {
        (Some(frame), _) => preview.frame(frame, fps, &style)?,
        (None, Some(secs)) => preview.at_time(secs, fps, &style)?,
        (None, None) => anyhow::bail!("Pass --frame or --time"),
    };

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
