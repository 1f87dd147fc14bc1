//! ffmpeg encode backend.
//!
//! Burns captions into the source video with one ffmpeg process per job:
//! the source is scaled and padded to the export canvas, resampled onto
//! the export frame grid, then every caption span becomes a `drawtext`
//! filter enabled on exactly its frame range. Progress is read from
//! `-progress pipe:1`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::sync::Notify;
use uuid::Uuid;

use captioner_common::config::{AppConfig, ExportSettings};
use captioner_common::error::{CaptionError, CaptionResult};
use captioner_engine::{Compositor, TextRun};
use captioner_model::job::ResultHandle;

use crate::backend::{BackendHandle, BackendStatus, EncodeBackend, ExportPayload};
use crate::export::{caption_spans, CaptionSpan};

/// Seconds without output-time progress before a stall is logged.
const STALL_WARNING_SECS: u64 = 10;

/// Local ffmpeg encoder.
pub struct FfmpegBackend {
    settings: ExportSettings,
    output_dir: PathBuf,
    compositor: Compositor,
    tasks: Mutex<HashMap<BackendHandle, Arc<EncodeTask>>>,
}

/// One running or finished ffmpeg process.
struct EncodeTask {
    output_path: PathBuf,
    script_path: PathBuf,
    status: Mutex<BackendStatus>,
    cancel: Notify,
}

impl EncodeTask {
    fn report_progress(&self, fraction: f64) {
        let mut status = self.status.lock();
        if let BackendStatus::Running { progress } = &mut *status {
            if fraction > *progress {
                *progress = fraction;
            }
        }
    }

    fn finish(&self, outcome: BackendStatus) {
        let mut status = self.status.lock();
        if !status.is_terminal() {
            *status = outcome;
        }
    }
}

impl FfmpegBackend {
    pub fn new(settings: ExportSettings, output_dir: PathBuf, compositor: Compositor) -> Self {
        Self {
            settings,
            output_dir,
            compositor,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig, compositor: Compositor) -> Self {
        Self::new(
            config.export.clone(),
            config.render.output_dir.clone(),
            compositor,
        )
    }

    /// Whether the configured ffmpeg binary is on `PATH`.
    pub fn is_available(&self) -> bool {
        command_exists(&self.settings.ffmpeg_binary)
    }

    fn task(&self, handle: &BackendHandle) -> CaptionResult<Arc<EncodeTask>> {
        self.tasks
            .lock()
            .get(handle)
            .cloned()
            .ok_or_else(|| CaptionError::backend(format!("Unknown encode handle: {handle}")))
    }
}

#[async_trait]
impl EncodeBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn submit(&self, payload: ExportPayload) -> CaptionResult<BackendHandle> {
        let input = PathBuf::from(payload.video.as_str());
        if !input.exists() {
            return Err(CaptionError::FileNotFound { path: input });
        }
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let duration_secs = match probe_duration(&self.settings.ffprobe_binary, &input).await {
            Some(duration) => duration,
            None => {
                let fallback = payload.segments.end_secs();
                tracing::warn!(
                    video = %input.display(),
                    fallback_secs = fallback,
                    "Could not probe video duration; using transcript end"
                );
                fallback
            }
        };
        let total_frames = payload.fps.frame_count(duration_secs);
        // Composing every captioned frame is CPU-bound; keep it off the runtime workers.
        let (span_count, filter_graph) = {
            let payload = payload.clone();
            let compositor = self.compositor.clone();
            tokio::task::spawn_blocking(move || {
                let spans = caption_spans(&payload, &compositor, total_frames);
                (spans.len(), build_filter_graph(&payload, &spans))
            })
            .await
            .map_err(|e| CaptionError::render(format!("Caption planning failed: {e}")))?
        };

        let handle = BackendHandle::new(Uuid::new_v4().simple().to_string());
        let output_path = output_path_for(&self.output_dir, &input, &handle);
        let script_path = output_path.with_extension("filter.txt");
        tokio::fs::write(&script_path, &filter_graph).await?;

        let args = build_ffmpeg_args(&self.settings, &input, &script_path, &output_path);
        tracing::debug!(args = ?args, "Running ffmpeg");
        let spawned = tokio::process::Command::new(&self.settings.ffmpeg_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = tokio::fs::remove_file(&script_path).await;
                return Err(CaptionError::backend(format!("Failed to start ffmpeg: {e}")));
            }
        };

        tracing::info!(
            pid = child.id(),
            handle = %handle,
            total_frames,
            spans = span_count,
            output = %output_path.display(),
            "ffmpeg process started"
        );

        let task = Arc::new(EncodeTask {
            output_path,
            script_path,
            status: Mutex::new(BackendStatus::Running { progress: 0.0 }),
            cancel: Notify::new(),
        });
        self.tasks.lock().insert(handle.clone(), task.clone());
        tokio::spawn(supervise(child, task, duration_secs));

        Ok(handle)
    }

    async fn status(&self, handle: &BackendHandle) -> CaptionResult<BackendStatus> {
        let task = self.task(handle)?;
        let status = task.status.lock().clone();
        Ok(status)
    }

    async fn fetch_result(&self, handle: &BackendHandle) -> CaptionResult<ResultHandle> {
        let task = self.task(handle)?;
        let status = task.status.lock().clone();
        match status {
            BackendStatus::Succeeded => Ok(ResultHandle::new(task.output_path.display().to_string())),
            other => Err(CaptionError::backend(format!(
                "Encode {handle} has no result ({other:?})"
            ))),
        }
    }

    async fn cancel(&self, handle: &BackendHandle) -> CaptionResult<()> {
        let task = self.task(handle)?;
        if !task.status.lock().is_terminal() {
            task.cancel.notify_one();
        }
        Ok(())
    }
}

/// Wait for ffmpeg to exit (or be cancelled) and record the outcome.
async fn supervise(mut child: Child, task: Arc<EncodeTask>, expected_secs: f64) {
    let started = Instant::now();

    // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
    let stderr_reader = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut output = String::new();
            match BufReader::new(stderr).read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        })
    });
    let progress_reader = child
        .stdout
        .take()
        .map(|stdout| tokio::spawn(track_progress(stdout, task.clone(), expected_secs)));

    let exit = tokio::select! {
        status = child.wait() => Some(status),
        _ = task.cancel.notified() => {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to kill ffmpeg");
            }
            None
        }
    };

    if let Some(reader) = progress_reader {
        let _ = reader.await;
    }
    let stderr_output = match stderr_reader {
        Some(reader) => reader
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string()),
        None => String::new(),
    };

    let outcome = match exit {
        None => BackendStatus::Cancelled,
        Some(Ok(status)) if status.success() => BackendStatus::Succeeded,
        Some(Ok(status)) => BackendStatus::Failed {
            error: format!(
                "ffmpeg export failed (status {status}): {}",
                stderr_output.trim()
            ),
        },
        Some(Err(e)) => BackendStatus::Failed {
            error: format!("Failed to wait on ffmpeg: {e}"),
        },
    };
    discard_artifacts(&task, &outcome).await;

    match &outcome {
        BackendStatus::Failed { error } => tracing::error!(error = %error, "ffmpeg encode failed"),
        other => tracing::info!(
            outcome = ?other,
            elapsed_secs = started.elapsed().as_secs_f64(),
            output = %task.output_path.display(),
            "ffmpeg encode finished"
        ),
    }
    task.finish(outcome);
}

/// Remove the filter script, and the partial output unless the encode succeeded.
async fn discard_artifacts(task: &EncodeTask, outcome: &BackendStatus) {
    let _ = tokio::fs::remove_file(&task.script_path).await;
    if *outcome != BackendStatus::Succeeded {
        let _ = tokio::fs::remove_file(&task.output_path).await;
    }
}

async fn track_progress(stdout: ChildStdout, task: Arc<EncodeTask>, expected_secs: f64) {
    let mut lines = BufReader::new(stdout).lines();
    let mut state = ProgressState::default();
    let mut last_advance_secs = 0.0f64;
    let mut last_advance_wall = Instant::now();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed reading ffmpeg progress");
                break;
            }
        };
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        state.update(key, value);
        if key != "progress" {
            continue;
        }

        task.report_progress(state.fraction(expected_secs));
        if state.out_time_secs > last_advance_secs + 0.001 {
            last_advance_secs = state.out_time_secs;
            last_advance_wall = Instant::now();
        } else if last_advance_wall.elapsed().as_secs() >= STALL_WARNING_SECS {
            tracing::warn!(
                out_time_secs = state.out_time_secs,
                "No ffmpeg progress advancement for {STALL_WARNING_SECS}s"
            );
            last_advance_wall = Instant::now();
        }
    }
}

/// Latest values from ffmpeg's `key=value` progress stream.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite its name, `out_time_ms` is in microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn fraction(&self, expected_secs: f64) -> f64 {
        if self.complete {
            1.0
        } else if expected_secs <= 0.0 {
            0.0
        } else {
            (self.out_time_secs / expected_secs).clamp(0.0, 1.0)
        }
    }
}

/// Full `-filter_complex` graph for a job; the final label is `[vout]`.
pub fn build_filter_graph(payload: &ExportPayload, spans: &[CaptionSpan]) -> String {
    let width = payload.canvas.width;
    let height = payload.canvas.height;
    let mut graph = format!(
        "[0:v]scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={}",
        payload.fps.to_ffmpeg_string()
    );

    for span in spans {
        for run in &span.plan.runs {
            graph.push(',');
            graph.push_str(&drawtext_filter(run, span));
        }
    }
    graph.push_str("[vout]");
    graph
}

/// One `drawtext` filter drawing `run` on the frames of `span`.
fn drawtext_filter(run: &TextRun, span: &CaptionSpan) -> String {
    let opacity = span.plan.opacity;
    // drawtext positions the top of the text box; center it in the line box.
    let glyph_top = run.y + (run.height - run.font_size_px) / 2.0;
    format!(
        "drawtext=font={font}:text={text}:expansion=none:fontsize={size:.2}:\
         fontcolor={fill}:borderw={border:.2}:bordercolor={stroke}:x={x:.2}:y={y:.2}:\
         enable='between(n,{first},{last})'",
        font = escape_filter_value(&run.font_family),
        text = escape_filter_value(&run.text),
        size = run.font_size_px,
        fill = ffmpeg_color(&run.fill_color, opacity),
        border = run.stroke_width_px,
        stroke = ffmpeg_color(&run.stroke_color, opacity),
        x = run.x,
        y = glyph_top,
        first = span.first_frame,
        last = span.last_frame,
    )
}

/// Escape `value` for use as a filter option inside a filtergraph.
///
/// ffmpeg unescapes twice: the graph parser first, then the option parser
/// that splits `key=value` pairs on `:`. Control characters are dropped.
fn escape_filter_value(value: &str) -> String {
    let option_level = backslash_escape(value.chars().filter(|c| !c.is_control()), "\\':");
    backslash_escape(option_level.chars(), "\\'[],;")
}

fn backslash_escape(chars: impl Iterator<Item = char>, special: &str) -> String {
    let mut escaped = String::new();
    for c in chars {
        if special.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `#RRGGBB[AA]` to ffmpeg's `0xRRGGBB@alpha`, scaled by `opacity`.
fn ffmpeg_color(hex: &str, opacity: f64) -> String {
    let digits = hex.trim_start_matches('#');
    let (rgb, alpha) = if digits.len() == 8 {
        let alpha = u8::from_str_radix(&digits[6..], 16).map_or(1.0, |a| a as f64 / 255.0);
        (&digits[..6], alpha)
    } else {
        (digits, 1.0)
    };
    format!("0x{rgb}@{:.3}", (alpha * opacity).clamp(0.0, 1.0))
}

/// ffmpeg arguments for one encode.
pub fn build_ffmpeg_args(
    settings: &ExportSettings,
    input: &Path,
    filter_script: &Path,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-progress",
        "pipe:1",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(input.display().to_string());
    args.push("-filter_complex_script".to_string());
    args.push(filter_script.display().to_string());
    args.extend(
        ["-map", "[vout]", "-map", "0:a?"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.extend(codec_args(settings));
    args.extend(
        ["-c:a", "aac", "-b:a", "192k", "-movflags", "+faststart"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(output.display().to_string());
    args
}

fn codec_args(settings: &ExportSettings) -> Vec<String> {
    let mut args = vec!["-c:v".to_string(), settings.video_codec.clone()];
    if matches!(settings.video_codec.as_str(), "libx264" | "libx265") {
        args.extend([
            "-preset".to_string(),
            settings.preset.clone(),
            "-crf".to_string(),
            settings.crf.to_string(),
        ]);
    }
    args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
    args
}

fn output_path_for(output_dir: &Path, input: &Path, handle: &BackendHandle) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let short: String = handle.as_str().chars().take(8).collect();
    output_dir.join(format!("{stem}-captioned-{short}.mp4"))
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Container duration in seconds, if ffprobe can read it.
async fn probe_duration(ffprobe: &str, path: &Path) -> Option<f64> {
    let output = tokio::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let duration = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    use captioner_common::clock::FrameRate;
    use captioner_engine::Canvas;
    use captioner_model::job::VideoHandle;
    use captioner_model::segment::{RawSegment, SegmentStore};
    use captioner_model::style::StyleRegistry;

    fn payload(video: &str, style_key: &str) -> ExportPayload {
        let registry = StyleRegistry::with_builtins();
        ExportPayload {
            video: VideoHandle::new(video),
            segments: Arc::new(
                SegmentStore::load(vec![
                    RawSegment::new(0.0, 2.0, "Hello"),
                    RawSegment::new(2.0, 4.0, "दुनिया"),
                ])
                .unwrap(),
            ),
            style: registry.resolve(style_key).unwrap(),
            canvas: Canvas::hd(),
            fps: FrameRate::new(30).unwrap(),
        }
    }

    #[test]
    fn test_filter_graph_shape() {
        let payload = payload("/videos/talk.mp4", "bottom-centered");
        let spans = caption_spans(&payload, &Compositor::estimated(), 150);
        let graph = build_filter_graph(&payload, &spans);

        assert!(graph.starts_with("[0:v]scale=1280:720:force_original_aspect_ratio=decrease,"));
        assert!(graph.contains("fps=30,drawtext="));
        assert!(graph.ends_with("[vout]"));
        assert_eq!(graph.matches("drawtext=").count(), 2);
        assert!(graph.contains("text=Hello:"));
        assert!(graph.contains("text=दुनिया:"));
        assert!(graph.contains("font=Noto Sans Devanagari:"));
        assert!(graph.contains("enable='between(n,0,59)'"));
        assert!(graph.contains("enable='between(n,60,119)'"));
    }

    #[test]
    fn test_filter_graph_without_captions() {
        let payload = payload("/videos/talk.mp4", "bottom-centered");
        let graph = build_filter_graph(&payload, &[]);
        assert!(!graph.contains("drawtext"));
        assert!(graph.ends_with("fps=30[vout]"));
    }

    #[test]
    fn test_fade_spans_carry_opacity() {
        let payload = payload("/videos/talk.mp4", "centered-fade");
        let spans = caption_spans(&payload, &Compositor::estimated(), 150);
        let graph = build_filter_graph(&payload, &spans);
        // The first fade frame is fully transparent, the middle is opaque.
        assert!(graph.contains("fontcolor=0xFFFFFF@0.000"));
        assert!(graph.contains("fontcolor=0xFFFFFF@1.000"));
    }

    /// Split `input` on unquoted, unescaped `delims`, unescaping each piece
    /// the way ffmpeg's `av_get_token` does.
    fn split_tokens(input: &str, delims: &[char]) -> Vec<String> {
        let mut tokens = vec![String::new()];
        let mut chars = input.chars();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            let current = tokens.last_mut().unwrap();
            match c {
                '\\' if !quoted => current.extend(chars.next()),
                '\'' => quoted = !quoted,
                c if !quoted && delims.contains(&c) => tokens.push(String::new()),
                c => current.push(c),
            }
        }
        tokens
    }

    /// The `text` option of every drawtext filter, as ffmpeg reads it back.
    fn drawn_texts(graph: &str) -> Vec<String> {
        let chain = graph
            .strip_prefix("[0:v]")
            .and_then(|g| g.strip_suffix("[vout]"))
            .unwrap();
        split_tokens(chain, &[','])
            .iter()
            .filter_map(|filter| filter.strip_prefix("drawtext="))
            .map(|args| {
                split_tokens(args, &[':'])
                    .into_iter()
                    .find_map(|pair| pair.strip_prefix("text=").map(str::to_string))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_caption_text_survives_filter_parsing() {
        let mut payload = payload("/videos/talk.mp4", "bottom-centered");
        payload.segments = Arc::new(
            SegmentStore::load(vec![
                RawSegment::new(0.0, 2.0, "Note: meet at 10:30"),
                RawSegment::new(2.0, 4.0, "it's [a], b; c\\d"),
            ])
            .unwrap(),
        );
        let spans = caption_spans(&payload, &Compositor::estimated(), 150);
        let graph = build_filter_graph(&payload, &spans);

        assert_eq!(
            drawn_texts(&graph),
            vec!["Note: meet at 10:30".to_string(), "it's [a], b; c\\d".to_string()]
        );
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("Hello"), "Hello");
        assert_eq!(escape_filter_value("10:30"), "10\\\\:30");
        assert_eq!(escape_filter_value("it's"), "it\\\\\\\'s");
        assert_eq!(escape_filter_value("a, b"), "a\\, b");
        assert_eq!(escape_filter_value("line\nbreak"), "linebreak");
    }

    #[test]
    fn test_ffmpeg_color() {
        assert_eq!(ffmpeg_color("#FFE14D", 1.0), "0xFFE14D@1.000");
        assert_eq!(ffmpeg_color("#000000", 0.5), "0x000000@0.500");
        assert_eq!(ffmpeg_color("#FFFFFF80", 1.0), "0xFFFFFF@0.502");
    }

    #[test]
    fn test_progress_state() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "1500000");
        assert!((state.fraction(3.0) - 0.5).abs() < 1e-9);
        state.update("out_time_ms", "6000000");
        assert_eq!(state.fraction(3.0), 1.0);
        assert_eq!(state.fraction(0.0), 0.0);

        state.update("out_time_us", "0");
        state.update("progress", "end");
        assert_eq!(state.fraction(3.0), 1.0);
    }

    #[test]
    fn test_ffmpeg_args() {
        let settings = ExportSettings::default();
        let args = build_ffmpeg_args(
            &settings,
            Path::new("/in/talk.mp4"),
            Path::new("/out/job.filter.txt"),
            Path::new("/out/job.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-progress pipe:1"));
        assert!(joined.contains("-i /in/talk.mp4"));
        assert!(joined.contains("-filter_complex_script /out/job.filter.txt"));
        assert!(joined.contains("-map [vout] -map 0:a?"));
        assert!(joined.contains("-c:v libx264 -preset medium -crf 20"));
        assert_eq!(args.last().map(String::as_str), Some("/out/job.mp4"));

        let hw = ExportSettings {
            video_codec: "h264_nvenc".to_string(),
            ..ExportSettings::default()
        };
        let args = codec_args(&hw);
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_output_path() {
        let handle = BackendHandle::new("0123456789abcdef");
        let path = output_path_for(Path::new("/exports"), Path::new("/videos/talk.mp4"), &handle);
        assert_eq!(path, PathBuf::from("/exports/talk-captioned-01234567.mp4"));
    }

    #[tokio::test]
    async fn test_missing_video_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FfmpegBackend::new(
            ExportSettings::default(),
            dir.path().join("exports"),
            Compositor::estimated(),
        );
        let missing = dir.path().join("missing.mp4");
        let err = backend
            .submit(payload(&missing.display().to_string(), "bottom-centered"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::FileNotFound { .. }));
    }

    fn exported_files(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_failed_spawn_removes_filter_script() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"not really a video").unwrap();
        let settings = ExportSettings {
            ffmpeg_binary: dir.path().join("no-such-ffmpeg").display().to_string(),
            ffprobe_binary: dir.path().join("no-such-ffprobe").display().to_string(),
            ..ExportSettings::default()
        };
        let exports = dir.path().join("exports");
        let backend = FfmpegBackend::new(settings, exports.clone(), Compositor::estimated());

        let err = backend
            .submit(payload(&video.display().to_string(), "bottom-centered"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::Backend { .. }));
        assert!(exported_files(&exports).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_encode_removes_partial_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"not really a video").unwrap();
        // Writes a partial file to its last argument, then fails.
        let encoder = dir.path().join("broken-ffmpeg");
        std::fs::write(
            &encoder,
            "#!/bin/sh\nfor out; do :; done\necho partial > \"$out\"\necho 'Invalid data' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&encoder, std::fs::Permissions::from_mode(0o755)).unwrap();

        let settings = ExportSettings {
            ffmpeg_binary: encoder.display().to_string(),
            ffprobe_binary: dir.path().join("no-such-ffprobe").display().to_string(),
            ..ExportSettings::default()
        };
        let exports = dir.path().join("exports");
        let backend = FfmpegBackend::new(settings, exports.clone(), Compositor::estimated());
        let handle = backend
            .submit(payload(&video.display().to_string(), "bottom-centered"))
            .await
            .unwrap();

        let status = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            loop {
                let status = backend.status(&handle).await.unwrap();
                if status.is_terminal() {
                    return status;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        match status {
            BackendStatus::Failed { error } => assert!(error.contains("Invalid data")),
            other => panic!("expected a failed encode, got {other:?}"),
        }
        assert!(exported_files(&exports).is_empty());
        assert!(backend.fetch_result(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let backend = FfmpegBackend::new(
            ExportSettings::default(),
            PathBuf::from("/tmp"),
            Compositor::estimated(),
        );
        let handle = BackendHandle::new("nope");
        assert!(backend.status(&handle).await.is_err());
        assert!(backend.fetch_result(&handle).await.is_err());
    }
}
