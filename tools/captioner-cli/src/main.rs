//! Captioner CLI: validate transcripts, preview caption frames, export video.
//!
//! Usage:
//!   captioner styles                       List caption styles
//!   captioner validate <SEGMENTS>          Load and normalize a transcript
//!   captioner preview <SEGMENTS> --frame N Print one frame's draw plan
//!   captioner export <VIDEO> <SEGMENTS>    Burn captions into a video
//!   captioner subtitles <SEGMENTS> -o F    Write SRT/VTT subtitles
//!   captioner check                        Check export prerequisites

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use captioner_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "captioner",
    about = "Frame-accurate bilingual captions for video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the XDG config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that compose frames.
#[derive(Args, Debug, Clone)]
pub struct RenderOptions {
    /// Caption style key
    #[arg(short, long)]
    style: Option<String>,

    /// Frame rate (integer, or NUM/DEN such as 30000/1001)
    #[arg(long)]
    fps: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered caption styles
    Styles {
        /// Print full style definitions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a transcript (.json, .srt, .vtt) and report what normalization did
    Validate {
        /// Transcript file
        segments: PathBuf,
    },

    /// Print the draw plan for one frame as JSON
    Preview {
        /// Transcript file
        segments: PathBuf,

        /// Frame index
        #[arg(long, conflicts_with = "time", required_unless_present = "time")]
        frame: Option<u64>,

        /// Timestamp in seconds
        #[arg(long)]
        time: Option<f64>,

        #[command(flatten)]
        render: RenderOptions,
    },

    /// Burn captions into a video with ffmpeg
    Export {
        /// Source video
        video: PathBuf,

        /// Transcript file
        segments: PathBuf,

        /// Output directory (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Give up waiting after this many seconds (the encode is cancelled)
        #[arg(long)]
        timeout: Option<u64>,

        #[command(flatten)]
        render: RenderOptions,
    },

    /// Write sidecar subtitles
    Subtitles {
        /// Transcript file
        segments: PathBuf,

        /// Output file (.srt or .vtt)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check export prerequisites
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    captioner_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Styles { json } => commands::styles::run(&config, json),
        Commands::Validate { segments } => commands::validate::run(segments),
        Commands::Preview {
            segments,
            frame,
            time,
            render,
        } => commands::preview::run(&config, segments, frame, time, render),
        Commands::Export {
            video,
            segments,
            output,
            timeout,
            render,
        } => commands::export::run(config, video, segments, output, timeout, render).await,
        Commands::Subtitles { segments, output } => commands::subtitles::run(segments, output),
        Commands::Check => commands::check::run(&config),
    }
}
