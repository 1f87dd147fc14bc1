//! Check export prerequisites.

use captioner_common::config::AppConfig;
use captioner_engine::Compositor;
use captioner_render_engine::FfmpegBackend;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Captioner System Check");
    println!("{}", "=".repeat(50));

    let backend = FfmpegBackend::from_config(config, Compositor::estimated());
    let ffmpeg_ok = backend.is_available();
    if ffmpeg_ok {
        println!("[OK] ffmpeg: {}", config.export.ffmpeg_binary);
    } else {
        println!("[MISSING] ffmpeg: {} not found on PATH", config.export.ffmpeg_binary);
    }

    match super::load_registry(config) {
        Ok(registry) => {
            println!("[OK] Caption styles: {}", registry.len());
            if !registry.contains(&config.render.default_style) {
                println!(
                    "[WARN] Default style '{}' is not registered",
                    config.render.default_style
                );
            }
        }
        Err(e) => println!("[WARN] Caption styles: {e}"),
    }

    println!(
        "[OK] Canvas: {}x{} @ {}/{} fps",
        config.render.canvas_width, config.render.canvas_height, config.render.fps, config.render.fps_den
    );
    println!("     Exports go to {}", config.render.output_dir.display());

    println!();
    if ffmpeg_ok {
        println!("All required tools are available. Captioner is ready to export.");
    } else {
        println!("Install ffmpeg (with fontconfig and drawtext) to export video.");
    }
    Ok(())
}
