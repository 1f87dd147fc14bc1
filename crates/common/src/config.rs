//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Canvas and frame-grid defaults shared by preview and export.
    #[serde(default)]
    pub render: RenderDefaults,

    /// Export job settings.
    #[serde(default)]
    pub export: ExportSettings,

    /// Optional JSON file with extra caption styles, registered after
    /// the built-in set.
    #[serde(default)]
    pub styles_file: Option<PathBuf>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Composition defaults. Preview and export must agree on these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderDefaults {
    /// Canvas width in pixels.
    pub canvas_width: u32,

    /// Canvas height in pixels.
    pub canvas_height: u32,

    /// Frame rate numerator.
    pub fps: u32,

    /// Frame rate denominator (1 for integer rates).
    #[serde(default = "default_fps_den")]
    pub fps_den: u32,

    /// Style key used when none is given.
    pub default_style: String,

    /// Directory for exported videos.
    pub output_dir: PathBuf,
}

/// Render job coordination and ffmpeg encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// How often an awaiting caller polls the backend (milliseconds).
    pub poll_interval_ms: u64,

    /// Default bound for awaiting a job (seconds).
    pub await_timeout_secs: u64,

    /// ffmpeg executable.
    pub ffmpeg_binary: String,

    /// ffprobe executable.
    pub ffprobe_binary: String,

    /// Video codec passed to `-c:v`.
    pub video_codec: String,

    /// Constant rate factor.
    pub crf: u32,

    /// Encoder preset.
    pub preset: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "captioner=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

fn default_fps_den() -> u32 {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            render: RenderDefaults::default(),
            export: ExportSettings::default(),
            styles_file: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            canvas_width: 1280,
            canvas_height: 720,
            fps: 30,
            fps_den: 1,
            default_style: "bottom-centered".to_string(),
            output_dir: dirs_default_output(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            await_timeout_secs: 600,
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
            video_codec: "libx264".to_string(),
            crf: 20,
            preset: "medium".to_string(),
        }
    }
}

impl ExportSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_secs(self.await_timeout_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("captioner").join("config.json")
}

/// Default export directory.
fn dirs_default_output() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("captioner").join("exports")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_preview_canvas() {
        let config = AppConfig::default();
        assert_eq!(config.render.canvas_width, 1280);
        assert_eq!(config.render.canvas_height, 720);
        assert_eq!(config.render.fps, 30);
        assert_eq!(config.render.default_style, "bottom-centered");
        assert_eq!(config.export.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.render.fps = 25;
        config.export.crf = 18;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.render.fps, 25);
        assert_eq!(loaded.export.crf, 18);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"logging":{"level":"debug","json":true,"file":null}}"#)
            .unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.logging.level, "debug");
        assert!(loaded.logging.json);
        assert_eq!(loaded.render.canvas_width, 1280);
    }

    #[test]
    fn test_unparsable_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.ffmpeg_binary, "ffmpeg");
    }
}
