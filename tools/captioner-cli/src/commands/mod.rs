pub mod check;
pub mod export;
pub mod preview;
pub mod styles;
pub mod subtitles;
pub mod validate;

use captioner_common::clock::FrameRate;
use captioner_common::config::AppConfig;
use captioner_model::style::StyleRegistry;

/// Built-in styles plus the configured styles file.
fn load_registry(config: &AppConfig) -> anyhow::Result<StyleRegistry> {
    StyleRegistry::from_config(config).map_err(|e| anyhow::anyhow!("Failed to load styles: {e}"))
}

/// `--fps` override, else the configured frame rate.
fn frame_rate(config: &AppConfig, fps: Option<&str>) -> anyhow::Result<FrameRate> {
    let rate = match fps {
        Some(value) => parse_fps(value)?,
        None => FrameRate::rational(config.render.fps, config.render.fps_den)?,
    };
    Ok(rate)
}

/// `30` or `30000/1001`.
fn parse_fps(value: &str) -> anyhow::Result<FrameRate> {
    let rate = match value.split_once('/') {
        Some((num, den)) => FrameRate::rational(num.trim().parse()?, den.trim().parse()?)?,
        None => FrameRate::new(value.trim().parse()?)?,
    };
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fps() {
        assert_eq!(parse_fps("30").unwrap(), FrameRate::new(30).unwrap());
        assert_eq!(
            parse_fps("30000/1001").unwrap(),
            FrameRate::rational(30000, 1001).unwrap()
        );
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("fast").is_err());
    }

    #[test]
    fn test_frame_rate_defaults_to_config() {
        let config = AppConfig::default();
        assert_eq!(frame_rate(&config, None).unwrap(), FrameRate::new(30).unwrap());
        assert_eq!(frame_rate(&config, Some("25")).unwrap(), FrameRate::new(25).unwrap());
    }
}
