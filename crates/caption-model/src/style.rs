//! Caption style definitions and the style registry.
//!
//! Styles are registered once at startup and referenced by key from
//! then on. A definition never changes after registration, so every
//! consumer resolving the same key sees the same style.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use captioner_common::config::AppConfig;
use captioner_common::error::{CaptionError, CaptionResult};

use crate::script::Script;

/// Font family for Latin text in the built-in styles.
pub const LATIN_FAMILY: &str = "Noto Sans";

/// Font family for Devanagari text in the built-in styles.
pub const DEVANAGARI_FAMILY: &str = "Noto Sans Devanagari";

/// Where the caption block sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopCenter,
    Center,
    BottomCenter,
    BottomLeft,
    BottomRight,
}

/// Horizontal alignment of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// Vertical placement of the whole caption block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl Anchor {
    pub fn horizontal(&self) -> HorizontalAlign {
        match self {
            Anchor::TopCenter | Anchor::Center | Anchor::BottomCenter => HorizontalAlign::Center,
            Anchor::BottomLeft => HorizontalAlign::Left,
            Anchor::BottomRight => HorizontalAlign::Right,
        }
    }

    pub fn vertical(&self) -> VerticalAlign {
        match self {
            Anchor::TopCenter => VerticalAlign::Top,
            Anchor::Center => VerticalAlign::Middle,
            Anchor::BottomCenter | Anchor::BottomLeft | Anchor::BottomRight => {
                VerticalAlign::Bottom
            }
        }
    }
}

/// Entry/exit animation driven by segment progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Animation {
    None,
    /// Ease in over the first 10%, ease out over the last 10%.
    Fade,
    /// Rise into place over the first 15%.
    SlideUp,
}

/// Font selection per script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typography {
    /// Font size in pixels.
    pub font_size_px: f64,

    /// Font family used for each script.
    pub families: BTreeMap<Script, String>,

    /// Family used when a script has no entry in `families`.
    pub fallback_family: String,
}

impl Typography {
    /// Noto Sans for Latin plus Noto Sans Devanagari.
    pub fn noto(font_size_px: f64) -> Self {
        let mut families = BTreeMap::new();
        families.insert(Script::Latin, LATIN_FAMILY.to_string());
        families.insert(Script::Devanagari, DEVANAGARI_FAMILY.to_string());
        Self {
            font_size_px,
            families,
            fallback_family: LATIN_FAMILY.to_string(),
        }
    }

    /// The registered family for `script`, if any.
    pub fn family_for(&self, script: Script) -> Option<&str> {
        self.families.get(&script).map(String::as_str)
    }
}

/// A named caption style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDefinition {
    /// Unique registry key.
    pub key: String,

    /// Block placement.
    pub anchor: Anchor,

    /// Maximum line width as a fraction of canvas width, in `(0, 1]`.
    pub max_width_fraction: f64,

    /// Distance from the anchored edge as a fraction of canvas height.
    #[serde(default = "default_margin_fraction")]
    pub margin_fraction: f64,

    /// Fonts and size.
    pub typography: Typography,

    /// Line height as a multiple of the font size.
    pub line_spacing: f64,

    /// Animation policy.
    pub animation: Animation,

    /// Text fill color (`#RRGGBB` or `#RRGGBBAA`).
    #[serde(default = "default_fill_color")]
    pub fill_color: String,

    /// Outline color.
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,

    /// Outline width in pixels (0 disables the outline).
    #[serde(default)]
    pub stroke_width_px: f64,
}

fn default_margin_fraction() -> f64 {
    0.08
}

fn default_fill_color() -> String {
    "#FFFFFF".to_string()
}

fn default_stroke_color() -> String {
    "#000000".to_string()
}

impl StyleDefinition {
    /// Check the definition is usable before registering it.
    pub fn validate(&self) -> CaptionResult<()> {
        let fail = |what: &str| {
            Err(CaptionError::validation(format!(
                "style '{}': {what}",
                self.key
            )))
        };

        if self.key.trim().is_empty() {
            return Err(CaptionError::validation("style key must not be empty"));
        }
        if !(self.max_width_fraction > 0.0 && self.max_width_fraction <= 1.0) {
            return fail("max_width_fraction must be in (0, 1]");
        }
        if !(0.0..0.5).contains(&self.margin_fraction) {
            return fail("margin_fraction must be in [0, 0.5)");
        }
        if !(self.typography.font_size_px.is_finite() && self.typography.font_size_px > 0.0) {
            return fail("font_size_px must be positive");
        }
        if self.typography.fallback_family.trim().is_empty() {
            return fail("fallback_family must not be empty");
        }
        if !(self.line_spacing.is_finite() && self.line_spacing > 0.0) {
            return fail("line_spacing must be positive");
        }
        if !(self.stroke_width_px.is_finite() && self.stroke_width_px >= 0.0) {
            return fail("stroke_width_px must not be negative");
        }
        if !is_hex_color(&self.fill_color) || !is_hex_color(&self.stroke_color) {
            return fail("colors must be #RRGGBB or #RRGGBBAA");
        }
        Ok(())
    }

    /// Line box height in pixels.
    pub fn line_height_px(&self) -> f64 {
        self.typography.font_size_px * self.line_spacing
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .map(|hex| (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// The built-in style set.
pub fn builtin_styles() -> Vec<StyleDefinition> {
    let base = |key: &str, anchor: Anchor, font_size_px: f64, animation: Animation| {
        StyleDefinition {
            key: key.to_string(),
            anchor,
            max_width_fraction: 0.8,
            margin_fraction: default_margin_fraction(),
            typography: Typography::noto(font_size_px),
            line_spacing: 1.25,
            animation,
            fill_color: default_fill_color(),
            stroke_color: default_stroke_color(),
            stroke_width_px: 3.0,
        }
    };

    vec![
        base("bottom-centered", Anchor::BottomCenter, 42.0, Animation::None),
        base("top-centered", Anchor::TopCenter, 42.0, Animation::None),
        base("centered-fade", Anchor::Center, 48.0, Animation::Fade),
        StyleDefinition {
            max_width_fraction: 0.7,
            fill_color: "#FFE14D".to_string(),
            stroke_width_px: 4.0,
            ..base("karaoke-style", Anchor::BottomCenter, 56.0, Animation::SlideUp)
        },
        StyleDefinition {
            max_width_fraction: 0.6,
            margin_fraction: 0.06,
            ..base("lower-left", Anchor::BottomLeft, 36.0, Animation::Fade)
        },
    ]
}

/// Key-addressed, append-only collection of caption styles.
///
/// Populated at startup, then shared read-only (typically behind an
/// `Arc`). There is no removal, so lookups never race with mutation.
#[derive(Debug, Clone, Default)]
pub struct StyleRegistry {
    styles: BTreeMap<String, Arc<StyleDefinition>>,
}

impl StyleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in styles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for style in builtin_styles() {
            // Built-in keys are distinct and valid.
            if let Err(e) = registry.register(style) {
                tracing::error!(error = %e, "Built-in style rejected");
            }
        }
        registry
    }

    /// Built-ins plus any styles from `config.styles_file`.
    pub fn from_config(config: &AppConfig) -> CaptionResult<Self> {
        let mut registry = Self::with_builtins();
        if let Some(path) = &config.styles_file {
            for style in load_styles_file(path)? {
                registry.register(style)?;
            }
        }
        Ok(registry)
    }

    /// Register a new style. Fails if the key is taken or the style is invalid.
    pub fn register(&mut self, style: StyleDefinition) -> CaptionResult<()> {
        style.validate()?;
        if self.styles.contains_key(&style.key) {
            return Err(CaptionError::duplicate_key(style.key));
        }
        tracing::debug!(style = %style.key, "Registered caption style");
        self.styles.insert(style.key.clone(), Arc::new(style));
        Ok(())
    }

    /// Look up a style by key.
    pub fn resolve(&self, key: &str) -> CaptionResult<Arc<StyleDefinition>> {
        self.styles
            .get(key)
            .cloned()
            .ok_or_else(|| CaptionError::unknown_style(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.styles.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        self.styles.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDefinition> {
        self.styles.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Read a JSON array of style definitions.
pub fn load_styles_file(path: &Path) -> CaptionResult<Vec<StyleDefinition>> {
    if !path.exists() {
        return Err(CaptionError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let styles: Vec<StyleDefinition> = serde_json::from_str(&content)?;
    Ok(styles)
}
