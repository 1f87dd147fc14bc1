//! Text measurement capability.
//!
//! The compositor resolves geometry but never rasterizes glyphs. It asks
//! a [`TextLayout`] how wide a run of text is in a given family; the host
//! supplies the implementation backed by its real font engine.

use std::collections::BTreeSet;

use captioner_model::script::Script;
use captioner_model::style::{DEVANAGARI_FAMILY, LATIN_FAMILY};

use crate::cluster::{cluster_script, clusters};

/// Font metrics provider used for line breaking and placement.
pub trait TextLayout: Send + Sync {
    /// Whether `family` can be used for drawing.
    fn has_family(&self, family: &str) -> bool;

    /// Horizontal advance of `text` set in `family` at `font_size_px`.
    fn advance(&self, text: &str, family: &str, font_size_px: f64) -> f64;
}

/// Deterministic advance estimates from per-cluster em widths.
///
/// Good enough to break lines consistently between preview and export
/// when no real font engine is at hand; both paths share this type so
/// their geometry matches exactly.
#[derive(Debug, Clone)]
pub struct EstimatedTextLayout {
    families: BTreeSet<String>,
}

impl EstimatedTextLayout {
    /// A layout that knows exactly `families`.
    pub fn new<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            families: families.into_iter().map(Into::into).collect(),
        }
    }

    fn em_width(cluster: &str) -> f64 {
        let Some(first) = cluster.chars().next() else {
            return 0.0;
        };
        if first.is_whitespace() {
            return 0.28;
        }
        match cluster_script(cluster) {
            Some(Script::Devanagari) => 0.62,
            Some(Script::Latin) if first.is_uppercase() => 0.66,
            Some(Script::Latin) if matches!(first, 'i' | 'l' | 'j' | 't' | 'f' | 'r') => 0.32,
            Some(Script::Latin) if matches!(first, 'm' | 'w') => 0.82,
            Some(Script::Latin) => 0.54,
            None if first.is_ascii_digit() => 0.56,
            None => 0.34,
        }
    }
}

impl Default for EstimatedTextLayout {
    /// Knows the two Noto families used by the built-in styles.
    fn default() -> Self {
        Self::new([LATIN_FAMILY, DEVANAGARI_FAMILY])
    }
}

impl TextLayout for EstimatedTextLayout {
    fn has_family(&self, family: &str) -> bool {
        self.families.contains(family)
    }

    fn advance(&self, text: &str, _family: &str, font_size_px: f64) -> f64 {
        clusters(text)
            .into_iter()
            .map(Self::em_width)
            .sum::<f64>()
            * font_size_px
    }
}
