//! Writing-system classification.
//!
//! Captions mix Latin and Devanagari (Hinglish). Each script is drawn
//! with its own font family, so text is classified per character and
//! later grouped into script runs by the compositor.

use serde::{Deserialize, Serialize};

/// A writing system with its own font family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Devanagari,
}

/// Script content of a whole segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptHint {
    Latin,
    Devanagari,
    Mixed,
}

impl Script {
    pub fn as_str(&self) -> &'static str {
        match self {
            Script::Latin => "Latin",
            Script::Devanagari => "Devanagari",
        }
    }

    /// Classify a single character.
    ///
    /// Returns `None` for script-neutral characters (whitespace, digits,
    /// punctuation, joiners, dandas) which take the script of their
    /// neighbours.
    pub fn of_char(c: char) -> Option<Script> {
        match c as u32 {
            0x0964 | 0x0965 => None,
            0x0900..=0x097F | 0xA8E0..=0xA8FF | 0x1CD0..=0x1CFF | 0x11B00..=0x11B5F => {
                Some(Script::Devanagari)
            }
            0x200C | 0x200D => None,
            _ if c.is_alphabetic() => Some(Script::Latin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScriptHint {
    /// Detect the script mix of `text`.
    ///
    /// Text with no script-bearing characters counts as Latin.
    pub fn detect(text: &str) -> Self {
        let mut latin = false;
        let mut devanagari = false;
        for script in text.chars().filter_map(Script::of_char) {
            match script {
                Script::Latin => latin = true,
                Script::Devanagari => devanagari = true,
            }
            if latin && devanagari {
                return ScriptHint::Mixed;
            }
        }
        if devanagari {
            ScriptHint::Devanagari
        } else {
            ScriptHint::Latin
        }
    }
}
