//! Grapheme clusters and script runs.
//!
//! Line breaking may only cut between clusters. Extended grapheme
//! clusters alone are not enough for Devanagari: a conjunct such as
//! `क्ष` is consonant + virama + consonant, and older Unicode data splits
//! it after the virama. Such pieces are merged here so a conjunct is
//! always one unit.

use unicode_segmentation::UnicodeSegmentation;

use captioner_model::script::Script;

const VIRAMA: char = '\u{094D}';
const ZWNJ: char = '\u{200C}';
const ZWJ: char = '\u{200D}';

fn is_devanagari_consonant(c: char) -> bool {
    matches!(c as u32, 0x0915..=0x0939 | 0x0958..=0x095F | 0x0978..=0x097F)
}

/// Split `text` into display clusters.
///
/// Every returned slice is a contiguous piece of `text` and the slices
/// concatenate back to `text`.
pub fn clusters(text: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (offset, grapheme) in text.grapheme_indices(true) {
        let end = offset + grapheme.len();
        let joins = match current {
            Some((start, prev_end)) => {
                let prev_last = text[start..prev_end].chars().next_back();
                let next_first = grapheme.chars().next();
                match (prev_last, next_first) {
                    (Some(VIRAMA), Some(c)) | (Some(ZWJ), Some(c)) | (Some(ZWNJ), Some(c)) => {
                        is_devanagari_consonant(c)
                    }
                    _ => false,
                }
            }
            None => false,
        };

        current = match current {
            Some((start, _)) if joins => Some((start, end)),
            Some((start, prev_end)) => {
                out.push(&text[start..prev_end]);
                Some((offset, end))
            }
            None => Some((offset, end)),
        };
    }

    if let Some((start, end)) = current {
        out.push(&text[start..end]);
    }
    out
}

fn extend_last(runs: &mut [(Script, usize, usize)], end: usize) {
    if let Some(last) = runs.last_mut() {
        last.2 = end;
    }
}

/// Script of a cluster: that of its first script-bearing character.
pub fn cluster_script(cluster: &str) -> Option<Script> {
    cluster.chars().find_map(Script::of_char)
}

/// Split `text` into maximal single-script runs.
///
/// Script-neutral clusters (spaces, digits, punctuation) join the run
/// before them; leading neutrals join the first run. Text without any
/// script-bearing character is one Latin run.
pub fn script_runs(text: &str) -> Vec<(Script, &str)> {
    let mut runs: Vec<(Script, usize, usize)> = Vec::new();
    let mut pending_start: Option<usize> = None;
    let mut offset = 0;

    for cluster in clusters(text) {
        let end = offset + cluster.len();
        let last_script = runs.last().map(|run| run.0);
        match (cluster_script(cluster), last_script) {
            (Some(script), Some(last)) if last == script => extend_last(&mut runs, end),
            (Some(script), last) => {
                let start = match last {
                    None => pending_start.take().unwrap_or(offset),
                    Some(_) => offset,
                };
                runs.push((script, start, end));
            }
            (None, Some(_)) => extend_last(&mut runs, end),
            (None, None) => {
                pending_start.get_or_insert(offset);
            }
        }
        offset = end;
    }

    if runs.is_empty() && !text.is_empty() {
        return vec![(Script::Latin, text)];
    }
    runs.into_iter()
        .map(|(script, start, end)| (script, &text[start..end]))
        .collect()
}

/// Devanagari vowel signs, nasalization marks, and virama.
///
/// These never start a cluster; a line beginning with one has been cut
/// mid-cluster.
pub fn is_devanagari_mark(c: char) -> bool {
    matches!(
        c as u32,
        0x0900..=0x0903 | 0x093A..=0x093C | 0x093E..=0x094F | 0x0951..=0x0957 | 0x0962..=0x0963
    )
}
