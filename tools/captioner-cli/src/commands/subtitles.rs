//! Write sidecar subtitles.

use std::path::PathBuf;

use captioner_transcript::{load_segments, save_subtitles};

pub fn run(segments: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let store = load_segments(&segments)?;
    save_subtitles(store.segments(), &output)?;
    println!("Wrote {} cue(s) to {}", store.len(), output.display());
    Ok(())
}
