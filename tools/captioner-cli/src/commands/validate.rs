//! Validate a transcript file.

use std::path::PathBuf;

use captioner_model::segment::SegmentStore;
use captioner_transcript::read_raw_segments;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating transcript at: {}", path.display());

    let raw = read_raw_segments(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read transcript: {e}"))?;
    let received = raw.len();

    let store = match SegmentStore::load(raw) {
        Ok(store) => store,
        Err(e) => {
            println!("\nTranscript is invalid: {e}");
            return Err(e.into());
        }
    };

    println!("  Segments: {}", store.len());
    println!("  Records received: {received}");
    println!("  Ends at: {:.3}s", store.end_secs());
    println!("  Content hash: {}", store.content_hash());
    if store.clipped_count() > 0 {
        println!(
            "  Overlaps clipped: {} (earlier segments shortened)",
            store.clipped_count()
        );
    }
    println!("\nTranscript is valid.");
    Ok(())
}
