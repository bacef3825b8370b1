//! Output types: per-chunk outcomes plus whole-job statistics.
//!
//! A job that finishes is not necessarily a job where every repair call
//! succeeded. [`JobOutput`] keeps the per-chunk record so callers can tell
//! cleaned text from fallback text, and [`JobStats`] aggregates the numbers
//! a front-end needs for a summary line. Everything here serialises to JSON
//! for the CLI's `--json` mode.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ChunkError;

/// The result of repairing one text chunk.
///
/// Chunks correspond 1:1 by position to the pieces the raw text was split
/// into; `index` is the zero-based position used to reassemble them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// Zero-based chunk index (reassembly order).
    pub index: usize,
    /// Cleaned text, or the original chunk text when `fallback` is true.
    pub text: String,
    /// True when the repair call failed and the original text was kept.
    pub fallback: bool,
    /// The failure that caused the fallback, if any.
    pub error: Option<ChunkError>,
    /// Wall-clock time spent on this chunk's repair call.
    pub duration_ms: u64,
}

/// Aggregate counters and notices for one job run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    /// Frames emitted by the sampler and handed to OCR.
    pub frames_sampled: usize,
    /// Frames whose OCR text was non-empty after trimming.
    pub fragments_kept: usize,
    /// Chunks the raw text was split into (0 when repair was skipped).
    pub chunks_total: usize,
    /// Chunks cleaned by the LLM.
    pub chunks_repaired: usize,
    /// Chunks that kept their original text after a failed call.
    pub chunks_fallback: usize,
    /// True when no LLM provider was available and repair was skipped.
    pub repair_skipped: bool,
    /// True when no text was extracted and no document was written.
    pub render_skipped: bool,
    /// Human-readable notice when frame decoding ended early or never
    /// started; extraction still returns whatever it gathered.
    pub decode_notice: Option<String>,
    /// Time spent resolving, sampling, and recognising frames.
    pub extract_duration_ms: u64,
    /// Time spent in the repair stage (0 when skipped).
    pub repair_duration_ms: u64,
    /// End-to-end job time.
    pub total_duration_ms: u64,
}

/// Everything a finished job produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    /// The final text: cleaned chunks joined with blank lines, or the raw
    /// OCR text when repair was skipped.
    pub text: String,
    /// Per-chunk outcomes in index order (empty when repair was skipped).
    pub chunks: Vec<ChunkOutcome>,
    /// Where the rendered document was written, if it was.
    pub document_path: Option<PathBuf>,
    /// Aggregate counters.
    pub stats: JobStats,
}

impl JobOutput {
    /// True when repair ran and every chunk was cleaned without fallback.
    pub fn fully_repaired(&self) -> bool {
        !self.stats.repair_skipped && self.stats.chunks_fallback == 0
    }

    /// The errors behind any fallback chunks, in chunk order.
    pub fn chunk_errors(&self) -> impl Iterator<Item = &ChunkError> {
        self.chunks.iter().filter_map(|c| c.error.as_ref())
    }
}
