//! Error types for the vid2text library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Vid2TextError`] — **Fatal**: the job cannot proceed at all (missing
//!   input file, unreachable URL, unwritable output document). Returned as
//!   `Err(Vid2TextError)` from the top-level `run*` functions.
//!
//! * [`ChunkError`] — **Non-fatal**: the repair call for a single text chunk
//!   failed but the chunk's original text is still usable. Stored inside
//!   [`crate::output::ChunkOutcome`] so callers can see which chunks fell
//!   back to raw OCR text rather than losing the whole document to one bad
//!   API call.
//!
//! Decode and OCR problems inside the extraction stage are also non-fatal:
//! the stage keeps whatever text it gathered and records a notice in
//! [`crate::output::JobStats`].

use std::path::PathBuf;
use thiserror::Error;

fn fetch_hint(auth_required: &bool) -> &'static str {
    if *auth_required {
        "\nThe site refused access. Re-run with --cookies-from-browser <BROWSER> to reuse a logged-in browser session."
    } else {
        "\nCheck the URL and your internet connection."
    }
}

/// All fatal errors returned by the vid2text library.
///
/// Chunk-level repair failures use [`ChunkError`] and are stored in
/// [`crate::output::ChunkOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Vid2TextError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// Local input file was not found at the given path.
    #[error("Video file not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// URL was syntactically plausible but the video could not be fetched.
    ///
    /// `auth_required` is set when the downloader recognised a login wall,
    /// so front-ends can point users at browser cookies.
    #[error("Failed to fetch video from '{url}': {reason}{}", fetch_hint(.auth_required))]
    SourceUnavailable {
        url: String,
        reason: String,
        auth_required: bool,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write document '{path}': {source}")]
    RenderFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single text chunk.
///
/// Stored alongside [`crate::output::ChunkOutcome`] when a repair call
/// fails. The chunk keeps its original text and the job continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// LLM call failed (HTTP error, API error, malformed response).
    #[error("Chunk {chunk}: repair call failed: {detail}")]
    LlmFailed { chunk: usize, detail: String },

    /// LLM call timed out.
    #[error("Chunk {chunk}: repair call timed out after {secs}s")]
    Timeout { chunk: usize, secs: u64 },
}
