//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::JobConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline samples frames and repairs chunks.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database record,
//! or a terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` so it works
//! correctly when chunks are repaired concurrently.
//!
//! # Example
//!
//! ```rust
//! use vid2text::{JobProgressCallback, JobConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl JobProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fallback: bool) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Chunk {}/{} done (fallback: {})", chunk + 1, total_chunks, fallback);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = JobConfig::builder()
//!     .progress_callback(counter as Arc<dyn JobProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// Implementations must be `Send + Sync` (frame events arrive from a blocking
/// worker thread, chunk events from concurrent repair tasks). All methods have
/// default no-op implementations so callers only override what they care
/// about. Chunk and frame indices are zero-based.
///
/// # Thread safety
///
/// `on_chunk_start` and `on_chunk_complete` may be called concurrently from
/// different tasks. Implementations must protect shared mutable state with
/// appropriate synchronisation primitives (e.g. `Mutex`, `AtomicUsize`).
pub trait JobProgressCallback: Send + Sync {
    /// Called once before a remote source download begins.
    fn on_download_start(&self, url: &str) {
        let _ = url;
    }

    /// Called once before frame sampling and OCR begin.
    fn on_extraction_start(&self) {}

    /// Called for every sampled frame, just before it is handed to OCR.
    ///
    /// The total frame count is unknown up front (the frame stream is lazy),
    /// so there is no `total` argument.
    fn on_frame_sampled(&self, ordinal: usize) {
        let _ = ordinal;
    }

    /// Called once before any repair request is sent.
    fn on_repair_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the repair request is sent for a chunk.
    fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
        let _ = (chunk, total_chunks);
    }

    /// Called when a chunk's repair attempt finishes.
    ///
    /// `fallback` is true when the call failed and the chunk kept its
    /// original text.
    fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fallback: bool) {
        let _ = (chunk, total_chunks, fallback);
    }

    /// Called once after all chunks have been attempted.
    ///
    /// `repaired` counts the chunks that were cleaned without falling back.
    fn on_repair_complete(&self, total_chunks: usize, repaired: usize) {
        let _ = (total_chunks, repaired);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::JobConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;
