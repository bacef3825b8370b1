//! # vid2text
//!
//! Extract the on-screen text of a video into a cleaned, paginated PDF.
//!
//! ## Why this crate?
//!
//! Lectures, conference talks and tutorial recordings carry most of their
//! information on screen — slides, terminals, captions — and none of it in
//! the audio transcript. This crate samples roughly one frame per second of
//! video, runs OCR on each sampled frame, and then lets an LLM repair the
//! usual OCR damage (split words, misread glyphs, stray artefacts) before
//! rendering everything into a single searchable document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! video (file or URL)
//!  │
//!  ├─ 1. Source   local file, or download via yt-dlp into a temp dir
//!  ├─ 2. Decode   ffmpeg → raw RGB frames (blocking, spawn_blocking)
//!  ├─ 3. Sample   one frame per second, driven by the container fps
//!  ├─ 4. OCR      tesseract per sampled frame, fragments joined by line
//!  ├─ 5. Repair   concurrent LLM cleanup per chunk, raw text on failure
//!  └─ 6. Render   paginated PDF + per-chunk stats
//! ```
//!
//! Downloads live in a temporary directory that is removed when the job
//! ends, whether it succeeds, fails or panics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vid2text::{run, JobConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / GEMINI_API_KEY.
//!     let config = JobConfig::default();
//!     let output = run("lecture.mp4", &config).await?;
//!     println!("{}", output.text);
//!     if let Some(path) = &output.document_path {
//!         eprintln!("document: {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vid2text` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! vid2text = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Provider
//!
//! | Provider | Default model | Needs | Best for |
//! |----------|--------------|-------|----------|
//! | `openai` | `gpt-4.1-mini` | `OPENAI_API_KEY` | Default — fast, accurate |
//! | `gemini` | `gemini-2.0-flash` | `GEMINI_API_KEY` | Cheap alternative |
//! | `local`  | `phi3:mini` | an Ollama server | Offline, free |
//!
//! With no key and no explicit provider the repair stage is skipped and the
//! raw OCR text flows straight to the document.
//!
//! ## External Tools
//!
//! The production pipeline shells out to `ffmpeg`/`ffprobe` (decoding),
//! `tesseract` (OCR) and, for URLs, `yt-dlp`. All three are packaged by
//! every major distro; none are linked against.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chunk;
pub mod config;
pub mod error;
pub mod job;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chunk::split_chunks;
pub use config::{JobConfig, JobConfigBuilder};
pub use error::{ChunkError, Vid2TextError};
pub use job::{run, Job};
pub use llm::{
    resolve_provider, GeminiProvider, LlmError, LlmProvider, OpenAiProvider, ProviderKind,
};
pub use output::{ChunkOutcome, JobOutput, JobStats};
pub use pipeline::decode::{FfmpegDecoder, FrameDecoder};
pub use pipeline::ocr::{OcrEngine, TesseractOcr, TextSpan};
pub use pipeline::source::{Downloader, VideoSource, YtDlpDownloader};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::{DocumentRenderer, PdfRenderer};
