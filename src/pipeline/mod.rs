//! Pipeline stages for video-to-text extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the OCR engine) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ decode ──▶ sample ──▶ ocr ──▶ extract ──▶ repair
//! (URL/path) (ffmpeg)  (1/sec)  (tesseract) (join)     (LLM)
//! ```
//!
//! 1. [`source`]  — canonicalise the user-supplied path or URL to a local file
//! 2. [`decode`]  — turn the file into a lazy stream of raster frames
//! 3. [`sample`]  — keep roughly one frame per second of video
//! 4. [`ocr`]     — recognise on-screen text per frame
//! 5. [`extract`] — drive 2–4 on a blocking worker and join the fragments
//! 6. [`repair`]  — chunk the raw text and clean each chunk via the LLM,
//!    falling back to the original chunk on any failure

pub mod decode;
pub mod extract;
pub mod ocr;
pub mod repair;
pub mod sample;
pub mod source;
