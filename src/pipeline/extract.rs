//! Extraction: walk the sampled frames of one video, OCR each, and
//! accumulate the per-frame fragments into the raw transcript.
//!
//! Decoding and OCR are blocking subprocess work, so the whole stage runs on
//! a blocking thread via [`tokio::task::spawn_blocking`].
//!
//! Failures inside the stage degrade instead of aborting: a frame whose
//! recognition fails is skipped with a warning, and a frame stream that dies
//! mid-video yields whatever text was gathered up to that point together
//! with a notice for the caller.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Vid2TextError;
use crate::progress::ProgressCallback;

use super::decode::FrameDecoder;
use super::ocr::{fragment_from_spans, OcrEngine};
use super::sample::FrameSampler;

/// What the extraction stage learned about one video.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Per-frame fragments joined with single newlines; empty when no frame
    /// produced any text.
    pub raw_text: String,
    pub frames_sampled: usize,
    pub fragments_kept: usize,
    /// Present when the video could not be decoded to the end; `raw_text`
    /// still holds everything gathered before the failure.
    pub decode_notice: Option<String>,
}

/// Decode `path`, sample roughly one frame per second, and OCR each sampled
/// frame.
///
/// Fragments are kept in playback order and joined with `\n`. Frames whose
/// recognition yields no text contribute nothing, not even a blank line.
pub async fn extract_text(
    path: PathBuf,
    decoder: Arc<dyn FrameDecoder>,
    ocr: Arc<dyn OcrEngine>,
    progress: Option<ProgressCallback>,
) -> Result<Extraction, Vid2TextError> {
    tokio::task::spawn_blocking(move || {
        if let Some(cb) = &progress {
            cb.on_extraction_start();
        }

        let video = match decoder.open(&path) {
            Ok(video) => video,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open video; no text extracted");
                return Extraction {
                    decode_notice: Some(format!("could not open video: {e}")),
                    ..Extraction::default()
                };
            }
        };

        let sampler = FrameSampler::new(video);
        info!(path = %path.display(), interval = sampler.interval(), "extracting text");

        let mut fragments: Vec<String> = Vec::new();
        let mut frames_sampled = 0usize;
        let mut decode_notice = None;

        for result in sampler {
            match result {
                Ok(frame) => {
                    frames_sampled += 1;
                    if let Some(cb) = &progress {
                        cb.on_frame_sampled(frame.ordinal);
                    }
                    match ocr.recognize(&frame) {
                        Ok(spans) => {
                            let fragment = fragment_from_spans(&spans);
                            if !fragment.is_empty() {
                                fragments.push(fragment);
                            }
                        }
                        Err(e) => {
                            warn!(frame = frame.ordinal, error = %e, "recognition failed; skipping frame");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "decoding stopped early; keeping partial text");
                    decode_notice = Some(format!("decoding stopped early: {e}"));
                    break;
                }
            }
        }

        let fragments_kept = fragments.len();
        info!(frames_sampled, fragments_kept, "extraction finished");
        Extraction {
            raw_text: fragments.join("\n"),
            frames_sampled,
            fragments_kept,
            decode_notice,
        }
    })
    .await
    .map_err(|e| Vid2TextError::Internal(format!("extraction task failed: {e}")))
}
