//! The job driver: wires the pipeline stages together and owns the
//! lifecycle of one video-to-document run.
//!
//! Stage order is fixed: resolve the source, extract raw text, repair it,
//! render the document. A downloaded video lives in a temp directory whose
//! lifetime spans the whole run, so cleanup happens on success, on error
//! and on panic alike.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::JobConfig;
use crate::error::Vid2TextError;
use crate::llm::resolve_provider;
use crate::output::{JobOutput, JobStats};
use crate::pipeline::decode::{FfmpegDecoder, FrameDecoder};
use crate::pipeline::extract::extract_text;
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::repair::repair_text;
use crate::pipeline::source::{self, Downloader, VideoSource, YtDlpDownloader};
use crate::render::{DocumentRenderer, PdfRenderer};

/// One configured video-to-document job.
///
/// [`Job::new`] wires the production capabilities (yt-dlp, ffmpeg,
/// tesseract, the PDF renderer); [`Job::with_capabilities`] accepts
/// substitutes, which is how the tests run the driver without any of the
/// external tools installed.
pub struct Job {
    config: JobConfig,
    downloader: Arc<dyn Downloader>,
    decoder: Arc<dyn FrameDecoder>,
    ocr: Arc<dyn OcrEngine>,
    renderer: Arc<dyn DocumentRenderer>,
}

impl Job {
    pub fn new(config: JobConfig) -> Self {
        let ocr = TesseractOcr::new(config.ocr_lang.clone());
        Self {
            config,
            downloader: Arc::new(YtDlpDownloader),
            decoder: Arc::new(FfmpegDecoder),
            ocr: Arc::new(ocr),
            renderer: Arc::new(PdfRenderer),
        }
    }

    pub fn with_capabilities(
        config: JobConfig,
        downloader: Arc<dyn Downloader>,
        decoder: Arc<dyn FrameDecoder>,
        ocr: Arc<dyn OcrEngine>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            config,
            downloader,
            decoder,
            ocr,
            renderer,
        }
    }

    /// Run the full pipeline for one source.
    ///
    /// Returns the final transcript, per-chunk repair outcomes and the
    /// document path; the path is `None` when no text was extracted and
    /// rendering was skipped.
    pub async fn run(&self, source: &VideoSource) -> Result<JobOutput, Vid2TextError> {
        let total_started = Instant::now();
        let progress = self.config.progress_callback.clone();
        info!(source = %source, "starting job");

        if let (Some(cb), VideoSource::Remote { url, .. }) = (&progress, source) {
            cb.on_download_start(url);
        }
        let resolved = source::resolve(source, self.downloader.clone()).await?;

        let extract_started = Instant::now();
        let extraction = extract_text(
            resolved.path().to_path_buf(),
            self.decoder.clone(),
            self.ocr.clone(),
            progress.clone(),
        )
        .await?;
        let extract_duration_ms = extract_started.elapsed().as_millis() as u64;

        let provider = resolve_provider(&self.config);
        let repair_started = Instant::now();
        let repaired = repair_text(&extraction.raw_text, provider, &self.config).await;
        let repair_duration_ms = repair_started.elapsed().as_millis() as u64;

        let document_path = if repaired.text.trim().is_empty() {
            info!("no text extracted; skipping document rendering");
            None
        } else {
            let path = self.config.document_path();
            let renderer = self.renderer.clone();
            let text = repaired.text.clone();
            let render_path = path.clone();
            tokio::task::spawn_blocking(move || renderer.render(&text, &render_path))
                .await
                .map_err(|e| Vid2TextError::Internal(format!("render task failed: {e}")))??;
            info!(path = %path.display(), "document written");
            Some(path)
        };

        if resolved.is_downloaded() {
            debug!("removing temporary download");
        }
        drop(resolved);

        let stats = JobStats {
            frames_sampled: extraction.frames_sampled,
            fragments_kept: extraction.fragments_kept,
            chunks_total: repaired.chunks.len(),
            chunks_repaired: repaired.chunks.iter().filter(|c| !c.fallback).count(),
            chunks_fallback: repaired.chunks.iter().filter(|c| c.fallback).count(),
            repair_skipped: repaired.skipped,
            render_skipped: document_path.is_none(),
            decode_notice: extraction.decode_notice,
            extract_duration_ms,
            repair_duration_ms,
            total_duration_ms: total_started.elapsed().as_millis() as u64,
        };
        info!(
            frames = stats.frames_sampled,
            chunks = stats.chunks_total,
            elapsed_ms = stats.total_duration_ms,
            "job finished"
        );

        Ok(JobOutput {
            text: repaired.text,
            chunks: repaired.chunks,
            document_path,
            stats,
        })
    }
}

/// Convenience entry point: classify `input` as a URL or a local path and
/// run a [`Job`] with the production capabilities.
pub async fn run(input: &str, config: &JobConfig) -> Result<JobOutput, Vid2TextError> {
    let source = VideoSource::parse(input, config.cookies_browser.clone());
    Job::new(config.clone()).run(&source).await
}
