//! Driver-level integration tests for vid2text.
//!
//! Every external capability (yt-dlp, ffmpeg, tesseract, the LLM, the PDF
//! renderer) is swapped for an in-process substitute via
//! `Job::with_capabilities`, so these run anywhere: no tools installed, no
//! network, no API keys.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vid2text::pipeline::decode::{DecodeError, DecodedVideo, FrameDecoder, RasterFrame};
use vid2text::pipeline::ocr::{OcrEngine, OcrError, TextSpan};
use vid2text::pipeline::sample::Frame;
use vid2text::pipeline::source::{DownloadError, Downloader, VideoSource};
use vid2text::{DocumentRenderer, Job, JobConfig, LlmError, LlmProvider, Vid2TextError};

// ── Capability substitutes ───────────────────────────────────────────────────

/// Emits `frames` synthetic 1×1 frames at the given container fps.
struct StubDecoder {
    fps: f64,
    frames: usize,
}

impl FrameDecoder for StubDecoder {
    fn open(&self, _path: &Path) -> Result<DecodedVideo, DecodeError> {
        let items: Vec<Result<RasterFrame, DecodeError>> = (0..self.frames)
            .map(|i| {
                Ok(RasterFrame {
                    width: 1,
                    height: 1,
                    data: vec![i as u8, 0, 0],
                })
            })
            .collect();
        Ok(DecodedVideo {
            fps_hint: self.fps,
            frames: Box::new(items.into_iter()),
        })
    }
}

/// Returns a scripted text per sampled-frame ordinal; missing entries and
/// empty strings yield no spans.
struct ScriptedOcr {
    texts: Vec<&'static str>,
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, frame: &Frame) -> Result<Vec<TextSpan>, OcrError> {
        let text = self.texts.get(frame.ordinal).copied().unwrap_or("");
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TextSpan {
            text: text.to_string(),
            region: (0, 0, 1, 1),
            confidence: 95.0,
        }])
    }
}

/// Fails every repair call with an API error.
struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }
    async fn chat_complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::Api {
            provider: "failing".to_string(),
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

/// Uppercases the quoted chunk embedded at the end of the repair prompt.
struct UppercaseProvider;

#[async_trait]
impl LlmProvider for UppercaseProvider {
    fn name(&self) -> &str {
        "uppercase"
    }
    async fn chat_complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        let chunk = user.rsplit('"').nth(1).unwrap_or("");
        Ok(chunk.to_uppercase())
    }
}

/// Records every render call instead of writing a PDF.
#[derive(Default)]
struct RecordingRenderer {
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl DocumentRenderer for RecordingRenderer {
    fn render(&self, text: &str, path: &Path) -> Result<(), Vid2TextError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), path.to_path_buf()));
        Ok(())
    }
}

/// Writes a fake video into the destination directory and remembers where.
#[derive(Default)]
struct SucceedingDownloader {
    seen_dir: Mutex<Option<PathBuf>>,
}

impl Downloader for SucceedingDownloader {
    fn fetch(
        &self,
        _url: &str,
        _auth_hint: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        *self.seen_dir.lock().unwrap() = Some(dest_dir.to_path_buf());
        let path = dest_dir.join("video.mp4");
        fs::write(&path, b"fake video").unwrap();
        Ok(path)
    }
}

/// Leaves a partial file behind, remembers the directory, then fails with an
/// auth-shaped error.
#[derive(Default)]
struct AuthWallDownloader {
    seen_dir: Mutex<Option<PathBuf>>,
}

impl Downloader for AuthWallDownloader {
    fn fetch(
        &self,
        _url: &str,
        _auth_hint: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        fs::write(dest_dir.join("video.mp4.part"), b"truncated").unwrap();
        *self.seen_dir.lock().unwrap() = Some(dest_dir.to_path_buf());
        Err(DownloadError {
            detail: "ERROR: Sign in to confirm your age".to_string(),
            auth_required: true,
        })
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

const OCR_PHRASE: &str = "hello wrold this is smple OCR txt";

fn test_config(output_dir: &Path, provider: Option<Arc<dyn LlmProvider>>) -> JobConfig {
    let mut builder = JobConfig::builder().output_dir(output_dir.to_path_buf());
    if let Some(provider) = provider {
        builder = builder.provider(provider);
    }
    builder.build().expect("valid config")
}

fn one_frame_job(
    config: JobConfig,
    provider_text: &'static str,
    renderer: Arc<RecordingRenderer>,
) -> Job {
    Job::with_capabilities(
        config,
        Arc::new(SucceedingDownloader::default()),
        Arc::new(StubDecoder {
            fps: 1.0,
            frames: 1,
        }),
        Arc::new(ScriptedOcr {
            texts: vec![provider_text],
        }),
        renderer,
    )
}

/// A throwaway local video file the stub decoder will happily "open".
fn fake_video(dir: &Path) -> PathBuf {
    let path = dir.join("talk.mp4");
    fs::write(&path, b"not really a video").unwrap();
    path
}

// ── Source failures ──────────────────────────────────────────────────────────

/// A local path that does not exist must fail before any stage runs.
#[tokio::test]
async fn missing_local_video_is_source_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer::default());
    let job = one_frame_job(test_config(dir.path(), None), OCR_PHRASE, renderer.clone());

    let source = VideoSource::Local(PathBuf::from("/definitely/not/here.mp4"));
    let err = job.run(&source).await.unwrap_err();

    assert!(matches!(err, Vid2TextError::SourceNotFound { .. }));
    assert!(renderer.calls.lock().unwrap().is_empty());
}

/// A download refused by a login wall reports the auth flag, surfaces the
/// cookies hint, and leaves no partial files behind.
#[tokio::test]
async fn failed_download_reports_auth_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = Arc::new(AuthWallDownloader::default());
    let renderer = Arc::new(RecordingRenderer::default());
    let job = Job::with_capabilities(
        test_config(dir.path(), None),
        downloader.clone(),
        Arc::new(StubDecoder {
            fps: 1.0,
            frames: 1,
        }),
        Arc::new(ScriptedOcr {
            texts: vec![OCR_PHRASE],
        }),
        renderer.clone(),
    );

    let source = VideoSource::parse("https://example.com/gated", None);
    let err = job.run(&source).await.unwrap_err();

    match &err {
        Vid2TextError::SourceUnavailable { auth_required, .. } => assert!(*auth_required),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("--cookies-from-browser"));

    let seen = downloader.seen_dir.lock().unwrap().clone().unwrap();
    assert!(!seen.exists(), "partial download must be removed");
    assert!(renderer.calls.lock().unwrap().is_empty());
}

// ── Repair fallback ──────────────────────────────────────────────────────────

/// When every repair call fails, the document must carry the raw OCR text
/// verbatim; the renderer still runs exactly once.
#[tokio::test]
async fn repair_failure_falls_back_to_raw_text() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let renderer = Arc::new(RecordingRenderer::default());
    let config = test_config(dir.path(), Some(Arc::new(FailingProvider)));
    let expected_doc = config.document_path();
    let job = one_frame_job(config, OCR_PHRASE, renderer.clone());

    let output = job.run(&VideoSource::Local(video)).await.unwrap();

    assert_eq!(output.text, OCR_PHRASE);
    assert_eq!(output.document_path.as_deref(), Some(expected_doc.as_path()));
    assert!(!output.fully_repaired());
    assert_eq!(output.stats.chunks_total, 1);
    assert_eq!(output.stats.chunks_fallback, 1);
    assert!(!output.stats.repair_skipped);
    assert!(!output.stats.render_skipped);
    assert_eq!(output.chunk_errors().count(), 1);

    let calls = renderer.calls.lock().unwrap();
    assert_eq!(calls.len(), 1, "renderer must run exactly once");
    assert_eq!(calls[0].0, OCR_PHRASE);
    assert_eq!(calls[0].1, expected_doc);
}

/// A working provider's cleaned text is what reaches the renderer.
#[tokio::test]
async fn successful_repair_renders_cleaned_text() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let renderer = Arc::new(RecordingRenderer::default());
    let config = test_config(dir.path(), Some(Arc::new(UppercaseProvider)));
    let job = one_frame_job(config, OCR_PHRASE, renderer.clone());

    let output = job.run(&VideoSource::Local(video)).await.unwrap();

    let cleaned = OCR_PHRASE.to_uppercase();
    assert_eq!(output.text, cleaned);
    assert!(output.fully_repaired());
    assert_eq!(output.stats.chunks_repaired, 1);

    let calls = renderer.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, cleaned);
}

/// Without any provider the raw text flows straight through and the stage is
/// reported as skipped.
#[tokio::test]
async fn no_provider_keeps_raw_text_and_reports_skip() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let renderer = Arc::new(RecordingRenderer::default());
    let job = one_frame_job(test_config(dir.path(), None), OCR_PHRASE, renderer.clone());

    let output = job.run(&VideoSource::Local(video)).await.unwrap();

    assert_eq!(output.text, OCR_PHRASE);
    assert!(output.stats.repair_skipped);
    assert_eq!(output.stats.chunks_total, 0);
    assert_eq!(renderer.calls.lock().unwrap().len(), 1);
}

// ── Empty extraction ─────────────────────────────────────────────────────────

/// A video with no recognisable text renders nothing and says so.
#[tokio::test]
async fn empty_extraction_skips_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let renderer = Arc::new(RecordingRenderer::default());
    let job = Job::with_capabilities(
        test_config(dir.path(), Some(Arc::new(FailingProvider))),
        Arc::new(SucceedingDownloader::default()),
        Arc::new(StubDecoder {
            fps: 1.0,
            frames: 3,
        }),
        Arc::new(ScriptedOcr { texts: vec![] }),
        renderer.clone(),
    );

    let output = job.run(&VideoSource::Local(video)).await.unwrap();

    assert_eq!(output.text, "");
    assert!(output.document_path.is_none());
    assert!(output.stats.render_skipped);
    assert!(output.stats.repair_skipped, "nothing to repair");
    assert_eq!(output.stats.frames_sampled, 3);
    assert_eq!(output.stats.fragments_kept, 0);
    assert!(renderer.calls.lock().unwrap().is_empty());
}

// ── Download success path ────────────────────────────────────────────────────

/// A remote source is downloaded, processed, and its temp directory removed
/// once the job has finished.
#[tokio::test]
async fn downloaded_video_is_processed_and_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = Arc::new(SucceedingDownloader::default());
    let renderer = Arc::new(RecordingRenderer::default());
    let job = Job::with_capabilities(
        test_config(dir.path(), None),
        downloader.clone(),
        Arc::new(StubDecoder {
            fps: 2.0,
            frames: 4,
        }),
        Arc::new(ScriptedOcr {
            texts: vec!["first screen", "second screen"],
        }),
        renderer.clone(),
    );

    let source = VideoSource::parse("https://example.com/talk", None);
    let output = job.run(&source).await.unwrap();

    // fps 2 over 4 decoded frames samples ordinals 0 and 1.
    assert_eq!(output.stats.frames_sampled, 2);
    assert_eq!(output.text, "first screen\nsecond screen");
    assert!(output.document_path.is_some());

    let seen = downloader.seen_dir.lock().unwrap().clone().unwrap();
    assert!(!seen.exists(), "temp download dir must be removed");
    assert_eq!(renderer.calls.lock().unwrap().len(), 1);
}

// ── Multi-chunk reassembly ───────────────────────────────────────────────────

/// Chunked repair reassembles in order with blank-line joins, whatever order
/// the concurrent calls complete in.
#[tokio::test]
async fn multi_chunk_repair_rejoins_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let renderer = Arc::new(RecordingRenderer::default());
    let config = JobConfig::builder()
        .output_dir(dir.path().to_path_buf())
        .chunk_size(5)
        .concurrency(4)
        .provider(Arc::new(UppercaseProvider))
        .build()
        .expect("valid config");
    let job = one_frame_job(config, "aa bb cc dd", renderer.clone());

    let output = job.run(&VideoSource::Local(video)).await.unwrap();

    assert_eq!(output.stats.chunks_total, 2);
    assert_eq!(output.text, "AA BB\n\nCC DD");
    let indices: Vec<usize> = output.chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1]);
}

// ── Output serialisation ─────────────────────────────────────────────────────

/// The structured output must survive a JSON round-trip (the CLI's --json
/// mode depends on it).
#[tokio::test]
async fn job_output_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let renderer = Arc::new(RecordingRenderer::default());
    let config = test_config(dir.path(), Some(Arc::new(FailingProvider)));
    let job = one_frame_job(config, OCR_PHRASE, renderer);

    let output = job.run(&VideoSource::Local(video)).await.unwrap();

    let json = serde_json::to_string_pretty(&output).expect("output must serialise");
    let back: vid2text::JobOutput = serde_json::from_str(&json).expect("and deserialise");
    assert_eq!(back.text, output.text);
    assert_eq!(back.stats.chunks_fallback, output.stats.chunks_fallback);
    assert_eq!(back.chunks.len(), output.chunks.len());
}
