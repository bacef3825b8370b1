//! OCR: recognise on-screen text in a sampled frame.
//!
//! ## Why a tesseract subprocess?
//!
//! The `tesseract` CLI ships in every distro's package manager and reads PNG
//! from stdin, so nothing here links against the tesseract/leptonica C++
//! libraries. TSV output mode carries a bounding region and a confidence per
//! word; the pipeline only consumes the text field, but the richer contract
//! keeps the engine swappable for one that needs geometry.

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use thiserror::Error;

use super::decode::RasterFrame;
use super::sample::Frame;

/// One recognised word with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Bounding region in pixels: (left, top, width, height).
    pub region: (i32, i32, i32, i32),
    pub confidence: f32,
}

/// Errors from a single recognition call.
///
/// These are per-frame: the extraction orchestrator logs them and skips the
/// frame rather than failing the job.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine binary could not be started.
    #[error("failed to run tesseract: {0} (is tesseract installed?)")]
    Spawn(std::io::Error),

    /// Feeding the frame or collecting the output failed.
    #[error("tesseract I/O failed: {0}")]
    Io(std::io::Error),

    /// The engine ran but exited with an error.
    #[error("tesseract failed: {0}")]
    Engine(String),

    /// The frame could not be encoded for the engine.
    #[error("could not encode frame: {0}")]
    Encode(String),
}

/// Recognises text spans in one sampled frame.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, frame: &Frame) -> Result<Vec<TextSpan>, OcrError>;
}

/// Production engine driving the `tesseract` binary in TSV mode.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    lang: String,
}

impl TesseractOcr {
    /// `lang` is a tesseract language code such as "eng" or "deu+eng".
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, frame: &Frame) -> Result<Vec<TextSpan>, OcrError> {
        let png = encode_png(&frame.image)?;

        let mut child = Command::new("tesseract")
            .args(["stdin", "stdout", "-l", &self.lang, "--psm", "3", "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(OcrError::Spawn)?;

        // Tesseract reads stdin to EOF before emitting any TSV, so writing
        // the whole image first cannot deadlock on the output pipe.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).map_err(OcrError::Io)?;
        }

        let output = child.wait_with_output().map_err(OcrError::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(stderr.trim().to_string()));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// PNG-encode a raw RGB frame for the engine's stdin.
fn encode_png(raster: &RasterFrame) -> Result<Vec<u8>, OcrError> {
    let buffer = image::RgbImage::from_raw(raster.width, raster.height, raster.data.clone())
        .ok_or_else(|| OcrError::Encode("frame buffer does not match its dimensions".into()))?;
    let mut png = Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| OcrError::Encode(e.to_string()))?;
    Ok(png.into_inner())
}

/// Parse tesseract TSV output into spans.
///
/// Word rows have level 5; everything else (page/block/paragraph/line rows
/// and the header) is layout structure. Words with negative confidence are
/// layout artefacts and are dropped, as are empty texts.
fn parse_tsv(tsv: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    for line in tsv.lines() {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let (Ok(left), Ok(top), Ok(width), Ok(height)) = (
            cols[6].parse::<i32>(),
            cols[7].parse::<i32>(),
            cols[8].parse::<i32>(),
            cols[9].parse::<i32>(),
        ) else {
            continue;
        };
        let Ok(confidence) = cols[10].parse::<f32>() else {
            continue;
        };
        let text = cols[11].trim();
        if confidence < 0.0 || text.is_empty() {
            continue;
        }
        spans.push(TextSpan {
            text: text.to_string(),
            region: (left, top, width, height),
            confidence,
        });
    }
    spans
}

/// Collapse a frame's spans into one text fragment: word texts joined with
/// single spaces, trimmed. Region and confidence are deliberately dropped.
pub fn fragment_from_spans(spans: &[TextSpan]) -> String {
    spans
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
