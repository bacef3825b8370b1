//! Frame decoding: turn a local video file into a lazy stream of raster
//! frames.
//!
//! ## Why an ffmpeg subprocess?
//!
//! ffmpeg handles every container and codec worth supporting, and piping
//! tightly packed rgb24 frames over stdout needs no linking against the
//! libav* C libraries. Frames are read one at a time, so memory stays
//! bounded no matter how long the video is. The child process is killed and
//! reaped when the stream is dropped, so abandoning a stream mid-video never
//! leaks a decoder.

use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// One decoded frame: tightly packed 8-bit RGB, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// An opened video: the container's fps hint plus a lazy frame stream.
///
/// The stream is finite and non-restartable; dropping it releases the
/// underlying decoder.
pub struct DecodedVideo {
    /// Frames per second as reported by the container; `0.0` when the
    /// metadata is missing or malformed.
    pub fps_hint: f64,
    /// Decoded frames in playback order. A mid-stream failure is yielded
    /// once as `Err`, after which the stream ends.
    pub frames: Box<dyn Iterator<Item = Result<RasterFrame, DecodeError>>>,
}

/// Errors from opening or walking a frame stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The video could not be opened at all.
    #[error("could not open video: {0}")]
    Open(String),

    /// The frame stream ended abnormally after yielding some frames.
    #[error("frame stream failed: {0}")]
    Stream(String),
}

/// Opens a local video file into a frame stream.
pub trait FrameDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<DecodedVideo, DecodeError>;
}

/// Production decoder backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Default)]
pub struct FfmpegDecoder;

impl FfmpegDecoder {
    /// Read stream dimensions and the container's frame-rate hint.
    fn probe(&self, path: &Path) -> Result<(u32, u32, f64), DecodeError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,avg_frame_rate",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                DecodeError::Open(format!("failed to run ffprobe: {e} (is ffmpeg installed?)"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DecodeError::Open(format!("ffprobe: {}", stderr.trim())));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| DecodeError::Open(format!("unreadable ffprobe output: {e}")))?;
        let stream = probe
            .streams
            .first()
            .ok_or_else(|| DecodeError::Open("no video stream found".into()))?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(DecodeError::Open(
                    "video stream reports no usable dimensions".into(),
                ))
            }
        };
        let fps = stream
            .avg_frame_rate
            .as_deref()
            .map(parse_frame_rate)
            .unwrap_or(0.0);
        Ok((width, height, fps))
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn open(&self, path: &Path) -> Result<DecodedVideo, DecodeError> {
        let (width, height, fps_hint) = self.probe(path)?;
        debug!(width, height, fps = fps_hint, "probed video stream");

        let child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DecodeError::Open(format!("failed to spawn ffmpeg: {e}")))?;

        Ok(DecodedVideo {
            fps_hint,
            frames: Box::new(FfmpegFrames::new(child, width, height)?),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
}

/// Parse an ffprobe rational like `"30000/1001"` into frames per second.
///
/// Malformed, negative, or zero-denominator values collapse to `0.0` (no
/// hint), which downstream treats as "sample every frame".
fn parse_frame_rate(raw: &str) -> f64 {
    let mut parts = raw.trim().splitn(2, '/');
    let num: f64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0.0);
    let den: f64 = match parts.next() {
        Some(d) => d.parse().unwrap_or(0.0),
        None => 1.0,
    };
    if num > 0.0 && den > 0.0 && num.is_finite() && den.is_finite() {
        num / den
    } else {
        0.0
    }
}

/// Iterator over the rgb24 frames ffmpeg writes to its stdout.
struct FfmpegFrames {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_len: usize,
    done: bool,
}

impl FfmpegFrames {
    fn new(mut child: Child, width: u32, height: u32) -> Result<Self, DecodeError> {
        let stdout = match child.stdout.take() {
            Some(out) => out,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DecodeError::Open("ffmpeg stdout unavailable".into()));
            }
        };
        Ok(Self {
            child,
            stdout,
            width,
            height,
            frame_len: width as usize * height as usize * 3,
            done: false,
        })
    }
}

impl Iterator for FfmpegFrames {
    type Item = Result<RasterFrame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut data = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => Some(Ok(RasterFrame {
                width: self.width,
                height: self.height,
                data,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // End of stream; a truncated trailing frame is dropped.
                self.done = true;
                match self.child.wait() {
                    Ok(status) if !status.success() => Some(Err(DecodeError::Stream(format!(
                        "ffmpeg exited with {status}"
                    )))),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("failed to reap ffmpeg: {e}");
                        None
                    }
                }
            }
            Err(e) => {
                self.done = true;
                let _ = self.child.kill();
                let _ = self.child.wait();
                Some(Err(DecodeError::Stream(e.to_string())))
            }
        }
    }
}

impl Drop for FfmpegFrames {
    fn drop(&mut self) {
        // Stream abandoned before end-of-stream: stop the decoder and reap it.
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
