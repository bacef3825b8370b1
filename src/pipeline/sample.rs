//! Frame sampling: reduce the decoded stream to roughly one frame per
//! second of video.
//!
//! On-screen text rarely changes faster than once a second, so running OCR
//! on all 30 frames of that second does thirty times the work for the same
//! words. The sampler emits one decoded frame per `interval` frames, where
//! the interval comes from the container's fps hint.

use tracing::debug;

use super::decode::{DecodeError, DecodedVideo, RasterFrame};

/// A sampled frame: the raster image plus its ordinal position in the
/// sampled sequence (0, 1, 2, …).
#[derive(Debug, Clone)]
pub struct Frame {
    pub ordinal: usize,
    pub image: RasterFrame,
}

/// Decoded frames per emitted frame for a given container fps hint.
///
/// A positive hint rounds to the nearest whole frame count, clamped to at
/// least 1 (sub-1fps streams emit every frame). A missing or malformed hint
/// (`0.0`) also degrades to every frame rather than failing.
pub fn sampling_interval(fps_hint: f64) -> u64 {
    if fps_hint > 0.0 {
        (fps_hint.round() as u64).max(1)
    } else {
        1
    }
}

/// Lazy sampler over a decoded frame stream.
///
/// Emits exactly the frames whose zero-based decode index is a multiple of
/// the interval, in playback order. Owns the underlying stream: dropping the
/// sampler releases the decoder, exhausting it reaps the decoder normally.
pub struct FrameSampler {
    frames: Box<dyn Iterator<Item = Result<RasterFrame, DecodeError>>>,
    interval: u64,
    decode_index: u64,
    next_ordinal: usize,
}

impl FrameSampler {
    pub fn new(video: DecodedVideo) -> Self {
        let interval = sampling_interval(video.fps_hint);
        debug!(fps = video.fps_hint, interval, "sampling interval chosen");
        Self {
            frames: video.frames,
            interval,
            decode_index: 0,
            next_ordinal: 0,
        }
    }

    /// The chosen interval, in decoded frames per emitted frame.
    pub fn interval(&self) -> u64 {
        self.interval
    }
}

impl Iterator for FrameSampler {
    type Item = Result<Frame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.frames.next()? {
                Ok(image) => {
                    let index = self.decode_index;
                    self.decode_index += 1;
                    if index % self.interval == 0 {
                        let frame = Frame {
                            ordinal: self.next_ordinal,
                            image,
                        };
                        self.next_ordinal += 1;
                        return Some(Ok(frame));
                    }
                }
                // Decoder failures pass through untouched; the caller decides
                // whether to stop.
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
