//! Media types crossing the socket boundary into the engine.
//!
//! Frames arrive as base64 JPEG and are decoded to RGB before they reach the
//! intake queues; audio arrives as float32 PCM. Decoding failures are caller
//! errors ([`MediaError`]) and never reach the scheduler.

mod buffer;
mod intake;

pub use buffer::AudioBuffer;
pub use intake::MediaIntake;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use thiserror::Error;

use crate::utils::now_millis;

/// Errors produced while validating or decoding inbound media.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The frame payload was not decodable base64 JPEG.
    #[error("undecodable frame: {0}")]
    FrameDecode(String),

    /// The frame payload decoded to an empty image.
    #[error("empty frame")]
    EmptyFrame,

    /// The audio payload was malformed.
    #[error("bad audio payload: {0}")]
    BadAudio(String),
}

/// A decoded RGB video frame.
///
/// Pixels are tightly packed `width * height * 3` bytes. The pixel buffer is
/// [`Bytes`] so frames can be handed to a blocking detector call without
/// copying.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Packed RGB8 pixel data.
    pub pixels: Bytes,
    /// Unix timestamp (ms) when the frame was accepted.
    pub captured_at: u64,
}

impl VideoFrame {
    /// Creates a frame from raw RGB8 pixel data.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != width * height * 3`; callers construct
    /// frames only from decoded images where this holds.
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            pixels: Bytes::from(pixels),
            captured_at: now_millis(),
        }
    }

    /// The RGB triplet at (x, y).
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let idx = ((y * self.width + x) * 3) as usize;
        (self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2])
    }
}

/// A chunk of float32 mono PCM as received from a producer.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM samples in [-1, 1].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Creates a chunk, rejecting malformed payloads.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::BadAudio`] on an empty payload, a zero sample
    /// rate, or non-finite samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, MediaError> {
        if samples.is_empty() {
            return Err(MediaError::BadAudio("empty sample buffer".into()));
        }
        if sample_rate == 0 {
            return Err(MediaError::BadAudio("zero sample rate".into()));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(MediaError::BadAudio("non-finite sample".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Chunk duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// The concatenated PCM window handed to the voice detector.
///
/// Produced on demand by [`AudioBuffer::extract_window`]; never mutated.
#[derive(Debug, Clone)]
pub struct AudioWindow {
    /// Concatenated PCM samples in arrival order.
    pub samples: Vec<f32>,
    /// Sample rate of the window (most recent chunk's rate).
    pub sample_rate: u32,
    /// Number of chunks that contributed to the window.
    pub chunk_count: usize,
}

impl AudioWindow {
    /// Window duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Whether the window carries any samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decodes a base64 JPEG payload into an RGB [`VideoFrame`].
///
/// # Errors
///
/// Returns [`MediaError::FrameDecode`] when the payload is not valid base64
/// or not a decodable image, and [`MediaError::EmptyFrame`] for zero-sized
/// images.
pub fn decode_jpeg_frame(payload: &str) -> Result<VideoFrame, MediaError> {
    let raw = BASE64
        .decode(payload.trim())
        .map_err(|e| MediaError::FrameDecode(format!("base64: {e}")))?;
    let decoded =
        image::load_from_memory(&raw).map_err(|e| MediaError::FrameDecode(format!("image: {e}")))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = (rgb.width(), rgb.height());
    if width == 0 || height == 0 {
        return Err(MediaError::EmptyFrame);
    }
    Ok(VideoFrame::from_rgb8(width, height, rgb.into_raw()))
}
