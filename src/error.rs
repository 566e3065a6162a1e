//! Error types for the decode pipeline
//!
//! Every failure a decoder session can report is a [`DecodeError`]. End of
//! stream is not an error: sessions report it as `Ok(None)`.

use std::fmt;

use ffmpeg_next::format::Pixel;
use thiserror::Error;

/// Pixel format and dimensions of a decoded picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub format: Pixel,
    pub width: u32,
    pub height: u32,
}

impl FrameLayout {
    pub fn new(format: Pixel, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
        }
    }

    /// Layout of an existing FFmpeg frame
    pub fn of(frame: &ffmpeg_next::frame::Video) -> Self {
        Self::new(frame.format(), frame.width(), frame.height())
    }
}

impl fmt::Display for FrameLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}x{}", self.format, self.width, self.height)
    }
}

/// Errors that can occur while opening or pulling from a decoder session
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The container could not be opened or its headers could not be parsed
    #[error("failed to open media source {locator}: {reason}")]
    Open { locator: String, reason: String },

    /// The container holds no video stream the demuxer would select
    #[error("no usable video stream in {0}")]
    NoStream(String),

    /// No decoder for the stream's codec, or the codec failed to open
    #[error("codec error: {0}")]
    Codec(String),

    /// The negotiated hardware device could not be created
    #[error("hardware device unavailable: {0}")]
    Device(String),

    /// Copying a device-resident picture into host memory failed
    #[error("hardware frame transfer failed: {0}")]
    Transfer(String),

    /// Generic failure reported by the decoding device or demuxer
    #[error("decode failed: {0}")]
    Decode(String),

    /// The decoded layout changed after the conversion context was built
    #[error("pixel layout changed from {expected} to {found} after conversion was configured")]
    ConversionMismatch {
        expected: FrameLayout,
        found: FrameLayout,
    },

    #[error("decoder session is not open")]
    NotOpen,

    #[error("decoder session is already open")]
    AlreadyOpen,
}

impl DecodeError {
    pub fn open(locator: &str, reason: impl fmt::Display) -> Self {
        DecodeError::Open {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn codec(reason: impl fmt::Display) -> Self {
        DecodeError::Codec(reason.to_string())
    }

    pub fn device(reason: impl fmt::Display) -> Self {
        DecodeError::Device(reason.to_string())
    }

    pub fn transfer(reason: impl fmt::Display) -> Self {
        DecodeError::Transfer(reason.to_string())
    }

    pub fn decode(reason: impl fmt::Display) -> Self {
        DecodeError::Decode(reason.to_string())
    }
}
