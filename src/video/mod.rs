//! Video decoding and conversion
//!
//! Opens a media source with FFmpeg via the `ffmpeg-next` crate, decodes
//! its best video stream on a hardware device when one can be negotiated
//! (on the CPU otherwise) and converts each picture to RGB24.

pub mod accel;
pub mod backend;
mod codec;
mod convert;
pub mod session;
mod source;

pub use accel::{AccelBackend, AccelerationCapability, AccelerationNegotiator, HwConfig};
pub use backend::{
    CodecDescriptor, CodecSetup, CodedPacket, Demuxer, MediaBackend, Receive, Residency,
    StreamInfo, ThreadingHint, VideoCodec,
};
pub use codec::{FfmpegBackend, FfmpegCodec};
pub use convert::{
    PixelConverter, PresentationFrame, ScalingAlgorithm, PRESENTATION_BYTES_PER_PIXEL,
    PRESENTATION_FORMAT,
};
pub use session::{
    open_session, open_session_with, DecoderSession, HardwareSession, SessionKind,
    SessionOptions, SoftwareSession,
};
pub use source::FfmpegSource;

/// Initialise FFmpeg and quieten its own logging
pub fn init() -> Result<(), ffmpeg_next::Error> {
    ffmpeg_next::init()?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Warning);
    Ok(())
}
