//! hwplay
//!
//! A video player that decodes on a hardware accelerator when one is
//! available, falls back to software decoding otherwise, converts every
//! frame to packed RGB24 and paces presentation to the stream's frame rate.

pub mod display;
pub mod error;
pub mod playback;
pub mod settings;
pub mod telemetry;
pub mod video;

pub use error::{DecodeError, FrameLayout};
pub use playback::{PlaybackError, PlaybackOrchestrator, PlaybackSummary, StopReason};
pub use settings::{PlayerSettings, SettingsError};
pub use video::{
    open_session, AccelBackend, AccelerationNegotiator, DecoderSession, PresentationFrame,
    ScalingAlgorithm, SessionKind, SessionOptions,
};
