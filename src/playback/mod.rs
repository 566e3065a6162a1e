//! Frame pacing and the playback loop

mod orchestrator;
mod pacing;
mod stats;

pub use orchestrator::{
    EventPump, FrameSink, PlaybackError, PlaybackOrchestrator, PlaybackSummary, Sleeper,
    StopReason, ThreadSleeper,
};
pub use pacing::PacingController;
pub use stats::PlaybackStats;
