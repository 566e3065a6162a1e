//! The playback loop
//!
//! Pulls frames from a [`DecoderSession`], paces them to the stream's
//! nominal rate and hands them to a [`FrameSink`] while an [`EventPump`]
//! keeps the window alive.

use std::time::{Duration, Instant};

use thiserror::Error;

use super::pacing::PacingController;
use super::stats::PlaybackStats;
use crate::error::DecodeError;
use crate::video::{DecoderSession, PresentationFrame};

/// Consumer of presentation frames
///
/// `present` must be done with the frame before it returns; the buffer is
/// overwritten by the next pull.
pub trait FrameSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn present(
        &mut self,
        frame: &PresentationFrame<'_>,
        drawable_size: (u32, u32),
    ) -> Result<(), Self::Error>;
}

/// Window event driver
pub trait EventPump {
    /// Process pending events; `false` once the window should close
    fn run_iteration(&mut self) -> bool;

    /// Current drawable size in physical pixels
    fn drawable_size(&self) -> (u32, u32);
}

/// Blocking wait between frames
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Errors that end a playback run
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to present frame: {0}")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Why a playback run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    WindowClosed,
}

/// Outcome of a playback run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub reason: StopReason,
    pub stats: PlaybackStats,
}

/// Drives decode, pacing and presentation on the calling thread
pub struct PlaybackOrchestrator<S: Sleeper = ThreadSleeper> {
    pacing: PacingController,
    sleeper: S,
}

impl PlaybackOrchestrator<ThreadSleeper> {
    pub fn new() -> Self {
        Self::with_sleeper(ThreadSleeper)
    }
}

impl Default for PlaybackOrchestrator<ThreadSleeper> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sleeper> PlaybackOrchestrator<S> {
    pub fn with_sleeper(sleeper: S) -> Self {
        Self {
            pacing: PacingController::new(),
            sleeper,
        }
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Play `session` until end of stream, window close or the first error
    pub fn run<D, P, K>(
        &mut self,
        session: &mut D,
        pump: &mut P,
        sink: &mut K,
    ) -> Result<PlaybackSummary, PlaybackError>
    where
        D: DecoderSession + ?Sized,
        P: EventPump + ?Sized,
        K: FrameSink + ?Sized,
    {
        let mut stats = PlaybackStats::new(session.nominal_frame_interval());
        tracing::info!(
            "Starting {} playback at {:.3}ms per frame",
            session.kind(),
            stats.nominal_interval.as_secs_f64() * 1000.0
        );

        let reason = loop {
            if !pump.run_iteration() {
                break StopReason::WindowClosed;
            }

            let interval = session.nominal_frame_interval();
            let started = Instant::now();
            let Some(frame) = session.decode_next_frame()? else {
                break StopReason::EndOfStream;
            };
            let decode_time = started.elapsed();

            let sleep = self.pacing.compute_sleep(interval, decode_time);
            self.sleeper.sleep(sleep);

            sink.present(&frame, pump.drawable_size())
                .map_err(|e| PlaybackError::Render(Box::new(e)))?;
            stats.record(decode_time, sleep);
        };

        tracing::info!("Playback stopped ({:?}): {}", reason, stats);
        Ok(PlaybackSummary { reason, stats })
    }
}
