//! Playback statistics

use std::fmt;
use std::time::Duration;

/// Decode and pacing figures for one playback run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Frame period the run was paced against
    pub nominal_interval: Duration,
    pub frames_presented: u64,
    /// Frames whose decode took at least the nominal interval
    pub late_frames: u64,
    pub total_decode: Duration,
    pub max_decode: Duration,
    pub total_sleep: Duration,
}

impl PlaybackStats {
    pub fn new(nominal_interval: Duration) -> Self {
        Self {
            nominal_interval,
            ..Self::default()
        }
    }

    pub fn record(&mut self, decode_time: Duration, sleep: Duration) {
        self.frames_presented += 1;
        if decode_time >= self.nominal_interval {
            self.late_frames += 1;
        }
        self.total_decode += decode_time;
        self.max_decode = self.max_decode.max(decode_time);
        self.total_sleep += sleep;
    }

    pub fn average_decode(&self) -> Duration {
        match u32::try_from(self.frames_presented) {
            Ok(0) => Duration::ZERO,
            Ok(frames) => self.total_decode / frames,
            Err(_) => Duration::from_secs_f64(
                self.total_decode.as_secs_f64() / self.frames_presented as f64,
            ),
        }
    }
}

impl fmt::Display for PlaybackStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames ({} late), decode avg {:.2}ms max {:.2}ms, slept {:.2}s",
            self.frames_presented,
            self.late_frames,
            self.average_decode().as_secs_f64() * 1000.0,
            self.max_decode.as_secs_f64() * 1000.0,
            self.total_sleep.as_secs_f64()
        )
    }
}
