//! Per-frame pacing

use std::time::Duration;

/// Open-loop pacing: fill out each frame period, never catch up
#[derive(Debug, Clone, Copy, Default)]
pub struct PacingController;

impl PacingController {
    pub fn new() -> Self {
        Self
    }

    /// How long to wait after a frame that took `measured_decode_time` to produce
    ///
    /// Zero when decoding is at or over budget.
    pub fn compute_sleep(
        &self,
        nominal_interval: Duration,
        measured_decode_time: Duration,
    ) -> Duration {
        nominal_interval.saturating_sub(measured_decode_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_fills_remaining_period() {
        let pacing = PacingController::new();
        assert_eq!(
            pacing.compute_sleep(Duration::from_millis(33), Duration::from_millis(10)),
            Duration::from_millis(23)
        );
    }

    #[test]
    fn test_slow_decode_never_sleeps() {
        let pacing = PacingController::new();
        assert_eq!(
            pacing.compute_sleep(Duration::from_millis(33), Duration::from_millis(40)),
            Duration::ZERO
        );
        assert_eq!(
            pacing.compute_sleep(Duration::from_millis(33), Duration::from_millis(33)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_zero_interval() {
        let pacing = PacingController::new();
        assert_eq!(
            pacing.compute_sleep(Duration::ZERO, Duration::from_micros(5)),
            Duration::ZERO
        );
    }
}
