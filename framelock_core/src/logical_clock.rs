//! Logical frame clock owned by the dispatch loop.

use std::time::Duration;

/// Deltas above this are read as the source stepping backwards, not as a
/// forward jump of more than ~24 days.
const MAX_FORWARD_DELTA_MS: u32 = u32::MAX / 2;

/// Non-decreasing logical time advanced once per processed frame.
///
/// Fed with raw 32-bit millisecond ticks. Deltas are computed with wrapping
/// arithmetic so the counter rolling over produces the true small delta,
/// never a negative or enormous one.
#[derive(Debug, Clone)]
pub struct LogicalClock {
    /// Tick reading at the previous frame (or at loop start)
    last_ms: u32,

    /// Sum of all deltas handed out
    elapsed_ms: u64,

    /// Number of frames advanced
    frames: u64,

    /// Readings that went backwards and were clamped to a zero delta
    regressions: u64,
}

impl LogicalClock {
    /// Seeds the clock with the reading taken at loop start.
    pub fn new(start_ms: u32) -> Self {
        Self {
            last_ms: start_ms,
            elapsed_ms: 0,
            frames: 0,
            regressions: 0,
        }
    }

    /// Advances to `now_ms` and returns the delta since the previous call.
    pub fn advance(&mut self, now_ms: u32) -> Duration {
        let mut delta = now_ms.wrapping_sub(self.last_ms);
        if delta > MAX_FORWARD_DELTA_MS {
            self.regressions += 1;
            delta = 0;
        }

        self.last_ms = now_ms;
        self.elapsed_ms += u64::from(delta);
        self.frames += 1;

        Duration::from_millis(u64::from(delta))
    }

    /// Accumulated logical time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Frames advanced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Raw tick reading at the last advance.
    pub fn last_ms(&self) -> u32 {
        self.last_ms
    }

    /// Number of backwards readings clamped to zero.
    pub fn regressions(&self) -> u64 {
        self.regressions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_simple_deltas() {
        let mut clock = LogicalClock::new(100);

        assert_eq!(clock.advance(116), Duration::from_millis(16));
        assert_eq!(clock.advance(133), Duration::from_millis(17));
        assert_eq!(clock.elapsed_ms(), 33);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn test_wraparound_gives_small_positive_delta() {
        let mut clock = LogicalClock::new(u32::MAX - 5);

        assert_eq!(clock.advance(10), Duration::from_millis(16));
        assert_eq!(clock.last_ms(), 10);
        assert_eq!(clock.regressions(), 0);
    }

    #[test]
    fn test_backwards_step_is_clamped() {
        let mut clock = LogicalClock::new(1_000);

        assert_eq!(clock.advance(990), Duration::ZERO);
        assert_eq!(clock.regressions(), 1);
        assert_eq!(clock.advance(1_006), Duration::from_millis(16));
        assert_eq!(clock.elapsed_ms(), 16);
    }

    #[test]
    fn test_same_reading_is_zero() {
        let mut clock = LogicalClock::new(7);
        assert_eq!(clock.advance(7), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn deltas_match_increments_across_wrap(
            start in any::<u32>(),
            steps in proptest::collection::vec(0u32..100_000, 1..200),
        ) {
            let mut clock = LogicalClock::new(start);
            let mut now = start;
            let mut total = 0u64;

            for step in &steps {
                now = now.wrapping_add(*step);
                let dt = clock.advance(now);
                prop_assert_eq!(dt, Duration::from_millis(u64::from(*step)));
                total += u64::from(*step);
            }

            prop_assert_eq!(clock.elapsed_ms(), total);
            prop_assert_eq!(clock.regressions(), 0);
        }

        #[test]
        fn elapsed_never_decreases(readings in proptest::collection::vec(any::<u32>(), 1..100)) {
            let mut clock = LogicalClock::new(0);
            let mut previous = 0u64;

            for reading in readings {
                clock.advance(reading);
                prop_assert!(clock.elapsed_ms() >= previous);
                previous = clock.elapsed_ms();
            }
        }
    }
}
