//! Manual frame clock for deterministic runs.

use framelock_env::FrameClock;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Virtual 32-bit millisecond counter.
///
/// Either moved by hand (`advance`, `set`) or driven by a step schedule:
/// every read returns the current value and then moves the counter forward
/// by the next scheduled step. The dispatch loop reads the clock once at
/// start and once per frame, so frame `n` sees a delta of exactly
/// `schedule[n % len]`.
///
/// Clones share the same counter.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Current reading; wraps like a hardware tick counter
    now_ms: Arc<AtomicU32>,

    /// Steps applied after each read (empty = manual only)
    schedule: Arc<[u32]>,

    /// Reads so far
    reads: Arc<AtomicUsize>,
}

impl ManualClock {
    /// Creates a manual clock at `start_ms`.
    pub fn new(start_ms: u32) -> Self {
        Self {
            now_ms: Arc::new(AtomicU32::new(start_ms)),
            schedule: Arc::from(Vec::new()),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Advances by `schedule` steps on each read, cycling.
    pub fn with_schedule(mut self, schedule: Vec<u32>) -> Self {
        self.schedule = Arc::from(schedule);
        self
    }

    /// Moves the counter forward, wrapping at `u32::MAX`.
    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u32, Ordering::SeqCst);
    }

    /// Sets the counter.
    pub fn set(&self, ms: u32) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    /// Current reading without consuming a step.
    pub fn peek(&self) -> u32 {
        self.now_ms.load(Ordering::SeqCst)
    }

    /// Number of reads taken through [`FrameClock::ticks_ms`].
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// The step schedule.
    pub fn schedule(&self) -> &[u32] {
        &self.schedule
    }
}

impl FrameClock for ManualClock {
    fn ticks_ms(&self) -> u32 {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.schedule.is_empty() {
            return self.peek();
        }
        let step = self.schedule[read % self.schedule.len()];
        self.now_ms.fetch_add(step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_advance_wraps() {
        let clock = ManualClock::new(u32::MAX - 4);
        clock.advance(Duration::from_millis(10));
        assert_eq!(clock.ticks_ms(), 5);
        assert_eq!(clock.reads(), 1);
    }

    #[test]
    fn test_schedule_steps_after_each_read() {
        let clock = ManualClock::new(100).with_schedule(vec![16, 17]);

        assert_eq!(clock.ticks_ms(), 100);
        assert_eq!(clock.ticks_ms(), 116);
        assert_eq!(clock.ticks_ms(), 133);
        assert_eq!(clock.ticks_ms(), 149);
    }

    #[test]
    fn test_clones_share_counter() {
        let clock = ManualClock::new(0);
        let other = clock.clone();
        clock.set(42);
        assert_eq!(other.peek(), 42);
    }
}
