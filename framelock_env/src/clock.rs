//! Millisecond tick clock used to time frames.

use std::sync::Arc;
use std::time::Instant;

/// A monotonic millisecond counter.
///
/// The counter is 32 bits wide and wraps roughly every 49.7 days, the same
/// shape as the tick counters exposed by windowing libraries. Consumers must
/// compute deltas with wrapping arithmetic.
///
/// # Implementations
///
/// - **Production**: `SystemClock` - wraps `std::time::Instant`
/// - **Simulation**: `ManualClock` - advanced explicitly by the harness
pub trait FrameClock {
    /// Returns milliseconds since an arbitrary origin, modulo 2^32.
    fn ticks_ms(&self) -> u32;
}

impl<T: FrameClock + ?Sized> FrameClock for Arc<T> {
    fn ticks_ms(&self) -> u32 {
        (**self).ticks_ms()
    }
}

impl<T: FrameClock + ?Sized> FrameClock for &T {
    fn ticks_ms(&self) -> u32 {
        (**self).ticks_ms()
    }
}

/// Production clock backed by `Instant`.
pub struct SystemClock {
    /// Origin for tick calculations
    start: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped clock for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn ticks_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.start.elapsed().as_millis() as u32
    }
}
