//! Event source pump: blocking input reads forwarded into a bounded queue.

use crate::shutdown::ShutdownSignal;
use crossbeam::channel::Sender;
use framelock_env::{EnvError, InputEvent, InputSource};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Counters reported by the pump when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    /// Events handed to the dispatch loop
    pub events_forwarded: u64,

    /// Waits that ended without an event
    pub timeouts: u64,
}

/// Leaf activity that owns the input source.
///
/// Knows nothing about simulation or rendering. Events are forwarded in
/// arrival order without filtering; classification happens downstream.
pub struct EventPump<I: InputSource> {
    source: I,
    events: Sender<InputEvent>,
    shutdown: ShutdownSignal,
    timeout: Duration,
}

impl<I: InputSource> EventPump<I> {
    /// Creates a pump feeding `events`.
    pub fn new(
        source: I,
        events: Sender<InputEvent>,
        shutdown: ShutdownSignal,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            events,
            shutdown,
            timeout,
        }
    }

    /// Pumps until the shutdown signal is raised or the queue closes.
    ///
    /// The signal is checked between waits, so the pump stops at most one
    /// `timeout` after it is raised. A full queue blocks (backpressure).
    ///
    /// # Errors
    /// Returns the input source's error unchanged; the caller treats it as
    /// fatal.
    pub fn run(mut self) -> Result<PumpStats, EnvError> {
        let mut stats = PumpStats::default();

        while !self.shutdown.is_raised() {
            let Some(event) = self.source.wait_for_event(self.timeout)? else {
                stats.timeouts += 1;
                continue;
            };

            trace!(kind = event.kind.name(), ts = event.timestamp_ms, "pumped input event");
            if self.events.send(event).is_err() {
                debug!("Input queue closed, pump exiting");
                break;
            }
            stats.events_forwarded += 1;
        }

        Ok(stats)
    }
}
