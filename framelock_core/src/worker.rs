//! Simulation worker: catch-up, drain, hand off, wait.

use crate::token::{FrameEmitter, HandoffError};
use framelock_env::Simulation;
use serde::Serialize;
use tracing::{debug, warn};

/// Counters kept by the worker across its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Completed catch-up + drain batches
    pub cycles: u64,

    /// Unconditional catch-up steps
    pub catch_up_steps: u64,

    /// Updates applied by the drain loop
    pub drained_updates: u64,

    /// Tokens taken by the dispatch loop
    pub tokens_emitted: u64,

    /// Tokens handed back
    pub tokens_acknowledged: u64,
}

/// Why the worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerExit {
    /// The dispatch loop went away between frames. Normal end.
    DispatchClosed,

    /// A taken token was dropped without acknowledgment.
    TokenAbandoned {
        /// Cycle of the lost token
        cycle: u64,
    },
}

/// What the worker thread returns when joined.
pub struct WorkerReport<S> {
    /// Why it stopped
    pub exit: WorkerExit,

    /// Lifetime counters
    pub stats: WorkerStats,

    /// The state, if it was still owned by the worker at exit
    pub state: Option<Box<S>>,
}

impl<S> std::fmt::Debug for WorkerReport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerReport")
            .field("exit", &self.exit)
            .field("stats", &self.stats)
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

/// Leaf activity that owns the simulation state between frames.
///
/// The only suspension point is the handoff: while the token is out the
/// worker holds nothing and mutates nothing.
///
/// # Liveness
///
/// The drain is unbounded. A simulation whose `has_pending` never turns
/// false starves the dispatch loop of frames; this is not guarded against.
pub struct SimulationWorker<S: Simulation> {
    emitter: FrameEmitter<S>,
    stats: WorkerStats,
}

impl<S: Simulation> SimulationWorker<S> {
    /// Creates a worker that hands frames off through `emitter`.
    pub fn new(emitter: FrameEmitter<S>) -> Self {
        Self {
            emitter,
            stats: WorkerStats::default(),
        }
    }

    /// Runs cycles until the dispatch loop disappears.
    pub fn run(mut self, mut state: Box<S>) -> WorkerReport<S> {
        loop {
            self.catch_up_and_drain(&mut state);

            match self.emitter.handoff(state) {
                Ok(returned) => state = returned,
                Err(HandoffError::DispatchClosed(returned)) => {
                    debug!(cycles = self.stats.cycles, "Dispatch loop closed, worker exiting");
                    return self.finish(WorkerExit::DispatchClosed, Some(returned));
                }
                Err(HandoffError::Abandoned { cycle }) => {
                    warn!(cycle, "Frame token dropped without acknowledgment");
                    return self.finish(WorkerExit::TokenAbandoned { cycle }, None);
                }
            }
        }
    }

    /// Steps 1 and 2 of a cycle: one unconditional update, then every
    /// buffered update, never a partial batch.
    fn catch_up_and_drain(&mut self, state: &mut S) {
        state.advance_once();
        self.stats.catch_up_steps += 1;

        while state.has_pending() {
            state.advance_once();
            self.stats.drained_updates += 1;
        }

        self.stats.cycles += 1;
    }

    fn finish(mut self, exit: WorkerExit, state: Option<Box<S>>) -> WorkerReport<S> {
        self.stats.tokens_emitted = self.emitter.emitted();
        self.stats.tokens_acknowledged = self.emitter.acknowledged();
        WorkerReport {
            exit,
            stats: self.stats,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::frame_channel;
    use std::time::Duration;

    /// Counts updates; `has_pending` reads a fixed backlog.
    struct Backlog {
        pending: u32,
        applied: u32,
        pending_at_handoff: Vec<u32>,
    }

    impl Simulation for Backlog {
        fn advance_once(&mut self) {
            self.pending = self.pending.saturating_sub(1);
            self.applied += 1;
        }

        fn has_pending(&self) -> bool {
            self.pending > 0
        }

        fn tick(&mut self, _dt: Duration) -> bool {
            self.pending_at_handoff.push(self.pending);
            true
        }
    }

    #[test]
    fn test_drains_backlog_before_first_token() {
        let (emitter, frames) = frame_channel::<Backlog>();
        let worker = SimulationWorker::new(emitter);
        let state = Box::new(Backlog {
            pending: 5,
            applied: 0,
            pending_at_handoff: Vec::new(),
        });

        let handle = std::thread::spawn(move || worker.run(state));

        let mut token = frames.recv().unwrap();
        assert_eq!(token.state().applied, 5);
        assert!(!token.state().has_pending());
        assert!(token.state_mut().tick(Duration::ZERO));
        token.acknowledge().unwrap();

        // Second cycle: only the catch-up step runs.
        let token = frames.recv().unwrap();
        assert_eq!(token.state().applied, 6);
        token.acknowledge().unwrap();
        drop(frames);

        let report = handle.join().unwrap();
        assert_eq!(report.exit, WorkerExit::DispatchClosed);
        assert_eq!(report.stats.tokens_emitted, 2);
        assert_eq!(report.stats.tokens_acknowledged, 2);
        assert_eq!(report.stats.catch_up_steps, 3);
        assert_eq!(report.stats.drained_updates, 4);

        let state = report.state.unwrap();
        assert_eq!(state.pending_at_handoff, vec![0]);
    }

    #[test]
    fn test_abandoned_token_ends_worker() {
        let (emitter, frames) = frame_channel::<Backlog>();
        let worker = SimulationWorker::new(emitter);
        let state = Box::new(Backlog {
            pending: 0,
            applied: 0,
            pending_at_handoff: Vec::new(),
        });

        let handle = std::thread::spawn(move || worker.run(state));
        drop(frames.recv().unwrap());

        let report = handle.join().unwrap();
        assert_eq!(report.exit, WorkerExit::TokenAbandoned { cycle: 0 });
        assert_eq!(report.stats.tokens_emitted, 1);
        assert_eq!(report.stats.tokens_acknowledged, 0);
        assert!(report.state.is_none());
    }
}
