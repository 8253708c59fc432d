//! Scripted simulation fed by a simulated update stream.

use crate::error::HarnessError;
use crate::oracle::{Access, AccessOracle};
use crossbeam::channel::{self, Receiver, Sender};
use framelock_env::Simulation;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the catch-up step waits for an update before stepping idle.
pub const DEFAULT_CATCH_UP_WAIT: Duration = Duration::from_millis(2);

/// A state update as it would arrive from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Update {
    /// Arrival order, starting at 0
    pub seq: u64,
}

/// The "network" side: pushes updates toward a [`ScriptedSimulation`].
#[derive(Debug, Clone)]
pub struct UpdateFeed {
    tx: Sender<Update>,
    next_seq: Arc<AtomicU64>,
}

impl UpdateFeed {
    /// Queues `count` updates at once.
    pub fn push(&self, count: u64) -> Result<(), HarnessError> {
        for _ in 0..count {
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            self.tx.send(Update { seq }).map_err(|_| HarnessError::FeedClosed)?;
        }
        Ok(())
    }

    /// Updates pushed so far.
    pub fn sent(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }
}

/// What the simulation saw at one `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickRecord {
    /// Delta handed to `tick`
    pub dt: Duration,

    /// Updates applied since the previous tick
    pub applied_since_last: u64,

    /// Total updates applied before this tick
    pub applied_total: u64,

    /// Updates that had arrived but were not yet applied
    pub pending_at_tick: u64,
}

/// Counters kept by the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Real updates applied
    pub updates_applied: u64,

    /// Catch-up steps that found no update
    pub idle_steps: u64,

    /// Calls to `tick`
    pub ticks: u64,

    /// Highest sequence number applied
    pub last_seq: Option<u64>,
}

/// Owned copy of a simulation's observations.
#[derive(Debug, Clone, Default)]
pub struct SimSnapshot {
    /// Counters
    pub stats: SimStats,
    /// One record per tick
    pub records: Vec<TickRecord>,
    /// Updates applied out of sequence
    pub out_of_order: u64,
}

/// Simulation whose updates come from an [`UpdateFeed`].
///
/// Every access is reported to the shared [`AccessOracle`].
pub struct ScriptedSimulation {
    updates: Receiver<Update>,
    oracle: Arc<AccessOracle>,
    catch_up_wait: Duration,
    apply_cost: Duration,
    stop_at_tick: Option<u64>,
    stats: SimStats,
    applied_at_last_tick: u64,
    records: Vec<TickRecord>,
    out_of_order: u64,
}

impl ScriptedSimulation {
    /// Creates a simulation and the feed that drives it.
    pub fn new(oracle: Arc<AccessOracle>) -> (Self, UpdateFeed) {
        let (tx, rx) = channel::unbounded();
        let feed = UpdateFeed {
            tx,
            next_seq: Arc::new(AtomicU64::new(0)),
        };
        let sim = Self {
            updates: rx,
            oracle,
            catch_up_wait: DEFAULT_CATCH_UP_WAIT,
            apply_cost: Duration::ZERO,
            stop_at_tick: None,
            stats: SimStats::default(),
            applied_at_last_tick: 0,
            records: Vec::new(),
            out_of_order: 0,
        };
        (sim, feed)
    }

    /// Sets the catch-up wait.
    pub fn with_catch_up_wait(mut self, wait: Duration) -> Self {
        self.catch_up_wait = wait;
        self
    }

    /// Makes every applied update take `cost` of wall time.
    pub fn with_apply_cost(mut self, cost: Duration) -> Self {
        self.apply_cost = cost;
        self
    }

    /// Makes the `n`th call to `tick` (1-based) return false.
    pub fn stop_at_tick(mut self, n: u64) -> Self {
        self.stop_at_tick = Some(n);
        self
    }

    /// Counters.
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// One record per `tick` call.
    pub fn records(&self) -> &[TickRecord] {
        &self.records
    }

    /// Updates applied with a sequence number that was not the next one.
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    /// Copies out everything the harness checks after a run.
    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            stats: self.stats,
            records: self.records.clone(),
            out_of_order: self.out_of_order,
        }
    }

    fn apply(&mut self, update: Update) {
        let expected = self.stats.last_seq.map_or(0, |s| s + 1);
        if update.seq != expected {
            self.out_of_order += 1;
        }
        if !self.apply_cost.is_zero() {
            std::thread::sleep(self.apply_cost);
        }
        self.stats.last_seq = Some(update.seq);
        self.stats.updates_applied += 1;
    }
}

impl Simulation for ScriptedSimulation {
    fn advance_once(&mut self) {
        let oracle = Arc::clone(&self.oracle);
        let _access = oracle.enter(Access::Update);

        match self.updates.recv_timeout(self.catch_up_wait) {
            Ok(update) => self.apply(update),
            Err(_) => self.stats.idle_steps += 1,
        }
    }

    fn has_pending(&self) -> bool {
        !self.updates.is_empty()
    }

    fn tick(&mut self, dt: Duration) -> bool {
        let oracle = Arc::clone(&self.oracle);
        let _access = oracle.enter(Access::Tick);

        self.stats.ticks += 1;
        self.records.push(TickRecord {
            dt,
            applied_since_last: self.stats.updates_applied - self.applied_at_last_tick,
            applied_total: self.stats.updates_applied,
            pending_at_tick: self.updates.len() as u64,
        });
        self.applied_at_last_tick = self.stats.updates_applied;

        self.stop_at_tick != Some(self.stats.ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_applies_every_queued_update() {
        let (mut sim, feed) = ScriptedSimulation::new(AccessOracle::shared());
        feed.push(5).unwrap();

        sim.advance_once();
        while sim.has_pending() {
            sim.advance_once();
        }
        assert!(sim.tick(Duration::from_millis(16)));

        assert_eq!(sim.stats().updates_applied, 5);
        assert_eq!(sim.stats().last_seq, Some(4));
        assert_eq!(sim.records()[0].applied_since_last, 5);
        assert_eq!(sim.records()[0].pending_at_tick, 0);
        assert_eq!(sim.out_of_order(), 0);
    }

    #[test]
    fn test_catch_up_without_updates_is_idle() {
        let (mut sim, _feed) = ScriptedSimulation::new(AccessOracle::shared());
        sim.advance_once();
        assert_eq!(sim.stats().idle_steps, 1);
        assert_eq!(sim.stats().updates_applied, 0);
    }

    #[test]
    fn test_zero_catch_up_wait_still_applies_queued_update() {
        let (sim, feed) = ScriptedSimulation::new(AccessOracle::shared());
        let mut sim = sim.with_catch_up_wait(Duration::ZERO);

        sim.advance_once();
        feed.push(1).unwrap();
        sim.advance_once();

        assert_eq!(sim.stats().idle_steps, 1);
        assert_eq!(sim.stats().updates_applied, 1);
    }

    #[test]
    fn test_stop_at_tick() {
        let (sim, _feed) = ScriptedSimulation::new(AccessOracle::shared());
        let mut sim = sim.stop_at_tick(3);

        assert!(sim.tick(Duration::ZERO));
        assert!(sim.tick(Duration::ZERO));
        assert!(!sim.tick(Duration::ZERO));
        assert_eq!(sim.stats().ticks, 3);
    }

    #[test]
    fn test_accesses_reach_oracle() {
        let oracle = AccessOracle::shared();
        let (mut sim, feed) = ScriptedSimulation::new(Arc::clone(&oracle));
        feed.push(1).unwrap();

        sim.advance_once();
        sim.tick(Duration::ZERO);

        assert_eq!(oracle.log(), vec![Access::Update, Access::Tick]);
        assert_eq!(oracle.violations(), 0);
    }
}
