//! Access oracle: the harness's ground truth for who touched the state.
//!
//! Every harness collaborator reports each access to the simulation state
//! through a guard. The oracle:
//! - Counts overlaps (both sides inside at once)
//! - Logs the access sequence for an alternation check afterwards

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Which activity is touching the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    /// The simulation worker (catch-up and drain)
    Worker,
    /// The dispatch/render thread (tick and present)
    Render,
}

/// One recorded access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    /// `advance_once`
    Update,
    /// `tick`
    Tick,
    /// `present`
    Present,
}

impl Access {
    /// The side this access belongs to.
    pub fn side(&self) -> Side {
        match self {
            Access::Update => Side::Worker,
            Access::Tick | Access::Present => Side::Render,
        }
    }
}

/// Summary of a well-formed access log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Alternation {
    /// Contiguous runs of worker updates
    pub worker_phases: u64,

    /// Contiguous tick/present runs
    pub render_phases: u64,

    /// Ticks that were followed by a present
    pub presented: u64,
}

/// Shared recorder of state accesses.
#[derive(Debug, Default)]
pub struct AccessOracle {
    worker_inside: AtomicBool,
    render_inside: AtomicBool,
    violations: AtomicU64,
    log: Mutex<Vec<Access>>,
}

/// Marks an access in progress; leaving scope ends it.
pub struct AccessGuard<'a> {
    oracle: &'a AccessOracle,
    side: Side,
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.oracle.flag(self.side).store(false, Ordering::SeqCst);
    }
}

impl AccessOracle {
    /// Creates an empty oracle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped oracle for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn flag(&self, side: Side) -> &AtomicBool {
        match side {
            Side::Worker => &self.worker_inside,
            Side::Render => &self.render_inside,
        }
    }

    /// Records the start of an access.
    pub fn enter(&self, access: Access) -> AccessGuard<'_> {
        let side = access.side();
        let other = match side {
            Side::Worker => Side::Render,
            Side::Render => Side::Worker,
        };

        let reentered = self.flag(side).swap(true, Ordering::SeqCst);
        if reentered || self.flag(other).load(Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }

        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(access);

        AccessGuard { oracle: self, side }
    }

    /// Overlapping accesses seen so far.
    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::SeqCst)
    }

    /// Copy of the access log.
    pub fn log(&self) -> Vec<Access> {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Checks that worker batches and frames strictly alternate.
    ///
    /// A well-formed log starts with a worker phase; every render phase is
    /// exactly one `Tick`, optionally followed by one `Present`.
    pub fn verify_alternation(&self) -> Result<Alternation, String> {
        check_alternation(&self.log())
    }
}

/// Validates an access sequence. See [`AccessOracle::verify_alternation`].
pub fn check_alternation(log: &[Access]) -> Result<Alternation, String> {
    let mut summary = Alternation::default();
    let mut previous: Option<Access> = None;

    for (i, access) in log.iter().enumerate() {
        match (previous, access) {
            (None, Access::Update) => summary.worker_phases += 1,
            (None, other) => return Err(format!("log starts with {:?}", other)),

            (Some(Access::Update), Access::Update) => {}
            (Some(Access::Update), Access::Tick) => summary.render_phases += 1,
            (Some(Access::Tick), Access::Present) => summary.presented += 1,
            (Some(Access::Tick | Access::Present), Access::Update) => summary.worker_phases += 1,

            (Some(prev), next) => {
                return Err(format!("{:?} followed by {:?} at entry {}", prev, next, i));
            }
        }
        previous = Some(*access);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_accesses_are_clean() {
        let oracle = AccessOracle::new();
        drop(oracle.enter(Access::Update));
        drop(oracle.enter(Access::Update));
        drop(oracle.enter(Access::Tick));
        drop(oracle.enter(Access::Present));
        drop(oracle.enter(Access::Update));

        assert_eq!(oracle.violations(), 0);
        let summary = oracle.verify_alternation().unwrap();
        assert_eq!(summary.worker_phases, 2);
        assert_eq!(summary.render_phases, 1);
        assert_eq!(summary.presented, 1);
    }

    #[test]
    fn test_overlap_is_counted() {
        let oracle = AccessOracle::new();
        let _worker = oracle.enter(Access::Update);
        let _render = oracle.enter(Access::Tick);
        assert_eq!(oracle.violations(), 1);
    }

    #[test]
    fn test_double_tick_is_rejected() {
        let log = [Access::Update, Access::Tick, Access::Present, Access::Tick];
        assert!(check_alternation(&log).is_err());
    }

    #[test]
    fn test_must_start_with_worker() {
        assert!(check_alternation(&[Access::Tick]).is_err());
        assert_eq!(check_alternation(&[]).unwrap(), Alternation::default());
    }
}
