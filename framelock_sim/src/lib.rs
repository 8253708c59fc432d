//! framelock Deterministic Scenario Harness
//!
//! A controlled environment where the framelock frame client runs against
//! scripted collaborators, so the handoff protocol can be checked from the
//! outside.
//!
//! # Core Principle: Observe Every Access
//!
//! All sources of non-determinism the core consumes are replaced:
//! - **Time**: [`ManualClock`] replays a seeded step schedule
//! - **Network**: [`UpdateFeed`] pushes updates into a [`ScriptedSimulation`]
//! - **Input**: [`SimInput`] delivers injected events and failures
//! - **Randomness**: all schedules derive from a single 64-bit seed
//!
//! Thread interleaving stays real. Instead of controlling it, every access
//! to simulation state reports to an [`AccessOracle`], which counts overlaps
//! and checks that worker batches and frames strictly alternate.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                       │
//! │                                                           │
//! │  fl-feed ──► UpdateFeed ──► ScriptedSimulation            │
//! │  fl-noise ─► SimInputHandle ──► SimInput                  │
//! │                                     │                     │
//! │                 ┌───────────────────▼──────────────────┐  │
//! │                 │   FrameClient (pump/worker/dispatch) │  │
//! │                 └───────────────────┬──────────────────┘  │
//! │                                     ▼                     │
//! │        HeadlessSurface ──► AccessOracle ◄── ManualClock   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use framelock_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_frames(120).run(ScenarioId::Burst);
//! assert!(result.passed);
//! ```

mod clock;
mod error;
mod exporter;
mod input;
mod oracle;
mod runner;
pub mod scenarios;
mod simulation;
mod surface;

pub use clock::ManualClock;
pub use error::HarnessError;
pub use exporter::{FrameRecord, TraceExport};
pub use input::{sim_input, InputCommand, SimInput, SimInputHandle};
pub use oracle::{check_alternation, Access, AccessGuard, AccessOracle, Alternation, Side};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use simulation::{
    ScriptedSimulation, SimSnapshot, SimStats, TickRecord, Update, UpdateFeed, DEFAULT_CATCH_UP_WAIT,
};
pub use surface::{FrameTrigger, HeadlessSurface};
