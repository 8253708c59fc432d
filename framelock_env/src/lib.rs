//! framelock Environment Abstraction Layer
//!
//! This crate defines the boundaries between the framelock frame-sync core
//! and everything it coordinates but does not implement:
//!
//! - **Input** (`InputSource`): a blocking, timed producer of events
//! - **Simulation** (`Simulation`): opaque state with `advance_once`,
//!   `has_pending` and `tick`
//! - **Rendering** (`Surface`): the thread-affine drawing handle
//! - **Time** (`FrameClock`): a wrapping millisecond counter
//!
//! Production code plugs in real windowing/network implementations; the
//! `framelock_sim` harness plugs in deterministic ones.
//!
//! # Example
//!
//! ```ignore
//! use framelock_env::{InputSource, Simulation};
//!
//! fn catch_up<S: Simulation>(sim: &mut S) {
//!     sim.advance_once();
//!     while sim.has_pending() {
//!         sim.advance_once();
//!     }
//! }
//! ```

mod clock;
mod error;
mod input;
mod simulation;
mod types;

pub use clock::{FrameClock, SystemClock};
pub use error::EnvError;
pub use input::InputSource;
pub use simulation::{NullSurface, Simulation, Surface};
pub use types::{EventClass, EventKind, FrameInfo, InputEvent};
