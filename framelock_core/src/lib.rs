//! framelock Core - Lock-free frame synchronisation
//!
//! Keeps a simulation stepping exactly once per rendered frame while a
//! separate thread owns a blocking input source and the rendering surface.
//! No lock is ever taken on simulation state:
//!
//! 1. **Ownership handoff**: the simulation state travels inside a
//!    single-use [`FrameToken`] over zero-capacity channels, so the worker's
//!    mutations and the render thread's tick/draw strictly alternate.
//! 2. **Settled frames**: the worker applies a catch-up step and drains every
//!    buffered update before emitting a token.
//! 3. **Cooperative shutdown**: a one-shot [`ShutdownSignal`] stops the event
//!    pump within one input timeout of a quit event.
//!
//! ```text
//!   {prefix}-input            caller thread               {prefix}-sim
//!  ┌────────────┐   events  ┌───────────────┐  tokens  ┌──────────────────┐
//!  │ EventPump  │ ────────► │ DispatchLoop  │ ◄─────── │ SimulationWorker │
//!  └────────────┘  bounded  │  tick/render  │ ───────► └──────────────────┘
//!                           └───────────────┘   ack
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logical_clock;
pub mod pump;
pub mod shutdown;
pub mod token;
pub mod worker;

// Re-export key types for convenience
pub use client::{ClientExit, ClientReport, FrameClient};
pub use config::{FrameLoopConfig, StopPolicy};
pub use dispatch::{DispatchExit, DispatchLoop, DispatchState, DispatchStats, FrameHandler};
pub use error::{ClientError, ConfigError};
pub use logical_clock::LogicalClock;
pub use pump::{EventPump, PumpStats};
pub use shutdown::ShutdownSignal;
pub use token::{frame_channel, FrameEmitter, FrameToken, HandoffError, TokenError};
pub use worker::{SimulationWorker, WorkerExit, WorkerReport, WorkerStats};
