//! Error types for the frame client.

use crate::worker::WorkerExit;
use framelock_env::EnvError;
use thiserror::Error;

/// Invalid frame loop configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero input timeout would spin the pump.
    #[error("input timeout must be greater than zero")]
    ZeroInputTimeout,

    /// The input queue needs at least one slot.
    #[error("input queue capacity must be at least 1")]
    ZeroQueueCapacity,

    /// The frame budget is a divisor for slow-frame detection.
    #[error("frame budget must be greater than zero")]
    ZeroFrameBudget,
}

/// Errors that end a frame client run.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration rejected before any thread started.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The input source failed. Fatal.
    #[error("Input source failed: {0}")]
    Input(#[source] EnvError),

    /// The rendering surface failed.
    #[error("Surface failed: {0}")]
    Surface(#[source] EnvError),

    /// The OS refused to start a thread.
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        /// Which activity
        name: &'static str,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A spawned activity panicked.
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    /// The worker stopped while the dispatch loop still expected frames.
    #[error("Simulation worker stopped unexpectedly: {0:?}")]
    WorkerStopped(WorkerExit),
}
