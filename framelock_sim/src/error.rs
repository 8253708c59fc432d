//! Harness errors.

use framelock_core::ClientError;
use thiserror::Error;

/// Errors raised while setting up or running a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The frame client failed.
    #[error("Frame client failed: {0}")]
    Client(#[from] ClientError),

    /// The injected input source is gone.
    #[error("Input source closed")]
    InputClosed,

    /// The update feed receiver is gone.
    #[error("Update feed closed")]
    FeedClosed,

    /// An arrival rate that no exponential distribution accepts.
    #[error("Invalid arrival rate: {0}")]
    InvalidRate(f64),

    /// A helper thread could not be started or panicked.
    #[error("Harness thread failed: {0}")]
    Thread(String),

    /// Writing the trace failed.
    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
}
