//! Error types for the framelock collaborator boundaries.

use thiserror::Error;

/// Errors raised by external collaborators.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The input subsystem cannot be reached. Fatal to the whole client.
    #[error("Input source unavailable: {0}")]
    InputUnavailable(String),

    /// The rendering surface failed to initialise or present.
    #[error("Surface error: {0}")]
    SurfaceError(String),
}

impl EnvError {
    /// Creates an input-unavailable error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputUnavailable(msg.into())
    }

    /// Creates a surface error.
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::SurfaceError(msg.into())
    }
}
