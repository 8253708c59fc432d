//! Simulation state and rendering surface capabilities.

use crate::error::EnvError;
use crate::types::FrameInfo;
use std::time::Duration;

/// The opaque, stateful simulation driven by the frame loop.
///
/// None of these methods lock internally. The frame loop guarantees that
/// exactly one thread holds the state at any instant by moving it inside the
/// frame token, so `&mut self` is all the synchronisation there is.
///
/// # Cycle
///
/// ```text
/// worker:   advance_once()                  (catch-up, unconditional)
///           while has_pending() { advance_once() }   (drain)
///           -- emit token -->
/// dispatch: tick(dt) -> continue?
///           -- acknowledge -->
/// ```
pub trait Simulation: Send + 'static {
    /// Applies one pending update.
    ///
    /// Called unconditionally once per cycle as the catch-up step, so an
    /// implementation may block briefly waiting for the first update.
    fn advance_once(&mut self);

    /// Returns true if more buffered updates are waiting.
    fn has_pending(&self) -> bool;

    /// Advances logical time by `dt` and prepares the frame.
    ///
    /// # Returns
    /// `false` when the simulation wants the client to terminate.
    fn tick(&mut self, dt: Duration) -> bool;
}

impl<T: Simulation + ?Sized> Simulation for Box<T> {
    fn advance_once(&mut self) {
        (**self).advance_once()
    }

    fn has_pending(&self) -> bool {
        (**self).has_pending()
    }

    fn tick(&mut self, dt: Duration) -> bool {
        (**self).tick(dt)
    }
}

/// The thread-affine rendering surface.
///
/// Deliberately not `Send`: a surface is created on the dispatch thread and
/// never leaves it, matching windowing libraries that bind their handles to
/// one OS thread.
pub trait Surface<S: ?Sized> {
    /// Draws the settled simulation state for one frame.
    fn present(&mut self, sim: &S, frame: &FrameInfo) -> Result<(), EnvError>;
}

/// A surface that draws nothing. Useful for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl<S: ?Sized> Surface<S> for NullSurface {
    fn present(&mut self, _sim: &S, _frame: &FrameInfo) -> Result<(), EnvError> {
        Ok(())
    }
}
