//! Blocking input source abstraction.

use crate::error::EnvError;
use crate::types::InputEvent;
use std::time::Duration;

/// A blocking producer of timestamped input events.
///
/// # Implementations
///
/// - **Production**: wraps the windowing/input library's timed event wait
/// - **Simulation**: channel-backed source with injectable events and faults
///
/// # Event Flow
///
/// ```text
/// InputSource            EventPump                 DispatchLoop
///   |                        |                          |
///   |<-- wait(250ms) --------|                          |
///   |--- Some(event) ------->|                          |
///   |                        |-- [bounded queue] ------>|
///   |<-- wait(250ms) --------|                          |
///   |--- None (timeout) ---->| (re-check shutdown)      |
/// ```
pub trait InputSource: Send + 'static {
    /// Waits up to `timeout` for the next event.
    ///
    /// # Returns
    /// * `Ok(Some(event))` - An event arrived
    /// * `Ok(None)` - The timeout elapsed; not an error
    /// * `Err(EnvError::InputUnavailable)` - The source is gone; fatal
    fn wait_for_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, EnvError>;
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn wait_for_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, EnvError> {
        (**self).wait_for_event(timeout)
    }
}
