//! Injectable input source.

use crate::error::HarnessError;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use framelock_env::{EnvError, EventKind, InputEvent, InputSource};
use std::time::Duration;

/// What the harness pushes into a [`SimInput`].
#[derive(Debug, Clone)]
pub enum InputCommand {
    /// Deliver an event
    Event(InputEvent),

    /// Make the next wait fail as if the device vanished
    Fail(String),
}

/// Input source fed by a [`SimInputHandle`].
///
/// A dropped handle leaves the source idle: waits time out, nothing fails.
pub struct SimInput {
    rx: Receiver<InputCommand>,
}

/// Sending half of a [`SimInput`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SimInputHandle {
    tx: Sender<InputCommand>,
}

/// Creates a connected input source and handle.
pub fn sim_input() -> (SimInput, SimInputHandle) {
    let (tx, rx) = channel::unbounded();
    (SimInput { rx }, SimInputHandle { tx })
}

impl SimInputHandle {
    /// Queues an event.
    pub fn send(&self, event: InputEvent) -> Result<(), HarnessError> {
        self.tx
            .send(InputCommand::Event(event))
            .map_err(|_| HarnessError::InputClosed)
    }

    /// Queues a quit event.
    pub fn quit(&self, timestamp_ms: u32) -> Result<(), HarnessError> {
        self.send(InputEvent::quit(timestamp_ms))
    }

    /// Queues a pointer motion (draw-relevant).
    pub fn pointer(&self, timestamp_ms: u32, x: i32, y: i32) -> Result<(), HarnessError> {
        self.send(InputEvent::new(timestamp_ms, EventKind::PointerMotion { x, y }))
    }

    /// Queues a device failure.
    pub fn fail(&self, reason: impl Into<String>) -> Result<(), HarnessError> {
        self.tx
            .send(InputCommand::Fail(reason.into()))
            .map_err(|_| HarnessError::InputClosed)
    }
}

impl InputSource for SimInput {
    fn wait_for_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, EnvError> {
        match self.rx.recv_timeout(timeout) {
            Ok(InputCommand::Event(event)) => Ok(Some(event)),
            Ok(InputCommand::Fail(reason)) => Err(EnvError::input(reason)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_then_times_out() {
        let (mut input, handle) = sim_input();
        handle.pointer(3, 1, 2).unwrap();

        let event = input.wait_for_event(Duration::from_millis(5)).unwrap().unwrap();
        assert_eq!(event.timestamp_ms, 3);
        assert!(input.wait_for_event(Duration::from_millis(5)).unwrap().is_none());
    }

    #[test]
    fn test_injected_failure() {
        let (mut input, handle) = sim_input();
        handle.fail("display connection lost").unwrap();

        let err = input.wait_for_event(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, EnvError::InputUnavailable(_)));
    }

    #[test]
    fn test_dropped_handle_is_idle() {
        let (mut input, handle) = sim_input();
        drop(handle);
        assert!(input.wait_for_event(Duration::from_millis(1)).unwrap().is_none());
    }
}
