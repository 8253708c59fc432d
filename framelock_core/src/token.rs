//! Frame token rendezvous between the simulation worker and the dispatch loop.
//!
//! The token owns the simulation state while it is in flight. Emitting a
//! token moves the state to the dispatch loop; acknowledging it moves the
//! state back. Neither side can touch the state without holding it, so the
//! worker's mutations and the dispatch loop's tick/render reads strictly
//! alternate without a lock.
//!
//! ```text
//! Worker                         frames: bounded(0)              Dispatch
//!   | catch-up + drain                 |                             |
//!   |-- FrameToken { state } --------->|---------------------------->| tick(dt)
//!   |   (blocks on release_rx)         |                             | present
//!   |<------------- state -------------|---- release: bounded(0) ----| acknowledge()
//!   | catch-up + drain                 |                             |
//! ```
//!
//! Both channels are zero-capacity: a send completes only when the peer
//! takes the value, so there is never a buffered token or a buffered release.

use crossbeam::channel::{self, Receiver, Sender};
use thiserror::Error;

/// Single-use frame-ready token.
///
/// Must be consumed with [`FrameToken::acknowledge`]. Dropping it instead
/// disconnects the release channel and the worker exits with
/// [`HandoffError::Abandoned`].
#[must_use = "a frame token must be acknowledged to release the simulation worker"]
pub struct FrameToken<S> {
    /// Worker cycle that produced this token
    cycle: u64,

    /// Exclusive access to the simulation state
    state: Box<S>,

    /// One-shot release channel for this cycle only
    release: Sender<Box<S>>,
}

impl<S> FrameToken<S> {
    /// Worker cycle number (zero-based).
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Read access to the settled simulation state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access for the tick step.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Releases the worker, handing the state back.
    ///
    /// Blocks until the worker takes the state, which is immediate because
    /// the worker is parked on the release channel.
    pub fn acknowledge(self) -> Result<(), TokenError> {
        self.release
            .send(self.state)
            .map_err(|_| TokenError::WorkerGone { cycle: self.cycle })
    }
}

impl<S> std::fmt::Debug for FrameToken<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameToken").field("cycle", &self.cycle).finish()
    }
}

/// Failure to acknowledge a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The worker stopped waiting (it panicked).
    #[error("simulation worker gone before cycle {cycle} was acknowledged")]
    WorkerGone {
        /// Cycle of the orphaned token
        cycle: u64,
    },
}

/// Failure of a worker-side handoff.
pub enum HandoffError<S> {
    /// The dispatch loop is gone; the token was never taken. Returns the
    /// state untouched.
    DispatchClosed(Box<S>),

    /// The token was taken but dropped without acknowledgment.
    Abandoned {
        /// Cycle of the abandoned token
        cycle: u64,
    },
}

impl<S> std::fmt::Debug for HandoffError<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffError::DispatchClosed(_) => f.write_str("DispatchClosed"),
            HandoffError::Abandoned { cycle } => {
                f.debug_struct("Abandoned").field("cycle", cycle).finish()
            }
        }
    }
}

/// Worker-side end of the rendezvous.
pub struct FrameEmitter<S> {
    frames: Sender<FrameToken<S>>,
    next_cycle: u64,
    emitted: u64,
    acknowledged: u64,
}

impl<S> FrameEmitter<S> {
    /// Emits one token carrying `state` and blocks until it is acknowledged.
    ///
    /// A token counts as emitted only once the dispatch loop has taken it.
    pub fn handoff(&mut self, state: Box<S>) -> Result<Box<S>, HandoffError<S>> {
        let cycle = self.next_cycle;
        self.next_cycle += 1;

        let (release_tx, release_rx) = channel::bounded(0);
        let token = FrameToken {
            cycle,
            state,
            release: release_tx,
        };

        if let Err(channel::SendError(token)) = self.frames.send(token) {
            return Err(HandoffError::DispatchClosed(token.state));
        }
        self.emitted += 1;

        match release_rx.recv() {
            Ok(state) => {
                self.acknowledged += 1;
                Ok(state)
            }
            Err(_) => Err(HandoffError::Abandoned { cycle }),
        }
    }

    /// Tokens taken by the dispatch loop so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Tokens acknowledged so far.
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged
    }
}

/// Creates a connected emitter / token receiver pair.
pub fn frame_channel<S>() -> (FrameEmitter<S>, Receiver<FrameToken<S>>) {
    let (frames_tx, frames_rx) = channel::bounded(0);
    let emitter = FrameEmitter {
        frames: frames_tx,
        next_cycle: 0,
        emitted: 0,
        acknowledged: 0,
    };
    (emitter, frames_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_handoff_round_trip_returns_state() {
        let (mut emitter, frames) = frame_channel::<u32>();

        let dispatch = thread::spawn(move || {
            let mut token = frames.recv().unwrap();
            assert_eq!(token.cycle(), 0);
            *token.state_mut() += 1;
            token.acknowledge().unwrap();
        });

        let state = emitter.handoff(Box::new(41)).unwrap();
        dispatch.join().unwrap();

        assert_eq!(*state, 42);
        assert_eq!(emitter.emitted(), 1);
        assert_eq!(emitter.acknowledged(), 1);
    }

    #[test]
    fn test_dispatch_closed_returns_state() {
        let (mut emitter, frames) = frame_channel::<u32>();
        drop(frames);

        match emitter.handoff(Box::new(7)) {
            Err(HandoffError::DispatchClosed(state)) => assert_eq!(*state, 7),
            other => panic!("unexpected handoff result: {:?}", other),
        }
        assert_eq!(emitter.emitted(), 0);
    }

    #[test]
    fn test_dropped_token_is_abandoned_not_deadlocked() {
        let (mut emitter, frames) = frame_channel::<u32>();

        let dispatch = thread::spawn(move || {
            let token = frames.recv().unwrap();
            drop(token);
        });

        let result = emitter.handoff(Box::new(0));
        dispatch.join().unwrap();

        assert!(matches!(result, Err(HandoffError::Abandoned { cycle: 0 })));
        assert_eq!(emitter.emitted(), 1);
        assert_eq!(emitter.acknowledged(), 0);
    }

    #[test]
    fn test_cycles_increase() {
        let (mut emitter, frames) = frame_channel::<()>();

        let dispatch = thread::spawn(move || {
            let mut cycles = Vec::new();
            for token in frames.iter() {
                cycles.push(token.cycle());
                token.acknowledge().unwrap();
            }
            cycles
        });

        let mut state = Box::new(());
        for _ in 0..3 {
            state = emitter.handoff(state).unwrap();
        }
        drop(emitter);

        assert_eq!(dispatch.join().unwrap(), vec![0, 1, 2]);
    }
}
