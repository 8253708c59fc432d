//! Dispatch/render loop.
//!
//! Runs on the thread that owns the rendering surface and multiplexes two
//! sources with one blocking wait:
//!
//! ```text
//!            ┌──────────── input queue (bounded) ◄── EventPump
//!            │
//!   select! ─┤
//!            │
//!            └──────────── frame tokens (rendezvous) ◄── SimulationWorker
//!
//!   Idle ──input──► ProcessingInput ──► Idle | ShuttingDown
//!   Idle ──token──► ProcessingFrame ──► Idle | (process exit)
//! ```

use crate::config::{FrameLoopConfig, StopPolicy};
use crate::logical_clock::LogicalClock;
use crate::shutdown::ShutdownSignal;
use crate::token::FrameToken;
use crossbeam::channel::{select, Receiver};
use framelock_env::{EnvError, EventClass, FrameClock, FrameInfo, InputEvent, Simulation, Surface};
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Phase of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchState {
    /// Blocked in the multiplexed wait
    Idle,
    /// Classifying one input event
    ProcessingInput,
    /// Ticking and rendering one frame
    ProcessingFrame,
    /// Quit received; no more input is consumed
    ShuttingDown,
}

/// Why the dispatch loop returned.
pub enum DispatchExit<S> {
    /// A terminal input event arrived. The shutdown signal is raised.
    UserQuit,

    /// `tick` returned false under [`StopPolicy::Return`]. Carries the
    /// unacknowledged token; the worker stays parked until it is dropped.
    SimulationStopped(FrameToken<S>),

    /// The pump stopped feeding the input queue.
    InputClosed,

    /// The worker disappeared (panicked) while the loop was waiting.
    WorkerLost,
}

impl<S> DispatchExit<S> {
    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            DispatchExit::UserQuit => "user_quit",
            DispatchExit::SimulationStopped(_) => "simulation_stopped",
            DispatchExit::InputClosed => "input_closed",
            DispatchExit::WorkerLost => "worker_lost",
        }
    }
}

impl<S> std::fmt::Debug for DispatchExit<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchExit::SimulationStopped(token) => f
                .debug_tuple("SimulationStopped")
                .field(&token.cycle())
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Counters kept by the dispatch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Frames ticked, rendered and acknowledged
    pub frames: u64,

    /// Draw-relevant input events dropped
    pub inputs_discarded: u64,

    /// Informational input events logged
    pub inputs_logged: u64,

    /// Frames whose dt exceeded twice the frame budget
    pub slow_frames: u64,

    /// Accumulated logical time in milliseconds
    pub logical_ms: u64,

    /// Clock readings that went backwards
    pub clock_regressions: u64,
}

/// The per-event logic of the dispatch loop, separated from the channels.
pub struct FrameHandler<S, R, C> {
    surface: R,
    clock: C,
    shutdown: ShutdownSignal,
    frame_budget: Duration,
    slow_threshold: Duration,
    stop_policy: StopPolicy,
    logical: LogicalClock,
    stats: DispatchStats,
    state: DispatchState,
    _sim: PhantomData<fn() -> S>,
}

impl<S, R, C> FrameHandler<S, R, C>
where
    S: Simulation,
    R: Surface<S>,
    C: FrameClock,
{
    /// Creates a handler. The frame clock is read here to seed the first
    /// frame's delta, so construct it right before the loop starts.
    pub fn new(surface: R, clock: C, shutdown: ShutdownSignal, config: &FrameLoopConfig) -> Self {
        let logical = LogicalClock::new(clock.ticks_ms());
        Self {
            surface,
            clock,
            shutdown,
            frame_budget: config.frame_budget,
            slow_threshold: config.frame_budget.saturating_mul(2),
            stop_policy: config.on_simulation_stop,
            logical,
            stats: DispatchStats::default(),
            state: DispatchState::Idle,
            _sim: PhantomData,
        }
    }

    /// Current phase.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            logical_ms: self.logical.elapsed_ms(),
            clock_regressions: self.logical.regressions(),
            ..self.stats
        }
    }

    /// The rendering surface.
    pub fn surface(&self) -> &R {
        &self.surface
    }

    /// Handles one input event.
    ///
    /// Returns an exit only for a terminal event.
    pub fn on_input(&mut self, event: InputEvent) -> Option<DispatchExit<S>> {
        self.state = DispatchState::ProcessingInput;

        match event.class() {
            EventClass::Terminal => {
                self.state = DispatchState::ShuttingDown;
                self.shutdown.raise();
                info!(ts = event.timestamp_ms, "Quit received, shutting down");
                return Some(DispatchExit::UserQuit);
            }
            EventClass::DrawRelevant => {
                self.stats.inputs_discarded += 1;
            }
            EventClass::Informational => {
                self.stats.inputs_logged += 1;
                debug!(kind = event.kind.name(), ts = event.timestamp_ms, "Input event");
            }
        }

        self.state = DispatchState::Idle;
        None
    }

    /// Handles one frame token: tick, render, acknowledge.
    ///
    /// Under [`StopPolicy::ExitProcess`] a `false` from `tick` terminates the
    /// process here with code 0 and this function does not return.
    ///
    /// # Errors
    /// A surface failure. The shutdown signal is raised and the token is
    /// dropped unacknowledged.
    pub fn on_frame(&mut self, mut token: FrameToken<S>) -> Result<Option<DispatchExit<S>>, EnvError> {
        self.state = DispatchState::ProcessingFrame;

        let now = self.clock.ticks_ms();
        let dt = self.logical.advance(now);
        if dt > self.slow_threshold {
            self.stats.slow_frames += 1;
            warn!(
                frame = self.stats.frames,
                dt_ms = dt.as_millis() as u64,
                budget_ms = self.frame_budget.as_millis() as u64,
                "Slow frame"
            );
        }

        if !token.state_mut().tick(dt) {
            match self.stop_policy {
                StopPolicy::ExitProcess => std::process::exit(0),
                StopPolicy::Return => return Ok(Some(DispatchExit::SimulationStopped(token))),
            }
        }

        let info = FrameInfo {
            frame: self.stats.frames,
            dt,
            logical_ms: self.logical.elapsed_ms(),
        };
        if let Err(e) = self.surface.present(token.state(), &info) {
            error!(frame = info.frame, "Surface failed: {}", e);
            self.shutdown.raise();
            return Err(e);
        }

        if let Err(e) = token.acknowledge() {
            warn!("{}", e);
            return Ok(Some(DispatchExit::WorkerLost));
        }

        self.stats.frames += 1;
        self.state = DispatchState::Idle;
        Ok(None)
    }
}

/// What the dispatch loop hands back when it returns normally.
pub struct DispatchReport<S, R> {
    /// Why the loop returned
    pub exit: DispatchExit<S>,

    /// Final counters
    pub stats: DispatchStats,

    /// The surface, returned to the owning thread
    pub surface: R,
}

/// The dispatch loop: input queue and token receiver around a
/// [`FrameHandler`].
pub struct DispatchLoop<S, R, C> {
    input: Receiver<InputEvent>,
    frames: Receiver<FrameToken<S>>,
    handler: FrameHandler<S, R, C>,
}

impl<S, R, C> DispatchLoop<S, R, C>
where
    S: Simulation,
    R: Surface<S>,
    C: FrameClock,
{
    /// Creates the loop.
    pub fn new(
        input: Receiver<InputEvent>,
        frames: Receiver<FrameToken<S>>,
        handler: FrameHandler<S, R, C>,
    ) -> Self {
        Self {
            input,
            frames,
            handler,
        }
    }

    /// Runs until quit, simulation stop, or a peer disappears.
    ///
    /// Returning drops both receivers: the pump's next send fails and the
    /// worker's next handoff reports the dispatch loop closed.
    ///
    /// # Errors
    /// Surface failure (see [`FrameHandler::on_frame`]).
    pub fn run(self) -> Result<DispatchReport<S, R>, EnvError> {
        let DispatchLoop {
            input,
            frames,
            mut handler,
        } = self;

        debug!("Dispatch loop running");

        let exit = loop {
            select! {
                recv(input) -> msg => match msg {
                    Ok(event) => {
                        if let Some(exit) = handler.on_input(event) {
                            break exit;
                        }
                    }
                    Err(_) => {
                        handler.state = DispatchState::ShuttingDown;
                        handler.shutdown.raise();
                        break DispatchExit::InputClosed;
                    }
                },
                recv(frames) -> msg => match msg {
                    Ok(token) => {
                        if let Some(exit) = handler.on_frame(token)? {
                            break exit;
                        }
                    }
                    Err(_) => break DispatchExit::WorkerLost,
                },
            }
        };

        let stats = handler.stats();
        debug!(exit = exit.name(), frames = stats.frames, "Dispatch loop returned");

        Ok(DispatchReport {
            exit,
            stats,
            surface: handler.surface,
        })
    }
}
