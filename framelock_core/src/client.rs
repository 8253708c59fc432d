//! Frame client: wires the three activities together and runs them.

use crate::config::FrameLoopConfig;
use crate::dispatch::{DispatchExit, DispatchLoop, DispatchStats, FrameHandler};
use crate::error::{ClientError, ConfigError};
use crate::pump::{EventPump, PumpStats};
use crate::shutdown::ShutdownSignal;
use crate::token::{frame_channel, FrameToken};
use crate::worker::{SimulationWorker, WorkerReport};
use crossbeam::channel;
use framelock_env::{EnvError, FrameClock, InputSource, Simulation, Surface};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

type PumpHandle = JoinHandle<Result<PumpStats, EnvError>>;

/// How a run that did not fail ended.
pub enum ClientExit<S> {
    /// Quit event; cooperative shutdown completed.
    UserQuit,

    /// `tick` returned false and the stop policy handed control back. Holds
    /// the token that was never acknowledged.
    SimulationStopped(FrameToken<S>),
}

impl<S> ClientExit<S> {
    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            ClientExit::UserQuit => "user_quit",
            ClientExit::SimulationStopped(_) => "simulation_stopped",
        }
    }
}

impl<S> std::fmt::Debug for ClientExit<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a completed run.
///
/// The simulation worker may still be parked (on a held token) or finishing
/// its last drain; [`ClientReport::finish`] collects it.
pub struct ClientReport<S, R> {
    /// How the run ended
    pub exit: ClientExit<S>,

    /// Dispatch loop counters
    pub dispatch: DispatchStats,

    /// Pump counters, if the pump was joined
    pub pump: Option<PumpStats>,

    /// The rendering surface, back on the calling thread
    pub surface: R,

    /// The run's shutdown signal
    pub shutdown: ShutdownSignal,

    worker: JoinHandle<WorkerReport<S>>,
    pending_pump: Option<PumpHandle>,
}

impl<S, R> ClientReport<S, R> {
    /// Drops any held token, raises shutdown and joins the remaining threads.
    pub fn finish(self) -> Result<WorkerReport<S>, ClientError> {
        let ClientReport {
            exit,
            shutdown,
            worker,
            pending_pump,
            ..
        } = self;

        drop(exit);
        shutdown.raise();

        if let Some(pump) = pending_pump {
            if pump.join().is_err() {
                return Err(ClientError::ThreadPanicked("input"));
            }
        }

        worker
            .join()
            .map_err(|_| ClientError::ThreadPanicked("simulation"))
    }
}

/// Runs a simulation against an input source and a surface.
///
/// # Threads
///
/// - `{prefix}-sim`: the [`SimulationWorker`]
/// - `{prefix}-input`: the [`EventPump`]
/// - the caller's thread: the [`DispatchLoop`], which owns the surface
///
/// # Example
///
/// ```ignore
/// let client = FrameClient::new(FrameLoopConfig::default())?;
/// let report = client.run(sim, input, NullSurface, SystemClock::new())?;
/// ```
#[derive(Debug, Clone)]
pub struct FrameClient {
    config: FrameLoopConfig,
}

impl FrameClient {
    /// Creates a client after validating `config`.
    pub fn new(config: FrameLoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &FrameLoopConfig {
        &self.config
    }

    /// Runs until quit, simulation stop, or a fatal error.
    ///
    /// Under the default stop policy a `false` from `tick` ends the process
    /// from inside this call.
    ///
    /// # Errors
    /// - [`ClientError::Spawn`] if a thread cannot be started
    /// - [`ClientError::Input`] if the input source fails
    /// - [`ClientError::Surface`] if rendering fails
    /// - [`ClientError::ThreadPanicked`] / [`ClientError::WorkerStopped`] if a
    ///   peer dies mid-run
    ///
    /// Once the dispatch loop has started, every error path joins both the
    /// pump and the worker before returning.
    pub fn run<S, I, R, C>(
        &self,
        sim: S,
        input: I,
        surface: R,
        clock: C,
    ) -> Result<ClientReport<S, R>, ClientError>
    where
        S: Simulation,
        I: InputSource,
        R: Surface<S>,
        C: FrameClock,
    {
        let shutdown = ShutdownSignal::new();
        let (input_tx, input_rx) = channel::bounded(self.config.input_queue_capacity);
        let (emitter, frames_rx) = frame_channel::<S>();

        let worker = SimulationWorker::new(emitter);
        let state = Box::new(sim);
        let worker_handle = thread::Builder::new()
            .name(format!("{}-sim", self.config.thread_prefix))
            .spawn(move || worker.run(state))
            .map_err(|source| ClientError::Spawn {
                name: "simulation",
                source,
            })?;

        let pump = EventPump::new(input, input_tx, shutdown.clone(), self.config.input_timeout);
        let pump_handle = thread::Builder::new()
            .name(format!("{}-input", self.config.thread_prefix))
            .spawn(move || pump.run())
            .map_err(|source| ClientError::Spawn {
                name: "input",
                source,
            })?;

        info!(
            prefix = %self.config.thread_prefix,
            queue = self.config.input_queue_capacity,
            "Frame client started"
        );

        let handler = FrameHandler::new(surface, clock, shutdown.clone(), &self.config);
        let report = match DispatchLoop::new(input_rx, frames_rx, handler).run() {
            Ok(report) => report,
            Err(e) => {
                let _ = pump_handle.join();
                Self::reclaim_worker(worker_handle);
                return Err(ClientError::Surface(e));
            }
        };

        let (exit, pump, pending_pump) = match report.exit {
            DispatchExit::UserQuit => {
                let stats = Self::join_pump_after_quit(pump_handle)?;
                info!(frames = report.stats.frames, "Input loop stopped gracefully");
                (ClientExit::UserQuit, stats, None)
            }
            DispatchExit::SimulationStopped(token) => {
                (ClientExit::SimulationStopped(token), None, Some(pump_handle))
            }
            DispatchExit::InputClosed => {
                let err = Self::input_failure(pump_handle);
                Self::reclaim_worker(worker_handle);
                return Err(err);
            }
            DispatchExit::WorkerLost => {
                shutdown.raise();
                let _ = pump_handle.join();
                return Err(match worker_handle.join() {
                    Ok(worker) => ClientError::WorkerStopped(worker.exit),
                    Err(_) => ClientError::ThreadPanicked("simulation"),
                });
            }
        };

        Ok(ClientReport {
            exit,
            dispatch: report.stats,
            pump,
            surface: report.surface,
            shutdown,
            worker: worker_handle,
            pending_pump,
        })
    }

    /// Joins the pump once shutdown is raised. It stops within one input
    /// timeout.
    fn join_pump_after_quit(pump: PumpHandle) -> Result<Option<PumpStats>, ClientError> {
        match pump.join() {
            Ok(Ok(stats)) => Ok(Some(stats)),
            Ok(Err(e)) => {
                warn!("Input source failed during shutdown: {}", e);
                Ok(None)
            }
            Err(_) => Err(ClientError::ThreadPanicked("input")),
        }
    }

    /// Joins a worker whose dispatch side is gone. Its next handoff fails, so
    /// it returns after the cycle in progress.
    fn reclaim_worker<S>(worker: JoinHandle<WorkerReport<S>>) {
        match worker.join() {
            Ok(report) => debug!(exit = ?report.exit, "Simulation worker reclaimed"),
            Err(_) => warn!("Simulation worker panicked during shutdown"),
        }
    }

    /// The input queue closed under the dispatch loop: collect the cause.
    fn input_failure(pump: PumpHandle) -> ClientError {
        match pump.join() {
            Ok(Err(e)) => {
                error!("Input source failed: {}", e);
                ClientError::Input(e)
            }
            Ok(Ok(_)) => ClientError::Input(EnvError::input("input pump stopped")),
            Err(_) => ClientError::ThreadPanicked("input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StopPolicy;
    use crate::worker::WorkerExit;
    use framelock_env::{EventKind, FrameInfo, InputEvent, NullSurface, SystemClock};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Steps {
        ticks: u32,
        stop_after: Option<u32>,
    }

    impl Simulation for Steps {
        fn advance_once(&mut self) {}

        fn has_pending(&self) -> bool {
            false
        }

        fn tick(&mut self, _dt: Duration) -> bool {
            self.ticks += 1;
            self.stop_after.map_or(true, |n| self.ticks < n)
        }
    }

    /// Emits its script after a short delay per event, then idles or fails.
    struct Script {
        events: VecDeque<InputEvent>,
        fail_when_empty: bool,
    }

    impl InputSource for Script {
        fn wait_for_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, EnvError> {
            std::thread::sleep(Duration::from_millis(2).min(timeout));
            match self.events.pop_front() {
                Some(event) => Ok(Some(event)),
                None if self.fail_when_empty => Err(EnvError::input("device unplugged")),
                None => Ok(None),
            }
        }
    }

    /// Raises its flag when dropped, wherever that happens.
    struct Watched(Arc<AtomicBool>);

    impl Simulation for Watched {
        fn advance_once(&mut self) {}

        fn has_pending(&self) -> bool {
            false
        }

        fn tick(&mut self, _dt: Duration) -> bool {
            true
        }
    }

    impl Drop for Watched {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Frames(Vec<FrameInfo>);

    impl Surface<Steps> for Frames {
        fn present(&mut self, _sim: &Steps, frame: &FrameInfo) -> Result<(), EnvError> {
            self.0.push(*frame);
            Ok(())
        }
    }

    fn client() -> FrameClient {
        FrameClient::new(
            FrameLoopConfig::default()
                .with_input_timeout(Duration::from_millis(10))
                .with_stop_policy(StopPolicy::Return)
                .with_thread_prefix("test"),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FrameLoopConfig::default().with_input_queue_capacity(0);
        assert!(matches!(FrameClient::new(config), Err(ConfigError::ZeroQueueCapacity)));
    }

    #[test]
    fn test_quit_stops_gracefully() {
        let mut events: VecDeque<_> = (0..5)
            .map(|i| InputEvent::new(i, EventKind::FocusChanged(true)))
            .collect();
        events.push_back(InputEvent::quit(10));
        let input = Script {
            events,
            fail_when_empty: false,
        };
        let sim = Steps {
            ticks: 0,
            stop_after: None,
        };

        let report = client().run(sim, input, Frames::default(), SystemClock::new()).unwrap();
        assert!(matches!(report.exit, ClientExit::UserQuit));
        assert!(report.shutdown.is_raised());
        assert_eq!(report.pump.unwrap().events_forwarded, 6);
        assert_eq!(report.surface.0.len() as u64, report.dispatch.frames);

        let frames = report.dispatch.frames;
        let worker = report.finish().unwrap();
        assert_eq!(worker.exit, WorkerExit::DispatchClosed);
        assert_eq!(worker.stats.tokens_emitted, worker.stats.tokens_acknowledged);
        assert_eq!(worker.stats.tokens_acknowledged, frames);
        assert_eq!(worker.state.unwrap().ticks as u64, frames);
    }

    #[test]
    fn test_simulation_stop_returns_held_token() {
        let input = Script {
            events: VecDeque::new(),
            fail_when_empty: false,
        };
        let sim = Steps {
            ticks: 0,
            stop_after: Some(3),
        };

        let report = client().run(sim, input, NullSurface, SystemClock::new()).unwrap();
        match &report.exit {
            ClientExit::SimulationStopped(token) => {
                assert_eq!(token.cycle(), 2);
                assert_eq!(token.state().ticks, 3);
            }
            other => panic!("unexpected exit: {:?}", other),
        }
        assert_eq!(report.dispatch.frames, 2);
        assert!(!report.shutdown.is_raised());

        let worker = report.finish().unwrap();
        assert_eq!(worker.exit, WorkerExit::TokenAbandoned { cycle: 2 });
        assert_eq!(worker.stats.tokens_emitted, 3);
        assert_eq!(worker.stats.tokens_acknowledged, 2);
    }

    #[test]
    fn test_input_failure_is_fatal() {
        let input = Script {
            events: VecDeque::new(),
            fail_when_empty: true,
        };
        let sim = Steps {
            ticks: 0,
            stop_after: None,
        };

        let result = client().run(sim, input, NullSurface, SystemClock::new());
        assert!(matches!(result, Err(ClientError::Input(EnvError::InputUnavailable(_)))));
    }

    #[test]
    fn test_input_failure_reclaims_worker() {
        let input = Script {
            events: VecDeque::new(),
            fail_when_empty: true,
        };
        let dropped = Arc::new(AtomicBool::new(false));
        let sim = Watched(Arc::clone(&dropped));

        let result = client().run(sim, input, NullSurface, SystemClock::new());
        assert!(matches!(result, Err(ClientError::Input(_))));

        // The worker has returned and released the state.
        assert!(dropped.load(Ordering::SeqCst));
    }
}
