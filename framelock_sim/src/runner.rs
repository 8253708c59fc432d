//! Scenario runner - drives the frame client through harness scenarios.

use crate::clock::ManualClock;
use crate::error::HarnessError;
use crate::input::{sim_input, SimInput, SimInputHandle};
use crate::oracle::{AccessOracle, Alternation};
use crate::scenarios::ScenarioId;
use crate::simulation::{ScriptedSimulation, SimSnapshot, TickRecord, UpdateFeed};
use crate::surface::{FrameTrigger, HeadlessSurface};

use framelock_core::{
    ClientError, ClientExit, DispatchStats, FrameClient, FrameLoopConfig, PumpStats,
    ShutdownSignal, StopPolicy, WorkerExit, WorkerStats,
};
use framelock_env::{EventKind, InputEvent};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Updates pre-queued before the burst scenario starts.
const INITIAL_BACKLOG: u64 = 5;

/// Size of each later burst.
const BURST_SIZE: u64 = 10;

/// Slow burst injected in the quit-mid-drain scenario.
const SLOW_BURST_SIZE: u64 = 25;

/// The tick on which the sim-stop scenario asks to terminate.
const STOP_AT_TICK: u64 = 3;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Ticks executed by the simulation
    pub total_ticks: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Per-tick observations
    pub ticks: Vec<TickRecord>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Frames ticked, rendered and acknowledged
    pub frames: u64,

    /// Updates pushed by the feed
    pub updates_sent: u64,

    /// Updates applied by the simulation
    pub updates_applied: u64,

    /// Catch-up steps that found no update
    pub idle_steps: u64,

    /// Tokens taken by the dispatch loop
    pub tokens_emitted: u64,

    /// Tokens acknowledged
    pub tokens_acknowledged: u64,

    /// Input events forwarded by the pump
    pub inputs_forwarded: u64,

    /// Draw-relevant inputs discarded
    pub inputs_discarded: u64,

    /// Informational inputs logged
    pub inputs_logged: u64,

    /// Frames over twice the budget
    pub slow_frames: u64,

    /// Logical time at exit
    pub logical_ms: u64,

    /// Backwards clock readings
    pub clock_regressions: u64,

    /// Overlapping state accesses
    pub access_violations: u64,

    /// Worker batches seen by the oracle
    pub worker_phases: u64,

    /// Tick/present runs seen by the oracle
    pub render_phases: u64,
}

/// How the client run ended, without the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunExit {
    UserQuit,
    SimulationStopped { cycle: u64 },
}

/// Everything observed from one client run.
struct RunOutcome {
    exit: RunExit,
    dispatch: DispatchStats,
    pump: Option<PumpStats>,
    worker_exit: WorkerExit,
    worker: WorkerStats,
    sim: SimSnapshot,
    alternation: Result<Alternation, String>,
    violations: u64,
    updates_sent: u64,
}

/// Background threads feeding a run.
struct Helpers {
    stop: ShutdownSignal,
    threads: Vec<(&'static str, JoinHandle<()>)>,
}

impl Helpers {
    fn new() -> Self {
        Self {
            stop: ShutdownSignal::new(),
            threads: Vec::new(),
        }
    }

    fn spawn<F>(&mut self, name: &'static str, body: F) -> Result<(), HarnessError>
    where
        F: FnOnce(ShutdownSignal) + Send + 'static,
    {
        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(stop))
            .map_err(|e| HarnessError::Thread(format!("{}: {}", name, e)))?;
        self.threads.push((name, handle));
        Ok(())
    }

    fn stop(self) -> Result<(), HarnessError> {
        self.stop.raise();
        for (name, handle) in self.threads {
            handle
                .join()
                .map_err(|_| HarnessError::Thread(format!("{} panicked", name)))?;
        }
        Ok(())
    }
}

/// One prepared run: collaborators plus the threads feeding them.
struct RunSetup {
    sim: ScriptedSimulation,
    feed: UpdateFeed,
    oracle: Arc<AccessOracle>,
    input: SimInput,
    input_handle: SimInputHandle,
    surface: HeadlessSurface,
    clock: ManualClock,
    helpers: Helpers,
}

/// Runs frame-sync scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Frames before the harness injects quit
    frames: u64,

    /// Mean update arrival rate in Hz
    update_rate_hz: f64,

    /// Mean input noise rate in Hz
    input_rate_hz: f64,

    /// Pump wait timeout
    input_timeout: Duration,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            frames: 60,
            update_rate_hz: 250.0,
            input_rate_hz: 100.0,
            input_timeout: Duration::from_millis(20),
        }
    }

    /// Sets the frame target. Values below 8 are raised to 8 so every
    /// scenario has room for its triggers.
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.frames = frames.max(8);
        self
    }

    /// Sets the mean update arrival rate.
    pub fn with_update_rate(mut self, hz: f64) -> Self {
        self.update_rate_hz = hz;
        self
    }

    /// Sets the mean input noise rate.
    pub fn with_input_rate(mut self, hz: f64) -> Self {
        self.input_rate_hz = hz;
        self
    }

    /// The configured frame target.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let outcome = match scenario {
            ScenarioId::Steady => self.run_steady(),
            ScenarioId::Burst => self.run_burst(),
            ScenarioId::QuitMidDrain => self.run_quit_mid_drain(),
            ScenarioId::SimStop => self.run_sim_stop(),
            ScenarioId::ClockWrap => self.run_clock_wrap(),
        };

        match outcome {
            Ok((outcome, failures)) => self.result(scenario, outcome, failures),
            Err(e) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                total_ticks: 0,
                failure_reason: Some(e.to_string()),
                metrics: ScenarioMetrics::default(),
                ticks: Vec::new(),
            },
        }
    }

    /// FL-001: Steady - exponential arrivals, input noise, quit after N frames.
    fn run_steady(&self) -> Result<(RunOutcome, Vec<String>), HarnessError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut setup = self.setup(ManualClock::new(rng.gen()).with_schedule(jitter(&mut rng, 64)));
        self.spawn_feed(&mut setup, rng.gen())?;
        self.spawn_noise(&mut setup, rng.gen())?;
        let quit = setup.input_handle.clone();
        setup.surface = setup.surface.on_frame(self.frames - 1, FrameTrigger::Quit(quit));

        let outcome = self.drive(setup, StopPolicy::Return)?;
        let mut failures = graceful_checks(&outcome, self.frames);
        if outcome.sim.out_of_order > 0 {
            failures.push(format!("{} updates applied out of order", outcome.sim.out_of_order));
        }
        Ok((outcome, failures))
    }

    /// FL-002: Burst - a backlog before start and bursts during frames.
    fn run_burst(&self) -> Result<(RunOutcome, Vec<String>), HarnessError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut setup = self.setup(ManualClock::new(rng.gen()).with_schedule(jitter(&mut rng, 64)));
        setup.feed.push(INITIAL_BACKLOG)?;

        let burst_frames = [self.frames / 4, self.frames / 2, self.frames * 3 / 4];
        for frame in burst_frames {
            let feed = setup.feed.clone();
            setup.surface = setup.surface.on_frame(frame, FrameTrigger::Burst(feed, BURST_SIZE));
        }
        let quit = setup.input_handle.clone();
        setup.surface = setup.surface.on_frame(self.frames - 1, FrameTrigger::Quit(quit));

        let outcome = self.drive(setup, StopPolicy::Return)?;
        let mut failures = graceful_checks(&outcome, self.frames);
        let records = &outcome.sim.records;

        match records.first() {
            Some(first) if first.applied_since_last == INITIAL_BACKLOG => {}
            Some(first) => failures.push(format!(
                "first frame saw {} of {} queued updates",
                first.applied_since_last, INITIAL_BACKLOG
            )),
            None => failures.push("no frame was ticked".to_string()),
        }

        for frame in burst_frames {
            let next = records.get(frame as usize + 1).map(|r| r.applied_since_last);
            if next != Some(BURST_SIZE) {
                failures.push(format!(
                    "burst at frame {} not drained before next frame (saw {:?})",
                    frame, next
                ));
            }
        }

        if let Some(pos) = records.iter().position(|r| r.pending_at_tick > 0) {
            failures.push(format!("frame {} ticked with updates still pending", pos));
        }

        Ok((outcome, failures))
    }

    /// FL-003: QuitMidDrain - quit lands while the worker drains a slow burst.
    fn run_quit_mid_drain(&self) -> Result<(RunOutcome, Vec<String>), HarnessError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut setup = self.setup(ManualClock::new(rng.gen()).with_schedule(jitter(&mut rng, 64)));
        setup.sim = setup.sim.with_apply_cost(Duration::from_millis(2));

        let at = self.frames / 2;
        let feed = setup.feed.clone();
        let quit = setup.input_handle.clone();
        setup.surface = setup
            .surface
            .on_frame(at, FrameTrigger::Burst(feed, SLOW_BURST_SIZE))
            .on_frame(at, FrameTrigger::Quit(quit));

        let outcome = self.drive(setup, StopPolicy::Return)?;
        let mut failures = graceful_checks(&outcome, at + 1);

        if outcome.sim.stats.updates_applied != SLOW_BURST_SIZE {
            failures.push(format!(
                "drain interrupted: {} of {} updates applied",
                outcome.sim.stats.updates_applied, SLOW_BURST_SIZE
            ));
        }

        Ok((outcome, failures))
    }

    /// FL-004: SimStop - `tick` returns false on its third call.
    fn run_sim_stop(&self) -> Result<(RunOutcome, Vec<String>), HarnessError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut setup = self.setup(ManualClock::new(rng.gen()).with_schedule(jitter(&mut rng, 64)));
        setup.sim = setup.sim.stop_at_tick(STOP_AT_TICK);
        self.spawn_feed(&mut setup, rng.gen())?;

        let outcome = self.drive(setup, StopPolicy::Return)?;
        let mut failures = common_checks(&outcome);

        let last = STOP_AT_TICK - 1;
        if outcome.exit != (RunExit::SimulationStopped { cycle: last }) {
            failures.push(format!("expected stop on cycle {}, got {:?}", last, outcome.exit));
        }
        if outcome.worker_exit != (WorkerExit::TokenAbandoned { cycle: last }) {
            failures.push(format!("worker exit {:?}", outcome.worker_exit));
        }
        if outcome.worker.tokens_emitted != STOP_AT_TICK
            || outcome.worker.tokens_acknowledged != STOP_AT_TICK - 1
        {
            failures.push(format!(
                "expected {} emitted / {} acknowledged, got {} / {}",
                STOP_AT_TICK,
                STOP_AT_TICK - 1,
                outcome.worker.tokens_emitted,
                outcome.worker.tokens_acknowledged
            ));
        }
        if outcome.dispatch.frames != STOP_AT_TICK - 1 {
            failures.push(format!("{} frames rendered", outcome.dispatch.frames));
        }
        if outcome.sim.stats.ticks != STOP_AT_TICK {
            failures.push(format!("{} ticks", outcome.sim.stats.ticks));
        }

        Ok((outcome, failures))
    }

    /// FL-005: ClockWrap - the tick counter rolls over mid-run.
    fn run_clock_wrap(&self) -> Result<(RunOutcome, Vec<String>), HarnessError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let schedule = jitter(&mut rng, 64);
        let start = u32::MAX - rng.gen_range(0..=(schedule[0] * 2));
        let clock = ManualClock::new(start).with_schedule(schedule.clone());
        let mut setup = self.setup(clock.clone());
        self.spawn_feed(&mut setup, rng.gen())?;
        let quit = setup.input_handle.clone();
        setup.surface = setup.surface.on_frame(self.frames - 1, FrameTrigger::Quit(quit));

        let outcome = self.drive(setup, StopPolicy::Return)?;
        let mut failures = graceful_checks(&outcome, self.frames);

        for (i, record) in outcome.sim.records.iter().enumerate() {
            let expected = Duration::from_millis(u64::from(schedule[i % schedule.len()]));
            if record.dt != expected {
                failures.push(format!("frame {} dt {:?}, expected {:?}", i, record.dt, expected));
                break;
            }
        }

        let total: u64 = outcome.sim.records.iter().map(|r| r.dt.as_millis() as u64).sum();
        if total != outcome.dispatch.logical_ms {
            failures.push(format!(
                "logical clock {} ms, ticks summed to {} ms",
                outcome.dispatch.logical_ms, total
            ));
        }
        if outcome.dispatch.clock_regressions > 0 {
            failures.push(format!("{} clock regressions", outcome.dispatch.clock_regressions));
        }
        if clock.peek() >= start {
            failures.push("tick counter never wrapped".to_string());
        }

        Ok((outcome, failures))
    }

    fn config(&self, policy: StopPolicy) -> FrameLoopConfig {
        FrameLoopConfig::default()
            .with_input_timeout(self.input_timeout)
            .with_stop_policy(policy)
            .with_thread_prefix("fl")
    }

    fn setup(&self, clock: ManualClock) -> RunSetup {
        let oracle = AccessOracle::shared();
        let (sim, feed) = ScriptedSimulation::new(Arc::clone(&oracle));
        let (input, input_handle) = sim_input();
        let surface = HeadlessSurface::new().with_oracle(Arc::clone(&oracle));

        RunSetup {
            sim,
            feed,
            oracle,
            input,
            input_handle,
            surface,
            clock,
            helpers: Helpers::new(),
        }
    }

    /// Pushes single updates with exponential gaps until stopped.
    fn spawn_feed(&self, setup: &mut RunSetup, seed: u64) -> Result<(), HarnessError> {
        let gaps = exp_ms(self.update_rate_hz)?;
        let feed = setup.feed.clone();
        setup.helpers.spawn("fl-feed", move |stop| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            while !stop.is_raised() {
                thread::sleep(gap(&gaps, &mut rng));
                if feed.push(1).is_err() {
                    break;
                }
            }
        })
    }

    /// Injects draw-relevant and informational events until stopped.
    fn spawn_noise(&self, setup: &mut RunSetup, seed: u64) -> Result<(), HarnessError> {
        let gaps = exp_ms(self.input_rate_hz)?;
        let input = setup.input_handle.clone();
        setup.helpers.spawn("fl-noise", move |stop| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut ts = 0u32;
            while !stop.is_raised() {
                let pause = gap(&gaps, &mut rng);
                thread::sleep(pause);
                ts = ts.wrapping_add(pause.as_millis() as u32);
                if input.send(noise_event(&mut rng, ts)).is_err() {
                    break;
                }
            }
        })
    }

    /// Runs the client to completion and collects every observation.
    fn drive(&self, setup: RunSetup, policy: StopPolicy) -> Result<RunOutcome, HarnessError> {
        let RunSetup {
            sim,
            feed,
            oracle,
            input,
            input_handle,
            surface,
            clock,
            helpers,
        } = setup;

        let client = FrameClient::new(self.config(policy)).map_err(ClientError::from)?;
        let run = client.run(sim, input, surface, clock);
        let stopped = helpers.stop();
        let report = run?;
        stopped?;
        drop(input_handle);

        let (exit, snapshot) = match &report.exit {
            ClientExit::UserQuit => (RunExit::UserQuit, None),
            ClientExit::SimulationStopped(token) => (
                RunExit::SimulationStopped {
                    cycle: token.cycle(),
                },
                Some(token.state().snapshot()),
            ),
        };
        let dispatch = report.dispatch;
        let pump = report.pump;

        let worker = report.finish()?;
        let sim = match (snapshot, worker.state.as_deref()) {
            (Some(snapshot), _) => snapshot,
            (None, Some(state)) => state.snapshot(),
            (None, None) => {
                return Err(HarnessError::Thread("worker exited without the state".to_string()))
            }
        };

        Ok(RunOutcome {
            exit,
            dispatch,
            pump,
            worker_exit: worker.exit,
            worker: worker.stats,
            sim,
            alternation: oracle.verify_alternation(),
            violations: oracle.violations(),
            updates_sent: feed.sent(),
        })
    }

    fn result(&self, scenario: ScenarioId, outcome: RunOutcome, failures: Vec<String>) -> ScenarioResult {
        let alternation = outcome.alternation.clone().unwrap_or_default();
        let metrics = ScenarioMetrics {
            frames: outcome.dispatch.frames,
            updates_sent: outcome.updates_sent,
            updates_applied: outcome.sim.stats.updates_applied,
            idle_steps: outcome.sim.stats.idle_steps,
            tokens_emitted: outcome.worker.tokens_emitted,
            tokens_acknowledged: outcome.worker.tokens_acknowledged,
            inputs_forwarded: outcome.pump.map_or(0, |p| p.events_forwarded),
            inputs_discarded: outcome.dispatch.inputs_discarded,
            inputs_logged: outcome.dispatch.inputs_logged,
            slow_frames: outcome.dispatch.slow_frames,
            logical_ms: outcome.dispatch.logical_ms,
            clock_regressions: outcome.dispatch.clock_regressions,
            access_violations: outcome.violations,
            worker_phases: alternation.worker_phases,
            render_phases: alternation.render_phases,
        };

        debug!(
            frames = metrics.frames,
            updates = metrics.updates_applied,
            idle = metrics.idle_steps,
            "Scenario {} finished",
            scenario.name()
        );

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failures.is_empty(),
            total_ticks: outcome.sim.stats.ticks,
            failure_reason: if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            },
            metrics,
            ticks: outcome.sim.records,
        }
    }
}

/// Checks every scenario shares: exclusion, alternation, exactly-once.
fn common_checks(outcome: &RunOutcome) -> Vec<String> {
    let mut failures = Vec::new();

    if outcome.violations > 0 {
        failures.push(format!("{} overlapping state accesses", outcome.violations));
    }

    match &outcome.alternation {
        Ok(alt) => {
            if alt.render_phases != outcome.sim.stats.ticks {
                failures.push(format!(
                    "{} render phases for {} ticks",
                    alt.render_phases, outcome.sim.stats.ticks
                ));
            }
            if alt.worker_phases < alt.render_phases || alt.worker_phases > alt.render_phases + 1 {
                failures.push(format!(
                    "{} worker phases around {} render phases",
                    alt.worker_phases, alt.render_phases
                ));
            }
        }
        Err(e) => failures.push(format!("alternation broken: {}", e)),
    }

    if outcome.sim.stats.updates_applied > outcome.updates_sent {
        failures.push("applied more updates than were sent".to_string());
    }

    failures
}

/// Checks for runs that end with a quit event.
fn graceful_checks(outcome: &RunOutcome, min_frames: u64) -> Vec<String> {
    let mut failures = common_checks(outcome);

    if outcome.exit != RunExit::UserQuit {
        failures.push(format!("expected user quit, got {:?}", outcome.exit));
    }
    if outcome.worker_exit != WorkerExit::DispatchClosed {
        failures.push(format!("worker exit {:?}", outcome.worker_exit));
    }
    if outcome.worker.tokens_emitted != outcome.worker.tokens_acknowledged {
        failures.push(format!(
            "{} tokens emitted but {} acknowledged",
            outcome.worker.tokens_emitted, outcome.worker.tokens_acknowledged
        ));
    }
    if outcome.dispatch.frames != outcome.worker.tokens_acknowledged {
        failures.push(format!(
            "{} frames rendered for {} acknowledgments",
            outcome.dispatch.frames, outcome.worker.tokens_acknowledged
        ));
    }
    if outcome.dispatch.frames < min_frames {
        failures.push(format!("only {} of {} frames", outcome.dispatch.frames, min_frames));
    }
    if outcome.pump.is_none() {
        failures.push("pump did not stop cleanly".to_string());
    }

    failures
}

/// Per-frame clock steps around 60 FPS.
fn jitter(rng: &mut ChaCha8Rng, len: usize) -> Vec<u32> {
    (0..len).map(|_| rng.gen_range(14..=19)).collect()
}

fn exp_ms(rate_hz: f64) -> Result<Exp<f64>, HarnessError> {
    Exp::new(rate_hz / 1000.0).map_err(|_| HarnessError::InvalidRate(rate_hz))
}

fn gap(dist: &Exp<f64>, rng: &mut ChaCha8Rng) -> Duration {
    Duration::from_secs_f64(dist.sample(rng).min(50.0) / 1000.0)
}

fn noise_event(rng: &mut ChaCha8Rng, ts: u32) -> InputEvent {
    let kind = match rng.gen_range(0..4) {
        0 => EventKind::PointerMotion {
            x: rng.gen_range(0..1920),
            y: rng.gen_range(0..1080),
        },
        1 => EventKind::Key {
            code: rng.gen_range(0..256),
            pressed: rng.gen(),
        },
        2 => EventKind::FocusChanged(rng.gen()),
        _ => EventKind::WindowResized {
            width: rng.gen_range(640..=1920),
            height: rng.gen_range(480..=1080),
        },
    };
    InputEvent::new(ts, kind)
}
