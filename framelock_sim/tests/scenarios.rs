//! End-to-end scenario tests: the real frame client against harness
//! collaborators.

use framelock_core::{ClientError, ClientExit, FrameClient, FrameLoopConfig, StopPolicy, WorkerExit};
use framelock_env::EnvError;
use framelock_sim::scenarios::ScenarioId;
use framelock_sim::{
    sim_input, AccessOracle, FrameTrigger, HeadlessSurface, ManualClock, ScenarioRunner,
    ScriptedSimulation, TraceExport,
};
use std::sync::Arc;
use std::time::Duration;

fn config() -> FrameLoopConfig {
    FrameLoopConfig::default()
        .with_input_timeout(Duration::from_millis(20))
        .with_stop_policy(StopPolicy::Return)
}

#[test]
fn test_steady_passes() {
    let result = ScenarioRunner::new(7).with_frames(30).run(ScenarioId::Steady);

    assert!(result.passed, "{:?}", result.failure_reason);
    assert!(result.metrics.frames >= 30);
    assert_eq!(result.metrics.access_violations, 0);
    assert_eq!(result.metrics.tokens_emitted, result.metrics.tokens_acknowledged);
}

#[test]
fn test_backlog_drained_before_first_frame() {
    let result = ScenarioRunner::new(11).with_frames(24).run(ScenarioId::Burst);

    assert!(result.passed, "{:?}", result.failure_reason);
    assert_eq!(result.ticks[0].applied_since_last, 5);
    assert_eq!(result.ticks[0].pending_at_tick, 0);
}

#[test]
fn test_quit_mid_drain_loses_no_acknowledgment() {
    let result = ScenarioRunner::new(3).with_frames(16).run(ScenarioId::QuitMidDrain);

    assert!(result.passed, "{:?}", result.failure_reason);
    assert_eq!(result.metrics.tokens_emitted, result.metrics.tokens_acknowledged);
    assert_eq!(result.metrics.updates_applied, 25);
}

#[test]
fn test_sim_stop_on_third_tick() {
    let result = ScenarioRunner::new(5).run(ScenarioId::SimStop);

    assert!(result.passed, "{:?}", result.failure_reason);
    assert_eq!(result.total_ticks, 3);
    assert_eq!(result.metrics.tokens_emitted, 3);
    assert_eq!(result.metrics.tokens_acknowledged, 2);
    assert_eq!(result.metrics.frames, 2);
}

#[test]
fn test_clock_wrap_keeps_deltas_small() {
    let result = ScenarioRunner::new(9).with_frames(20).run(ScenarioId::ClockWrap);

    assert!(result.passed, "{:?}", result.failure_reason);
    assert_eq!(result.metrics.clock_regressions, 0);
    assert!(result
        .ticks
        .iter()
        .all(|t| t.dt >= Duration::from_millis(14) && t.dt <= Duration::from_millis(19)));
}

#[test]
fn test_all_scenarios_across_seeds() {
    for seed in 100..103 {
        let runner = ScenarioRunner::new(seed).with_frames(12);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(
                result.passed,
                "{} seed={}: {:?}",
                scenario,
                seed,
                result.failure_reason
            );
        }
    }
}

#[test]
fn test_input_failure_is_fatal() {
    let (sim, _feed) = ScriptedSimulation::new(AccessOracle::shared());
    let (input, handle) = sim_input();
    handle.fail("display connection lost").unwrap();

    let client = FrameClient::new(config()).unwrap();
    let result = client.run(sim, input, HeadlessSurface::new(), ManualClock::new(0));

    assert!(matches!(result, Err(ClientError::Input(EnvError::InputUnavailable(_)))));
}

#[test]
fn test_surface_failure_abandons_token() {
    let oracle = AccessOracle::shared();
    let (sim, _feed) = ScriptedSimulation::new(Arc::clone(&oracle));
    let (input, _handle) = sim_input();
    let surface = HeadlessSurface::new()
        .with_oracle(Arc::clone(&oracle))
        .on_frame(2, FrameTrigger::Fail);

    let client = FrameClient::new(config()).unwrap();
    let result = client.run(sim, input, surface, ManualClock::new(0));

    assert!(matches!(result, Err(ClientError::Surface(EnvError::SurfaceError(_)))));
    assert_eq!(oracle.violations(), 0);
}

#[test]
fn test_quit_joins_pump_and_releases_worker() {
    let oracle = AccessOracle::shared();
    let (sim, feed) = ScriptedSimulation::new(Arc::clone(&oracle));
    let (input, handle) = sim_input();
    feed.push(3).unwrap();
    let surface = HeadlessSurface::new()
        .with_oracle(Arc::clone(&oracle))
        .on_frame(4, FrameTrigger::Quit(handle.clone()));

    let client = FrameClient::new(config()).unwrap();
    let report = client
        .run(sim, input, surface, ManualClock::new(0).with_schedule(vec![16]))
        .unwrap();

    assert!(matches!(report.exit, ClientExit::UserQuit));
    assert!(report.shutdown.is_raised());
    assert!(report.pump.is_some());
    assert!(report.dispatch.frames >= 5);
    assert_eq!(report.dispatch.logical_ms, 16 * report.dispatch.frames);

    let frames = report.dispatch.frames;
    let worker = report.finish().unwrap();
    assert_eq!(worker.exit, WorkerExit::DispatchClosed);
    assert_eq!(worker.stats.tokens_acknowledged, frames);
    assert_eq!(worker.state.unwrap().stats().updates_applied, 3);
    assert!(oracle.verify_alternation().is_ok());
}

#[test]
fn test_export_writes_trace() {
    let result = ScenarioRunner::new(21).with_frames(10).run(ScenarioId::Burst);
    let path = std::env::temp_dir().join(format!("framelock-trace-{}.json", std::process::id()));

    TraceExport::from_result(&result).write_to_file(&path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(json["scenario"], "burst");
    assert_eq!(json["seed"], 21);
    assert_eq!(json["frames"].as_array().unwrap().len(), result.ticks.len());
    assert_eq!(json["frames"][0]["applied"], 5);
}
