//! framelock scenario harness CLI
//!
//! Run frame-sync scenarios against the real frame client.

use clap::Parser;
use framelock_core::{FrameClient, FrameLoopConfig};
use framelock_env::SystemClock;
use framelock_sim::scenarios::ScenarioId;
use framelock_sim::{sim_input, AccessOracle, HeadlessSurface, ScriptedSimulation};
use framelock_sim::{ScenarioResult, ScenarioRunner, TraceExport};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// framelock scenario harness
#[derive(Parser, Debug)]
#[command(name = "framelock-sim")]
#[command(about = "Run frame-sync scenarios for framelock", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (steady, burst, quit_mid_drain, sim_stop, clock_wrap, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Frames before the harness sends quit
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the per-frame trace of a single scenario run to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Run one client on the system clock until the simulation stops after
    /// --frames ticks; the process exits from inside the frame loop
    #[arg(long)]
    live: bool,
}

/// Runs a client with the default stop policy. Only returns on failure.
fn run_live(frames: u64) -> ! {
    let (sim, _feed) = ScriptedSimulation::new(AccessOracle::shared());
    let sim = sim.stop_at_tick(frames);
    let (input, _input_handle) = sim_input();

    let client = match FrameClient::new(FrameLoopConfig::default()) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Running live client for {} ticks", frames);
    match client.run(sim, input, HeadlessSurface::new(), SystemClock::new()) {
        Ok(report) => error!("Frame client returned unexpectedly: {:?}", report.exit),
        Err(e) => error!("Frame client failed: {}", e),
    }
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();

    // Initialize logging (RUST_LOG overrides --verbose)
    let level = match (args.json, args.verbose) {
        (true, _) => Level::WARN,
        (false, true) => Level::DEBUG,
        (false, false) => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    if !args.json {
        info!("framelock scenario harness v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    if args.live {
        run_live(args.frames);
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: steady, burst, quit_mid_drain, sim_stop, clock_wrap, all");
            std::process::exit(1);
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 || args.seeds > 1 {
            eprintln!("Error: --export only supports a single scenario and seed");
            std::process::exit(1);
        }

        let result = ScenarioRunner::new(base_seed)
            .with_frames(args.frames)
            .run(scenarios[0]);

        match TraceExport::from_result(&result).write_to_file(export_path) {
            Ok(()) => info!("Exported {} frames to {}", result.ticks.len(), export_path),
            Err(e) => {
                error!("Failed to write export: {}", e);
                std::process::exit(1);
            }
        }

        report(&result, args.json);
        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    // Run scenarios
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed).with_frames(args.frames);

        for scenario in &scenarios {
            let result = runner.run(*scenario);
            report(&result, args.json);
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode summary: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

fn report(result: &ScenarioResult, json: bool) {
    if json {
        return;
    }
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED - {} frames, {} updates, {} inputs",
            result.scenario.name(),
            result.seed,
            result.metrics.frames,
            result.metrics.updates_applied,
            result.metrics.inputs_forwarded
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}
