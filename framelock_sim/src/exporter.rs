//! JSON exporter for frame traces.
//!
//! Writes one scenario run as JSON: per-frame timing and drain data plus the
//! final counters, for offline inspection.

use crate::error::HarnessError;
use crate::runner::{ScenarioMetrics, ScenarioResult};
use crate::simulation::TickRecord;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of the trace.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    /// Zero-based tick index
    pub frame: u64,

    /// Delta handed to `tick`, in milliseconds
    pub dt_ms: u64,

    /// Updates applied since the previous tick
    pub applied: u64,

    /// Updates still queued when `tick` ran
    pub pending: u64,
}

impl FrameRecord {
    /// Builds the record for tick `frame`.
    pub fn from_tick(frame: u64, tick: &TickRecord) -> Self {
        Self {
            frame,
            dt_ms: tick.dt.as_millis() as u64,
            applied: tick.applied_since_last,
            pending: tick.pending_at_tick,
        }
    }
}

/// Complete trace export.
#[derive(Debug, Clone, Serialize)]
pub struct TraceExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Final verdict
    pub passed: bool,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Final counters
    pub metrics: ScenarioMetrics,

    /// One entry per tick
    pub frames: Vec<FrameRecord>,
}

impl TraceExport {
    /// Builds an export from a finished run.
    pub fn from_result(result: &ScenarioResult) -> Self {
        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            passed: result.passed,
            failure_reason: result.failure_reason.clone(),
            metrics: result.metrics,
            frames: result
                .ticks
                .iter()
                .enumerate()
                .map(|(i, tick)| FrameRecord::from_tick(i as u64, tick))
                .collect(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), HarnessError> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
