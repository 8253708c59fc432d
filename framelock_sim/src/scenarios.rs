//! Frame-sync scenarios.

use serde::Serialize;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScenarioId {
    /// FL-001: Poisson update stream, quit after N frames
    Steady,

    /// FL-002: Updates queued before start and in bursts afterwards
    Burst,

    /// FL-003: Quit arrives while the worker is draining a slow burst
    QuitMidDrain,

    /// FL-004: `tick` asks to stop on its third call
    SimStop,

    /// FL-005: Tick counter rolls over during the run
    ClockWrap,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Steady,
            ScenarioId::Burst,
            ScenarioId::QuitMidDrain,
            ScenarioId::SimStop,
            ScenarioId::ClockWrap,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "steady",
            ScenarioId::Burst => "burst",
            ScenarioId::QuitMidDrain => "quit_mid_drain",
            ScenarioId::SimStop => "sim_stop",
            ScenarioId::ClockWrap => "clock_wrap",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "Exponential update arrivals and input noise, graceful quit",
            ScenarioId::Burst => "5 updates queued before start, bursts later; each frame sees a settled state",
            ScenarioId::QuitMidDrain => "Quit during a slow drain; every taken token is acknowledged",
            ScenarioId::SimStop => "tick returns false on the 3rd call; no further token emitted",
            ScenarioId::ClockWrap => "32-bit tick counter wraps; every dt stays small and non-negative",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady" | "fl-001" => Ok(ScenarioId::Steady),
            "burst" | "fl-002" => Ok(ScenarioId::Burst),
            "quit_mid_drain" | "quitmiddrain" | "fl-003" => Ok(ScenarioId::QuitMidDrain),
            "sim_stop" | "simstop" | "fl-004" => Ok(ScenarioId::SimStop),
            "clock_wrap" | "clockwrap" | "fl-005" => Ok(ScenarioId::ClockWrap),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
