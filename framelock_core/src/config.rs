//! Configuration for the frame loop.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default wait on the input source before re-checking shutdown.
pub const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_millis(250);

/// Default capacity of the pump → dispatch input queue.
pub const DEFAULT_INPUT_QUEUE_CAPACITY: usize = 16;

/// Default frame budget (60 FPS).
pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_micros(16_667);

/// What the dispatch loop does when `tick` asks to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopPolicy {
    /// Terminate the process immediately with exit code 0. No teardown, no
    /// shutdown signal, no log line.
    ExitProcess,

    /// Hand the unacknowledged token back to the caller. Used by harnesses
    /// that need to observe the abrupt path without losing the process.
    Return,
}

/// Configuration for a frame client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameLoopConfig {
    /// Bounded wait on the input source per pump iteration
    pub input_timeout: Duration,

    /// Capacity of the input queue (pump blocks when full)
    pub input_queue_capacity: usize,

    /// Expected frame period; frames slower than twice this are logged
    pub frame_budget: Duration,

    /// Behaviour when the simulation requests termination
    pub on_simulation_stop: StopPolicy,

    /// Prefix for spawned thread names
    pub thread_prefix: String,
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            input_timeout: DEFAULT_INPUT_TIMEOUT,
            input_queue_capacity: DEFAULT_INPUT_QUEUE_CAPACITY,
            frame_budget: DEFAULT_FRAME_BUDGET,
            on_simulation_stop: StopPolicy::ExitProcess,
            thread_prefix: "framelock".to_string(),
        }
    }
}

impl FrameLoopConfig {
    /// Sets the input wait timeout.
    pub fn with_input_timeout(mut self, timeout: Duration) -> Self {
        self.input_timeout = timeout;
        self
    }

    /// Sets the input queue capacity.
    pub fn with_input_queue_capacity(mut self, capacity: usize) -> Self {
        self.input_queue_capacity = capacity;
        self
    }

    /// Sets the frame budget.
    pub fn with_frame_budget(mut self, budget: Duration) -> Self {
        self.frame_budget = budget;
        self
    }

    /// Sets the frame budget from a target rate.
    pub fn with_target_fps(self, fps: u32) -> Self {
        let budget = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / fps
        };
        self.with_frame_budget(budget)
    }

    /// Sets the stop policy.
    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.on_simulation_stop = policy;
        self
    }

    /// Sets the thread name prefix.
    pub fn with_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }

    /// Checks the configuration for values the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_timeout.is_zero() {
            return Err(ConfigError::ZeroInputTimeout);
        }
        if self.input_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.frame_budget.is_zero() {
            return Err(ConfigError::ZeroFrameBudget);
        }
        Ok(())
    }
}
