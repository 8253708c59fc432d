//! Headless rendering surface.

use crate::input::SimInputHandle;
use crate::oracle::{Access, AccessOracle};
use crate::simulation::UpdateFeed;
use framelock_env::{EnvError, FrameInfo, Surface};
use std::sync::Arc;
use tracing::debug;

/// Something the surface does right after presenting a given frame.
#[derive(Debug, Clone)]
pub enum FrameTrigger {
    /// Inject a quit event
    Quit(SimInputHandle),

    /// Push a burst of updates into the feed
    Burst(UpdateFeed, u64),

    /// Fail the present call
    Fail,
}

/// Surface that draws nothing and records every frame.
pub struct HeadlessSurface {
    oracle: Option<Arc<AccessOracle>>,
    frames: Vec<FrameInfo>,
    triggers: Vec<(u64, FrameTrigger)>,
}

impl HeadlessSurface {
    /// Creates a surface with no oracle and no triggers.
    pub fn new() -> Self {
        Self {
            oracle: None,
            frames: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Reports each present to `oracle`.
    pub fn with_oracle(mut self, oracle: Arc<AccessOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Fires `trigger` when frame `frame` (zero-based) is presented.
    /// Triggers on the same frame fire in insertion order.
    pub fn on_frame(mut self, frame: u64, trigger: FrameTrigger) -> Self {
        self.triggers.push((frame, trigger));
        self
    }

    /// Presented frames in order.
    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> Surface<S> for HeadlessSurface {
    fn present(&mut self, _sim: &S, frame: &FrameInfo) -> Result<(), EnvError> {
        let _access = self.oracle.as_ref().map(|o| o.enter(Access::Present));

        for (at, trigger) in &self.triggers {
            if *at != frame.frame {
                continue;
            }
            debug!(frame = frame.frame, ?trigger, "Firing frame trigger");
            match trigger {
                FrameTrigger::Quit(input) => {
                    input.quit(frame.logical_ms as u32).map_err(|e| EnvError::surface(e.to_string()))?
                }
                FrameTrigger::Burst(feed, count) => {
                    feed.push(*count).map_err(|e| EnvError::surface(e.to_string()))?
                }
                FrameTrigger::Fail => return Err(EnvError::surface("injected present failure")),
            }
        }

        self.frames.push(*frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::sim_input;
    use crate::simulation::ScriptedSimulation;
    use framelock_env::{EventClass, InputSource};
    use std::time::Duration;

    fn frame(n: u64) -> FrameInfo {
        FrameInfo {
            frame: n,
            dt: Duration::from_millis(16),
            logical_ms: 16 * (n + 1),
        }
    }

    #[test]
    fn test_records_frames() {
        let mut surface = HeadlessSurface::new();
        Surface::<()>::present(&mut surface, &(), &frame(0)).unwrap();
        Surface::<()>::present(&mut surface, &(), &frame(1)).unwrap();
        assert_eq!(surface.frames().len(), 2);
        assert_eq!(surface.frames()[1].logical_ms, 32);
    }

    #[test]
    fn test_quit_trigger_injects_event() {
        let (mut input, handle) = sim_input();
        let mut surface = HeadlessSurface::new().on_frame(1, FrameTrigger::Quit(handle));

        Surface::<()>::present(&mut surface, &(), &frame(0)).unwrap();
        assert!(input.wait_for_event(Duration::from_millis(1)).unwrap().is_none());

        Surface::<()>::present(&mut surface, &(), &frame(1)).unwrap();
        let event = input.wait_for_event(Duration::from_millis(1)).unwrap().unwrap();
        assert_eq!(event.class(), EventClass::Terminal);
    }

    #[test]
    fn test_burst_and_fail_triggers() {
        let (sim, feed) = ScriptedSimulation::new(AccessOracle::shared());
        let mut surface = HeadlessSurface::new()
            .on_frame(0, FrameTrigger::Burst(feed.clone(), 3))
            .on_frame(1, FrameTrigger::Fail);

        Surface::<()>::present(&mut surface, &(), &frame(0)).unwrap();
        assert_eq!(feed.sent(), 3);
        assert!(framelock_env::Simulation::has_pending(&sim));

        let err = Surface::<()>::present(&mut surface, &(), &frame(1)).unwrap_err();
        assert!(matches!(err, EnvError::SurfaceError(_)));
        assert_eq!(surface.frames().len(), 1);
    }
}
