//! Common types crossing the framelock collaborator boundaries.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coarse classification of an input event.
///
/// The dispatch loop only branches on the class, never on the concrete kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventClass {
    /// Ends the client (window closed, quit requested).
    Terminal,

    /// High-frequency motion that only matters to drawing code.
    DrawRelevant,

    /// Everything else; logged and forwarded.
    Informational,
}

/// Concrete input event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// The user asked the application to exit.
    Quit,

    /// Continuous pointer movement.
    PointerMotion {
        /// Pointer x in surface pixels
        x: i32,
        /// Pointer y in surface pixels
        y: i32,
    },

    /// A key changed state.
    Key {
        /// Platform key code
        code: u32,
        /// True on press, false on release
        pressed: bool,
    },

    /// The surface was resized.
    WindowResized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },

    /// Keyboard focus gained or lost.
    FocusChanged(bool),

    /// An event the core has no name for.
    Other(String),
}

impl EventKind {
    /// Returns the class the dispatch loop acts on.
    pub fn class(&self) -> EventClass {
        match self {
            EventKind::Quit => EventClass::Terminal,
            EventKind::PointerMotion { .. } => EventClass::DrawRelevant,
            EventKind::Key { .. }
            | EventKind::WindowResized { .. }
            | EventKind::FocusChanged(_)
            | EventKind::Other(_) => EventClass::Informational,
        }
    }

    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Quit => "quit",
            EventKind::PointerMotion { .. } => "pointer_motion",
            EventKind::Key { .. } => "key",
            EventKind::WindowResized { .. } => "window_resized",
            EventKind::FocusChanged(_) => "focus_changed",
            EventKind::Other(_) => "other",
        }
    }
}

/// An immutable, timestamped input record.
///
/// Moved by value from the event pump into the dispatch loop; the pump never
/// sees it again after enqueueing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Source timestamp in the input subsystem's millisecond ticks (wrapping)
    pub timestamp_ms: u32,

    /// Event payload
    pub kind: EventKind,
}

impl InputEvent {
    /// Creates a new event.
    pub fn new(timestamp_ms: u32, kind: EventKind) -> Self {
        Self { timestamp_ms, kind }
    }

    /// Convenience constructor for a quit event.
    pub fn quit(timestamp_ms: u32) -> Self {
        Self::new(timestamp_ms, EventKind::Quit)
    }

    /// Returns the event class.
    pub fn class(&self) -> EventClass {
        self.kind.class()
    }
}

/// Per-frame information handed to the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Zero-based frame number
    pub frame: u64,

    /// Wall time elapsed since the previous frame
    pub dt: Duration,

    /// Accumulated logical time in milliseconds
    pub logical_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classes() {
        assert_eq!(EventKind::Quit.class(), EventClass::Terminal);
        assert_eq!(
            EventKind::PointerMotion { x: 1, y: 2 }.class(),
            EventClass::DrawRelevant
        );
        assert_eq!(
            EventKind::Key { code: 27, pressed: true }.class(),
            EventClass::Informational
        );
        assert_eq!(EventKind::FocusChanged(false).class(), EventClass::Informational);
        assert_eq!(EventKind::Other("joy".into()).class(), EventClass::Informational);
    }

    #[test]
    fn test_input_event_serde() {
        let event = InputEvent::new(1234, EventKind::WindowResized { width: 800, height: 600 });
        let json = serde_json::to_string(&event).unwrap();
        let back: InputEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(back, event);
        assert_eq!(back.class(), EventClass::Informational);
    }
}
