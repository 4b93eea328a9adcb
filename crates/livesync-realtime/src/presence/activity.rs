//! Activity signal kinds and the acceptance throttle.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Input signals that count as user activity. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Pointer or mouse button pressed.
    PointerDown,
    /// Key pressed.
    KeyPress,
    /// Scroll.
    Scroll,
    /// Touch started.
    TouchStart,
    /// Click.
    Click,
}

impl ActivityKind {
    /// Every accepted kind.
    pub const ALL: [ActivityKind; 5] = [
        Self::PointerDown,
        Self::KeyPress,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
    ];

    /// Parse a host event name. Returns `None` for kinds outside the
    /// whitelist (e.g. `mousemove`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pointerdown" | "mousedown" => Some(Self::PointerDown),
            "keypress" | "keydown" => Some(Self::KeyPress),
            "scroll" => Some(Self::Scroll),
            "touchstart" => Some(Self::TouchStart),
            "click" => Some(Self::Click),
            _ => None,
        }
    }

    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts a signal only if `window` has elapsed since the last accepted
/// one. The first signal after construction or [`reset`](Self::reset) is
/// always accepted.
#[derive(Debug, Clone)]
pub struct ActivityThrottle {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl ActivityThrottle {
    /// Create a throttle with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Decide whether a signal at `at` is accepted, recording it if so.
    pub fn accept(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if at.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(at);
        true
    }

    /// Forget the last accepted signal.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
