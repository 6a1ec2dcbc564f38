//! Blink edge detection
//!
//! Emits an event when an eye's blink flag goes from false to true. When both
//! eyes close on the same frame a single `Both` event is emitted instead of
//! separate left and right events.

use serde::{Deserialize, Serialize};

/// Which eye(s) started a blink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlinkEye {
    Left,
    Right,
    Both,
}

impl BlinkEye {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlinkEye::Left => "Left",
            BlinkEye::Right => "Right",
            BlinkEye::Both => "Both",
        }
    }

    pub fn includes_left(&self) -> bool {
        matches!(self, BlinkEye::Left | BlinkEye::Both)
    }

    pub fn includes_right(&self) -> bool {
        matches!(self, BlinkEye::Right | BlinkEye::Both)
    }
}

/// A buffered blink onset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlinkEvent {
    pub time: f64,
    pub eye: BlinkEye,
    /// Stage index, `None` when no sequencer is attached
    pub level: Option<usize>,
}

/// Remembers last frame's blink flags
#[derive(Debug, Clone, Copy, Default)]
pub struct BlinkEdgeDetector {
    last_left: bool,
    last_right: bool,
}

impl BlinkEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this frame's flags; returns the rising edge, if any
    pub fn update(&mut self, left: bool, right: bool) -> Option<BlinkEye> {
        let left_rose = !self.last_left && left;
        let right_rose = !self.last_right && right;
        self.last_left = left;
        self.last_right = right;

        match (left_rose, right_rose) {
            (true, true) => Some(BlinkEye::Both),
            (true, false) => Some(BlinkEye::Left),
            (false, true) => Some(BlinkEye::Right),
            (false, false) => None,
        }
    }
}
