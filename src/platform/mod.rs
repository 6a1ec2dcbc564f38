//! Platform abstraction layer
//!
//! Stand-ins for the headset and engine so a session can run natively:
//! - Simulated eye tracker (gaze, blinks, tracking loss)
//! - Puzzle board (stage content and raycast scene)
//! - Scripted participant (hover and trigger input)
//! - Log-backed timer widgets

pub mod simulated;

pub use simulated::{LogDisplay, Participant, PuzzleBoard, SharedBoard, SimulatedEyeTracker};
