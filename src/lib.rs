//! FormFusion - eye-tracking telemetry for a VR puzzle session
//!
//! Core modules:
//! - `sim`: Frame-driven session logic (gaze recorder, stage sequencer, selection)
//! - `persistence`: CSV logs with append-only flushes and atomic summaries
//! - `platform`: Simulated headset, scene and participant for native runs
//! - `settings`: JSON session settings

pub mod error;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::{TelemetryError, TelemetryResult};
pub use settings::Settings;

/// Session configuration constants
pub mod consts {
    /// Seconds between periodic telemetry flushes
    pub const FLUSH_INTERVAL_SECS: f64 = 10.0;
    /// Countdown per stage
    pub const DEFAULT_STAGE_DURATION_SECS: f64 = 15.0;
    pub const DEFAULT_STAGE_COUNT: usize = 5;

    /// Host loop defaults (typical headset refresh)
    pub const DEFAULT_FRAME_RATE: f64 = 90.0;
    pub const DEFAULT_SESSION_LENGTH_SECS: f64 = 600.0;
    /// Frames kept running after the last stage so trailing gaze is captured
    pub const COMPLETION_TAIL_SECS: f64 = 1.0;

    /// Telemetry files
    pub const DEFAULT_DATA_DIR: &str = "data";
    pub const GAZE_LOG_FILE: &str = "GazeHitData.csv";
    pub const BLINK_LOG_FILE: &str = "BlinkEvents.csv";
    pub const LEVEL_LOG_FILE: &str = "LevelEvents.csv";
    pub const CSV_DELIMITER: u8 = b';';
}
