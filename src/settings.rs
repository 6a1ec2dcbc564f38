//! Session settings
//!
//! Loaded from an optional JSON file. Every field has a default, so a file
//! only needs the values it overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{TelemetryError, TelemetryResult};

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Telemetry ===
    /// Directory holding the three CSV files
    pub data_dir: PathBuf,
    /// Record gaze samples and blink events
    pub recording: bool,
    /// Seconds between periodic flushes
    pub flush_interval: f64,

    // === Stages ===
    /// Number of puzzle stages
    pub stage_count: usize,
    /// Countdown per stage (seconds)
    pub stage_duration: f64,

    // === Host harness ===
    /// Frames per second driven by the host loop
    pub frame_rate: f64,
    /// Hard stop for the session (seconds)
    pub session_length: f64,
    /// Seed for the simulated tracker and participant
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            recording: true,
            flush_interval: FLUSH_INTERVAL_SECS,

            stage_count: DEFAULT_STAGE_COUNT,
            stage_duration: DEFAULT_STAGE_DURATION_SECS,

            frame_rate: DEFAULT_FRAME_RATE,
            session_length: DEFAULT_SESSION_LENGTH_SECS,
            seed: 12345,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist. A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> TelemetryResult<Self> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> TelemetryResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Reject values the session loop cannot run with
    pub fn validate(&self) -> TelemetryResult<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TelemetryError::InvalidSettings(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        };
        positive("flush_interval", self.flush_interval)?;
        positive("stage_duration", self.stage_duration)?;
        positive("frame_rate", self.frame_rate)?;
        positive("session_length", self.session_length)?;
        Ok(())
    }

    /// Seconds per host frame
    pub fn frame_dt(&self) -> f64 {
        1.0 / self.frame_rate
    }

    pub fn gaze_log_path(&self) -> PathBuf {
        self.data_dir.join(GAZE_LOG_FILE)
    }

    pub fn blink_log_path(&self) -> PathBuf {
        self.data_dir.join(BLINK_LOG_FILE)
    }

    pub fn level_log_path(&self) -> PathBuf {
        self.data_dir.join(LEVEL_LOG_FILE)
    }
}
