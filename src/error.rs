//! Unified error type for telemetry, persistence and settings.
//!
//! Nothing in a running session is fatal: flush failures surface as
//! `TelemetryError` so the caller can log them and retry on the next cycle.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
