//! Telemetry persistence
//!
//! Features:
//! - `;`-delimited CSV rendering for gaze samples, blink events and stage events
//! - Append-only log sinks with rollback of partially written batches
//! - Atomic overwrite (tmp → rename) for the end-of-session summary

pub mod log_sink;
pub mod rows;

pub use log_sink::{AppendLog, LogSink, MemorySink};
pub use rows::{CsvRecord, render_header, render_rows};

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::TelemetryResult;

/// Create the data directory (and parents) if it does not exist yet
pub fn ensure_dir(dir: &Path) -> TelemetryResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        log::info!("Created data directory {}", dir.display());
    }
    Ok(())
}

/// Replace `path` with `contents`. Writes a temporary sibling first and
/// renames it over the target so a crash never leaves a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> TelemetryResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    {
        let mut file = fs::File::create(tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(tmp, path)?;
    Ok(())
}
