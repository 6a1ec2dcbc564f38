//! Append-only destinations for flushed rows

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::TelemetryResult;

/// Where a flush writes its rows
pub trait LogSink {
    /// Append a batch of rendered rows. On error nothing from `chunk` may
    /// remain in the log, so the batch can be retried as a whole.
    fn append(&mut self, chunk: &str) -> TelemetryResult<()>;
}

/// A CSV file opened in append mode for every batch
#[derive(Debug, Clone)]
pub struct AppendLog {
    path: PathBuf,
}

impl AppendLog {
    /// Truncate (or create) the file and write its header
    pub fn create(path: impl Into<PathBuf>, header: &str) -> TelemetryResult<Self> {
        let path = path.into();
        let mut file = File::create(&path)?;
        file.write_all(header.as_bytes())?;
        file.sync_data()?;
        Ok(Self { path })
    }

    /// Attach to an existing file without truncating it
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LogSink for AppendLog {
    fn append(&mut self, chunk: &str) -> TelemetryResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        let len_before = file.metadata()?.len();

        let written = file
            .write_all(chunk.as_bytes())
            .and_then(|_| file.sync_data());

        if let Err(e) = written {
            // Drop whatever part of the batch made it to disk
            if let Err(rollback) = file.set_len(len_before) {
                log::error!(
                    "Failed to roll back {} after write error: {}",
                    self.path.display(),
                    rollback
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryLog {
    contents: String,
    fail_writes: bool,
    appends: usize,
}

/// In-memory sink. Clones share the same buffer, so a caller can keep a
/// handle for inspection after giving one to a recorder.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Rc<RefCell<MemoryLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far
    pub fn contents(&self) -> String {
        self.inner.borrow().contents.clone()
    }

    /// Number of successful non-empty appends
    pub fn append_count(&self) -> usize {
        self.inner.borrow().appends
    }

    /// Make subsequent appends fail (simulates a full or locked disk)
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, chunk: &str) -> TelemetryResult<()> {
        let mut log = self.inner.borrow_mut();
        if log.fail_writes {
            return Err(io::Error::other("simulated write failure").into());
        }
        if !chunk.is_empty() {
            log.contents.push_str(chunk);
            log.appends += 1;
        }
        Ok(())
    }
}
