//! Alert Journal
//!
//! Alerts are appended as JSON lines to `alerts_<YYYYMMDDHH>.jsonl` under a
//! configured directory, one file per UTC hour. A dedicated thread owns the
//! files; request handlers only serialize and `try_send` into a bounded
//! channel, so a slow disk drops lines instead of stalling ingestion.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::telemetry::JOURNAL_DROPPED;

pub const DEFAULT_JOURNAL_QUEUE: usize = 10_000;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("journal I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn journal writer: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("journal writer panicked")]
    WriterPanicked,
}

/// Cloneable producer side of the journal
#[derive(Clone, Debug)]
pub struct AlertJournal {
    tx: Sender<String>,
}

/// Writer thread handle; join after every [`AlertJournal`] clone is dropped.
#[derive(Debug)]
pub struct JournalWorker {
    handle: thread::JoinHandle<Result<u64, JournalError>>,
}

impl AlertJournal {
    /// Create `dir` if needed and start the writer thread.
    pub fn spawn(dir: impl Into<PathBuf>, queue: usize) -> Result<(Self, JournalWorker), JournalError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| JournalError::Io {
            path: dir.clone(),
            source,
        })?;

        let (tx, rx) = bounded::<String>(queue.max(1));
        let handle = thread::Builder::new()
            .name("netguard-journal".into())
            .spawn(move || run_writer(dir, rx))
            .map_err(JournalError::Spawn)?;

        Ok((Self { tx }, JournalWorker { handle }))
    }

    /// Queue one record. Returns false when it was dropped.
    pub fn append<T: Serialize>(&self, record: &T) -> bool {
        let mut line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Alert not serializable, skipping journal");
                return false;
            }
        };
        line.push('\n');

        match self.tx.try_send(line) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                JOURNAL_DROPPED.inc();
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Journal writer is gone, alert not persisted");
                false
            }
        }
    }
}

impl JournalWorker {
    /// Wait for the writer to drain and flush; returns the number of lines written.
    pub fn join(self) -> Result<u64, JournalError> {
        self.handle.join().map_err(|_| JournalError::WriterPanicked)?
    }
}

fn run_writer(dir: PathBuf, rx: Receiver<String>) -> Result<u64, JournalError> {
    info!(dir = %dir.display(), "Alert journal active.");
    let mut writer = HourlyWriter::new(dir);
    let mut written = 0u64;

    while let Ok(line) = rx.recv() {
        let hour = Utc::now().format("%Y%m%d%H").to_string();
        writer.write_line(&hour, &line)?;
        written += 1;
    }

    writer.flush()?;
    info!(written, "Alert journal stopped.");
    Ok(written)
}

/// Appends to the file of the hour it is given, reopening when the hour changes
struct HourlyWriter {
    dir: PathBuf,
    current: Option<(String, BufWriter<File>)>,
}

impl HourlyWriter {
    fn new(dir: PathBuf) -> Self {
        Self { dir, current: None }
    }

    fn path_for(dir: &Path, hour: &str) -> PathBuf {
        dir.join(format!("alerts_{hour}.jsonl"))
    }

    fn write_line(&mut self, hour: &str, line: &str) -> Result<(), JournalError> {
        let rotate = !matches!(&self.current, Some((h, _)) if h == hour);
        if rotate {
            self.flush()?;
            let path = Self::path_for(&self.dir, hour);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| JournalError::Io {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), "Journal file opened");
            self.current = Some((hour.to_string(), BufWriter::with_capacity(64 * 1024, file)));
        }

        if let Some((hour, buffer)) = self.current.as_mut() {
            buffer.write_all(line.as_bytes()).map_err(|source| JournalError::Io {
                path: Self::path_for(&self.dir, hour),
                source,
            })?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        if let Some((hour, buffer)) = self.current.as_mut() {
            buffer.flush().map_err(|source| JournalError::Io {
                path: Self::path_for(&self.dir, hour),
                source,
            })?;
        }
        Ok(())
    }
}
