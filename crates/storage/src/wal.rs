// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of local events.
//!
//! One JSON object per line: `{"seq": N, "event": {...}}`. Sequence numbers
//! are strictly increasing. A line that fails to parse marks the end of the
//! valid log; everything from that line on is treated as a torn write.

use crate::backup::rotate_bak_path;
use cp_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAL unusable after a write that could not be rolled back; reopen it")]
    Poisoned,
}

/// Injected I/O failures for tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Half the buffer reaches the file, then the write fails.
    PartialWrite,
    /// The whole buffer is written but the sync fails.
    Sync,
    /// As `Sync`, and cutting the file back fails too.
    SyncAndRollback,
}

/// A single log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only event log backed by a single file.
pub struct Wal {
    path: PathBuf,
    file: File,
    write_seq: u64,
    buffer: Vec<u8>,
    buffered: usize,
    poisoned: bool,
    #[cfg(test)]
    fault: Option<Fault>,
}

impl Wal {
    /// Open (or create) the log at `path`.
    ///
    /// `base_seq` is the sequence already covered by a snapshot; new entries
    /// continue after whichever is larger, the snapshot or the log's tail.
    /// A corrupt tail is moved aside to a `.bak` file and the valid prefix
    /// is rewritten in place.
    pub fn open(path: &Path, base_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (entries, corrupt) = if path.exists() { scan(path)? } else { (Vec::new(), false) };

        if corrupt {
            let bak = rotate_bak_path(path);
            warn!(
                path = %path.display(),
                backup = %bak.display(),
                valid_entries = entries.len(),
                "corrupt WAL tail, keeping valid prefix"
            );
            fs::rename(path, &bak)?;
            write_entries(path, &entries)?;
        }

        let last_seq = entries.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            write_seq: last_seq.max(base_seq),
            buffer: Vec::new(),
            buffered: 0,
            poisoned: false,
            #[cfg(test)]
            fault: None,
        })
    }

    /// Buffer an event and return its sequence number.
    ///
    /// Nothing is durable until [`Wal::flush`] returns.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }
        let seq = self.write_seq + 1;
        let entry = WalEntry { seq, event: event.clone() };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.buffer.extend_from_slice(&line);
        self.write_seq = seq;
        self.buffered += 1;
        Ok(seq)
    }

    /// Write buffered entries and sync them to disk.
    ///
    /// On failure the buffered entries are dropped and the file is cut back
    /// to its length before the write, so their sequence numbers are free
    /// again. If the file cannot be cut back the log is poisoned.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }
        if self.buffer.is_empty() {
            return Ok(());
        }
        let len = match self.file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.discard_buffer();
                return Err(e.into());
            }
        };
        if let Err(e) = self.write_buffer() {
            self.roll_back(len);
            return Err(e.into());
        }
        self.buffer.clear();
        self.buffered = 0;
        Ok(())
    }

    fn write_buffer(&mut self) -> io::Result<()> {
        #[cfg(test)]
        if let Some(fault) = self.fault {
            let written = match fault {
                Fault::PartialWrite => self.buffer.len() / 2,
                Fault::Sync | Fault::SyncAndRollback => self.buffer.len(),
            };
            self.file.write_all(&self.buffer[..written])?;
            return Err(io::Error::other("injected write failure"));
        }
        self.file.write_all(&self.buffer)?;
        self.file.sync_data()
    }

    fn roll_back(&mut self, len: u64) {
        match self.cut_to(len) {
            Ok(()) => self.discard_buffer(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed WAL write not rolled back");
                self.poisoned = true;
                self.buffer.clear();
                self.buffered = 0;
            }
        }
    }

    fn cut_to(&mut self, len: u64) -> io::Result<()> {
        #[cfg(test)]
        if self.fault.take() == Some(Fault::SyncAndRollback) {
            return Err(io::Error::other("injected truncate failure"));
        }
        self.file.set_len(len)?;
        self.file.sync_data()
    }

    /// Drop buffered entries that were never flushed.
    fn discard_buffer(&mut self) {
        self.write_seq -= self.buffered as u64;
        self.buffer.clear();
        self.buffered = 0;
    }

    /// Sequence number of the most recent append.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushed entries with `seq > after`, stopping at the first unreadable line.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let (entries, _) = scan(&self.path)?;
        Ok(entries.into_iter().filter(|e| e.seq > after).collect())
    }

    /// Rewrite the log keeping only entries with `seq >= keep_from`.
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<(), WalError> {
        self.flush()?;
        let (entries, _) = scan(&self.path)?;
        let kept: Vec<_> = entries.into_iter().filter(|e| e.seq >= keep_from).collect();

        let tmp = self.path.with_extension("tmp");
        write_entries(&tmp, &kept)?;
        fs::rename(&tmp, &self.path)?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }
}

/// Read the valid prefix of a log file. The flag reports a corrupt tail.
fn scan(path: &Path) -> Result<(Vec<WalEntry>, bool), WalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut last_seq = 0;

    for line in reader.split(b'\n') {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<WalEntry>(&line) {
            Ok(entry) if entry.seq > last_seq => {
                last_seq = entry.seq;
                entries.push(entry);
            }
            _ => return Ok((entries, true)),
        }
    }
    Ok((entries, false))
}

fn write_entries(path: &Path, entries: &[WalEntry]) -> Result<(), WalError> {
    let mut file = File::create(path)?;
    for entry in entries {
        serde_json::to_writer(&mut file, entry)?;
        file.write_all(b"\n")?;
    }
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
