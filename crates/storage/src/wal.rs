// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL event write-ahead log.
//!
//! Events are durably stored before they become visible, enabling crash
//! recovery via snapshot + replay. Each entry is a single line of JSON:
//! `{"seq":N,"event":{...}}\n`.
//!
//! A torn final line (crash mid-append) is dropped and the file truncated
//! to the last complete entry. Corruption anywhere else is surfaced as
//! [`WalError::Corrupt`], which the store treats as fatal.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tend_core::Event;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in Wal operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt entry at offset {offset}: {message}")]
    Corrupt { offset: u64, message: String },
}

/// Serialization helper for writing WAL entries without cloning the event.
#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

/// Deserialization helper for reading WAL entries.
#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    event: Event,
}

/// A single WAL entry with sequence number
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// JSONL WAL for durable event storage.
///
/// Appends buffer in memory until `flush()`, which writes all buffered
/// lines and fsyncs once. The store flushes on every typed operation, so a
/// multi-event operation commits atomically with a single sync.
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Next sequence number to assign
    write_seq: u64,
    /// Sequence number of the last entry applied to materialized state
    processed_seq: u64,
    /// Buffered JSON lines waiting to be flushed (without trailing newline)
    write_buffer: Vec<Vec<u8>>,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// `processed_seq` should come from the snapshot (0 if none). Scans the
    /// file to find the highest sequence number; a torn trailing line is
    /// truncated away, any earlier parse failure is an error.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let scan = Self::scan(&file)?;
        if let Some(truncate_at) = scan.torn_offset {
            warn!(
                path = %path.display(),
                offset = truncate_at,
                "torn WAL tail detected, truncating to last complete entry",
            );
            file.set_len(truncate_at)?;
            file.sync_all()?;
        }

        Ok(Self {
            file,
            path: path.to_owned(),
            write_seq: scan.max_seq,
            processed_seq,
            write_buffer: Vec::new(),
        })
    }

    /// Scan the full file, returning the max sequence seen and the byte
    /// offset of a torn trailing line, if any.
    fn scan(file: &File) -> Result<ScanResult, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut max_seq = 0u64;
        let mut offset = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    // Non-UTF-8 tail: recoverable only at end of file
                    return Ok(ScanResult {
                        max_seq,
                        torn_offset: Some(offset),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                offset += bytes_read as u64;
                continue;
            }

            match serde_json::from_str::<WalRecord>(trimmed) {
                Ok(record) => {
                    max_seq = max_seq.max(record.seq);
                }
                Err(e) => {
                    // A partial line at EOF (no trailing newline) is a torn
                    // append; anything followed by more data is corruption.
                    let at_eof = !line.ends_with('\n');
                    if at_eof {
                        return Ok(ScanResult {
                            max_seq,
                            torn_offset: Some(offset),
                        });
                    }
                    return Err(WalError::Corrupt {
                        offset,
                        message: e.to_string(),
                    });
                }
            }

            offset += bytes_read as u64;
        }

        Ok(ScanResult {
            max_seq,
            torn_offset: None,
        })
    }

    /// Append an event to the write buffer.
    ///
    /// Returns the assigned sequence number. The event is NOT durable until
    /// `flush()` is called.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let record = WalRecordRef { seq, event };
        let json_bytes = serde_json::to_vec(&record)?;
        self.write_buffer.push(json_bytes);
        Ok(seq)
    }

    /// Flush all buffered entries to disk with a single fsync.
    ///
    /// This is the durability point: after flush returns successfully all
    /// buffered events are on disk.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }

        for mut json_bytes in self.write_buffer.drain(..) {
            json_bytes.push(b'\n');
            self.file.write_all(&json_bytes)?;
        }

        self.file.sync_all()?;
        Ok(())
    }

    /// Mark entries up to `seq` as applied to materialized state. The
    /// value is persisted via snapshots.
    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }

    /// Sequence number of the last applied entry.
    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Highest sequence number assigned so far.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Iterate over all entries after the given sequence number.
    ///
    /// Used for recovery: replaying entries the snapshot does not cover.
    pub fn entries_after(&mut self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        self.flush()?;

        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut offset = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                offset += bytes_read as u64;
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    return Err(WalError::Corrupt {
                        offset,
                        message: e.to_string(),
                    });
                }
            };

            offset += bytes_read as u64;

            if record.seq > seq {
                entries.push(WalEntry {
                    seq: record.seq,
                    event: record.event,
                });
            }
        }

        Ok(entries)
    }

    /// Truncate entries before the given sequence number.
    ///
    /// Called after checkpoint to reclaim disk space. Rewrites the WAL with
    /// only entries `>= seq` and atomically swaps it in.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;

        let kept: Vec<WalEntry> = self.entries_after(seq.saturating_sub(1))?;
        let tmp_path = self.path.with_extension("tmp");

        {
            let mut tmp_file = File::create(&tmp_path)?;
            for entry in &kept {
                let record = WalRecordRef {
                    seq: entry.seq,
                    event: &entry.event,
                };
                let mut json_bytes = serde_json::to_vec(&record)?;
                json_bytes.push(b'\n');
                tmp_file.write_all(&json_bytes)?;
            }
            tmp_file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        Ok(())
    }
}

struct ScanResult {
    max_seq: u64,
    torn_offset: Option<u64>,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
