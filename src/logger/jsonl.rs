//! JSONL logger: append-only line-delimited JSON activity records.
//!
//! Each line is a self-contained JSON object assembled in memory and written
//! with a single `write_all`, so concurrent tails never see partial lines.
//!
//! Fallback chain:
//! 1. Primary file path
//! 2. Optional fallback path
//! 3. stderr with `[MDS-JSONL]` prefix
//! 4. Silent discard (a step must never fail because of logging)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{MdsError, Result};

/// Severity level for log events and console lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Activity event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CleanupStart,
    TargetRemoved,
    TargetRemovalFailed,
    CleanupComplete,
    CleanupSkipped,
    SpaceReport,
    Error,
}

/// A single JSONL log entry; all fields optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Cleanup level in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Runner image (`ImageOS/ImageVersion`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Removal target label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_hosted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_platform: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_gib: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_gib: Option<u64>,
    /// Signed: another process may consume space while removal runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freed_gib: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_gib: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            level: None,
            image: None,
            label: None,
            path: None,
            github_hosted: None,
            supported_platform: None,
            before_gib: None,
            after_gib: None,
            freed_gib: None,
            available_gib: None,
            duration_ms: None,
            ok: None,
            error_code: None,
            error_message: None,
            config_hash: None,
            details: None,
        }
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Fallback,
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Optional fallback path (e.g. on a different filesystem).
    pub fallback_path: Option<PathBuf>,
}

impl JsonlConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback_path: None,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback_path: Option<PathBuf>) -> Self {
        self.fallback_path = fallback_path;
        self
    }
}

/// Append-only JSONL log writer with multi-level fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl JsonlWriter {
    /// Open the JSONL log file. Falls through the degradation chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
        };
        w.try_open_primary();
        w
    }

    /// Write a single log entry as one JSONL line and flush it.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[MDS-JSONL] serialize error: {e}");
                return;
            }
        };

        self.write_line(&line);
    }

    #[cfg(test)]
    fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Fallback => "fallback",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::Normal | WriterState::Fallback => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).and_then(|()| w.flush()).is_err() {
                        self.degrade();
                        self.write_line(line);
                    }
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[MDS-JSONL] {line}");
            }
            WriterState::Discard => {}
        }
    }

    fn try_open_primary(&mut self) {
        match open_append(&self.config.path) {
            Ok(file) => {
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Normal;
            }
            Err(_) => {
                self.try_open_fallback();
            }
        }
    }

    fn try_open_fallback(&mut self) {
        if let Some(fb) = &self.config.fallback_path {
            if let Ok(file) = open_append(fb) {
                let _ = writeln!(
                    io::stderr(),
                    "[MDS-JSONL] primary path failed, using fallback: {}",
                    fb.display()
                );
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Fallback;
            } else {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[MDS-JSONL] both primary and fallback paths failed, using stderr"
                );
            }
        } else {
            self.state = WriterState::Stderr;
            let _ = writeln!(
                io::stderr(),
                "[MDS-JSONL] primary path failed and no fallback configured, using stderr"
            );
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Normal => self.try_open_fallback(),
            WriterState::Fallback => {
                self.state = WriterState::Stderr;
                let _ = writeln!(io::stderr(), "[MDS-JSONL] fallback write failed, using stderr");
            }
            WriterState::Stderr => self.state = WriterState::Discard,
            WriterState::Discard => {}
        }
    }
}

/// Open or create a file for appending, creating parent directories.
fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| MdsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| MdsError::io(path, source))
}

/// Format current UTC time as ISO 8601.
fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
