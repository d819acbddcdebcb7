//! JSONL activity journal: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object. Lines are assembled in memory
//! and written atomically via `write_all` to prevent interleaved partial
//! lines when the file is being tailed by another process.
//!
//! Three-level degradation chain:
//! 1. Configured journal file
//! 2. stderr with `[SGAUGE-JOURNAL]` prefix
//! 3. Silent discard (a report must never fail because journaling did)
//!
//! A writer built from a config with `enabled = false` never touches the
//! filesystem at all.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::JournalConfig;
use crate::core::errors::{GaugeError, Result};

/// Severity level for journal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Journal event types matching the gauge activity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEvent {
    ConfigLoaded,
    ReportComplete,
    MeasureFailed,
    LimitExceeded,
    OverlapClamped,
}

/// A single journal entry. All fields optional except `ts`, `event`,
/// `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: JournalEvent,
    pub severity: Severity,
    /// Category label the event refers to (when applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Affected filesystem path (when applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Byte count the event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Duration of the operation in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Stable hash of the effective configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    /// Gauge error code if the operation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JournalEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: JournalEvent, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            category: None,
            path: None,
            bytes: None,
            duration_ms: None,
            config_hash: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Degradation state of the journal writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Journaling turned off in the configuration.
    Disabled,
    /// Writing to the configured file.
    Normal,
    /// File writes failed, writing to stderr.
    Stderr,
    /// Everything failed, silently discarding.
    Discard,
}

/// Append-only JSONL journal writer with rotation and fallback to stderr.
pub struct JournalWriter {
    config: JournalConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JournalWriter {
    /// Open the journal file. Falls through the degradation chain on failure.
    #[must_use]
    pub fn open(config: JournalConfig) -> Self {
        let enabled = config.enabled;
        let mut writer = Self {
            config,
            writer: None,
            state: WriterState::Disabled,
            bytes_written: 0,
        };
        if enabled {
            writer.state = WriterState::Discard;
            writer.try_open_primary();
        }
        writer
    }

    /// Write a single entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &JournalEntry) {
        if self.state == WriterState::Disabled {
            return;
        }
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(error) => {
                // Serialization failure is a programming error; note it and bail.
                let _ = writeln!(io::stderr(), "[SGAUGE-JOURNAL] serialize error: {error}");
                return;
            }
        };

        self.write_line(&line);
    }

    /// Flush buffers.
    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }

    /// Current degradation state.
    #[must_use]
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Disabled => "disabled",
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    /// Number of bytes written to the current file.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        // Check if rotation is needed before writing.
        if self.state == WriterState::Normal
            && self.bytes_written + line.len() as u64 > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.state {
            WriterState::Disabled => {}
            WriterState::Normal => {
                if let Some(writer) = self.writer.as_mut() {
                    if writer.write_all(line.as_bytes()).is_err() {
                        self.degrade();
                        self.write_line(line); // retry at next level
                        return;
                    }
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[SGAUGE-JOURNAL] {line}");
            }
            WriterState::Discard => {
                // Silently drop.
            }
        }
    }

    fn try_open_primary(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => {
                self.writer = Some(BufWriter::with_capacity(64 * 1024, file));
                self.state = WriterState::Normal;
                self.bytes_written = size;
            }
            Err(_) => {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[SGAUGE-JOURNAL] journal path {} unwritable, using stderr",
                    self.config.path.display()
                );
            }
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Disabled => {}
            WriterState::Normal => {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[SGAUGE-JOURNAL] journal write failed, using stderr"
                );
            }
            WriterState::Stderr => {
                self.state = WriterState::Discard;
            }
            WriterState::Discard => {}
        }
    }

    fn rotate(&mut self) {
        // Flush and drop the current file.
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
        self.writer = None;

        let base = &self.config.path;

        // Drop the oldest rotation, then shift the rest up one slot:
        // delete .3, .2→.3, .1→.2, current→.1 (for max_rotated_files = 3).
        let oldest = rotated_name(base, self.config.max_rotated_files);
        let _ = fs::remove_file(&oldest);
        for index in (1..self.config.max_rotated_files).rev() {
            let from = rotated_name(base, index);
            let to = rotated_name(base, index + 1);
            let _ = rename(&from, &to);
        }

        // Rename current → .1
        let _ = rename(base, rotated_name(base, 1));

        // Reopen a fresh file.
        match open_append(base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::with_capacity(64 * 1024, file));
                self.bytes_written = 0;
            }
            Err(_) => {
                self.degrade();
            }
        }
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    // Ensure parent directory exists.
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| GaugeError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| GaugeError::io(path, source))?;
    let size = file.metadata().map(|meta| meta.len()).unwrap_or(0);
    Ok((file, size))
}

/// Build a rotated filename: `activity.jsonl` → `activity.jsonl.3`.
fn rotated_name(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Format current UTC time as ISO 8601.
fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf) -> JournalConfig {
        JournalConfig {
            enabled: true,
            path,
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 3,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let mut writer = JournalWriter::open(config(path.clone()));

        let mut entry = JournalEntry::new(JournalEvent::ReportComplete, Severity::Info);
        entry.bytes = Some(1_234);
        writer.write_entry(&entry);
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "report_complete");
        assert_eq!(parsed["severity"], "info");
        assert_eq!(parsed["bytes"], 1_234);
    }

    #[test]
    fn multiple_entries_are_separate_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.jsonl");
        let mut writer = JournalWriter::open(config(path.clone()));

        for _ in 0..5 {
            writer.write_entry(&JournalEntry::new(JournalEvent::ReportComplete, Severity::Info));
        }
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        for line in lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut journal_config = config(path.clone());
        journal_config.max_size_bytes = 100; // tiny: force rotation after ~1 entry
        let mut writer = JournalWriter::open(journal_config);

        // Write enough entries to trigger multiple rotations.
        for _ in 0..10 {
            writer.write_entry(&JournalEntry::new(JournalEvent::ReportComplete, Severity::Info));
        }
        writer.flush();

        // Primary file should exist with recent data.
        assert!(path.exists());
        // At least one rotated file should exist.
        assert!(rotated_name(&path, 1).exists());
    }

    #[test]
    fn rotation_retains_the_configured_number_of_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retain.jsonl");
        let mut journal_config = config(path.clone());
        journal_config.max_size_bytes = 100; // tiny: force rotation after ~1 entry
        let mut writer = JournalWriter::open(journal_config);

        // Far more writes than slots, so retention reaches steady state.
        for _ in 0..20 {
            writer.write_entry(&JournalEntry::new(JournalEvent::ReportComplete, Severity::Info));
        }
        writer.flush();

        assert!(path.exists());
        for index in 1..=3 {
            assert!(
                rotated_name(&path, index).exists(),
                "rotation .{index} must survive until pushed past the cap"
            );
        }
        // Nothing beyond max_rotated_files may linger.
        assert!(!rotated_name(&path, 4).exists());
    }

    #[test]
    fn degrades_to_stderr_when_primary_unwritable() {
        // Parent is a regular file, so the journal path cannot be created
        // even by root.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let mut writer = JournalWriter::open(config(blocker.join("journal.jsonl")));

        assert_eq!(writer.state(), "stderr");
        // Must not panic; the line goes to stderr.
        writer.write_entry(&JournalEntry::new(JournalEvent::MeasureFailed, Severity::Warning));
    }

    #[test]
    fn disabled_writer_never_touches_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("off.jsonl");
        let mut journal_config = config(path.clone());
        journal_config.enabled = false;
        let mut writer = JournalWriter::open(journal_config);

        assert_eq!(writer.state(), "disabled");
        writer.write_entry(&JournalEntry::new(JournalEvent::ReportComplete, Severity::Info));
        writer.flush();

        assert!(!path.exists());
    }

    #[test]
    fn state_reports_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::open(config(dir.path().join("ok.jsonl")));
        assert_eq!(writer.state(), "normal");
    }

    #[test]
    fn entry_optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JournalWriter::open(config(path.clone()));

        writer.write_entry(&JournalEntry::new(JournalEvent::ConfigLoaded, Severity::Info));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        // None-valued fields should NOT appear in the JSON.
        assert!(!line.contains("\"category\""));
        assert!(!line.contains("\"path\""));
        assert!(!line.contains("\"bytes\""));
        assert!(!line.contains("\"error_code\""));
    }
}
