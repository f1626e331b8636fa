//! Append-only JSONL activity log.
//!
//! Each line is one self-contained JSON object, assembled in memory and handed
//! to `write_all` in one call so a concurrent `tail -f` never sees half a line.
//!
//! When the primary file cannot be written the writer walks down a fixed
//! chain: fallback file, then stderr with a `[WSS-JSONL]` prefix, then silent
//! discard. Logging never takes the status loop down.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::config::{LoggingConfig, PathsConfig};
use crate::core::errors::{Result, StatusError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Activity event identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SessionStart,
    SessionStop,
    SyncSample,
    NetworkHeight,
    ModalOpen,
    ModalClose,
    AutoOpenSuppressed,
    IngestError,
    ConfigLoaded,
    Error,
}

/// One JSONL line. Everything beyond `ts`, `event` and `severity` is omitted
/// when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp with milliseconds.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Local node height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_height: Option<i64>,
    /// Sync percentage at the time of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increase_per_minute: Option<f64>,
    /// Rendered remaining-time text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    /// Dialog kind involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closable: Option<bool>,
    /// Why something happened (close reason, suppression reason, stop reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Height source name for ingest events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            height: None,
            network_height: None,
            percentage: None,
            increase_per_minute: None,
            eta: None,
            dialog: None,
            instance: None,
            forced: None,
            closable: None,
            reason: None,
            source: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Where lines are currently going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

impl Sink {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Stderr => "stderr",
            Self::Discard => "discard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the active file would grow past this size.
    pub max_size_bytes: u64,
    /// Rotated generations kept as `<path>.1` .. `<path>.N`.
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
}

impl JsonlConfig {
    #[must_use]
    pub fn from_config(logging: &LoggingConfig, paths: &PathsConfig) -> Self {
        Self {
            path: paths.jsonl_log.clone(),
            fallback_path: paths.jsonl_fallback.clone(),
            max_size_bytes: logging.max_size_bytes,
            max_rotated_files: logging.max_rotated_files,
            fsync_interval_secs: logging.fsync_interval_secs,
        }
    }
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self::from_config(&LoggingConfig::default(), &PathsConfig::default())
    }
}

/// JSONL writer with size-based rotation and the degradation chain above.
pub struct JsonlWriter {
    config: JsonlConfig,
    file: Option<BufWriter<File>>,
    sink: Sink,
    bytes_written: u64,
    last_fsync: Instant,
}

impl JsonlWriter {
    /// Open the primary file, degrading as needed. Never fails.
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            file: None,
            sink: Sink::Discard,
            bytes_written: 0,
            last_fsync: Instant::now(),
        };
        let primary = writer.config.path.clone();
        if !writer.attach(&primary, Sink::Primary) {
            writer.fall_back();
        }
        writer
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[WSS-JSONL] serialize error: {e}");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }

    pub fn fsync(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
            let _ = file.get_ref().sync_data();
        }
        self.last_fsync = Instant::now();
    }

    #[must_use]
    pub const fn sink(&self) -> Sink {
        self.sink
    }

    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Return to the primary file after an earlier degradation, if possible.
    pub fn try_recover(&mut self) -> bool {
        if self.sink == Sink::Primary {
            return true;
        }
        let primary = self.config.path.clone();
        let recovered = self.attach(&primary, Sink::Primary);
        if recovered {
            let _ = writeln!(
                io::stderr(),
                "[WSS-JSONL] recovered to primary path: {}",
                primary.display()
            );
        }
        recovered
    }

    // ──────────────────── internals ────────────────────

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if matches!(self.sink, Sink::Primary | Sink::Fallback)
            && self.bytes_written + len > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.sink {
            Sink::Primary | Sink::Fallback => {
                let written = self
                    .file
                    .as_mut()
                    .is_some_and(|file| file.write_all(line.as_bytes()).is_ok());
                if written {
                    self.bytes_written += len;
                    if self.last_fsync.elapsed()
                        >= Duration::from_secs(self.config.fsync_interval_secs)
                    {
                        self.fsync();
                    }
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            Sink::Stderr => {
                let _ = write!(io::stderr(), "[WSS-JSONL] {line}");
            }
            Sink::Discard => {}
        }
    }

    fn attach(&mut self, path: &Path, sink: Sink) -> bool {
        match open_append(path) {
            Ok((file, size)) => {
                self.file = Some(BufWriter::with_capacity(64 * 1024, file));
                self.sink = sink;
                self.bytes_written = size;
                true
            }
            Err(_) => false,
        }
    }

    fn fall_back(&mut self) {
        self.file = None;
        if let Some(fallback) = self.config.fallback_path.clone()
            && self.attach(&fallback, Sink::Fallback)
        {
            let _ = writeln!(
                io::stderr(),
                "[WSS-JSONL] primary path failed, using fallback: {}",
                fallback.display()
            );
            return;
        }
        self.sink = Sink::Stderr;
        let _ = writeln!(
            io::stderr(),
            "[WSS-JSONL] no writable log file, writing to stderr"
        );
    }

    fn degrade(&mut self) {
        self.file = None;
        match self.sink {
            Sink::Primary => self.fall_back(),
            Sink::Fallback => {
                self.sink = Sink::Stderr;
                let _ = writeln!(io::stderr(), "[WSS-JSONL] fallback write failed, using stderr");
            }
            Sink::Stderr | Sink::Discard => self.sink = Sink::Discard,
        }
    }

    fn active_path(&self) -> Option<PathBuf> {
        match self.sink {
            Sink::Primary => Some(self.config.path.clone()),
            Sink::Fallback => self.config.fallback_path.clone(),
            Sink::Stderr | Sink::Discard => None,
        }
    }

    fn rotate(&mut self) {
        let Some(base) = self.active_path() else {
            return;
        };
        self.flush();
        self.file = None;

        let keep = self.config.max_rotated_files;
        if keep == 0 {
            let _ = fs::remove_file(&base);
        } else {
            let _ = fs::remove_file(rotated_name(&base, keep));
            for generation in (1..keep).rev() {
                let _ = fs::rename(
                    rotated_name(&base, generation),
                    rotated_name(&base, generation + 1),
                );
            }
            let _ = fs::rename(&base, rotated_name(&base, 1));
        }

        let sink = self.sink;
        if !self.attach(&base, sink) {
            self.degrade();
        }
    }
}

// ──────────────────── helpers ────────────────────

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| StatusError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StatusError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `activity.jsonl` -> `activity.jsonl.2`.
fn rotated_name(base: &Path, generation: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}
