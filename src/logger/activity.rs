//! Activity logger thread.
//!
//! A dedicated thread owns the [`JsonlWriter`]. Everything else sends
//! [`ActivityEvent`]s through a bounded crossbeam channel using `try_send`, so
//! the control loop never waits on disk. Events that do not fit are counted
//! and reported as a warning line once the channel drains.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::config::Config;
use crate::core::errors::{Result, StatusError};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity, Sink};

/// Minimum spacing between attempts to win back the primary log file.
const RECOVER_EVERY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    SessionStarted {
        version: String,
        config_hash: String,
        mode: String,
    },
    SessionStopped {
        reason: String,
        samples: u64,
        uptime_secs: u64,
    },
    SyncSample {
        height: i64,
        network_height: i64,
        percentage: f64,
        increase_per_minute: f64,
        eta: Option<String>,
    },
    NetworkHeight {
        height: i64,
    },
    ModalOpened {
        kind: String,
        instance: u64,
        forced: bool,
        closable: bool,
        replaced: Option<String>,
    },
    ModalClosed {
        kind: String,
        instance: u64,
        reason: String,
    },
    AutoOpenSuppressed {
        reason: String,
        height: i64,
        network_height: i64,
    },
    IngestError {
        source: String,
        code: String,
        message: String,
    },
    ConfigLoaded {
        path: String,
        config_hash: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Stops the logger thread after flushing.
    Shutdown,
}

impl ActivityEvent {
    /// Log an error with its `WSS-nnnn` code.
    #[must_use]
    pub fn from_error(err: &StatusError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Cloneable, `Send` handle to the logger thread. A disabled handle accepts
/// and discards events.
#[derive(Debug, Clone)]
pub struct ActivityLoggerHandle {
    tx: Option<Sender<ActivityEvent>>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Handle with no logger thread behind it.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle feeding a caller-owned channel instead of the JSONL thread.
    #[must_use]
    pub fn with_sender(tx: Sender<ActivityEvent>) -> Self {
        Self {
            tx: Some(tx),
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Non-blocking send. A full channel drops the event and bumps the
    /// dropped counter; a disconnected one is ignored.
    pub fn send(&self, event: ActivityEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(TrySendError::Full(_)) = tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit. Blocks only until the sentinel
    /// is queued.
    pub fn shutdown(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ActivityEvent::Shutdown);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLoggerConfig {
    pub jsonl: JsonlConfig,
    pub channel_capacity: usize,
}

impl ActivityLoggerConfig {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            jsonl: JsonlConfig::from_config(&config.logging, &config.paths),
            channel_capacity: config.logging.channel_capacity,
        }
    }
}

/// Start the logger thread.
pub fn spawn_logger(
    config: ActivityLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let handle = ActivityLoggerHandle {
        tx: Some(tx),
        dropped_events: Arc::clone(&dropped),
    };

    let jsonl = config.jsonl;
    let join = thread::Builder::new()
        .name("wss-logger".to_string())
        .spawn(move || logger_thread_main(&rx, jsonl, &dropped))
        .map_err(|e| StatusError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<ActivityEvent>, jsonl: JsonlConfig, dropped: &AtomicU64) {
    let mut writer = JsonlWriter::open(jsonl);
    let mut last_recover = Instant::now();

    while let Ok(event) = rx.recv() {
        if writer.sink() != Sink::Primary && last_recover.elapsed() >= RECOVER_EVERY {
            writer.try_recover();
            last_recover = Instant::now();
        }

        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{lost} activity events dropped under back-pressure"));
            writer.write_entry(&warn);
        }

        let Some(entry) = to_log_entry(&event) else {
            break;
        };
        writer.write_entry(&entry);
    }

    writer.flush();
    writer.fsync();
}

/// Map an event to its JSONL line. `None` for the shutdown sentinel.
#[must_use]
pub fn to_log_entry(event: &ActivityEvent) -> Option<LogEntry> {
    let entry = match event {
        ActivityEvent::SessionStarted {
            version,
            config_hash,
            mode,
        } => {
            let mut e = LogEntry::new(EventType::SessionStart, Severity::Info);
            e.details = Some(format!("version={version} config_hash={config_hash} mode={mode}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::SessionStopped {
            reason,
            samples,
            uptime_secs,
        } => {
            let mut e = LogEntry::new(EventType::SessionStop, Severity::Info);
            e.reason = Some(reason.clone());
            e.details = Some(format!("samples={samples} uptime={uptime_secs}s"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::SyncSample {
            height,
            network_height,
            percentage,
            increase_per_minute,
            eta,
        } => {
            let mut e = LogEntry::new(EventType::SyncSample, Severity::Info);
            e.height = Some(*height);
            e.network_height = Some(*network_height);
            e.percentage = Some(*percentage);
            e.increase_per_minute = Some(*increase_per_minute);
            e.eta.clone_from(eta);
            e
        }
        ActivityEvent::NetworkHeight { height } => {
            let mut e = LogEntry::new(EventType::NetworkHeight, Severity::Info);
            e.network_height = Some(*height);
            e
        }
        ActivityEvent::ModalOpened {
            kind,
            instance,
            forced,
            closable,
            replaced,
        } => {
            let mut e = LogEntry::new(EventType::ModalOpen, Severity::Info);
            e.dialog = Some(kind.clone());
            e.instance = Some(*instance);
            e.forced = Some(*forced);
            e.closable = Some(*closable);
            e.details = replaced.as_ref().map(|r| format!("replaced={r}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::ModalClosed {
            kind,
            instance,
            reason,
        } => {
            let mut e = LogEntry::new(EventType::ModalClose, Severity::Info);
            e.dialog = Some(kind.clone());
            e.instance = Some(*instance);
            e.reason = Some(reason.clone());
            e.ok = Some(true);
            e
        }
        ActivityEvent::AutoOpenSuppressed {
            reason,
            height,
            network_height,
        } => {
            let mut e = LogEntry::new(EventType::AutoOpenSuppressed, Severity::Info);
            e.dialog = Some("syncing".to_string());
            e.reason = Some(reason.clone());
            e.height = Some(*height);
            e.network_height = Some(*network_height);
            e
        }
        ActivityEvent::IngestError {
            source,
            code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::IngestError, Severity::Warning);
            e.source = Some(source.clone());
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::ConfigLoaded { path, config_hash } => {
            let mut e = LogEntry::new(EventType::ConfigLoaded, Severity::Info);
            e.details = Some(format!("path={path} config_hash={config_hash}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::Shutdown => return None,
    };
    Some(entry)
}
