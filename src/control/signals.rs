//! Graceful shutdown: a shared flag set by SIGINT/SIGTERM (when the `daemon`
//! feature is on), by the quit key, or programmatically. Loops poll it rather
//! than blocking on signals.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep while waiting on the flag.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cloneable shutdown flag shared by the control loop and worker threads.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag wired to SIGINT and SIGTERM. Registration failures are reported
    /// on stderr and otherwise ignored.
    #[cfg(feature = "daemon")]
    #[must_use]
    pub fn with_os_signals() -> Self {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let shutdown = Self::new();
        for (signal, name) in [(SIGTERM, "SIGTERM"), (SIGINT, "SIGINT")] {
            if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&shutdown.flag)) {
                eprintln!("[WSS-SIGNAL] failed to register {name}: {e}");
            }
        }
        shutdown
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Sleep for `duration`, waking early once the flag is set. Returns
    /// whether shutdown was requested.
    pub fn sleep_unless_set(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_set() {
                return true;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            thread::sleep(left.min(SLEEP_SLICE));
        }
    }
}
