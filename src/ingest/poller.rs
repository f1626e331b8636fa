//! Poller thread: drives a [`HeightSource`] at a fixed interval and forwards
//! what it yields onto the control channel.

#![allow(missing_docs)]

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::control::signals::ShutdownFlag;
use crate::core::errors::{Result, StatusError};
use crate::ingest::{HeightEvent, HeightSource};

/// What the poller reports to the control loop.
#[derive(Debug)]
pub enum PollEvent {
    Heights(Vec<HeightEvent>),
    /// A poll failed. Tracker state is untouched. The poller keeps going
    /// unless the error is not retryable, in which case `Exhausted` follows.
    Failed {
        source: &'static str,
        error: StatusError,
    },
    /// The source will never yield again.
    Exhausted { source: &'static str },
}

/// Start polling `source` every `interval` until shutdown, source exhaustion,
/// a non-retryable poll error, or the receiving side hanging up. `wrap` turns poller output into the
/// control loop's message type.
pub fn spawn_poller<S, T, F>(
    mut source: S,
    interval: Duration,
    shutdown: ShutdownFlag,
    tx: Sender<T>,
    wrap: F,
) -> Result<thread::JoinHandle<()>>
where
    S: HeightSource + 'static,
    T: Send + 'static,
    F: Fn(PollEvent) -> T + Send + 'static,
{
    let name = source.name();
    thread::Builder::new()
        .name(format!("wss-poll-{name}"))
        .spawn(move || {
            while !shutdown.is_set() {
                let started = Instant::now();
                let mut fatal = false;
                let event = match source.poll() {
                    Ok(events) if events.is_empty() => None,
                    Ok(events) => Some(PollEvent::Heights(events)),
                    Err(error) => {
                        fatal = !error.is_retryable();
                        Some(PollEvent::Failed {
                            source: source.name(),
                            error,
                        })
                    }
                };
                if let Some(event) = event
                    && tx.send(wrap(event)).is_err()
                {
                    return;
                }
                if fatal || source.is_exhausted() {
                    let _ = tx.send(wrap(PollEvent::Exhausted {
                        source: source.name(),
                    }));
                    return;
                }
                shutdown.sleep_unless_set(interval.saturating_sub(started.elapsed()));
            }
        })
        .map_err(|e| StatusError::Runtime {
            details: format!("failed to spawn {name} poller: {e}"),
        })
}
