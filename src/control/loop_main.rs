//! Control loop: the only thread that touches [`StatusModel`].
//!
//! Pollers, the key reader and the signal flag all feed one crossbeam channel
//! of [`StatusMsg`]. The loop applies each message through the pure update
//! function and executes the returned commands: log lines go to the activity
//! logger, renders are coalesced to one per message, and `Quit` ends the run.

#![allow(missing_docs)]

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::Serialize;

use crate::control::signals::ShutdownFlag;
use crate::core::config::Config;
use crate::ingest::script::{ScriptOp, ScriptStep};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::monitor::sync_tracker::SyncState;
use crate::ui::model::{StatusCmd, StatusModel, StatusMsg};
use crate::ui::update::update;

// ──────────────────── outcome ────────────────────

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Quit key or an explicit quit message.
    UserQuit,
    /// Every height source finished.
    SourcesExhausted,
    /// SIGINT/SIGTERM or a programmatic shutdown request.
    Shutdown,
    /// All senders hung up.
    ChannelClosed,
    /// A replay ran out of steps.
    ScriptEnd,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserQuit => "user_quit",
            Self::SourcesExhausted => "sources_exhausted",
            Self::Shutdown => "shutdown",
            Self::ChannelClosed => "channel_closed",
            Self::ScriptEnd => "script_end",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub samples: u64,
    pub dialogs_opened: u64,
    pub ingest_errors: u64,
    pub final_state: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_dialog: Option<String>,
}

// ──────────────────── runtime ────────────────────

/// Model plus the executors for the commands update hands back.
pub struct Runtime<R: FnMut(&StatusModel)> {
    model: StatusModel,
    logger: ActivityLoggerHandle,
    renderer: R,
    started: Instant,
    last_msg_exhausted: bool,
}

impl<R: FnMut(&StatusModel)> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("model", &self.model)
            .field("logger_enabled", &self.logger.is_enabled())
            .finish_non_exhaustive()
    }
}

impl<R: FnMut(&StatusModel)> Runtime<R> {
    pub fn new(model: StatusModel, logger: ActivityLoggerHandle, renderer: R) -> Self {
        Self {
            model,
            logger,
            renderer,
            started: Instant::now(),
            last_msg_exhausted: false,
        }
    }

    /// Log the session header. `mode` names the entry point ("replay", ...).
    pub fn begin(&mut self, mode: &str, config: &Config) {
        self.logger.send(ActivityEvent::SessionStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: config.stable_hash().unwrap_or_default(),
            mode: mode.to_string(),
        });
        (self.renderer)(&self.model);
    }

    /// Apply one message. Returns `false` once the model wants to stop.
    pub fn dispatch(&mut self, msg: StatusMsg) -> bool {
        self.last_msg_exhausted = matches!(msg, StatusMsg::SourceExhausted { .. });
        let cmd = update(&mut self.model, msg);
        self.execute(cmd)
    }

    fn execute(&mut self, cmd: StatusCmd) -> bool {
        let mut render = false;
        let mut keep_going = true;
        for cmd in cmd.flatten() {
            match cmd {
                StatusCmd::Log(event) => self.logger.send(event),
                StatusCmd::Render => render = true,
                StatusCmd::Quit => keep_going = false,
                StatusCmd::None | StatusCmd::Batch(_) => {}
            }
        }
        if render {
            (self.renderer)(&self.model);
        }
        keep_going && !self.model.quit
    }

    #[must_use]
    pub const fn model(&self) -> &StatusModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut StatusModel {
        &mut self.model
    }

    /// Stop reason implied by the last message that ended the run.
    fn quit_reason(&self) -> StopReason {
        if self.last_msg_exhausted {
            StopReason::SourcesExhausted
        } else {
            StopReason::UserQuit
        }
    }

    /// Log the session trailer and hand back the summary.
    pub fn finish(self, stop_reason: StopReason) -> RunSummary {
        let state = self.model.tracker.current_state();
        self.logger.send(ActivityEvent::SessionStopped {
            reason: stop_reason.to_string(),
            samples: state.samples,
            uptime_secs: self.started.elapsed().as_secs(),
        });
        RunSummary {
            stop_reason,
            samples: state.samples,
            dialogs_opened: self.model.dialogs_opened,
            ingest_errors: self.model.ingest_errors,
            final_dialog: self.model.modal.active_kind().map(ToString::to_string),
            final_state: state,
        }
    }
}

// ──────────────────── entry points ────────────────────

/// Message for one script step. Height steps are stamped relative to `start`.
#[must_use]
pub fn step_message(step: &ScriptStep, start: DateTime<Utc>) -> StatusMsg {
    if let Some(event) = step.height_event(start) {
        return StatusMsg::Heights(vec![event]);
    }
    match &step.op {
        ScriptOp::Cancel => StatusMsg::Cancel,
        ScriptOp::Close => StatusMsg::Close,
        ScriptOp::EnableClose { enabled } => StatusMsg::SetEnableClose(*enabled),
        op => op
            .open_request()
            .map_or(StatusMsg::Tick, StatusMsg::UserOpen),
    }
}

/// Replay a parsed script synchronously. Deterministic: timestamps come from
/// the script, not the wall clock.
pub fn run_replay<R: FnMut(&StatusModel)>(
    config: &Config,
    steps: &[ScriptStep],
    start: DateTime<Utc>,
    logger: ActivityLoggerHandle,
    renderer: R,
) -> RunSummary {
    let mut runtime = Runtime::new(StatusModel::new(config), logger, renderer);
    runtime.begin("replay", config);
    for step in steps {
        if !runtime.dispatch(step_message(step, start)) {
            let reason = runtime.quit_reason();
            return runtime.finish(reason);
        }
    }
    runtime.finish(StopReason::ScriptEnd)
}

/// Drive the runtime from a channel until quit, shutdown or hang-up. A
/// `Tick` is injected whenever `tick` elapses without a message.
pub fn run_live<R: FnMut(&StatusModel)>(
    mut runtime: Runtime<R>,
    rx: &Receiver<StatusMsg>,
    shutdown: &ShutdownFlag,
    tick: Duration,
) -> RunSummary {
    let reason = loop {
        if shutdown.is_set() {
            break StopReason::Shutdown;
        }
        let msg = match rx.recv_timeout(tick) {
            Ok(msg) => msg,
            Err(RecvTimeoutError::Timeout) => StatusMsg::Tick,
            Err(RecvTimeoutError::Disconnected) => break StopReason::ChannelClosed,
        };
        if !runtime.dispatch(msg) {
            break runtime.quit_reason();
        }
    };
    shutdown.request();
    runtime.finish(reason)
}
