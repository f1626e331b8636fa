//! Elm-style state for the wallet status surface.
//!
//! [`StatusModel`] owns the tracker and the modal orchestrator. Everything that
//! happens arrives as a [`StatusMsg`]; the update function answers with a
//! [`StatusCmd`] for the runtime to execute. No I/O happens here.

use crate::core::config::Config;
use crate::core::errors::StatusError;
use crate::ingest::HeightEvent;
use crate::ingest::poller::PollEvent;
use crate::logger::activity::ActivityEvent;
use crate::modal::content::DialogRegistry;
use crate::modal::dialogs::builtin_registry;
use crate::modal::orchestrator::{ModalOrchestrator, ModalPolicy, ModalRequest};
use crate::monitor::sync_tracker::{SuppressReason, SyncTracker};

// ──────────────────── model ────────────────────

/// Complete state of one status session.
#[derive(Debug)]
pub struct StatusModel {
    pub tracker: SyncTracker,
    pub modal: ModalOrchestrator,
    /// Push sync percentage into the mounted dialog after every sample.
    pub forward_progress: bool,
    /// Quit once every height source reports exhaustion.
    pub stop_when_exhausted: bool,
    /// Sources still expected to produce heights.
    pub live_sources: usize,
    /// Last suppression reason logged, so repeats are not re-logged.
    pub last_suppression: Option<SuppressReason>,
    /// Most recent user-facing notice (rejected close, unknown dialog, ...).
    pub notice: Option<String>,
    pub ingest_errors: u64,
    pub dialogs_opened: u64,
    pub tick: u64,
    pub quit: bool,
}

impl StatusModel {
    /// Model with the built-in dialogs registered.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, builtin_registry())
    }

    #[must_use]
    pub fn with_registry(config: &Config, registry: DialogRegistry) -> Self {
        Self {
            tracker: SyncTracker::new(config),
            modal: ModalOrchestrator::new(registry, ModalPolicy::from(&config.modal)),
            forward_progress: config.sync.forward_progress,
            stop_when_exhausted: true,
            live_sources: 0,
            last_suppression: None,
            notice: None,
            ingest_errors: 0,
            dialogs_opened: 0,
            tick: 0,
            quit: false,
        }
    }
}

// ──────────────────── messages ────────────────────

/// Inputs to [`crate::ui::update::update`].
#[derive(Debug)]
pub enum StatusMsg {
    /// Periodic redraw.
    Tick,
    /// Height observations from an ingest source.
    Heights(Vec<HeightEvent>),
    /// A source failed to poll.
    IngestFailed {
        source: &'static str,
        error: StatusError,
    },
    /// A source finished.
    SourceExhausted { source: &'static str },
    /// Explicit user open; normally `force_open`.
    UserOpen(ModalRequest),
    /// User asked to see sync progress.
    OpenSyncing,
    /// Escape key.
    Cancel,
    /// Programmatic close.
    Close,
    SetEnableClose(bool),
    Quit,
}

impl From<PollEvent> for StatusMsg {
    fn from(event: PollEvent) -> Self {
        match event {
            PollEvent::Heights(events) => Self::Heights(events),
            PollEvent::Failed { source, error } => Self::IngestFailed { source, error },
            PollEvent::Exhausted { source } => Self::SourceExhausted { source },
        }
    }
}

// ──────────────────── commands ────────────────────

/// Side-effects requested by the update function.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusCmd {
    None,
    /// Append to the activity log.
    Log(ActivityEvent),
    /// State visible to the user changed.
    Render,
    /// Stop the control loop.
    Quit,
    Batch(Vec<Self>),
}

impl StatusCmd {
    /// Collapse a list of commands into the smallest equivalent command.
    #[must_use]
    pub fn batch(mut cmds: Vec<Self>) -> Self {
        cmds.retain(|c| *c != Self::None);
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Every command in execution order, batches expanded.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
