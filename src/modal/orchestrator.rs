//! Single-slot modal orchestrator.
//!
//! At most one dialog is mounted at a time. Opening a dialog always tears down
//! the previous instance before the new one is instantiated, so content never
//! observes a sibling. Close requests from the user are gated by policy and by
//! the closability resolved when the session was opened.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::core::config::ModalConfig;
use crate::core::errors::{Result, StatusError};
use crate::modal::content::{DialogContent, DialogKind, DialogRegistry};

// ──────────────────── requests ────────────────────

/// A request to display a dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalRequest {
    pub kind: DialogKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Carried through to the session; the orchestrator does not gate on it.
    pub force_open: bool,
    /// Per-request closability override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closable: Option<bool>,
}

impl ModalRequest {
    #[must_use]
    pub const fn new(kind: DialogKind) -> Self {
        Self {
            kind,
            payload: None,
            force_open: false,
            closable: None,
        }
    }

    /// Request flagged as forced, as issued by explicit user actions.
    #[must_use]
    pub const fn forced(kind: DialogKind) -> Self {
        Self {
            kind,
            payload: None,
            force_open: true,
            closable: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub const fn with_closable(mut self, closable: bool) -> Self {
        self.closable = Some(closable);
        self
    }
}

/// Read-only view of whether a dialog is currently shown.
pub trait SessionProbe {
    fn is_active(&self) -> bool;
}

/// Probe with a fixed answer, for exercising the tracker without a slot.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedProbe(pub bool);

#[cfg(test)]
impl SessionProbe for FixedProbe {
    fn is_active(&self) -> bool {
        self.0
    }
}

// ──────────────────── sessions ────────────────────

/// Monotonic identity of a mounted dialog instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct InstanceHandle(u64);

impl InstanceHandle {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The currently displayed dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalSession {
    pub kind: DialogKind,
    pub handle: InstanceHandle,
    pub closable: bool,
    pub force_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Whether the payload was handed to the content.
    pub data_delivered: bool,
}

/// Result of a successful [`ModalOrchestrator::open`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOutcome {
    pub session: ModalSession,
    /// Session that was torn down to make room, if any.
    pub replaced: Option<ModalSession>,
}

/// Who asked for a dialog to go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Programmatic,
    UserCancel,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Programmatic => "programmatic",
            Self::UserCancel => "user_cancel",
        })
    }
}

/// Result of a close attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    Closed {
        session: ModalSession,
        reason: CloseReason,
    },
    /// Nothing was mounted.
    NoSession,
    /// The mounted session resolved to non-closable.
    NotClosable,
    /// User-initiated closing is switched off by policy.
    Disabled,
}

impl CloseOutcome {
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Policy knobs for closing and progress rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalPolicy {
    pub default_closable: bool,
    pub enable_close: bool,
    pub close_on_escape: bool,
    pub completion_message: String,
}

impl Default for ModalPolicy {
    fn default() -> Self {
        Self::from(&ModalConfig::default())
    }
}

impl From<&ModalConfig> for ModalPolicy {
    fn from(config: &ModalConfig) -> Self {
        Self {
            default_closable: config.default_closable,
            enable_close: config.enable_close,
            close_on_escape: config.close_on_escape,
            completion_message: config.completion_message.clone(),
        }
    }
}

/// Render sync progress for dialog content.
#[must_use]
pub fn format_progress(progress: f64, completion_message: &str) -> String {
    if progress >= 100.0 {
        completion_message.to_string()
    } else {
        format!("{progress:.2} %")
    }
}

// ──────────────────── orchestrator ────────────────────

struct Mounted {
    session: ModalSession,
    content: Box<dyn DialogContent>,
}

/// Owns the single dialog slot.
pub struct ModalOrchestrator {
    registry: DialogRegistry,
    policy: ModalPolicy,
    slot: Option<Mounted>,
    next_handle: u64,
    last_progress: Option<f64>,
}

impl fmt::Debug for ModalOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalOrchestrator")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("session", &self.session())
            .field("last_progress", &self.last_progress)
            .finish_non_exhaustive()
    }
}

impl ModalOrchestrator {
    #[must_use]
    pub fn new(registry: DialogRegistry, policy: ModalPolicy) -> Self {
        Self {
            registry,
            policy,
            slot: None,
            next_handle: 1,
            last_progress: None,
        }
    }

    /// Show the requested dialog, replacing whatever is mounted.
    ///
    /// An unregistered kind is rejected before the slot is touched, so the
    /// current dialog stays up.
    pub fn open(&mut self, request: ModalRequest) -> Result<OpenOutcome> {
        if !self.registry.contains(&request.kind) {
            return Err(StatusError::UnknownDialog {
                kind: request.kind.to_string(),
            });
        }

        let replaced = self.take_and_teardown();

        let Some((mut content, capabilities)) = self.registry.instantiate(&request.kind) else {
            return Err(StatusError::UnknownDialog {
                kind: request.kind.to_string(),
            });
        };

        let data_delivered = match (&request.payload, capabilities.accepts_data) {
            (Some(payload), true) => {
                content.set_data(payload);
                true
            }
            _ => false,
        };
        if let Some(progress) = self.last_progress {
            content.set_progress(&format_progress(progress, &self.policy.completion_message));
        }

        let closable = request
            .closable
            .or(capabilities.closable)
            .unwrap_or(self.policy.default_closable);
        let handle = InstanceHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);

        let session = ModalSession {
            kind: request.kind,
            handle,
            closable,
            force_open: request.force_open,
            payload: request.payload,
            data_delivered,
        };
        self.slot = Some(Mounted {
            session: session.clone(),
            content,
        });
        Ok(OpenOutcome { session, replaced })
    }

    /// Hide and tear down the mounted dialog unconditionally.
    pub fn close(&mut self) -> CloseOutcome {
        self.take_and_teardown()
            .map_or(CloseOutcome::NoSession, |session| CloseOutcome::Closed {
                session,
                reason: CloseReason::Programmatic,
            })
    }

    /// User cancel (Escape). Honors policy and session closability.
    pub fn request_close(&mut self) -> CloseOutcome {
        let Some(mounted) = &self.slot else {
            return CloseOutcome::NoSession;
        };
        if !self.policy.enable_close || !self.policy.close_on_escape {
            return CloseOutcome::Disabled;
        }
        if !mounted.session.closable {
            return CloseOutcome::NotClosable;
        }
        self.take_and_teardown()
            .map_or(CloseOutcome::NoSession, |session| CloseOutcome::Closed {
                session,
                reason: CloseReason::UserCancel,
            })
    }

    /// Forward sync progress to the mounted dialog. Returns the rendered
    /// text when a dialog received it.
    pub fn push_progress(&mut self, progress: f64) -> Option<String> {
        self.last_progress = Some(progress);
        let text = format_progress(progress, &self.policy.completion_message);
        let mounted = self.slot.as_mut()?;
        mounted.content.set_progress(&text);
        Some(text)
    }

    pub fn set_enable_close(&mut self, enabled: bool) {
        self.policy.enable_close = enabled;
    }

    #[must_use]
    pub fn policy(&self) -> &ModalPolicy {
        &self.policy
    }

    #[must_use]
    pub fn registry(&self) -> &DialogRegistry {
        &self.registry
    }

    #[must_use]
    pub fn session(&self) -> Option<&ModalSession> {
        self.slot.as_ref().map(|m| &m.session)
    }

    #[must_use]
    pub fn active_kind(&self) -> Option<&DialogKind> {
        self.session().map(|s| &s.kind)
    }

    #[must_use]
    pub fn content(&self) -> Option<&dyn DialogContent> {
        self.slot.as_ref().map(|m| m.content.as_ref())
    }

    /// Last progress value pushed, whether or not a dialog received it.
    #[must_use]
    pub const fn last_progress(&self) -> Option<f64> {
        self.last_progress
    }

    #[must_use]
    pub fn progress_text(&self) -> Option<String> {
        self.last_progress
            .map(|p| format_progress(p, &self.policy.completion_message))
    }

    fn take_and_teardown(&mut self) -> Option<ModalSession> {
        let mut mounted = self.slot.take()?;
        mounted.content.teardown();
        Some(mounted.session)
    }
}

impl SessionProbe for ModalOrchestrator {
    fn is_active(&self) -> bool {
        self.slot.is_some()
    }
}
