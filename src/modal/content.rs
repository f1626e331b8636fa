//! Dialog content seam: symbolic kinds, the content trait, and the
//! registration-time capability registry.

#![allow(missing_docs)]

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Symbolic identifier of a dialog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogKind(Cow<'static, str>);

impl DialogKind {
    /// Sync progress dialog, auto-opened when the node falls behind.
    pub const SYNCING: Self = Self(Cow::Borrowed("syncing"));
    pub const CREATE_WALLET: Self = Self(Cow::Borrowed("create_wallet"));
    pub const ENCRYPT_WALLET: Self = Self(Cow::Borrowed("encrypt_wallet"));
    pub const UNLOCK_WALLET: Self = Self(Cow::Borrowed("unlock_wallet"));
    pub const COLD_STAKE: Self = Self(Cow::Borrowed("cold_stake"));
    /// Node connection problem notice.
    pub const DAEMON: Self = Self(Cow::Borrowed("daemon"));

    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(Cow::Owned(kind.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DialogKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Mounted dialog content. Rendering is the embedder's concern; the
/// orchestrator only drives this lifecycle surface.
pub trait DialogContent {
    fn kind(&self) -> &DialogKind;

    /// Receive the open request's payload. Only called when the registration
    /// declared [`DialogCapabilities::accepts_data`].
    fn set_data(&mut self, _payload: &Value) {}

    /// Receive formatted sync progress text.
    fn set_progress(&mut self, _text: &str) {}

    /// Release resources before the instance is dropped.
    fn teardown(&mut self) {}

    /// One-line textual summary, used by terminal front-ends.
    fn describe(&self) -> String {
        self.kind().to_string()
    }
}

/// Capabilities fixed when a dialog kind is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialogCapabilities {
    /// Whether instances receive the open request's payload.
    pub accepts_data: bool,
    /// Closability override; `None` defers to the orchestrator policy.
    pub closable: Option<bool>,
}

impl DialogCapabilities {
    /// Plain content: no payload, policy-default closability.
    pub const PLAIN: Self = Self {
        accepts_data: false,
        closable: None,
    };

    /// Content that consumes the open request's payload.
    pub const WITH_DATA: Self = Self {
        accepts_data: true,
        closable: None,
    };

    #[must_use]
    pub const fn closable(mut self, closable: bool) -> Self {
        self.closable = Some(closable);
        self
    }
}

type DialogFactory = Box<dyn Fn() -> Box<dyn DialogContent>>;

struct Registration {
    capabilities: DialogCapabilities,
    factory: DialogFactory,
}

/// Registry of mountable dialog kinds.
#[derive(Default)]
pub struct DialogRegistry {
    entries: HashMap<DialogKind, Registration>,
}

impl fmt::Debug for DialogRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl DialogRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `kind`. Returns the capabilities
    /// of the replaced registration, if any.
    pub fn register<F>(
        &mut self,
        kind: DialogKind,
        capabilities: DialogCapabilities,
        factory: F,
    ) -> Option<DialogCapabilities>
    where
        F: Fn() -> Box<dyn DialogContent> + 'static,
    {
        self.entries
            .insert(
                kind,
                Registration {
                    capabilities,
                    factory: Box::new(factory),
                },
            )
            .map(|previous| previous.capabilities)
    }

    #[must_use]
    pub fn contains(&self, kind: &DialogKind) -> bool {
        self.entries.contains_key(kind)
    }

    #[must_use]
    pub fn capabilities(&self, kind: &DialogKind) -> Option<DialogCapabilities> {
        self.entries.get(kind).map(|r| r.capabilities)
    }

    /// Registered kinds, sorted for stable output.
    #[must_use]
    pub fn kinds(&self) -> Vec<&DialogKind> {
        let mut kinds: Vec<&DialogKind> = self.entries.keys().collect();
        kinds.sort();
        kinds
    }

    /// Build a fresh instance of `kind`.
    pub(crate) fn instantiate(
        &self,
        kind: &DialogKind,
    ) -> Option<(Box<dyn DialogContent>, DialogCapabilities)> {
        self.entries
            .get(kind)
            .map(|r| ((r.factory)(), r.capabilities))
    }
}
