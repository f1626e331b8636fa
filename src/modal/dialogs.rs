//! Built-in dialog content for the wallet front-end.

use serde_json::Value;

use crate::modal::content::{DialogCapabilities, DialogContent, DialogKind, DialogRegistry};

static SYNCING_KIND: DialogKind = DialogKind::SYNCING;

/// Sync progress dialog. Shows the latest formatted progress line.
#[derive(Debug, Clone, Default)]
pub struct SyncingDialog {
    progress: Option<String>,
    torn_down: bool,
}

impl SyncingDialog {
    #[must_use]
    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }
}

impl DialogContent for SyncingDialog {
    fn kind(&self) -> &DialogKind {
        &SYNCING_KIND
    }

    fn set_progress(&mut self, text: &str) {
        if !self.torn_down {
            self.progress = Some(text.to_string());
        }
    }

    fn teardown(&mut self) {
        self.torn_down = true;
    }

    fn describe(&self) -> String {
        match &self.progress {
            Some(text) => format!("Synchronizing with the network: {text}"),
            None => "Synchronizing with the network".to_string(),
        }
    }
}

/// Generic wallet form (create, encrypt, unlock, cold stake, daemon notice).
#[derive(Debug, Clone)]
pub struct FormDialog {
    kind: DialogKind,
    title: &'static str,
    data: Option<Value>,
}

impl FormDialog {
    #[must_use]
    pub const fn new(kind: DialogKind, title: &'static str) -> Self {
        Self {
            kind,
            title,
            data: None,
        }
    }

    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl DialogContent for FormDialog {
    fn kind(&self) -> &DialogKind {
        &self.kind
    }

    fn set_data(&mut self, payload: &Value) {
        self.data = Some(payload.clone());
    }

    fn teardown(&mut self) {
        self.data = None;
    }

    fn describe(&self) -> String {
        match &self.data {
            Some(Value::Object(map)) if !map.is_empty() => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                format!("{} ({})", self.title, keys.join(", "))
            }
            _ => self.title.to_string(),
        }
    }
}

const FORMS: [(DialogKind, &str, DialogCapabilities); 5] = [
    (
        DialogKind::CREATE_WALLET,
        "Create wallet",
        DialogCapabilities::WITH_DATA,
    ),
    (
        DialogKind::ENCRYPT_WALLET,
        "Encrypt wallet",
        DialogCapabilities::WITH_DATA,
    ),
    (
        DialogKind::UNLOCK_WALLET,
        "Unlock wallet",
        DialogCapabilities::WITH_DATA,
    ),
    (
        DialogKind::COLD_STAKE,
        "Cold staking",
        DialogCapabilities::WITH_DATA,
    ),
    (
        DialogKind::DAEMON,
        "Node connection lost",
        DialogCapabilities::PLAIN.closable(false),
    ),
];

/// Registry with the syncing dialog and every wallet form registered.
#[must_use]
pub fn builtin_registry() -> DialogRegistry {
    let mut registry = DialogRegistry::new();
    registry.register(DialogKind::SYNCING, DialogCapabilities::PLAIN, || {
        Box::new(SyncingDialog::default())
    });
    for (kind, title, capabilities) in FORMS {
        let k = kind.clone();
        registry.register(kind, capabilities, move || {
            Box::new(FormDialog::new(k.clone(), title))
        });
    }
    registry
}
