//! Key routing for the interactive watch surface.

#![allow(missing_docs)]

use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::control::signals::ShutdownFlag;
use crate::core::errors::{Result, StatusError};
use crate::modal::content::DialogKind;
use crate::modal::orchestrator::ModalRequest;

use super::model::StatusMsg;

/// What a key press means, independent of the current model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    /// Escape: ask the mounted dialog to close.
    Cancel,
    /// Show sync progress on demand.
    OpenSyncing,
    /// Explicit open of a wallet dialog.
    Open(DialogKind),
}

impl InputAction {
    #[must_use]
    pub fn into_msg(self) -> StatusMsg {
        match self {
            Self::Quit => StatusMsg::Quit,
            Self::Cancel => StatusMsg::Cancel,
            Self::OpenSyncing => StatusMsg::OpenSyncing,
            Self::Open(kind) => StatusMsg::UserOpen(ModalRequest::forced(kind)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

pub const HELP: [HelpBinding; 7] = [
    HelpBinding {
        keys: "s",
        description: "show sync progress",
    },
    HelpBinding {
        keys: "w",
        description: "create wallet",
    },
    HelpBinding {
        keys: "e",
        description: "encrypt wallet",
    },
    HelpBinding {
        keys: "u",
        description: "unlock wallet",
    },
    HelpBinding {
        keys: "c",
        description: "cold staking",
    },
    HelpBinding {
        keys: "Esc",
        description: "close dialog",
    },
    HelpBinding {
        keys: "q",
        description: "quit",
    },
];

/// Resolve a key press. Releases and repeats are ignored.
#[must_use]
pub fn resolve_key(key: &KeyEvent) -> Option<InputAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c' | 'd')).then_some(InputAction::Quit);
    }
    match key.code {
        KeyCode::Esc => Some(InputAction::Cancel),
        KeyCode::Char('q' | 'Q') => Some(InputAction::Quit),
        KeyCode::Char('s') => Some(InputAction::OpenSyncing),
        KeyCode::Char('w') => Some(InputAction::Open(DialogKind::CREATE_WALLET)),
        KeyCode::Char('e') => Some(InputAction::Open(DialogKind::ENCRYPT_WALLET)),
        KeyCode::Char('u') => Some(InputAction::Open(DialogKind::UNLOCK_WALLET)),
        KeyCode::Char('c') => Some(InputAction::Open(DialogKind::COLD_STAKE)),
        _ => None,
    }
}

/// Read terminal key events on a background thread and forward them as
/// messages. Must run while raw mode is active.
pub fn spawn_key_reader<T, F>(
    shutdown: ShutdownFlag,
    tx: Sender<T>,
    wrap: F,
) -> Result<thread::JoinHandle<()>>
where
    T: Send + 'static,
    F: Fn(StatusMsg) -> T + Send + 'static,
{
    thread::Builder::new()
        .name("wss-keys".to_string())
        .spawn(move || {
            while !shutdown.is_set() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => return,
                }
                let Ok(Event::Key(key)) = event::read() else {
                    continue;
                };
                if let Some(action) = resolve_key(&key)
                    && tx.send(wrap(action.into_msg())).is_err()
                {
                    return;
                }
            }
        })
        .map_err(|e| StatusError::Runtime {
            details: format!("failed to spawn key reader: {e}"),
        })
}
