//! JSONL session scripts.
//!
//! One step per line, blank lines and `#` comments ignored:
//!
//! ```text
//! {"at_ms": 0,     "op": "network", "height": 300}
//! {"at_ms": 0,     "op": "internal", "height": 100}
//! {"at_ms": 60000, "op": "internal", "height": 150}
//! {"at_ms": 61000, "op": "open", "kind": "create_wallet", "force_open": true}
//! {"at_ms": 62000, "op": "cancel"}
//! ```
//!
//! `at_ms` is relative to the replay start and must not decrease.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::core::errors::{Result, StatusError};
use crate::ingest::{HeightEvent, HeightSource};
use crate::modal::content::DialogKind;
use crate::modal::orchestrator::ModalRequest;
use crate::monitor::sync_tracker::HeightSample;

/// What a script step does.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    Internal {
        height: i64,
    },
    Network {
        height: i64,
    },
    /// User-initiated open.
    Open {
        kind: DialogKind,
        #[serde(default)]
        payload: Option<Value>,
        #[serde(default = "default_force_open")]
        force_open: bool,
        #[serde(default)]
        closable: Option<bool>,
    },
    /// Escape key.
    Cancel,
    /// Programmatic close.
    Close,
    EnableClose {
        enabled: bool,
    },
}

const fn default_force_open() -> bool {
    true
}

impl ScriptOp {
    /// The modal request for an `open` step.
    #[must_use]
    pub fn open_request(&self) -> Option<ModalRequest> {
        let Self::Open {
            kind,
            payload,
            force_open,
            closable,
        } = self
        else {
            return None;
        };
        Some(ModalRequest {
            kind: kind.clone(),
            payload: payload.clone(),
            force_open: *force_open,
            closable: *closable,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub op: ScriptOp,
}

impl ScriptStep {
    /// Absolute time of this step for a replay starting at `start`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn timestamp(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + Duration::milliseconds(self.at_ms as i64)
    }

    /// Height event for height steps, `None` for user actions.
    #[must_use]
    pub fn height_event(&self, start: DateTime<Utc>) -> Option<HeightEvent> {
        match self.op {
            ScriptOp::Internal { height } => Some(HeightEvent::Internal(HeightSample::new(
                height,
                self.timestamp(start),
            ))),
            ScriptOp::Network { height } => Some(HeightEvent::Network(height)),
            _ => None,
        }
    }
}

/// Parse a whole script. Errors name the offending 1-based line.
pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    let mut last_at = 0_u64;
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step: ScriptStep =
            serde_json::from_str(line).map_err(|e| StatusError::ScriptParse {
                line: idx + 1,
                details: e.to_string(),
            })?;
        if step.at_ms < last_at {
            return Err(StatusError::ScriptParse {
                line: idx + 1,
                details: format!("at_ms {} goes backwards (previous {last_at})", step.at_ms),
            });
        }
        last_at = step.at_ms;
        steps.push(step);
    }
    Ok(steps)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let text = fs::read_to_string(path).map_err(|source| StatusError::io(path, source))?;
    parse_script(&text)
}

/// Height-only view of a script, one step per poll. User actions are
/// skipped; use [`parse_script`] directly to replay those.
#[derive(Debug)]
pub struct ScriptSource {
    steps: VecDeque<ScriptStep>,
    start: DateTime<Utc>,
}

impl ScriptSource {
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>, start: DateTime<Utc>) -> Self {
        Self {
            steps: steps.into(),
            start,
        }
    }

    pub fn from_path(path: &Path, start: DateTime<Utc>) -> Result<Self> {
        Ok(Self::new(load_script(path)?, start))
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl HeightSource for ScriptSource {
    fn name(&self) -> &'static str {
        "script"
    }

    fn poll(&mut self) -> Result<Vec<HeightEvent>> {
        while let Some(step) = self.steps.pop_front() {
            if let Some(event) = step.height_event(self.start) {
                return Ok(vec![event]);
            }
        }
        Ok(Vec::new())
    }

    fn is_exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}
