//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use wallet_sync_status::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, StatusError};

// Monitor
pub use crate::monitor::ewma::{BlockRateEstimator, RateEstimate, RateTrend};
pub use crate::monitor::sync_tracker::{
    AutoOpen, HeightSample, SuppressReason, SyncState, SyncTracker, UNKNOWN,
};
pub use crate::monitor::time_left::TimeLeft;

// Modal
pub use crate::modal::content::{DialogCapabilities, DialogContent, DialogKind, DialogRegistry};
pub use crate::modal::dialogs::builtin_registry;
pub use crate::modal::orchestrator::{
    CloseOutcome, ModalOrchestrator, ModalPolicy, ModalRequest, ModalSession, SessionProbe,
};

// Ingest
pub use crate::ingest::{HeightEvent, HeightSource};

// Runtime
pub use crate::control::loop_main::{RunSummary, Runtime, StopReason, run_live, run_replay};
pub use crate::control::signals::ShutdownFlag;
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
pub use crate::ui::model::{StatusCmd, StatusModel, StatusMsg};
