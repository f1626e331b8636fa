#![forbid(unsafe_code)]

//! Wallet sync status: the live status layer a desktop wallet shows while its
//! node catches up with the network.
//!
//! Two components do the work:
//! 1. **Sync tracker**: turns internal/network height samples into progress,
//!    pace and ETA, and decides when the syncing dialog should open by itself
//! 2. **Modal orchestrator**: keeps at most one dialog mounted, tears down the
//!    previous one before mounting the next, and gates user close requests
//!
//! Around them sit the ingest sources (scripted replay, simulated chain), an
//! Elm-style status surface, the single-threaded control loop and a JSONL
//! activity log.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use wallet_sync_status::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use wallet_sync_status::core::config::Config;
//! use wallet_sync_status::monitor::sync_tracker::{HeightSample, SyncTracker};
//! ```

pub mod prelude;

pub mod control;
pub mod core;
pub mod ingest;
pub mod logger;
pub mod modal;
pub mod monitor;
pub mod ui;
