//! Height ingest: sources of internal/network chain heights and the poller
//! thread that pumps them onto the control channel.

pub mod poller;
pub mod script;
pub mod simulated;

use crate::core::errors::Result;
use crate::monitor::sync_tracker::HeightSample;

/// One height observation headed for the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightEvent {
    /// Local node height with its observation time.
    Internal(HeightSample),
    /// Network tip height.
    Network(i64),
}

/// Anything that can be polled for fresh heights.
pub trait HeightSource: Send {
    /// Short identifier used in logs and ingest errors.
    fn name(&self) -> &'static str;

    /// Fetch whatever is new since the last poll. An empty vector means
    /// nothing changed.
    fn poll(&mut self) -> Result<Vec<HeightEvent>>;

    /// True once the source will never yield again.
    fn is_exhausted(&self) -> bool {
        false
    }
}
