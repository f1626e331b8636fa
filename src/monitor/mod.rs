//! Sync monitoring: height tracking, EWMA block-rate estimation, ETA
//! projection, and the ordered state broadcast.

pub mod broadcast;
pub mod ewma;
pub mod sync_tracker;
pub mod time_left;
