//! Control loop and shutdown signalling.

pub mod loop_main;
pub mod signals;
