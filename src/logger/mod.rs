//! Activity logging: append-only JSONL with rotation and graceful degradation,
//! fed by a dedicated logger thread.

pub mod activity;
pub mod jsonl;
