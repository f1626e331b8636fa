//! Modal dialogs: content seam, built-in dialogs, single-slot orchestrator.

pub mod content;
pub mod dialogs;
pub mod orchestrator;
