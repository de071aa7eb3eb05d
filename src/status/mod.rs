//! Status log
//!
//! Bounded, most-recent-first record of human-readable events for whatever
//! surface presents link status to the operator. Nothing reads it to make
//! control decisions.

mod log;

pub use log::{LogEntry, Severity, StatusLog};
