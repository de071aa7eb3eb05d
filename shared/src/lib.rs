//! Rover Link Shared Types
//!
//! This crate provides the command vocabulary, the device request codec and the
//! timing parameters shared by the dispatcher and the link health supervisor.

pub mod codec;
pub mod command;
pub mod outcome;
pub mod state_machine;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use codec::{CommandRequest, DeviceResponse, TargetOverride};
pub use command::{encode, Command, CommandKind, SpeedSetting};
pub use outcome::{LinkError, Outcome};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing parameters for the control link
pub mod timing {
    /// Response budget for a dispatched command
    pub const COMMAND_TIMEOUT_MS: u64 = 5000;

    /// Fixed delay before a critical command is re-issued
    pub const RETRY_BACKOFF_MS: u64 = 1000;

    /// Response budget for a liveness probe
    pub const PROBE_TIMEOUT_MS: u64 = 2000;

    /// Liveness probe period
    pub const PROBE_INTERVAL_MS: u64 = 15000;

    /// Stream freshness check period
    pub const STREAM_CHECK_INTERVAL_MS: u64 = 10000;

    /// Consecutive stale checks before the stream is restarted
    pub const STALE_CHECK_THRESHOLD: u32 = 1;

    /// Pause between tearing down and re-opening the stream on restart
    pub const STREAM_RESTART_DELAY_MS: u64 = 500;

    /// Delay before re-opening a stream that ended with an error
    pub const STREAM_ERROR_RETRY_MS: u64 = 3000;

    /// Period of the "system running" status line
    pub const STATUS_HEARTBEAT_INTERVAL_MS: u64 = 30000;

    /// Maximum number of retained status log entries
    pub const STATUS_LOG_CAPACITY: usize = 50;
}
