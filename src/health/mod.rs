//! Link Health Module
//!
//! Watches the control channel and the media stream independently: a
//! liveness probe that backs off while commands are in flight, and a
//! freshness watchdog that restarts a stalled stream.

mod freshness;
mod stream;
mod supervisor;

pub use freshness::{FreshnessVerdict, StreamFreshnessState};
pub use stream::{HttpStreamOwner, StreamOwner};
pub use supervisor::{LinkSupervisor, ProbeReport, SupervisorConfig, SupervisorHandle, WatchdogReport};
