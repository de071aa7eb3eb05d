//! Command dispatch for the rover control link
//!
//! This module handles:
//! - Issuing commands to the device endpoint under a fixed deadline
//! - Counting in-flight commands for the link supervisor
//! - Classifying each attempt as success, failure or timeout
//! - Re-issuing critical commands until they are delivered

mod dispatcher;
mod in_flight;
mod timeout;

pub use dispatcher::{CommandDispatcher, DispatchPolicy};
pub use in_flight::InFlightCounter;
pub use timeout::DispatchAttempt;
