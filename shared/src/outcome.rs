//! Terminal outcomes and link error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Failures observed on the control link or media stream
///
/// None of these are fatal: each one is handled where it occurs and turned
/// into a status entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("HTTP {status}: {body}")]
    ProtocolFailure { status: u16, body: String },

    #[error("timed out after {}ms", elapsed.as_millis())]
    TimeoutExpired { elapsed: Duration },

    #[error("liveness probe failed: {0}")]
    SupervisorProbeFailure(Box<LinkError>),

    #[error("stream stale for {checks} check(s)")]
    StreamStale { checks: u32 },
}

/// Result of a single dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Device answered with a 2xx status
    Success(String),
    /// Network or protocol failure
    Failure(LinkError),
    /// Deadline elapsed before the device answered
    Timeout { elapsed: Duration },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Error view of a non-success outcome
    pub fn error(&self) -> Option<LinkError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err.clone()),
            Outcome::Timeout { elapsed } => Some(LinkError::TimeoutExpired { elapsed: *elapsed }),
        }
    }
}

impl From<Result<String, LinkError>> for Outcome {
    fn from(result: Result<String, LinkError>) -> Self {
        match result {
            Ok(body) => Outcome::Success(body),
            Err(LinkError::TimeoutExpired { elapsed }) => Outcome::Timeout { elapsed },
            Err(err) => Outcome::Failure(err),
        }
    }
}
