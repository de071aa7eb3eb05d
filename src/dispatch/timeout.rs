//! Deadline race for a single dispatch attempt

use rover_shared::{Command, DeviceResponse, LinkError, Outcome};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// One attempt at delivering a command, owned by the dispatcher until it settles
#[derive(Debug, Clone)]
pub struct DispatchAttempt {
    pub command: Command,
    pub started_at: Instant,
    pub deadline: Instant,
    pub attempt_number: u32,
}

impl DispatchAttempt {
    pub fn new(command: Command, attempt_number: u32, budget: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            command,
            started_at,
            deadline: started_at + budget,
            attempt_number,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Race the request against the deadline
    ///
    /// Whichever resolves first decides the result. If the deadline wins, the
    /// request future is dropped, so a late response is never observed.
    pub async fn exchange<F>(&self, request: F) -> Result<DeviceResponse, LinkError>
    where
        F: Future<Output = Result<DeviceResponse, LinkError>>,
    {
        match timeout_at(self.deadline, request).await {
            Ok(result) => result,
            Err(_) => Err(LinkError::TimeoutExpired {
                elapsed: self.elapsed(),
            }),
        }
    }

    /// Race the request and classify the answer
    pub async fn run<F>(&self, request: F) -> Outcome
    where
        F: Future<Output = Result<DeviceResponse, LinkError>>,
    {
        self.exchange(request)
            .await
            .and_then(DeviceResponse::classify)
            .into()
    }
}
