//! Command dispatcher for sending commands to the rover

use super::in_flight::InFlightCounter;
use super::timeout::DispatchAttempt;
use crate::status::{Severity, StatusLog};
use crate::transport::CommandTransport;
use rover_shared::{timing, Command, CommandRequest, Outcome, TargetOverride};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Timing used by the dispatcher
///
/// The retry backoff is fixed, not exponential: a stop that keeps failing is
/// re-sent at the same pace for as long as it takes.
#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
    pub command_timeout: Duration,
    pub retry_backoff: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(timing::COMMAND_TIMEOUT_MS),
            retry_backoff: Duration::from_millis(timing::RETRY_BACKOFF_MS),
        }
    }
}

/// Whether an attempt writes its terminal outcome to the status log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reporting {
    Status,
    Quiet,
}

/// Dispatches commands to the rover and tracks in-flight work
#[derive(Clone)]
pub struct CommandDispatcher {
    transport: Arc<dyn CommandTransport>,
    target: Arc<RwLock<TargetOverride>>,
    in_flight: Arc<InFlightCounter>,
    status: StatusLog,
    policy: DispatchPolicy,
    /// Total attempts issued, used to tag log lines
    attempts: Arc<AtomicU64>,
    /// Cleared on shutdown so pending retries stop re-issuing
    accepting: Arc<AtomicBool>,
}

impl CommandDispatcher {
    /// Create a new command dispatcher
    pub fn new(transport: Arc<dyn CommandTransport>, status: StatusLog, policy: DispatchPolicy) -> Self {
        Self {
            transport,
            target: Arc::new(RwLock::new(TargetOverride::default())),
            in_flight: Arc::new(InFlightCounter::new()),
            status,
            policy,
            attempts: Arc::new(AtomicU64::new(0)),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Replace the forwarding target attached to every request
    pub fn set_target(&self, target: TargetOverride) {
        *self.target.write().unwrap_or_else(|e| e.into_inner()) = target;
    }

    pub fn target(&self) -> TargetOverride {
        self.target.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Snapshot of commands awaiting a terminal outcome
    pub fn current_in_flight_count(&self) -> usize {
        self.in_flight.current()
    }

    /// Total attempts issued since startup, retries and probes included
    pub fn attempts_issued(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Dispatch a command and return the outcome of its first attempt
    ///
    /// A critical command that fails is re-issued in the background after the
    /// fixed backoff, again and again, until the device confirms it.
    /// Non-critical commands get exactly one attempt.
    pub async fn dispatch(&self, command: Command) -> Outcome {
        let outcome = self
            .attempt(&command, 1, self.policy.command_timeout, Reporting::Status)
            .await;

        if command.is_critical() && !outcome.is_success() {
            self.schedule_retry(command, 2, None);
        }

        outcome
    }

    /// Dispatch a command and wait until it is delivered
    ///
    /// For non-critical commands this is the same as [`dispatch`](Self::dispatch).
    /// For critical ones it resolves with the first successful retry, or with
    /// the initial failure if the dispatcher shuts down first.
    pub async fn dispatch_until_delivered(&self, command: Command) -> Outcome {
        let outcome = self
            .attempt(&command, 1, self.policy.command_timeout, Reporting::Status)
            .await;

        if outcome.is_success() || !command.is_critical() {
            return outcome;
        }

        let (delivered_tx, delivered_rx) = oneshot::channel();
        self.schedule_retry(command, 2, Some(delivered_tx));
        delivered_rx.await.unwrap_or(outcome)
    }

    /// Single attempt with a caller-supplied budget, no retry, no status entry
    ///
    /// Used for liveness probes; the caller decides what to report.
    pub async fn probe(&self, command: Command, budget: Duration) -> Outcome {
        self.attempt(&command, 1, budget, Reporting::Quiet).await
    }

    /// One-shot PING that reports the raw HTTP status and body
    pub async fn test_connection(&self) -> Outcome {
        self.status.info("Testing device connection...");

        let command = Command::ping();
        let _guard = self.in_flight.enter();
        let attempt = self.begin(&command, 1, self.policy.command_timeout);
        let request = CommandRequest::new(command.name(), &self.target());

        match attempt.exchange(self.transport.send(&request)).await {
            Ok(response) => {
                let severity = if response.is_success() {
                    Severity::Success
                } else {
                    Severity::Error
                };
                self.status
                    .append_with(severity, format!("HTTP status: {}", response.status));
                self.status.append_with(severity, format!("Response: {}", response.body));
                response.classify().into()
            }
            Err(err) => {
                self.status.error(format!("Connection test FAILED: {}", err));
                Outcome::from(Err::<String, _>(err))
            }
        }
    }

    /// Stop re-issuing failed critical commands
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            info!("[DISPATCH] Shutting down, pending retries will be dropped");
        }
    }

    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    fn begin(&self, command: &Command, attempt_number: u32, budget: Duration) -> DispatchAttempt {
        let id = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "[DISPATCH] >>> #{} {} (attempt {}, budget {}ms)",
            id,
            command,
            attempt_number,
            budget.as_millis()
        );
        DispatchAttempt::new(command.clone(), attempt_number, budget)
    }

    /// Issue one request and settle it exactly once
    async fn attempt(
        &self,
        command: &Command,
        attempt_number: u32,
        budget: Duration,
        reporting: Reporting,
    ) -> Outcome {
        let _guard = self.in_flight.enter();
        let attempt = self.begin(command, attempt_number, budget);
        let request = CommandRequest::new(command.name(), &self.target());

        let outcome = attempt.run(self.transport.send(&request)).await;

        if reporting == Reporting::Status {
            self.record(&attempt, &outcome);
        }

        outcome
    }

    fn record(&self, attempt: &DispatchAttempt, outcome: &Outcome) {
        let command = &attempt.command;
        match outcome {
            Outcome::Success(body) => {
                self.status.success(format!("{} -> {}", command, body));
            }
            Outcome::Failure(_) | Outcome::Timeout { .. } => {
                let reason = outcome
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                let line = if command.is_critical() {
                    format!(
                        "{} -> {} (attempt {}, retrying in {}ms)",
                        command,
                        reason,
                        attempt.attempt_number,
                        self.policy.retry_backoff.as_millis()
                    )
                } else {
                    format!("{} -> {}", command, reason)
                };
                self.status.error(line);
            }
        }
    }

    /// Re-issue a critical command after the backoff, as its own task
    fn schedule_retry(
        &self,
        command: Command,
        attempt_number: u32,
        delivered: Option<oneshot::Sender<Outcome>>,
    ) {
        if !self.is_accepting() {
            return;
        }

        warn!(
            "[DISPATCH] {} not delivered, retry {} in {}ms",
            command,
            attempt_number - 1,
            self.policy.retry_backoff.as_millis()
        );

        let dispatcher = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(dispatcher.policy.retry_backoff).await;

            if !dispatcher.is_accepting() {
                debug!("[DISPATCH] Dropping retry of {} after shutdown", command);
                return;
            }

            let outcome = dispatcher
                .attempt(
                    &command,
                    attempt_number,
                    dispatcher.policy.command_timeout,
                    Reporting::Status,
                )
                .await;

            if outcome.is_success() {
                info!(
                    "[DISPATCH] {} delivered on attempt {}",
                    command, attempt_number
                );
                if let Some(tx) = delivered {
                    let _ = tx.send(outcome);
                }
            } else {
                dispatcher.schedule_retry(command, attempt_number + 1, delivered);
            }
        });
    }
}
