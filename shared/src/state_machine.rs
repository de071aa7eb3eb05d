//! Health Check State Machine
//!
//! Each periodic check (liveness probe, stream watchdog) walks the same cycle:
//! ```text
//! Idle -> Checking -> { Healthy, Degraded }
//! ```
//! A settled check only leaves its state on the next tick. There is no
//! separate recovery-confirmation state: a degraded check recovers when the
//! next scheduled run passes.

/// State of one periodic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Not yet run, or the last tick was skipped
    Idle,
    /// A tick is in progress
    Checking,
    /// The last completed tick passed
    Healthy,
    /// The last completed tick failed
    Degraded,
}

/// Events that drive a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckEvent {
    /// Scheduled tick fired and the check will run
    TickStarted,
    /// Tick fired but the precondition did not hold
    Skipped,
    /// The check passed
    Passed,
    /// The check failed
    Failed,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success(CheckState),
    /// A degraded check passed again
    Recovered,
    /// A previously healthy or unknown check failed
    Degraded,
    /// Transition was invalid from current state
    Invalid { from: CheckState, event: CheckEvent },
}

/// State machine for a single periodic check
#[derive(Debug)]
pub struct CheckStateMachine {
    current_state: CheckState,
    /// Outcome of the last completed tick, kept across skipped ticks
    last_settled: CheckState,
}

impl Default for CheckStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: CheckState::Idle,
            last_settled: CheckState::Idle,
        }
    }

    /// Get current state
    pub fn state(&self) -> CheckState {
        self.current_state
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: CheckEvent) -> TransitionResult {
        use CheckEvent::*;
        use CheckState::*;

        match (self.current_state, event) {
            (Idle | Healthy | Degraded, TickStarted) => {
                self.current_state = Checking;
                TransitionResult::Success(Checking)
            }
            (Idle | Healthy | Degraded, Skipped) => {
                self.current_state = Idle;
                TransitionResult::Success(Idle)
            }
            (Checking, Passed) => {
                let previous = std::mem::replace(&mut self.last_settled, Healthy);
                self.current_state = Healthy;
                if previous == Degraded {
                    TransitionResult::Recovered
                } else {
                    TransitionResult::Success(Healthy)
                }
            }
            (Checking, Failed) => {
                let previous = std::mem::replace(&mut self.last_settled, Degraded);
                self.current_state = Degraded;
                if previous == Degraded {
                    TransitionResult::Success(Degraded)
                } else {
                    TransitionResult::Degraded
                }
            }
            (from, event) => TransitionResult::Invalid { from, event },
        }
    }
}
