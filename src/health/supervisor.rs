//! Link Health Supervisor
//!
//! Runs independent background checks that assess whether the control
//! channel and the media stream are alive, and requests recovery when they
//! are not.

use super::freshness::{FreshnessVerdict, StreamFreshnessState};
use super::stream::StreamOwner;
use crate::dispatch::CommandDispatcher;
use crate::status::StatusLog;
use anyhow::{bail, Result};
use rover_shared::{
    state_machine::{CheckEvent, CheckState, CheckStateMachine, TransitionResult},
    timing, Command, LinkError,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periods and budgets used by the supervisor
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
    pub stream_check_interval: Duration,
    pub stale_threshold: u32,
    pub heartbeat_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_millis(timing::PROBE_INTERVAL_MS),
            probe_timeout: Duration::from_millis(timing::PROBE_TIMEOUT_MS),
            stream_check_interval: Duration::from_millis(timing::STREAM_CHECK_INTERVAL_MS),
            stale_threshold: timing::STALE_CHECK_THRESHOLD,
            heartbeat_interval: Duration::from_millis(timing::STATUS_HEARTBEAT_INTERVAL_MS),
        }
    }
}

/// Result of one liveness probe tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReport {
    /// Dispatcher was busy; nothing was sent
    Skipped { in_flight: usize },
    Healthy,
    Degraded(LinkError),
}

/// Result of one stream watchdog tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogReport {
    Fresh,
    /// Stale but below the restart threshold
    Stale,
    Restarted,
}

/// Supervises the control link and the media stream
pub struct LinkSupervisor {
    dispatcher: CommandDispatcher,
    stream: Arc<dyn StreamOwner>,
    status: StatusLog,
    config: SupervisorConfig,
    freshness: Mutex<StreamFreshnessState>,
    probe_fsm: RwLock<CheckStateMachine>,
    stream_fsm: RwLock<CheckStateMachine>,
    running: AtomicBool,
}

impl LinkSupervisor {
    pub fn new(
        dispatcher: CommandDispatcher,
        stream: Arc<dyn StreamOwner>,
        status: StatusLog,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            dispatcher,
            stream,
            status,
            freshness: Mutex::new(StreamFreshnessState::new(config.stale_threshold)),
            config,
            probe_fsm: RwLock::new(CheckStateMachine::new()),
            stream_fsm: RwLock::new(CheckStateMachine::new()),
            running: AtomicBool::new(false),
        }
    }

    pub async fn probe_state(&self) -> CheckState {
        self.probe_fsm.read().await.state()
    }

    pub async fn stream_state(&self) -> CheckState {
        self.stream_fsm.read().await.state()
    }

    pub async fn freshness(&self) -> StreamFreshnessState {
        self.freshness.lock().await.clone()
    }

    /// Run one liveness probe
    ///
    /// The tick is dropped entirely (no request, no status entry) while the
    /// dispatcher has in-flight work, so a congested channel is not loaded
    /// further. Skipped ticks are not deferred.
    pub async fn probe_tick(&self) -> ProbeReport {
        let in_flight = self.dispatcher.current_in_flight_count();
        if in_flight > 0 {
            self.probe_fsm.write().await.process_event(CheckEvent::Skipped);
            debug!("[HEALTH] Probe skipped, {} command(s) in flight", in_flight);
            return ProbeReport::Skipped { in_flight };
        }

        self.probe_fsm.write().await.process_event(CheckEvent::TickStarted);

        let outcome = self
            .dispatcher
            .probe(Command::ping(), self.config.probe_timeout)
            .await;

        let mut fsm = self.probe_fsm.write().await;
        match outcome.error() {
            None => {
                if fsm.process_event(CheckEvent::Passed) == TransitionResult::Recovered {
                    self.status.success("Device link restored");
                }
                ProbeReport::Healthy
            }
            Some(cause) => {
                fsm.process_event(CheckEvent::Failed);
                let responded = matches!(cause, LinkError::ProtocolFailure { .. });
                let err = LinkError::SupervisorProbeFailure(Box::new(cause));

                // An answer with a bad status still means the board is reachable
                if responded {
                    self.status.warning(format!("Device not responding ({})", err));
                } else {
                    self.status.error(format!("Device disconnected ({})", err));
                }
                ProbeReport::Degraded(err)
            }
        }
    }

    /// Run one stream freshness check
    pub async fn watchdog_tick(&self) -> WatchdogReport {
        self.stream_fsm.write().await.process_event(CheckEvent::TickStarted);

        let advanced = self.stream.advanced_since_last_check().await;
        let verdict = self.freshness.lock().await.observe(advanced);

        match verdict {
            FreshnessVerdict::Fresh => {
                let result = self.stream_fsm.write().await.process_event(CheckEvent::Passed);
                if result == TransitionResult::Recovered {
                    self.status.success("Video stream recovered");
                }
                WatchdogReport::Fresh
            }
            FreshnessVerdict::Stale(err) => {
                self.stream_fsm.write().await.process_event(CheckEvent::Failed);
                self.status.warning(format!("Video {}", err));
                WatchdogReport::Stale
            }
            FreshnessVerdict::Restart(err) => {
                self.stream_fsm.write().await.process_event(CheckEvent::Failed);
                warn!("[HEALTH] {}, requesting restart", err);
                self.stream.restart().await;
                WatchdogReport::Restarted
            }
        }
    }

    /// Periodic "still alive" status line
    pub fn heartbeat_tick(&self) {
        self.status.info("System running...");
    }

    /// Start the background checks
    ///
    /// Each check runs as its own task so a slow probe never delays the
    /// watchdog. They run until the returned handle is stopped.
    pub fn start(self: &Arc<Self>) -> Result<SupervisorHandle> {
        if self.running.swap(true, Ordering::SeqCst) {
            bail!("link supervisor already running");
        }

        let probe = {
            let supervisor = Arc::clone(self);
            spawn_periodic(self.config.probe_interval, move || {
                let supervisor = Arc::clone(&supervisor);
                async move {
                    supervisor.probe_tick().await;
                }
            })
        };

        let watchdog = {
            let supervisor = Arc::clone(self);
            spawn_periodic(self.config.stream_check_interval, move || {
                let supervisor = Arc::clone(&supervisor);
                async move {
                    supervisor.watchdog_tick().await;
                }
            })
        };

        let heartbeat = {
            let supervisor = Arc::clone(self);
            spawn_periodic(self.config.heartbeat_interval, move || {
                let supervisor = Arc::clone(&supervisor);
                async move { supervisor.heartbeat_tick() }
            })
        };

        info!(
            "[HEALTH] Supervisor started (probe every {}s, stream check every {}s)",
            self.config.probe_interval.as_secs(),
            self.config.stream_check_interval.as_secs()
        );

        Ok(SupervisorHandle {
            tasks: vec![probe, watchdog, heartbeat],
        })
    }
}

/// Run `tick` every `period`, first firing one period from now
fn spawn_periodic<F, Fut>(period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            tick().await;
        }
    })
}

/// Handle to stop supervision
pub struct SupervisorHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Abort every check
    pub fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
        info!("[HEALTH] Supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchPolicy;
    use crate::health::stream::scripted::ScriptedStream;
    use crate::status::Severity;
    use crate::transport::scripted::{Reply, ScriptedTransport};
    use rover_shared::DeviceResponse;

    struct Harness {
        supervisor: Arc<LinkSupervisor>,
        dispatcher: CommandDispatcher,
        transport: Arc<ScriptedTransport>,
        stream: Arc<ScriptedStream>,
        status: StatusLog,
    }

    fn harness(replies: Vec<Reply>, answers: Vec<bool>) -> Harness {
        let transport = Arc::new(ScriptedTransport::new(replies));
        let stream = Arc::new(ScriptedStream::new(answers));
        let status = StatusLog::new();
        let dispatcher =
            CommandDispatcher::new(transport.clone(), status.clone(), DispatchPolicy::default());
        let supervisor = Arc::new(LinkSupervisor::new(
            dispatcher.clone(),
            stream.clone(),
            status.clone(),
            SupervisorConfig::default(),
        ));
        Harness {
            supervisor,
            dispatcher,
            transport,
            stream,
            status,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_sent_when_idle() {
        let h = harness(vec![], vec![]);

        let report = h.supervisor.probe_tick().await;

        assert_eq!(report, ProbeReport::Healthy);
        assert_eq!(h.transport.sent(), vec!["PING".to_string()]);
        assert!(h.status.is_empty());
        assert_eq!(h.supervisor.probe_state().await, CheckState::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_skipped_while_busy() {
        let h = harness(
            vec![Reply::Delayed(
                Duration::from_secs(4),
                DeviceResponse::new(200, "OK"),
            )],
            vec![],
        );

        let pending = {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(Command::new("ALL F 150")).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let report = h.supervisor.probe_tick().await;

        assert_eq!(report, ProbeReport::Skipped { in_flight: 1 });
        assert_eq!(h.transport.call_count(), 1);
        assert!(h.status.is_empty());
        assert_eq!(h.supervisor.probe_state().await, CheckState::Idle);

        pending.await.expect("dispatch task");
        assert_eq!(h.dispatcher.current_in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_logged_without_recovery_action() {
        let h = harness(vec![Reply::refused()], vec![]);

        let report = h.supervisor.probe_tick().await;

        assert!(matches!(
            report,
            ProbeReport::Degraded(LinkError::SupervisorProbeFailure(_))
        ));
        let entries = h.status.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Error);
        assert!(entries[0].text.starts_with("Device disconnected"));

        // Liveness and stream health are independent
        assert_eq!(h.stream.restarts(), 0);
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_uses_short_budget() {
        let h = harness(
            vec![Reply::Delayed(
                Duration::from_secs(3),
                DeviceResponse::new(200, "OK"),
            )],
            vec![],
        );

        let report = h.supervisor.probe_tick().await;

        assert_eq!(
            report,
            ProbeReport::Degraded(LinkError::SupervisorProbeFailure(Box::new(
                LinkError::TimeoutExpired {
                    elapsed: Duration::from_secs(2)
                }
            )))
        );
        assert_eq!(h.dispatcher.current_in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_bad_status_is_warning_then_recovers() {
        let h = harness(vec![Reply::status(500, "ERR send failed")], vec![]);

        h.supervisor.probe_tick().await;
        assert_eq!(h.status.snapshot()[0].severity, Severity::Warning);
        assert_eq!(h.supervisor.probe_state().await, CheckState::Degraded);

        assert_eq!(h.supervisor.probe_tick().await, ProbeReport::Healthy);
        let entries = h.status.snapshot();
        assert_eq!(entries[0].text, "Device link restored");
        assert_eq!(entries[0].severity, Severity::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_stream_restarted_once() {
        let h = harness(vec![], vec![false]);

        let report = h.supervisor.watchdog_tick().await;

        assert_eq!(report, WatchdogReport::Restarted);
        assert_eq!(h.stream.restarts(), 1);
        assert_eq!(h.supervisor.freshness().await.consecutive_stale_checks, 0);
        assert_eq!(h.supervisor.stream_state().await, CheckState::Degraded);
        assert_eq!(h.transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_stream_not_restarted() {
        let h = harness(vec![], vec![true]);

        let report = h.supervisor.watchdog_tick().await;

        assert_eq!(report, WatchdogReport::Fresh);
        assert_eq!(h.stream.restarts(), 0);
        let freshness = h.supervisor.freshness().await;
        assert_eq!(freshness.consecutive_stale_checks, 0);
        assert!(freshness.last_known_good_at > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_recovery_reported_on_next_tick() {
        let h = harness(vec![], vec![false, true]);

        h.supervisor.watchdog_tick().await;
        assert_eq!(h.supervisor.watchdog_tick().await, WatchdogReport::Fresh);

        assert_eq!(h.status.snapshot()[0].text, "Video stream recovered");
        assert_eq!(h.supervisor.stream_state().await, CheckState::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_checks() {
        let h = harness(vec![], vec![]);
        let handle = h.supervisor.start().expect("start");
        assert!(h.supervisor.start().is_err());

        tokio::time::sleep(Duration::from_secs(31)).await;

        // Probes at 15s and 30s, stream checks at 10s, 20s and 30s
        assert_eq!(h.transport.call_count(), 2);
        assert_eq!(h.stream.checks(), 3);
        let heartbeats = h
            .status
            .snapshot()
            .iter()
            .filter(|e| e.text == "System running...")
            .count();
        assert_eq!(heartbeats, 1);

        handle.stop();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.transport.call_count(), 2);
        assert_eq!(h.stream.checks(), 3);
    }
}
