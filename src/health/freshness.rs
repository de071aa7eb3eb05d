//! Stream freshness bookkeeping for the watchdog

use rover_shared::{now_ms, timing, LinkError};

/// What the watchdog should do after a freshness observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreshnessVerdict {
    /// Frames are advancing
    Fresh,
    /// No advancement, but below the restart threshold
    Stale(LinkError),
    /// Threshold reached: restart the stream; the counter has been reset
    Restart(LinkError),
}

/// Freshness of the media stream as seen by the watchdog
#[derive(Debug, Clone)]
pub struct StreamFreshnessState {
    /// Last time a check saw the stream advance (ms since epoch, 0 = never)
    pub last_known_good_at: u64,
    pub consecutive_stale_checks: u32,
    threshold: u32,
}

impl Default for StreamFreshnessState {
    fn default() -> Self {
        Self::new(timing::STALE_CHECK_THRESHOLD)
    }
}

impl StreamFreshnessState {
    pub fn new(threshold: u32) -> Self {
        Self {
            last_known_good_at: 0,
            consecutive_stale_checks: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record one watchdog observation
    pub fn observe(&mut self, advanced: bool) -> FreshnessVerdict {
        if advanced {
            self.consecutive_stale_checks = 0;
            self.last_known_good_at = now_ms();
            return FreshnessVerdict::Fresh;
        }

        self.consecutive_stale_checks += 1;
        let stale = LinkError::StreamStale {
            checks: self.consecutive_stale_checks,
        };

        if self.consecutive_stale_checks >= self.threshold {
            self.consecutive_stale_checks = 0;
            FreshnessVerdict::Restart(stale)
        } else {
            FreshnessVerdict::Stale(stale)
        }
    }
}
