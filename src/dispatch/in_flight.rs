//! In-flight accounting shared between the dispatcher and the supervisor

use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of dispatched commands without a terminal outcome yet
#[derive(Debug, Default)]
pub struct InFlightCounter {
    count: AtomicUsize,
}

impl InFlightCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current count
    pub fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Count one dispatch as in flight until the returned guard drops
    pub(crate) fn enter(&self) -> InFlightGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard { counter: self }
    }
}

/// Decrements the counter exactly once, on drop
///
/// Dropping covers every terminal path: a response, a transport error, the
/// deadline firing, or the dispatch future itself being cancelled.
#[must_use = "the dispatch stops counting as in flight when the guard drops"]
pub struct InFlightGuard<'a> {
    counter: &'a InFlightCounter,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.count.fetch_sub(1, Ordering::SeqCst);
    }
}
