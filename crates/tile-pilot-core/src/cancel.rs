//! Cooperative cancellation for the periodic loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable stop signal observed by every loop once per tick.
///
/// Each task receives a clone at start and checks it between ticks, never
/// mid-I/O, so cancellation takes effect within one tick interval.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; all clones observe it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Granularity of cancellable sleeps. Cancellation lands within one slice.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Sleep for `duration`, returning early once `token` fires.
pub fn sleep_unless_cancelled(duration: Duration, token: &CancelToken) {
    let mut remaining = duration;
    while !remaining.is_zero() && !token.is_cancelled() {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
