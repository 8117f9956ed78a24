//! Orchestration of the capture loop and the retention sweeper.

use std::time::Duration;

use crate::cancel::CancelToken;
use crate::capture::{CaptureLoop, CaptureStats, FrameSource};
use crate::config::Config;
use crate::error::Result;
use crate::retention::{RetentionSweeper, SWEEP_POLL};

/// Single run-to-completion supervisor for a capture session.
///
/// Startup order is sweeper first, then the capture loop in the
/// foreground. Whichever way the loop exits (normal stop, cancellation,
/// or an error from a tick) the sweeper is stopped exactly once, and its
/// stop is a blocking join, so by the time `run` returns no task of this
/// session produces further side effects.
pub struct CaptureManager {
    config: Config,
    sweep_poll: Duration,
}

impl CaptureManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sweep_poll: SWEEP_POLL,
        }
    }

    /// Shorten the sweeper cadence (tests use this)
    pub fn with_sweep_poll(mut self, poll: Duration) -> Self {
        self.sweep_poll = poll;
        self
    }

    /// Run until `token` fires or the loop fails.
    ///
    /// Precondition failures (invalid config, unset region) surface before
    /// the sweeper starts, so a bad setup has no side effects at all.
    pub fn run<S: FrameSource>(&self, source: &mut S, token: &CancelToken) -> Result<CaptureStats> {
        let capture = CaptureLoop::new(&self.config)?;

        let sweeper = RetentionSweeper::new(&self.config)
            .with_poll(self.sweep_poll)
            .spawn();
        let result = capture.run(source, token);
        sweeper.stop();

        result
    }
}
