//! Timed capture loop: grab, persist, sleep, repeat.

use std::path::PathBuf;
use std::time::Duration;

use super::{capture_filename, FrameSource, Region};
use crate::cancel::{sleep_unless_cancelled, CancelToken};
use crate::config::Config;
use crate::error::{Error, Result};

/// Transient per-tick failures tolerated in a row before the loop gives
/// up and reports the last error.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Counters for a capture run
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureStats {
    /// Ticks attempted
    pub ticks: u64,
    /// Files written
    pub written: u64,
    /// Ticks skipped because of a transient error
    pub failed: u64,
}

/// Foreground loop that writes one timestamped capture per tick.
///
/// Runs until the cancellation token fires or transient failures persist
/// past the tolerance. A single failed tick is logged and skipped; a
/// non-transient error ends the run immediately.
pub struct CaptureLoop {
    region: Region,
    out_dir: PathBuf,
    prefix: String,
    interval: Duration,
}

impl CaptureLoop {
    /// Fails fast when the config has no region. That precondition is
    /// never retried; callers must have a region before starting.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let region = config.region.ok_or(Error::RegionUnset)?;
        Ok(Self {
            region,
            out_dir: config.save_dir.clone(),
            prefix: config.file_prefix.clone(),
            interval: config.interval(),
        })
    }

    /// Run the tick cycle until stopped
    pub fn run<S: FrameSource>(&self, source: &mut S, token: &CancelToken) -> Result<CaptureStats> {
        std::fs::create_dir_all(&self.out_dir)?;

        let mut stats = CaptureStats::default();
        let mut consecutive_failures = 0u32;

        while !token.is_cancelled() {
            stats.ticks += 1;
            match self.tick(source) {
                Ok(path) => {
                    consecutive_failures = 0;
                    stats.written += 1;
                    tracing::info!("Capture saved: {}", path.display());
                }
                Err(e) if e.is_transient() => {
                    consecutive_failures += 1;
                    stats.failed += 1;
                    tracing::warn!(
                        "Capture tick failed ({} in a row): {}",
                        consecutive_failures,
                        e
                    );
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        tracing::error!(
                            "Giving up after {} consecutive capture failures",
                            MAX_CONSECUTIVE_FAILURES
                        );
                        return Err(e);
                    }
                }
                Err(e) => {
                    tracing::error!("Capture loop terminated: {}", e);
                    return Err(e);
                }
            }
            sleep_unless_cancelled(self.interval, token);
        }

        tracing::info!(
            "Capture loop stopped after {} ticks ({} written)",
            stats.ticks,
            stats.written
        );
        Ok(stats)
    }

    /// Capture one frame and persist it under the timestamped name
    pub fn tick<S: FrameSource>(&self, source: &mut S) -> Result<PathBuf> {
        let frame = source.grab(self.region)?;
        let path = self
            .out_dir
            .join(capture_filename(&self.prefix, frame.taken_at));
        frame.save_to_file(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedFrame;
    use chrono::Local;
    use tempfile::TempDir;

    struct SolidSource;

    impl FrameSource for SolidSource {
        fn grab(&mut self, region: Region) -> Result<CapturedFrame> {
            Ok(CapturedFrame {
                png_bytes: vec![0u8; 16],
                width: region.width(),
                height: region.height(),
                taken_at: Local::now(),
            })
        }
    }

    fn test_config(save_dir: &std::path::Path) -> Config {
        Config {
            save_dir: save_dir.to_path_buf(),
            region: Some(Region::new(0, 0, 100, 100)),
            ..Default::default()
        }
    }

    #[test]
    fn new_requires_a_region() {
        let mut config = Config::default();
        config.region = None;
        assert!(matches!(
            CaptureLoop::new(&config),
            Err(Error::RegionUnset)
        ));
    }

    #[test]
    fn pre_cancelled_token_means_zero_ticks() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let capture = CaptureLoop::new(&config).unwrap();

        let token = CancelToken::new();
        token.cancel();

        let stats = capture.run(&mut SolidSource, &token).unwrap();
        assert_eq!(stats.ticks, 0);
        // The output directory is still prepared for the next run.
        assert!(temp.path().exists());
    }

    struct FlakySource {
        token: CancelToken,
        failures_left: u32,
    }

    impl FrameSource for FlakySource {
        fn grab(&mut self, region: Region) -> Result<CapturedFrame> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(Error::Capture("transient glitch".into()));
            }
            self.token.cancel();
            SolidSource.grab(region)
        }
    }

    #[test]
    fn transient_failure_skips_the_tick_and_recovers() {
        let temp = TempDir::new().unwrap();
        let capture = CaptureLoop::new(&test_config(temp.path())).unwrap();

        let token = CancelToken::new();
        let mut source = FlakySource {
            token: token.clone(),
            failures_left: 2,
        };

        let stats = capture.run(&mut source, &token).unwrap();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.written, 1);
    }

    #[test]
    fn persistent_transient_failures_end_the_run() {
        struct DeadSource;
        impl FrameSource for DeadSource {
            fn grab(&mut self, _region: Region) -> Result<CapturedFrame> {
                Err(Error::Capture("no signal".into()))
            }
        }

        let temp = TempDir::new().unwrap();
        let capture = CaptureLoop::new(&test_config(temp.path())).unwrap();

        let result = capture.run(&mut DeadSource, &CancelToken::new());
        assert!(matches!(result, Err(Error::Capture(_))));
    }

    #[test]
    fn tick_writes_a_parseable_name() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        std::fs::create_dir_all(temp.path()).unwrap();
        let capture = CaptureLoop::new(&config).unwrap();

        let path = capture.tick(&mut SolidSource).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(crate::capture::parse_capture_time("screenshot", name).is_some());
    }
}
