//! Disk retention for capture files.
//!
//! A background sweeper periodically deletes captures whose embedded
//! timestamp is strictly older than `now - retention_age`. It reads only
//! filenames, never file contents, so it is safe to run alongside the
//! capture loop: the loop creates files, the sweeper deletes expired ones,
//! and no file is ever mutated in place.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use walkdir::WalkDir;

use crate::capture::parse_capture_time;
use crate::config::Config;

/// How often the sweeper wakes up, independent of the capture interval
pub const SWEEP_POLL: Duration = Duration::from_secs(10);

/// Counters for a single sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries that matched the capture naming pattern
    pub matched: usize,
    /// Files deleted because they were strictly older than the cutoff
    pub deleted: usize,
    /// Matching expired files that could not be deleted
    pub failed: usize,
}

/// Delete every capture in `dir` older than `cutoff`.
///
/// Names that do not match `{prefix}_{timestamp}.png` are ignored.
/// Per-file errors (racing deletion, permissions) are logged and counted;
/// one bad file never prevents deletion attempts on the rest.
pub fn sweep_once(dir: &Path, prefix: &str, cutoff: DateTime<Local>) -> SweepStats {
    let mut stats = SweepStats::default();
    if !dir.exists() {
        return stats;
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Sweep skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(taken_at) = parse_capture_time(prefix, name) else {
            continue;
        };

        stats.matched += 1;
        if taken_at >= cutoff {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                stats.deleted += 1;
                tracing::info!("Deleted old capture: {}", entry.path().display());
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!("Failed to delete {}: {}", entry.path().display(), e);
            }
        }
    }

    stats
}

/// Periodic background retention task
pub struct RetentionSweeper {
    dir: PathBuf,
    prefix: String,
    retention: chrono::Duration,
    poll: Duration,
}

impl RetentionSweeper {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: config.save_dir.clone(),
            prefix: config.file_prefix.clone(),
            retention: config.retention_age(),
            poll: SWEEP_POLL,
        }
    }

    /// Override the poll cadence (tests use a short one)
    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Start sweeping on a background thread. The first pass runs
    /// immediately; later passes follow the poll cadence.
    pub fn spawn(self) -> SweeperHandle {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || self.run(rx));
        SweeperHandle {
            handle: Some(handle),
            tx,
        }
    }

    fn run(self, rx: Receiver<()>) {
        tracing::info!(
            "Retention sweeper started ({} min retention on {})",
            self.retention.num_minutes(),
            self.dir.display()
        );
        loop {
            let cutoff = Local::now() - self.retention;
            let stats = sweep_once(&self.dir, &self.prefix, cutoff);
            if stats.deleted > 0 || stats.failed > 0 {
                tracing::debug!(
                    "Sweep pass: {} deleted, {} failed of {} matched",
                    stats.deleted,
                    stats.failed,
                    stats.matched
                );
            }
            match rx.recv_timeout(self.poll) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        tracing::info!("Retention sweeper stopped");
    }
}

/// Owned handle to a running sweeper
pub struct SweeperHandle {
    handle: Option<JoinHandle<()>>,
    tx: Sender<()>,
}

impl SweeperHandle {
    /// Signal shutdown and block until the sweeper thread exits. No
    /// deletion can happen after this returns.
    pub fn stop(mut self) {
        let _ = self.tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::capture_filename;
    use chrono::Duration as ChronoDuration;
    use std::fs::File;
    use tempfile::TempDir;

    /// Truncate to the second granularity the filename format carries.
    fn second_precision(time: DateTime<Local>) -> DateTime<Local> {
        parse_capture_time("x", &capture_filename("x", time)).unwrap()
    }

    fn seed(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn cutoff_is_strictly_older_than() {
        let temp = TempDir::new().unwrap();
        let cutoff = second_precision(Local::now()) - ChronoDuration::seconds(60);

        let at_cutoff = seed(temp.path(), &capture_filename("shot", cutoff));
        let older = seed(
            temp.path(),
            &capture_filename("shot", cutoff - ChronoDuration::seconds(1)),
        );
        let newer = seed(
            temp.path(),
            &capture_filename("shot", cutoff + ChronoDuration::seconds(30)),
        );

        let stats = sweep_once(temp.path(), "shot", cutoff);
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.failed, 0);

        assert!(!older.exists());
        assert!(at_cutoff.exists(), "file exactly at the cutoff is retained");
        assert!(newer.exists());
    }

    #[test]
    fn unparseable_names_are_skipped_not_fatal() {
        let temp = TempDir::new().unwrap();
        let cutoff = Local::now();

        let garbage = seed(temp.path(), "shot_garbage.png");
        let wrong_prefix = seed(temp.path(), "other_20200101_000000.png");
        let expired = seed(temp.path(), "shot_20200101_000000.png");

        let stats = sweep_once(temp.path(), "shot", cutoff);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.deleted, 1);

        assert!(garbage.exists());
        assert!(wrong_prefix.exists());
        assert!(!expired.exists());
    }

    #[test]
    fn missing_directory_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("never-created");
        let stats = sweep_once(&gone, "shot", Local::now());
        assert_eq!(stats, SweepStats::default());
    }

    #[test]
    fn stop_joins_and_halts_deletions() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.save_dir = temp.path().to_path_buf();
        config.file_prefix = "shot".into();
        config.retention_minutes = 1;

        let expired = seed(temp.path(), "shot_20200101_000000.png");

        let handle = RetentionSweeper::new(&config)
            .with_poll(Duration::from_millis(20))
            .spawn();

        // The sweeper's first pass removes the expired file.
        for _ in 0..50 {
            if !expired.exists() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!expired.exists());

        handle.stop();

        // After stop returns the thread is joined; nothing sweeps this.
        let late = seed(temp.path(), "shot_20200101_000000.png");
        thread::sleep(Duration::from_millis(100));
        assert!(late.exists());
    }
}
