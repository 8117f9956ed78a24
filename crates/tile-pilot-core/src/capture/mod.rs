//! Screen capture: region model, persisted frames, and the timed loop.
//!
//! Capture files are written as `{prefix}_{YYYYMMDD_HHMMSS}.png`. The
//! timestamp formats at second granularity and parses back exactly, which
//! is what the retention sweeper relies on to age files; anything not
//! matching that pattern is invisible to it.
//!
//! The live [`ScreenSource`] grabs the primary monitor through `xcap` and
//! crops to the configured region. The loop itself only sees the
//! [`FrameSource`] trait, so tests run against synthetic sources.

mod runner;
mod source;

pub use runner::{CaptureLoop, CaptureStats};
pub use source::ScreenSource;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Extension of persisted capture files
pub const CAPTURE_EXT: &str = "png";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Screen rectangle pixels are read from each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    /// A region must enclose at least one pixel
    pub fn validate(&self) -> Result<()> {
        if self.right <= self.left || self.bottom <= self.top {
            return Err(Error::Config(format!("degenerate capture region {}", self)));
        }
        Ok(())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// A captured frame ready to persist
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// PNG image bytes
    pub png_bytes: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Local time the frame was grabbed
    pub taken_at: DateTime<Local>,
}

impl CapturedFrame {
    /// Save the frame to a file. The write is whole-file, so no partial
    /// capture is ever left behind on failure.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.png_bytes)?;
        Ok(())
    }
}

/// Source of frames for the capture loop.
///
/// The live implementation reads the screen; tests substitute synthetic
/// frames.
pub trait FrameSource {
    fn grab(&mut self, region: Region) -> Result<CapturedFrame>;
}

/// Build the on-disk name for a capture taken at `time`
pub fn capture_filename(prefix: &str, time: DateTime<Local>) -> String {
    format!("{}_{}.{}", prefix, time.format(TIMESTAMP_FORMAT), CAPTURE_EXT)
}

/// Parse the timestamp embedded in a capture filename.
///
/// Returns `None` unless the name is exactly `{prefix}_{YYYYMMDD_HHMMSS}.png`.
/// An ambiguous local instant (DST fold) resolves to the earlier reading so
/// a file is never considered older than it is.
pub fn parse_capture_time(prefix: &str, file_name: &str) -> Option<DateTime<Local>> {
    let stamp = file_name
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(".png")?;
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Newest capture in `dir` matching the naming pattern, by embedded
/// timestamp. This is the handoff point for downstream analysis.
pub fn latest_capture(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut newest: Option<(DateTime<Local>, PathBuf)> = None;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(taken_at) = parse_capture_time(prefix, name) else {
            continue;
        };
        if newest.as_ref().map_or(true, |(best, _)| taken_at > *best) {
            newest = Some((taken_at, entry.into_path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
