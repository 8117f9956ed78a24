//! Configuration for capture, retention, and play

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::Region;
use crate::error::{Error, Result};

/// Configuration for tile-pilot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Milliseconds between capture ticks. Must be at least 1000 so the
    /// second-granularity filenames stay unique within a run.
    pub interval_ms: u64,
    /// Directory capture files are written to (created if absent)
    pub save_dir: PathBuf,
    /// Screen rectangle to capture; play cannot start while unset
    pub region: Option<Region>,
    /// Filename prefix for capture files
    pub file_prefix: String,
    /// Maximum age of a capture file before the sweeper deletes it
    pub retention_minutes: u64,
    /// How the region was chosen; carried for collaborators, never
    /// interpreted by the core
    pub selection_mode: SelectionMode,
    /// Board rows inside the capture region
    pub board_rows: u32,
    /// Board columns inside the capture region
    pub board_cols: u32,
    /// Analysis and replay settings
    pub analysis: AnalysisConfig,
}

/// How the capture region was selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Region was drawn by hand in an external selector
    #[default]
    Manual,
    /// Region came from a stored preset
    Fixed,
}

/// Settings for the analysis / replay half of the pilot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// generateContent-style endpoint board screenshots are sent to
    pub endpoint: String,
    /// Pause after a move while the board animates, in milliseconds
    pub settle_ms: u64,
    /// Drag gesture duration in milliseconds
    pub drag_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::analysis::DEFAULT_ENDPOINT.to_string(),
            settle_ms: 2000,
            drag_ms: 500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            save_dir: PathBuf::from("screenshots"),
            region: None,
            file_prefix: "screenshot".to_string(),
            retention_minutes: 1,
            selection_mode: SelectionMode::Manual,
            board_rows: 9,
            board_cols: 9,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tile-pilot").join("config.json"))
    }

    /// Load config from the default location. A missing file is replaced
    /// with a written-out default; an unreadable one falls back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Invalid config at {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => {
                let config = Self::default();
                match config.save_to(&path) {
                    Ok(()) => tracing::info!("Created default config at {}", path.display()),
                    Err(e) => {
                        tracing::warn!("Could not write default config {}: {}", path.display(), e)
                    }
                }
                config
            }
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    /// Save config to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the invariants every run depends on. An unset region is fine
    /// here; it is a start precondition of the capture loop, not of the
    /// config itself.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms < 1000 {
            return Err(Error::Config(
                "interval_ms must be at least 1000 so capture filenames stay unique".into(),
            ));
        }
        if self.retention_minutes == 0 {
            return Err(Error::Config("retention_minutes must be positive".into()));
        }
        if self.file_prefix.is_empty() {
            return Err(Error::Config("file_prefix must not be empty".into()));
        }
        if self
            .file_prefix
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0'))
        {
            return Err(Error::Config(format!(
                "file_prefix {:?} contains path separators",
                self.file_prefix
            )));
        }
        if self.board_rows == 0 || self.board_cols == 0 {
            return Err(Error::Config("board geometry must be at least 1x1".into()));
        }
        if let Some(region) = self.region {
            region.validate()?;
        }
        Ok(())
    }

    /// Delay between capture ticks
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Maximum capture file age before deletion
    pub fn retention_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.retention_minutes as i64)
    }
}
