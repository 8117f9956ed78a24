//! # tile-pilot-core
//!
//! Core library for automating a tile-matching game: a timed screen
//! capture loop persists board screenshots, a background retention
//! sweeper keeps the capture directory from growing without bound, and an
//! analysis client turns the newest frame into a suggested move that is
//! replayed with synthetic pointer input.
//!
//! ## Modules
//!
//! - [`analysis`] - Board analysis through a multimodal inference endpoint
//! - [`bot`] - The capture-analyze-act play loop
//! - [`cancel`] - Cooperative cancellation for the periodic loops
//! - [`capture`] - Region model, capture files, and the timed capture loop
//! - [`config`] - Configuration loading, saving, and validation
//! - [`error`] - Error types and Result alias
//! - [`input`] - Drag geometry and synthetic pointer input
//! - [`manager`] - Supervision of the capture loop and the sweeper
//! - [`retention`] - Age-based deletion of old capture files
//!
//! ## Example
//!
//! ```no_run
//! use tile_pilot_core::{CancelToken, CaptureManager, Config, Region, ScreenSource};
//!
//! let mut config = Config::load();
//! config.region = Some(Region::new(100, 100, 740, 740));
//!
//! let token = CancelToken::new();
//! let mut source = ScreenSource::new();
//! let stats = CaptureManager::new(config).run(&mut source, &token)?;
//! println!("wrote {} captures", stats.written);
//! # Ok::<(), tile_pilot_core::Error>(())
//! ```

// Module declarations
pub mod analysis;
pub mod bot;
pub mod cancel;
pub mod capture;
pub mod config;
pub mod error;
pub mod input;
pub mod manager;
pub mod retention;

// Re-export key types for convenience

// Error types
pub use error::{Error, Result};

// Cancellation
pub use cancel::{sleep_unless_cancelled, CancelToken};

// Configuration
pub use config::{AnalysisConfig, Config, SelectionMode};

// Capture
pub use capture::{
    capture_filename, latest_capture, parse_capture_time, CaptureLoop, CaptureStats,
    CapturedFrame, FrameSource, Region, ScreenSource, CAPTURE_EXT,
};

// Retention
pub use retention::{sweep_once, RetentionSweeper, SweepStats, SweeperHandle, SWEEP_POLL};

// Supervision
pub use manager::CaptureManager;

// Analysis
pub use analysis::{
    extract_json, BoardAnalysis, FollowUp, MoveAnalyzer, MoveDirection, Objective, PlannedMove,
    SpecialTile, VisionClient, DEFAULT_ENDPOINT,
};

// Input
pub use input::{drag_for_move, Point, PointerDriver, SystemPointer};

// Play loop
pub use bot::{BotOutcome, GameBot};
