//! Error types for tile-pilot-core

use thiserror::Error;

/// Main error type for tile-pilot operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("capture region is not configured")]
    RegionUnset,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis response was unusable: {reason}")]
    BadResponse { reason: String },

    #[error("Input synthesis failed: {0}")]
    Input(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a periodic loop may log this error and carry on to its next
    /// tick. Everything else terminates the loop that hit it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Capture(_) | Error::Image(_))
    }
}

/// Result type alias for tile-pilot operations
pub type Result<T> = std::result::Result<T, Error>;
