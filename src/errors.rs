use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the border scanner
#[derive(Error, Debug)]
pub enum ScanError {
    /// The caller's cancel token was observed at a poll point
    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Unsupported output format {0:?} (from file extension)")]
    UnsupportedFormat(String),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ScanError>;
