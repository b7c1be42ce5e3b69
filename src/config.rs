// src/config.rs - Runtime configuration for the scanner CLI

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ScanError};
use crate::image_io::DEFAULT_JPEG_QUALITY;

/// Configuration for the border scanner
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub input_path: String,

    #[serde(default = "default_output_path")]
    pub output_path: String,

    #[serde(default)]
    pub log_mode: LogMode,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Also write the binary mask as `<stem>_mask.png`
    #[serde(default)]
    pub save_mask: bool,

    /// Invert colours before binarization
    #[serde(default)]
    pub invert: bool,

    /// Dump contour points to this CSV file
    #[serde(default)]
    pub contours_csv: Option<String>,

    /// Write `<stem>_preview.png` with this many rows of overlay over the mask
    #[serde(default)]
    pub preview_rows: Option<u32>,
}

/// Log output mode
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Text on a terminal, JSON otherwise
    #[default]
    Auto,
    Json,
    Text,
}

fn default_output_path() -> String {
    "out.png".to_string()
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            output_path: default_output_path(),
            log_mode: LogMode::Auto,
            jpeg_quality: default_jpeg_quality(),
            save_mask: false,
            invert: false,
            contours_csv: None,
            preview_rows: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| ScanError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.input_path.is_empty() {
            return Err(ScanError::Config("input_path is required".to_string()));
        }

        let input_path = PathBuf::from(&self.input_path);
        if !input_path.is_file() {
            return Err(ScanError::InvalidPath(input_path));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ScanError::Config(
                "jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ScanError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
