use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// How ranked outliers are materialized in the output directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Full copy of the source file
    Copy,

    /// Hard link to the source file
    HardLink,

    /// Symbolic link to the source file
    SymLink,
}

/// Zone in which a post date's midnight is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZonePolicy {
    Local,
    Utc,
}

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for the curation operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum structural similarity (0-1) for two images to count as duplicates
    pub similarity_threshold: f64,

    /// Largest reference-pixel difference (0-1) still compared by SSIM
    pub reference_tolerance: f64,

    /// Coordinate of the reference pixel in the thumbnail
    pub reference_pixel: (u32, u32),

    /// Edge length of the grayscale thumbnails used for comparison
    pub thumbnail_size: u32,

    /// Multiplier applied to per-channel background differences when trimming
    pub trim_gain: f32,

    /// Offset added after the gain; differences that stay at or below zero count as background
    pub trim_bias: f32,

    /// Content boxes covering at least this share of the image are left alone
    pub borderless_ratio: f64,

    /// Fixed window size for ranking; derived from the corpus size when unset
    pub window_size: Option<usize>,

    /// Share of the corpus used as the window when `window_size` is unset
    pub window_fraction: f64,

    /// Lower bound for the derived window size
    pub min_window_size: usize,

    /// Items above `average_multiplier * window average` are average outliers
    pub average_multiplier: f64,

    /// Items above `deviation_multiplier * window std. dev.` are deviation outliers
    pub deviation_multiplier: f64,

    /// Digits in the score prefix of ranked file names
    pub score_width: usize,

    /// Output directory (under the corpus) for average outliers
    pub average_dir: String,

    /// Output directory (under the corpus) for deviation outliers
    pub deviation_dir: String,

    /// How outliers are placed into the output directories
    pub link_mode: LinkMode,

    /// Zone used when restoring file times from post dates
    pub time_zone: TimeZonePolicy,

    /// Number of threads for border trimming (0 = auto)
    pub threads: usize,

    /// Whether to draw progress bars
    pub show_progress: bool,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            reference_tolerance: 0.1,
            reference_pixel: (0, 0),
            thumbnail_size: 100,
            trim_gain: 1.0,
            trim_bias: -100.0,
            borderless_ratio: 0.999,
            window_size: None,
            window_fraction: 0.1,
            min_window_size: 50,
            average_multiplier: 1.5,
            deviation_multiplier: 1.5,
            score_width: 6,
            average_dir: "abs_avg".to_string(),
            deviation_dir: "abs_std".to_string(),
            link_mode: LinkMode::Copy,
            time_zone: TimeZonePolicy::Local,
            threads: 0, // Auto
            show_progress: false,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Configuration(
                "Similarity threshold must be between 0 and 1".to_string(),
            ));
        }

        if !(self.reference_tolerance >= 0.0) {
            return Err(Error::Configuration(
                "Reference tolerance must not be negative".to_string(),
            ));
        }

        // SSIM uses 7x7 windows
        if self.thumbnail_size < 7 {
            return Err(Error::Configuration(
                "Thumbnail size must be at least 7 pixels".to_string(),
            ));
        }

        let (x, y) = self.reference_pixel;
        if x >= self.thumbnail_size || y >= self.thumbnail_size {
            return Err(Error::Configuration(format!(
                "Reference pixel ({}, {}) lies outside the {}px thumbnail",
                x, y, self.thumbnail_size
            )));
        }

        if !(self.borderless_ratio > 0.0 && self.borderless_ratio <= 1.0) {
            return Err(Error::Configuration(
                "Borderless ratio must be in (0, 1]".to_string(),
            ));
        }

        if self.window_size == Some(0) {
            return Err(Error::Configuration(
                "Window size must be positive".to_string(),
            ));
        }

        if !(self.window_fraction > 0.0) {
            return Err(Error::Configuration(
                "Window fraction must be positive".to_string(),
            ));
        }

        if !(self.average_multiplier > 0.0) || !(self.deviation_multiplier > 0.0) {
            return Err(Error::Configuration(
                "Outlier multipliers must be positive".to_string(),
            ));
        }

        // u64 scores hold at most 19 digits
        if self.score_width == 0 || self.score_width > 18 {
            return Err(Error::Configuration(
                "Score width must be between 1 and 18 digits".to_string(),
            ));
        }

        for dir in [&self.average_dir, &self.deviation_dir] {
            if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
                return Err(Error::Configuration(format!(
                    "Output directory '{}' must be a plain directory name",
                    dir
                )));
            }
        }

        if self.average_dir == self.deviation_dir {
            return Err(Error::Configuration(
                "Average and deviation output directories must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Worker count for parallel passes
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.similarity_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = Config::default();
        config.deviation_dir = config.average_dir.clone();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.reference_pixel = (100, 0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.window_size = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.average_dir = "../elsewhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("media-curator.json");

        let mut config = Config::default();
        config.similarity_threshold = 0.95;
        config.link_mode = LinkMode::HardLink;
        config.window_size = Some(20);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.similarity_threshold, 0.95);
        assert_eq!(loaded.link_mode, LinkMode::HardLink);
        assert_eq!(loaded.window_size, Some(20));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "time_zone": "utc" }"#).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.time_zone, TimeZonePolicy::Utc);
        assert_eq!(loaded.min_window_size, 50);
    }

    #[test]
    fn test_worker_threads() {
        let mut config = Config::default();
        assert!(config.worker_threads() >= 1);
        config.threads = 3;
        assert_eq!(config.worker_threads(), 3);
    }
}
