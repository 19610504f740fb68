//! Simple configuration persistence for wavalign
//!
//! Stores default search sizes and the silence trimming policy. Command line
//! flags take precedence over anything stored here.

use crate::trim::TrimConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SSD window length in milliseconds
    pub window_ms: u32,
    /// Maximum offset searched in milliseconds
    pub probe_ms: u32,
    /// Maximum backward offset in frames; negative means unlimited
    pub back_max: i64,
    /// Silence trimming policy
    pub trim: TrimConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_ms: 3000,
            probe_ms: 500,
            back_max: 1,
            trim: TrimConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.serialize();
        fs::write(path, content)
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wavalign")
            .join("config.txt")
    }

    /// Parse config from simple key=value format
    ///
    /// Unknown keys and unparsable values keep their defaults.
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim();
                match key.trim() {
                    "window_ms" => set_parsed(&mut config.window_ms, value),
                    "probe_ms" => set_parsed(&mut config.probe_ms, value),
                    "back_max" => set_parsed(&mut config.back_max, value),
                    "trim_ma_len" => set_parsed(&mut config.trim.moving_average_len, value),
                    "trim_threshold" => set_parsed(&mut config.trim.threshold_ratio, value),
                    _ => {}
                }
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        [
            "# wavalign configuration".to_string(),
            format!("window_ms={}", self.window_ms),
            format!("probe_ms={}", self.probe_ms),
            format!("back_max={}", self.back_max),
            format!("trim_ma_len={}", self.trim.moving_average_len),
            format!("trim_threshold={}", self.trim.threshold_ratio),
        ]
        .join("\n")
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, value: &str) {
    if let Ok(parsed) = value.parse() {
        *slot = parsed;
    }
}
