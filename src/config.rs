//! Editor configuration (sliceline.json).
//!
//! Every field has a default, so a partial or empty file is valid.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::thumb_queue::QueueConfig;
use crate::paths::{self, PathConfig};
use crate::widgets::strip::{StripConfig, StripGeometry};

pub const CONFIG_FILE: &str = "sliceline.json";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub strip: StripConfig,
    /// Initial layout until the host reports real measurements
    pub geometry: StripGeometry,
    pub thumbnails: QueueConfig,
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EditorConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Config from the standard location resolved by `PathConfig`.
    pub fn from_paths(paths: &PathConfig) -> Result<Self> {
        Self::load_or_default(&paths::config_file(CONFIG_FILE, paths))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config {}", path.display()))?;
        info!("Config saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sliceline-{}-{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.strip.item_width, 194.0);
        assert_eq!(config.strip.drag_threshold, 3.0);
        assert_eq!(config.strip.hysteresis, 0.65);
        assert_eq!(config.strip.autoscroll_interval_ms, 300);
        assert_eq!(config.thumbnails.max_in_flight, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"strip": {"hysteresis": 0.6}, "thumbnails": {"stall_timeout_ms": null}}"#)
                .unwrap();
        assert_eq!(config.strip.hysteresis, 0.6);
        assert_eq!(config.strip.item_width, 194.0);
        assert_eq!(config.thumbnails.stall_timeout_ms, None);
        assert_eq!(config.thumbnails.max_in_flight, 5);
    }

    #[test]
    fn test_save_load_round_trip() {
        let path = temp_path("config.json");
        let mut config = EditorConfig::default();
        config.thumbnails.max_in_flight = 2;
        config.save(&path).unwrap();

        assert_eq!(EditorConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = temp_path("missing.json");
        assert_eq!(EditorConfig::load_or_default(&path).unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_bad_json_is_error() {
        let path = temp_path("bad.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = EditorConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
        let _ = std::fs::remove_file(&path);
    }
}
