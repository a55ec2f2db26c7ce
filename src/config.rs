// SPDX-License-Identifier: GPL-3.0-only

//! Capture configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/pctrack/capture.json`. Missing fields
//! take their defaults, so a file only needs the values it changes.
//! Command-line flags override anything read here.

use crate::constants::{capture, file_formats};
use crate::errors::ConfigError;
use crate::pipelines::session::CaptureSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frames to capture after the key is built
    pub frame_count: u32,
    /// Foreground margin in depth units (millimeters)
    pub key_distance: u32,
    /// Depth camera index (from `pctrack list`)
    pub device_index: usize,
    /// Key candidates to try before giving up (unlimited when absent)
    pub max_key_attempts: Option<u32>,
    /// How long to wait for a single sensor frame
    pub acquisition_timeout_ms: u64,
    /// Directory for timestamped captures (default: ~/Videos/PointClouds)
    pub output_dir: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_count: capture::DEFAULT_FRAME_COUNT,
            key_distance: u32::from(capture::DEFAULT_KEY_DISTANCE),
            device_index: 0,
            max_key_attempts: None,
            acquisition_timeout_ms: capture::DEFAULT_ACQUISITION_TIMEOUT_MS,
            output_dir: None,
        }
    }
}

impl CaptureConfig {
    /// Location of the user's config file, if a config directory exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(file_formats::APP_DIR_NAME)
                .join(file_formats::CONFIG_FILE_NAME)
        })
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded capture config");
        Ok(config)
    }

    /// Load `explicit` if given, otherwise the user's config file if it exists
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let range = u32::from(capture::MIN_KEY_DISTANCE)..=u32::from(capture::MAX_KEY_DISTANCE);
        if !range.contains(&self.key_distance) {
            return Err(ConfigError::KeyDistanceOutOfRange {
                value: self.key_distance,
                min: capture::MIN_KEY_DISTANCE,
                max: capture::MAX_KEY_DISTANCE,
            });
        }
        if self.frame_count == 0 {
            return Err(ConfigError::ZeroFrameCount);
        }
        Ok(())
    }

    /// Validated session parameters
    pub fn capture_settings(&self, key_image: Option<PathBuf>) -> Result<CaptureSettings, ConfigError> {
        self.validate()?;
        Ok(CaptureSettings {
            frame_count: self.frame_count,
            // In range after validate()
            key_distance: self.key_distance as u16,
            max_key_attempts: self.max_key_attempts,
            key_image,
        })
    }

    /// Directory for timestamped captures
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::video_dir()
                .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
                .join(file_formats::DEFAULT_SAVE_FOLDER)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CaptureConfig = serde_json::from_str(r#"{"key_distance": 80}"#).unwrap();
        assert_eq!(config.key_distance, 80);
        assert_eq!(config.frame_count, capture::DEFAULT_FRAME_COUNT);
        assert!(config.max_key_attempts.is_none());
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = CaptureConfig::default();
        assert!(config.validate().is_ok());

        config.key_distance = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::KeyDistanceOutOfRange { value: 0, .. })
        ));
        config.key_distance = 1001;
        assert!(config.validate().is_err());
        config.key_distance = 1000;
        assert!(config.validate().is_ok());

        config.frame_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroFrameCount)));
    }

    #[test]
    fn test_capture_settings() {
        let config = CaptureConfig {
            key_distance: 25,
            max_key_attempts: Some(4),
            ..Default::default()
        };
        let settings = config.capture_settings(None).unwrap();
        assert_eq!(settings.key_distance, 25);
        assert_eq!(settings.max_key_attempts, Some(4));
    }

    #[test]
    fn test_explicit_output_dir() {
        let config = CaptureConfig {
            output_dir: Some(PathBuf::from("/tmp/clouds")),
            ..Default::default()
        };
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/clouds"));
    }
}
