// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner configuration.
//!
//! Configuration is stored in RON format in `stagecue.ron` and covers:
//! - DMX output (universe size, channel numbering)
//! - Playback (frame rate, default play options, startup sequence)
//! - Auto-scene settings

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use stagecue_autoscene::AutoSceneSettings;
use stagecue_timeline::{PlayOptions, SequenceId, MAX_SPEED, MIN_SPEED};
use std::path::{Path, PathBuf};

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "stagecue.ron";

/// Number of slots in a DMX512 universe
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Highest frame rate accepted
pub const MAX_FRAME_RATE: f64 = 1000.0;

/// DMX output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Number of slots in the output universe
    pub universe_size: usize,
    /// Channel 1 maps to slot 0
    pub one_based_channels: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            universe_size: DMX_UNIVERSE_SIZE,
            one_based_channels: true,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Ticks per second
    pub frame_rate: f64,
    /// Options for the startup sequence
    pub options: PlayOptions,
    /// Sequence to play on startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<SequenceId>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            options: PlayOptions::default(),
            sequence: None,
        }
    }
}

/// Complete runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Format version for compatibility
    pub version: u32,
    /// Show file loaded on startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<PathBuf>,
    /// DMX output
    pub output: OutputSettings,
    /// Timeline playback
    pub playback: PlaybackSettings,
    /// Automatic scene changes
    pub auto_scene: AutoSceneSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            show: None,
            output: OutputSettings::default(),
            playback: PlaybackSettings::default(),
            auto_scene: AutoSceneSettings::default(),
        }
    }
}

impl AppConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(content: &str) -> Result<Self, AppError> {
        let mut config: AppConfig = ron::from_str(content)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(AppError::Config(format!(
                "Config version {} is newer than supported version {}",
                config.version, CONFIG_FORMAT_VERSION
            )));
        }

        config.auto_scene = config.auto_scene.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, AppError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Get the configuration file path for a directory
    pub fn config_file_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), AppError> {
        if self.output.universe_size == 0 || self.output.universe_size > DMX_UNIVERSE_SIZE {
            return Err(AppError::Config(format!(
                "Universe size must be between 1 and {}, got {}",
                DMX_UNIVERSE_SIZE, self.output.universe_size
            )));
        }
        let fps = self.playback.frame_rate;
        if !(fps.is_finite() && fps > 0.0 && fps <= MAX_FRAME_RATE) {
            return Err(AppError::Config(format!(
                "Frame rate must be in (0, {}], got {}",
                MAX_FRAME_RATE, fps
            )));
        }
        let speed = self.playback.options.speed;
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(AppError::Config(format!(
                "Playback speed must be in [{}, {}], got {}",
                MIN_SPEED, MAX_SPEED, speed
            )));
        }
        Ok(())
    }
}
