// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings, stored as RON.

use serde::{Deserialize, Serialize};
use splice_mixer::DEFAULT_RAMP_MS;
use splice_timeline::snap::{DEFAULT_PIXEL_TOLERANCE, MIN_GRID_INTERVAL};
use std::path::Path;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Default settings file name
pub const SETTINGS_FILE_NAME: &str = "splice.ron";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the file failed
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid settings RON
    #[error("Settings parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Settings serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// A value is out of range
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Undo history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum undo depth
    pub depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            depth: crate::history::MAX_HISTORY,
        }
    }
}

/// Snapping settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// Snap on at startup
    pub enabled: bool,
    /// Snap radius in pixels
    pub pixel_tolerance: f64,
    /// Grid spacing in seconds
    pub grid_interval: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            pixel_tolerance: DEFAULT_PIXEL_TOLERANCE,
            grid_interval: 1.0,
        }
    }
}

impl SnapSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if !self.grid_interval.is_finite() || self.grid_interval < MIN_GRID_INTERVAL {
            return Err(SettingsError::Invalid(format!(
                "snap.grid_interval must be at least {MIN_GRID_INTERVAL}s, got {}",
                self.grid_interval
            )));
        }
        if !self.pixel_tolerance.is_finite() || self.pixel_tolerance < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "snap.pixel_tolerance must be non-negative, got {}",
                self.pixel_tolerance
            )));
        }
        Ok(())
    }
}

/// Pointer interaction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Pixel margin around item edges that grabs a trim handle
    pub trim_margin_px: f64,
    /// Pixel radius around a marker flag that grabs the marker
    pub marker_hit_radius_px: f64,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            trim_margin_px: 6.0,
            marker_hit_radius_px: 6.0,
        }
    }
}

/// Zoom settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Initial zoom in pixels per second
    pub default_zoom: f64,
    /// Lower zoom bound
    pub min_zoom: f64,
    /// Upper zoom bound
    pub max_zoom: f64,
    /// Factor applied by zoom in and zoom out
    pub zoom_step: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            default_zoom: 100.0,
            min_zoom: 10.0,
            max_zoom: 1000.0,
            zoom_step: 1.25,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Frames per second for frame stepping
    pub frame_rate: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self { frame_rate: 30.0 }
    }
}

/// Audio settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Gain/pan ramp time constant in milliseconds
    pub ramp_ms: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            ramp_ms: DEFAULT_RAMP_MS,
        }
    }
}

/// Editing settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingSettings {
    /// Ripple edit on at startup
    pub ripple: bool,
}

/// All editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Format version
    pub version: u32,
    /// Undo history
    pub history: HistorySettings,
    /// Snapping
    pub snap: SnapSettings,
    /// Pointer interaction
    pub interaction: InteractionSettings,
    /// Zoom
    pub view: ViewSettings,
    /// Playback
    pub playback: PlaybackSettings,
    /// Audio
    pub audio: AudioSettings,
    /// Editing
    pub editing: EditingSettings,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            history: HistorySettings::default(),
            snap: SnapSettings::default(),
            interaction: InteractionSettings::default(),
            view: ViewSettings::default(),
            playback: PlaybackSettings::default(),
            audio: AudioSettings::default(),
            editing: EditingSettings::default(),
        }
    }
}

impl EditorSettings {
    /// Parse settings from RON text
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        let settings: EditorSettings = ron::from_str(content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        settings.snap.validate()?;

        Ok(settings)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_ron(&content)?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved settings to {}", path.display());
        Ok(())
    }
}
