//! User settings and the per-activation launch configuration snapshot
//!
//! `UserSettings` is what the user edits and what gets persisted (JSON under
//! `~/.local/state/paperlane`). `LaunchConfig` is the immutable, validated,
//! pixel-space snapshot the overlay works against for one activation; a
//! settings change always produces a fresh snapshot, never a partial update.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while deriving a launch configuration snapshot or while
/// paginating with a capacity that cannot hold anything.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("negative size for {field}: {value}")]
    NegativeSize { field: &'static str, value: f32 },

    #[error("screen cannot fit a single entry (entry extent {entry_extent_px}px, screen extent {screen_extent_px}px)")]
    NoVisibleCapacity {
        entry_extent_px: i32,
        screen_extent_px: i32,
    },

    #[error("pagination capacity must be at least one entry")]
    ZeroPaginationCapacity,

    #[error("entry tree deeper than {limit} folder levels")]
    TreeTooDeep { limit: usize },
}

/// Where the entries gather vertically when they don't fill the lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LauncherGravity {
    Top,
    Center,
    Bottom,
}

/// Get the paperlane state directory (settings, entries, logs)
pub fn state_dir() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/state")))
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("paperlane")
}

/// User-facing launcher settings, persisted as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Entry icon edge length in dip
    pub image_size_dip: f32,
    /// Margin around the icon inside an entry, dip
    pub image_margin_dip: f32,
    /// Margin around each entry, dip
    pub entry_margin_dip: f32,
    /// Width of the invisible activation strip, dip
    pub sensitivity_dip: f32,
    /// Vertical offset of the activation strip from its gravity anchor, dip
    pub activation_offset_position_dip: f32,
    /// Amount the activation strip is shortened by, dip
    pub activation_offset_size_dip: f32,
    /// Which screen edge the launcher docks to
    pub is_on_right_side: bool,
    pub gravity: LauncherGravity,
    /// Per-entry stagger between unfold animations, ms
    pub entry_move_step_ms: u64,
    /// Duration of the selection confirmation animation, ms
    pub selection_animation_ms: u64,
    /// Indicator color when an entry doesn't provide one, RGBA 0.0-1.0
    pub frame_default_color: [f32; 4],
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            image_size_dip: 48.0,
            image_margin_dip: 3.0,
            entry_margin_dip: 5.0,
            sensitivity_dip: 10.0,
            activation_offset_position_dip: 0.0,
            activation_offset_size_dip: 0.0,
            is_on_right_side: true,
            gravity: LauncherGravity::Center,
            entry_move_step_ms: 50,
            selection_animation_ms: 200,
            frame_default_color: [0.22, 0.28, 0.31, 1.0],
        }
    }
}

impl UserSettings {
    fn settings_path() -> PathBuf {
        state_dir().join("settings.json")
    }

    /// Load settings from file, falling back to defaults
    pub fn load() -> Self {
        let path = Self::settings_path();
        if let Ok(contents) = std::fs::read_to_string(&path) {
            match serde_json::from_str::<Self>(&contents) {
                Ok(settings) => {
                    tracing::info!("Loaded settings from {:?}", path);
                    return settings;
                }
                Err(e) => {
                    tracing::error!("Failed to parse settings.json: {:?}", e);
                }
            }
        }
        Self::default()
    }

    /// Save settings to file
    pub fn save(&self) {
        let path = Self::settings_path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            if let Err(e) = std::fs::write(&path, json) {
                tracing::warn!("Failed to save settings: {:?}", e);
            }
        }
    }
}

/// Physical display description, provided by the platform
#[derive(Debug, Clone, Copy)]
pub struct ScreenMetrics {
    pub width_px: i32,
    pub height_px: i32,
    /// Pixels per dip
    pub density: f32,
}

impl ScreenMetrics {
    pub fn px(&self, dip: f32) -> i32 {
        (dip * self.density).round() as i32
    }

    /// Screen extent along the lane's layout axis (lanes are vertical)
    pub fn extent_along_layout_axis(&self) -> i32 {
        self.height_px
    }
}

/// Immutable pixel-space configuration for one overlay activation
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Horizontal extent of a lane (one entry cell wide)
    pub lane_width_px: i32,
    /// Vertical extent of one entry cell
    pub entry_height_px: i32,
    /// Width of the activation strip
    pub sensitivity_px: i32,
    pub activation_offset_position_px: i32,
    pub activation_offset_size_px: i32,
    pub is_on_right_side: bool,
    pub gravity: LauncherGravity,
    /// How many entries fit in one lane
    pub max_visible: usize,
    pub entry_move_step: Duration,
    pub selection_animation: Duration,
    pub frame_default_color: [f32; 4],
}

impl LaunchConfig {
    /// Validate the settings and derive the pixel-space snapshot
    pub fn snapshot(settings: &UserSettings, metrics: &ScreenMetrics) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("image_size_dip", settings.image_size_dip),
            ("image_margin_dip", settings.image_margin_dip),
            ("entry_margin_dip", settings.entry_margin_dip),
            ("sensitivity_dip", settings.sensitivity_dip),
            ("activation_offset_size_dip", settings.activation_offset_size_dip),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeSize { field, value });
            }
        }

        // One entry cell: icon plus icon margin plus entry margin, each on
        // both sides. Entries are square, so this is also the lane width.
        let entry_extent_dip = settings.image_size_dip
            + 2.0 * settings.image_margin_dip
            + 2.0 * settings.entry_margin_dip;
        let entry_extent_px = metrics.px(entry_extent_dip);
        let screen_extent_px = metrics.extent_along_layout_axis();

        if entry_extent_px <= 0 {
            return Err(ConfigError::NoVisibleCapacity {
                entry_extent_px,
                screen_extent_px,
            });
        }

        let max_visible = (screen_extent_px / entry_extent_px) as usize;
        if max_visible == 0 {
            return Err(ConfigError::NoVisibleCapacity {
                entry_extent_px,
                screen_extent_px,
            });
        }

        Ok(Self {
            lane_width_px: entry_extent_px,
            entry_height_px: entry_extent_px,
            sensitivity_px: metrics.px(settings.sensitivity_dip),
            activation_offset_position_px: metrics.px(settings.activation_offset_position_dip),
            activation_offset_size_px: metrics.px(settings.activation_offset_size_dip),
            is_on_right_side: settings.is_on_right_side,
            gravity: settings.gravity,
            max_visible,
            entry_move_step: Duration::from_millis(settings.entry_move_step_ms),
            selection_animation: Duration::from_millis(settings.selection_animation_ms),
            frame_default_color: settings.frame_default_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ScreenMetrics {
        ScreenMetrics {
            width_px: 1080,
            height_px: 2340,
            density: 2.0,
        }
    }

    #[test]
    fn test_snapshot_max_visible() {
        let settings = UserSettings::default();
        let config = LaunchConfig::snapshot(&settings, &metrics()).unwrap();
        // 48 + 2*3 + 2*5 = 64 dip -> 128 px; 2340 / 128 = 18
        assert_eq!(config.entry_height_px, 128);
        assert_eq!(config.max_visible, 18);
    }

    #[test]
    fn test_snapshot_rejects_negative_sizes() {
        let mut settings = UserSettings::default();
        settings.image_margin_dip = -1.0;
        let err = LaunchConfig::snapshot(&settings, &metrics()).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeSize { field: "image_margin_dip", .. }));
    }

    #[test]
    fn test_snapshot_rejects_screen_too_small() {
        let settings = UserSettings::default();
        let tiny = ScreenMetrics {
            width_px: 1080,
            height_px: 100,
            density: 2.0,
        };
        let err = LaunchConfig::snapshot(&settings, &tiny).unwrap_err();
        assert!(matches!(err, ConfigError::NoVisibleCapacity { .. }));
    }

    #[test]
    fn test_settings_roundtrip_defaults() {
        let json = serde_json::to_string(&UserSettings::default()).unwrap();
        let parsed: UserSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.is_on_right_side, true);
        assert_eq!(parsed.entry_move_step_ms, 50);
    }

    #[test]
    fn test_settings_tolerate_missing_fields() {
        let parsed: UserSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.image_size_dip, 48.0);
    }
}
