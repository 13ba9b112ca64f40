// SPDX-License-Identifier: MPL-2.0
//! Viewer configuration, loaded from and saved to a `settings.toml` file.
//!
//! # Configuration Sections
//!
//! - `[cine]` - Playback rate
//! - `[display]` - Zoom factors and the default intensity window
//! - `[layout]` - Grid layout used when a viewer starts
//! - `[cache]` - Frame cache size
//!
//! # Path Resolution
//!
//! 1. Explicit directory passed to [`load_with_override`] / [`save_with_override`]
//! 2. The `CINE_LENS_CONFIG_DIR` environment variable
//! 3. The platform config directory (`dirs::config_dir()/CineLens`)
//!
//! # Examples
//!
//! ```no_run
//! use cine_lens::config;
//!
//! let (mut config, _warning) = config::load();
//! config.cine.frame_rate = Some(24);
//! config::save(&config).expect("Failed to save config");
//! ```

pub mod defaults;

pub use defaults::*;

use crate::domain::layout::GridLayout;
use crate::domain::playback::FrameRate;
use crate::domain::transform::{TransformSettings, WindowLevel};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "CineLens";

/// Environment variable overriding the config directory.
pub const ENV_CONFIG_DIR: &str = "CINE_LENS_CONFIG_DIR";

// =============================================================================
// Section Structs
// =============================================================================

/// Playback settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CineConfig {
    /// Frames per second, clamped to 1..=30 when used.
    #[serde(default = "default_frame_rate", skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
}

impl Default for CineConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
        }
    }
}

/// Zoom and window settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(
        default = "default_zoom_in_factor",
        skip_serializing_if = "Option::is_none"
    )]
    pub zoom_in_factor: Option<f64>,

    #[serde(
        default = "default_zoom_out_factor",
        skip_serializing_if = "Option::is_none"
    )]
    pub zoom_out_factor: Option<f64>,

    /// Window width restored by a transform reset.
    #[serde(
        default = "default_window_width",
        skip_serializing_if = "Option::is_none"
    )]
    pub window_width: Option<f64>,

    /// Window center restored by a transform reset.
    #[serde(
        default = "default_window_center",
        skip_serializing_if = "Option::is_none"
    )]
    pub window_center: Option<f64>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            zoom_in_factor: default_zoom_in_factor(),
            zoom_out_factor: default_zoom_out_factor(),
            window_width: default_window_width(),
            window_center: default_window_center(),
        }
    }
}

/// Grid layout settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    /// Layout string such as `"1x2"`.
    #[serde(default = "default_layout", skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default: default_layout(),
        }
    }
}

/// Frame cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Images kept in memory; 0 disables the cache.
    #[serde(
        default = "default_frame_cache_images",
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_cache_images: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            frame_cache_images: default_frame_cache_images(),
        }
    }
}

// =============================================================================
// Main Config Struct (Sectioned)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub cine: CineConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Configured playback rate, clamped to the supported range.
    #[must_use]
    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::new(self.cine.frame_rate.unwrap_or(DEFAULT_FRAME_RATE))
    }

    /// Zoom factors and reset window used by transform operations.
    #[must_use]
    pub fn transform_settings(&self) -> TransformSettings {
        let display = &self.display;
        TransformSettings {
            zoom_in_factor: positive_or(display.zoom_in_factor, DEFAULT_ZOOM_IN_FACTOR),
            zoom_out_factor: positive_or(display.zoom_out_factor, DEFAULT_ZOOM_OUT_FACTOR),
            default_window: WindowLevel::new(
                display.window_width.unwrap_or(DEFAULT_WINDOW_WIDTH),
                display.window_center.unwrap_or(DEFAULT_WINDOW_CENTER),
            ),
        }
    }

    /// Startup layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] when the configured string is not a
    /// valid `RxC` layout.
    pub fn layout(&self) -> Result<GridLayout> {
        self.layout
            .default
            .as_deref()
            .unwrap_or(DEFAULT_LAYOUT)
            .parse()
    }

    /// Frame cache capacity in images.
    #[must_use]
    pub fn frame_cache_capacity(&self) -> usize {
        self.cache
            .frame_cache_images
            .unwrap_or(DEFAULT_FRAME_CACHE_IMAGES)
            .min(MAX_FRAME_CACHE_IMAGES)
    }
}

fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => fallback,
    }
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_frame_rate() -> Option<u32> {
    Some(DEFAULT_FRAME_RATE)
}

fn default_zoom_in_factor() -> Option<f64> {
    Some(DEFAULT_ZOOM_IN_FACTOR)
}

fn default_zoom_out_factor() -> Option<f64> {
    Some(DEFAULT_ZOOM_OUT_FACTOR)
}

fn default_window_width() -> Option<f64> {
    Some(DEFAULT_WINDOW_WIDTH)
}

fn default_window_center() -> Option<f64> {
    Some(DEFAULT_WINDOW_CENTER)
}

fn default_layout() -> Option<String> {
    Some(DEFAULT_LAYOUT.to_string())
}

fn default_frame_cache_images() -> Option<usize> {
    Some(DEFAULT_FRAME_CACHE_IMAGES)
}

// =============================================================================
// Config Path Resolution
// =============================================================================

/// Returns the config directory, honoring the override and then the
/// environment variable before falling back to the platform directory.
#[must_use]
pub fn config_dir_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(dir) = base_dir {
        return Some(dir);
    }
    if let Some(dir) = std::env::var_os(ENV_CONFIG_DIR).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path
    })
}

fn get_config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    config_dir_with_override(base_dir).map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

// =============================================================================
// Load Functions
// =============================================================================

/// Loads the configuration from the default path.
///
/// Returns a tuple of (config, optional_warning). A missing file yields the
/// defaults silently; an unreadable or corrupt file yields the defaults plus a
/// warning explaining what went wrong.
pub fn load() -> (Config, Option<String>) {
    load_with_override(None)
}

/// Loads the configuration from a custom directory.
pub fn load_with_override(base_dir: Option<PathBuf>) -> (Config, Option<String>) {
    if let Some(path) = get_config_path_with_override(base_dir) {
        if path.exists() {
            match load_from_path(&path) {
                Ok(config) => return (config, None),
                Err(err) => {
                    log::warn!("ignoring config at {}: {err}", path.display());
                    return (
                        Config::default(),
                        Some(format!("could not load {}: {err}", path.display())),
                    );
                }
            }
        }
    }
    (Config::default(), None)
}

/// Loads configuration from a specific path.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Config`]
/// when it is not valid TOML for [`Config`].
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

// =============================================================================
// Save Functions
// =============================================================================

/// Saves the configuration to the default path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save(config: &Config) -> Result<()> {
    save_with_override(config, None)
}

/// Saves the configuration to a custom directory.
///
/// # Errors
///
/// Returns [`Error::Config`] when no config directory can be determined, or
/// the underlying I/O error.
pub fn save_with_override(config: &Config, base_dir: Option<PathBuf>) -> Result<()> {
    let path = get_config_path_with_override(base_dir)
        .ok_or_else(|| Error::Config("no config directory available".to_string()))?;
    save_to_path(config, &path)
}

/// Saves configuration to a specific path, creating parent directories.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_abs_diff_eq;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip_preserves_sections() {
        let mut config = Config::default();
        config.cine.frame_rate = Some(24);
        config.layout.default = Some("2x2".to_string());
        config.cache.frame_cache_images = Some(0);

        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        save_to_path(&config, &config_path).expect("failed to save config");
        let loaded = load_from_path(&config_path).expect("failed to load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let loaded: Config = toml::from_str("[cine]\nframe_rate = 5\n").expect("valid toml");
        assert_eq!(loaded.cine.frame_rate, Some(5));
        assert_eq!(loaded.display, DisplayConfig::default());
        assert_eq!(loaded.layout.default.as_deref(), Some("1x1"));
        assert_eq!(loaded.frame_cache_capacity(), DEFAULT_FRAME_CACHE_IMAGES);
    }

    #[test]
    fn load_with_override_returns_warning_on_invalid_toml() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        fs::write(temp_dir.path().join(CONFIG_FILE), "not = valid = toml")
            .expect("failed to write invalid toml");

        let (config, warning) = load_with_override(Some(temp_dir.path().to_path_buf()));
        assert_eq!(config, Config::default());
        assert!(warning.is_some());
    }

    #[test]
    fn load_with_override_without_file_is_silent() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let (config, warning) = load_with_override(Some(temp_dir.path().to_path_buf()));
        assert_eq!(config, Config::default());
        assert!(warning.is_none());
    }

    #[test]
    fn save_with_override_writes_settings_file() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let base = temp_dir.path().join("deep").join("path");

        save_with_override(&Config::default(), Some(base.clone())).expect("save");
        assert!(base.join(CONFIG_FILE).exists());
    }

    #[test]
    fn frame_rate_is_clamped() {
        let mut config = Config::default();
        config.cine.frame_rate = Some(120);
        assert_eq!(config.frame_rate().fps(), MAX_FRAME_RATE);
        config.cine.frame_rate = Some(0);
        assert_eq!(config.frame_rate().fps(), MIN_FRAME_RATE);
    }

    #[test]
    fn transform_settings_fall_back_on_nonsense_factors() {
        let mut config = Config::default();
        config.display.zoom_in_factor = Some(-3.0);
        config.display.window_width = Some(1500.0);
        config.display.window_center = Some(-600.0);

        let settings = config.transform_settings();
        assert_abs_diff_eq!(settings.zoom_in_factor, DEFAULT_ZOOM_IN_FACTOR);
        assert_abs_diff_eq!(settings.default_window.width(), 1500.0);
        assert_abs_diff_eq!(settings.default_window.center(), -600.0);
    }

    #[test]
    fn invalid_layout_is_reported() {
        let mut config = Config::default();
        config.layout.default = Some("9x9".to_string());
        assert!(matches!(config.layout(), Err(Error::InvalidLayout(_))));
    }

    #[test]
    fn cache_capacity_is_capped() {
        let mut config = Config::default();
        config.cache.frame_cache_images = Some(usize::MAX);
        assert_eq!(config.frame_cache_capacity(), MAX_FRAME_CACHE_IMAGES);
    }
}
