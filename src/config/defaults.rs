// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! This module is the single source of truth for the defaults and bounds used
//! across the viewer core. Constants are organized by category.

// ==========================================================================
// Cine Defaults
// ==========================================================================

/// Default playback rate in frames per second.
pub const DEFAULT_FRAME_RATE: u32 = 10;

/// Minimum playback rate.
pub const MIN_FRAME_RATE: u32 = 1;

/// Maximum playback rate.
pub const MAX_FRAME_RATE: u32 = 30;

// ==========================================================================
// Zoom Defaults
// ==========================================================================

/// Scale multiplier applied by "zoom in".
pub const DEFAULT_ZOOM_IN_FACTOR: f64 = 1.2;

/// Scale multiplier applied by "zoom out".
pub const DEFAULT_ZOOM_OUT_FACTOR: f64 = 0.8;

/// Smallest viewport scale.
pub const MIN_SCALE: f64 = 0.05;

/// Largest viewport scale.
pub const MAX_SCALE: f64 = 20.0;

// ==========================================================================
// Window / Level Defaults
// ==========================================================================

/// Default window width (soft tissue).
pub const DEFAULT_WINDOW_WIDTH: f64 = 400.0;

/// Default window center (soft tissue).
pub const DEFAULT_WINDOW_CENTER: f64 = 40.0;

/// Window width floor.
pub const MIN_WINDOW_WIDTH: f64 = 1.0;

// ==========================================================================
// Layout Defaults
// ==========================================================================

/// Layout used when nothing else is configured.
pub const DEFAULT_LAYOUT: &str = "1x1";

/// Maximum rows or columns of the viewport grid.
pub const MAX_GRID_DIMENSION: u8 = 4;

// ==========================================================================
// Cache / Channel Defaults
// ==========================================================================

/// Number of decoded images kept by the frame cache.
pub const DEFAULT_FRAME_CACHE_IMAGES: usize = 32;

/// Upper bound for the frame cache size.
pub const MAX_FRAME_CACHE_IMAGES: usize = 1024;

/// Notices kept in the recent history.
pub const NOTICE_HISTORY_LEN: usize = 16;

/// Capacity of the notice broadcast channel.
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the command queue of the runtime.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_default_is_within_bounds() {
        assert!((MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&DEFAULT_FRAME_RATE));
    }

    #[test]
    fn zoom_factors_move_in_opposite_directions() {
        assert!(DEFAULT_ZOOM_IN_FACTOR > 1.0);
        assert!(DEFAULT_ZOOM_OUT_FACTOR < 1.0);
        assert!(MIN_SCALE < 1.0 && MAX_SCALE > 1.0);
    }

    #[test]
    fn cache_default_is_within_bounds() {
        assert!(DEFAULT_FRAME_CACHE_IMAGES <= MAX_FRAME_CACHE_IMAGES);
    }
}
