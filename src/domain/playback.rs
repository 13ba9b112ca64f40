// SPDX-License-Identifier: MPL-2.0
//! Cine playback value types.

use crate::config::{DEFAULT_FRAME_RATE, MAX_FRAME_RATE, MIN_FRAME_RATE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback rate in frames per second, guaranteed to be within 1..=30.
///
/// # Example
///
/// ```
/// use cine_lens::domain::playback::FrameRate;
/// use std::time::Duration;
///
/// let rate = FrameRate::new(10);
/// assert_eq!(rate.interval(), Duration::from_millis(100));
///
/// // Values outside range are clamped
/// assert_eq!(FrameRate::new(120).fps(), 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameRate(u32);

impl FrameRate {
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self(fps.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE))
    }

    #[must_use]
    pub fn fps(self) -> u32 {
        self.0
    }

    /// Time between two cine ticks.
    #[must_use]
    pub fn interval(self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.0))
    }

    #[must_use]
    pub fn is_min(self) -> bool {
        self.0 == MIN_FRAME_RATE
    }

    #[must_use]
    pub fn is_max(self) -> bool {
        self.0 == MAX_FRAME_RATE
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(DEFAULT_FRAME_RATE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CineState {
    #[default]
    Stopped,
    Playing,
}

impl CineState {
    #[must_use]
    pub fn is_playing(self) -> bool {
        self == CineState::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_to_valid_range() {
        assert_eq!(FrameRate::new(0).fps(), MIN_FRAME_RATE);
        assert_eq!(FrameRate::new(31).fps(), MAX_FRAME_RATE);
        assert_eq!(FrameRate::new(24).fps(), 24);
        assert!(FrameRate::new(0).is_min());
        assert!(FrameRate::new(99).is_max());
    }

    #[test]
    fn default_is_ten_fps() {
        assert_eq!(FrameRate::default().fps(), 10);
        assert_eq!(FrameRate::default().interval(), Duration::from_millis(100));
    }

    #[test]
    fn interval_shrinks_with_rate() {
        assert_eq!(FrameRate::new(1).interval(), Duration::from_secs(1));
        assert_eq!(FrameRate::new(30).interval(), Duration::from_micros(33_333));
    }

    #[test]
    fn initial_state_is_stopped() {
        assert!(!CineState::default().is_playing());
    }
}
