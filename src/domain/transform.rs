// SPDX-License-Identifier: MPL-2.0
//! Viewport transform value types.
//!
//! A [`TransformState`] is shared by every bound slot of the grid. All visual
//! operations (zoom, pan, rotation, flips, inversion, window/level, reset) are
//! expressed as pure `TransformState -> TransformState` functions, collected in
//! [`TransformOp`], so there is never per-operation state on the side.

use crate::config::{
    DEFAULT_WINDOW_CENTER, DEFAULT_WINDOW_WIDTH, DEFAULT_ZOOM_IN_FACTOR, DEFAULT_ZOOM_OUT_FACTOR,
    MAX_SCALE, MIN_SCALE, MIN_WINDOW_WIDTH,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// RotationAngle
// =============================================================================

/// Rotation angle in 90° increments.
///
/// The value is always one of 0°, 90°, 180° or 270°.
///
/// # Example
///
/// ```
/// use cine_lens::domain::transform::RotationAngle;
///
/// let angle = RotationAngle::default().rotate_clockwise();
/// assert_eq!(angle.degrees(), 90);
/// assert_eq!(angle.rotate_counterclockwise().degrees(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u16")]
pub struct RotationAngle(u16);

impl RotationAngle {
    pub const ZERO: Self = Self(0);

    /// Normalizes to the nearest lower 90° step, wrapped into 0..360.
    #[must_use]
    pub fn new(degrees: u16) -> Self {
        Self(((degrees / 90) * 90) % 360)
    }

    #[must_use]
    pub fn degrees(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn rotate_clockwise(self) -> Self {
        Self((self.0 + 90) % 360)
    }

    #[must_use]
    pub fn rotate_counterclockwise(self) -> Self {
        Self((self.0 + 270) % 360)
    }

    #[must_use]
    pub fn is_rotated(self) -> bool {
        self.0 != 0
    }

    /// True for 90° and 270°, where width and height trade places.
    #[must_use]
    pub fn swaps_dimensions(self) -> bool {
        self.0 == 90 || self.0 == 270
    }
}

impl From<u16> for RotationAngle {
    fn from(degrees: u16) -> Self {
        Self::new(degrees)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

// =============================================================================
// ZoomScale
// =============================================================================

/// Zoom scale factor, clamped to `[MIN_SCALE, MAX_SCALE]` (1.0 = fit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64")]
pub struct ZoomScale(f64);

impl ZoomScale {
    pub const FIT: Self = Self(1.0);

    #[must_use]
    pub fn new(scale: f64) -> Self {
        if scale.is_nan() {
            return Self::FIT;
        }
        Self(scale.clamp(MIN_SCALE, MAX_SCALE))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn scaled_by(self, factor: f64) -> Self {
        Self::new(self.0 * factor)
    }

    /// Scale as a rounded percentage (1.2 → 120).
    #[must_use]
    pub fn percent(self) -> f64 {
        (self.0 * 100.0).round()
    }

    #[must_use]
    pub fn is_min(self) -> bool {
        self.0 <= MIN_SCALE
    }

    #[must_use]
    pub fn is_max(self) -> bool {
        self.0 >= MAX_SCALE
    }
}

impl Default for ZoomScale {
    fn default() -> Self {
        Self::FIT
    }
}

impl From<f64> for ZoomScale {
    fn from(scale: f64) -> Self {
        Self::new(scale)
    }
}

// =============================================================================
// PanOffset / WindowLevel
// =============================================================================

/// Translation of the image inside the viewport, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

impl PanOffset {
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Intensity window (VOI). Width is kept at or above `MIN_WINDOW_WIDTH`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWindowLevel")]
pub struct WindowLevel {
    width: f64,
    center: f64,
}

#[derive(Deserialize)]
struct RawWindowLevel {
    width: f64,
    center: f64,
}

impl From<RawWindowLevel> for WindowLevel {
    fn from(raw: RawWindowLevel) -> Self {
        Self::new(raw.width, raw.center)
    }
}

impl WindowLevel {
    #[must_use]
    pub fn new(width: f64, center: f64) -> Self {
        let width = if width.is_nan() {
            DEFAULT_WINDOW_WIDTH
        } else {
            width.max(MIN_WINDOW_WIDTH)
        };
        Self { width, center }
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn center(self) -> f64 {
        self.center
    }
}

impl Default for WindowLevel {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_CENTER)
    }
}

// =============================================================================
// TransformState
// =============================================================================

/// The visual transform shared by all bound slots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformState {
    pub scale: ZoomScale,
    pub pan: PanOffset,
    pub rotation: RotationAngle,
    pub horizontal_flip: bool,
    pub vertical_flip: bool,
    pub window: WindowLevel,
    pub inverted: bool,
}

impl TransformState {
    /// Default transform with a specific window.
    #[must_use]
    pub fn with_default_window(window: WindowLevel) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn zoomed_by(mut self, factor: f64) -> Self {
        self.scale = self.scale.scaled_by(factor);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = ZoomScale::new(scale);
        self
    }

    #[must_use]
    pub fn panned_by(mut self, dx: f64, dy: f64) -> Self {
        self.pan = self.pan.translated(dx, dy);
        self
    }

    #[must_use]
    pub fn rotated(mut self, direction: RotateDirection) -> Self {
        self.rotation = match direction {
            RotateDirection::Clockwise => self.rotation.rotate_clockwise(),
            RotateDirection::CounterClockwise => self.rotation.rotate_counterclockwise(),
        };
        self
    }

    #[must_use]
    pub fn flipped_horizontally(mut self) -> Self {
        self.horizontal_flip = !self.horizontal_flip;
        self
    }

    #[must_use]
    pub fn flipped_vertically(mut self) -> Self {
        self.vertical_flip = !self.vertical_flip;
        self
    }

    #[must_use]
    pub fn toggled_inversion(mut self) -> Self {
        self.inverted = !self.inverted;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: WindowLevel) -> Self {
        self.window = window;
        self
    }
}

// =============================================================================
// TransformOp
// =============================================================================

/// Tunables used when applying a [`TransformOp`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSettings {
    pub zoom_in_factor: f64,
    pub zoom_out_factor: f64,
    /// Window restored by [`TransformOp::Reset`].
    pub default_window: WindowLevel,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            zoom_in_factor: DEFAULT_ZOOM_IN_FACTOR,
            zoom_out_factor: DEFAULT_ZOOM_OUT_FACTOR,
            default_window: WindowLevel::default(),
        }
    }
}

/// A named transform mutation, as issued by the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformOp {
    ZoomIn,
    ZoomOut,
    /// Back to scale 1.0.
    Fit,
    ZoomTo(f64),
    PanBy { dx: f64, dy: f64 },
    Rotate(RotateDirection),
    FlipHorizontal,
    FlipVertical,
    Invert,
    SetWindow { width: f64, center: f64 },
    Reset,
}

impl TransformOp {
    /// Applies this operation to `state`.
    #[must_use]
    pub fn apply(self, state: TransformState, settings: &TransformSettings) -> TransformState {
        match self {
            TransformOp::ZoomIn => state.zoomed_by(settings.zoom_in_factor),
            TransformOp::ZoomOut => state.zoomed_by(settings.zoom_out_factor),
            TransformOp::Fit => state.with_scale(1.0),
            TransformOp::ZoomTo(scale) => state.with_scale(scale),
            TransformOp::PanBy { dx, dy } => state.panned_by(dx, dy),
            TransformOp::Rotate(direction) => state.rotated(direction),
            TransformOp::FlipHorizontal => state.flipped_horizontally(),
            TransformOp::FlipVertical => state.flipped_vertically(),
            TransformOp::Invert => state.toggled_inversion(),
            TransformOp::SetWindow { width, center } => {
                state.with_window(WindowLevel::new(width, center))
            }
            TransformOp::Reset => TransformState::with_default_window(settings.default_window),
        }
    }
}
