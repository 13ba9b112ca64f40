// SPDX-License-Identifier: MPL-2.0
//! Shared test helpers.
//!
//! Transform values are `f64` throughout, so float assertions go through the
//! `approx` macros re-exported here rather than `assert_eq!`.

pub use approx::assert_abs_diff_eq;

/// Tolerance for scale, pan and window values that went through a few
/// multiplications.
pub const TRANSFORM_EPSILON: f64 = 1e-9;
