// SPDX-License-Identifier: MPL-2.0
//! Image sequence navigation.
//!
//! [`SequenceNavigator`] owns the ordered list of image identifiers of the
//! open series and the current index. It is pure index arithmetic.
//!
//! Two edge policies coexist on purpose:
//! - manual navigation ([`SequenceNavigator::advance`]) clamps at both ends,
//! - playback ([`SequenceNavigator::cine_step`]) wraps from the last image to
//!   the first.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one image (for example a `wadouri:` URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ImageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Direction of manual navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Next,
    Previous,
}

/// Snapshot of the navigation state for UI rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SequencePosition {
    /// Current position (0-indexed), `None` when the sequence is empty.
    pub index: Option<usize>,
    /// Total number of images in the sequence.
    pub len: usize,
}

impl SequencePosition {
    /// Whether a manual step in `direction` would move.
    #[must_use]
    pub fn can_advance(&self, direction: Direction) -> bool {
        match (self.index, direction) {
            (Some(index), Direction::Next) => index + 1 < self.len,
            (Some(index), Direction::Previous) => index > 0,
            (None, _) => false,
        }
    }

    /// Human readable "Image: 3 / 10" label (1-indexed).
    #[must_use]
    pub fn label(&self) -> String {
        let shown = self.index.map_or(0, |index| index + 1);
        format!("Image: {shown} / {}", self.len)
    }
}

/// Ordered image list plus the current index.
///
/// The generation counts [`set_sequence`](Self::set_sequence) calls, so an
/// index can be tied to the sequence it was taken from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceNavigator {
    ids: Vec<ImageId>,
    current: Option<usize>,
    generation: u64,
}

impl SequenceNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a navigator positioned on the first image of `ids`.
    #[must_use]
    pub fn from_ids(ids: Vec<ImageId>) -> Self {
        let mut navigator = Self::new();
        navigator.set_sequence(ids);
        navigator
    }

    /// Replaces the sequence wholesale and resets the index.
    pub fn set_sequence(&mut self, ids: Vec<ImageId>) {
        self.current = if ids.is_empty() { None } else { Some(0) };
        self.ids = ids;
        self.generation += 1;
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> &[ImageId] {
        &self.ids
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current_id(&self) -> Option<&ImageId> {
        self.current.and_then(|index| self.ids.get(index))
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ImageId> {
        self.ids.get(index)
    }

    /// Moves one step in `direction`, clamping at both ends.
    ///
    /// Returns the new index, or `None` when the step was a no-op (empty
    /// sequence, or already at the boundary).
    pub fn advance(&mut self, direction: Direction) -> Option<usize> {
        let current = self.current?;
        let target = match direction {
            Direction::Next if current + 1 < self.ids.len() => current + 1,
            Direction::Previous if current > 0 => current - 1,
            _ => return None,
        };
        self.current = Some(target);
        Some(target)
    }

    /// Jumps to `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] without touching the current index when
    /// `index` is not within `[0, len - 1]`.
    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        if index >= self.ids.len() {
            return Err(Error::OutOfRange {
                index,
                len: self.ids.len(),
            });
        }
        self.current = Some(index);
        Ok(())
    }

    /// Advances for playback, wrapping from the last image back to 0.
    ///
    /// Returns `None` only for an empty sequence.
    pub fn cine_step(&mut self) -> Option<usize> {
        let current = self.current?;
        let next = (current + 1) % self.ids.len();
        self.current = Some(next);
        Some(next)
    }

    #[must_use]
    pub fn position(&self) -> SequencePosition {
        SequencePosition {
            index: self.current,
            len: self.ids.len(),
        }
    }
}
