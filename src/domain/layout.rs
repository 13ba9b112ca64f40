// SPDX-License-Identifier: MPL-2.0
//! Viewport grid layout.

use crate::config::MAX_GRID_DIMENSION;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a slot in the grid, row-major from the top-left cell.
pub type SlotIndex = usize;

/// Rows × columns of rendering slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridLayout {
    rows: u8,
    cols: u8,
}

impl GridLayout {
    pub const SINGLE: Self = Self { rows: 1, cols: 1 };
    pub const SIDE_BY_SIDE: Self = Self { rows: 1, cols: 2 };
    pub const QUAD: Self = Self { rows: 2, cols: 2 };

    /// Toolbar presets.
    pub const PRESETS: [GridLayout; 3] = [Self::SINGLE, Self::SIDE_BY_SIDE, Self::QUAD];

    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] unless both dimensions are in
    /// `1..=MAX_GRID_DIMENSION`.
    pub fn new(rows: u8, cols: u8) -> Result<Self> {
        let valid = 1..=MAX_GRID_DIMENSION;
        if !valid.contains(&rows) || !valid.contains(&cols) {
            return Err(Error::InvalidLayout(format!(
                "{rows}x{cols} (rows and columns must be between 1 and {MAX_GRID_DIMENSION})"
            )));
        }
        Ok(Self { rows, cols })
    }

    #[must_use]
    pub fn rows(self) -> u8 {
        self.rows
    }

    #[must_use]
    pub fn cols(self) -> u8 {
        self.cols
    }

    #[must_use]
    pub fn slot_count(self) -> usize {
        usize::from(self.rows) * usize::from(self.cols)
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl fmt::Display for GridLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl FromStr for GridLayout {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidLayout(raw.to_string());
        let (rows, cols) = raw
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let rows = rows.trim().parse::<u8>().map_err(|_| invalid())?;
        let cols = cols.trim().parse::<u8>().map_err(|_| invalid())?;
        Self::new(rows, cols)
    }
}

impl TryFrom<String> for GridLayout {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<GridLayout> for String {
    fn from(layout: GridLayout) -> Self {
        layout.to_string()
    }
}
