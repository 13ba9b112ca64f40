// SPDX-License-Identifier: MPL-2.0
//! Crate-wide error type.
//!
//! Every variant is recoverable at the boundary of the component that raised
//! it: the viewer core reports it on the notice channel and keeps running.

use crate::domain::sequence::ImageId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Navigation index outside the sequence bounds.
    #[error("image index {index} is outside the sequence of {len} images")]
    OutOfRange { index: usize, len: usize },

    /// Activation requested for a name that is not a known tool.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A single frame failed to load. The previous frame stays displayed.
    #[error("failed to load image {image}: {reason}")]
    LoadFailure { image: ImageId, reason: String },

    /// One bound slot failed to apply a broadcast.
    #[error("slot {slot} did not apply the update: {reason}")]
    SlotUnresponsive { slot: usize, reason: String },

    /// The last bound slot went away while cine was playing.
    #[error("no rendering surface left while cine was playing")]
    RendererLost,

    /// Layout string or dimensions rejected.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Slot index outside the current layout.
    #[error("slot {0} does not exist in the current layout")]
    NoSuchSlot(usize),

    /// Study / series data source failure.
    #[error("data source error: {0}")]
    Source(String),

    /// The runtime behind a handle has stopped.
    #[error("viewer runtime is not running")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for failures that only affect one frame or one slot.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::LoadFailure { .. } | Error::SlotUnresponsive { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
