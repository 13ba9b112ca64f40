// SPDX-License-Identifier: MPL-2.0
//! Application layer - Viewer orchestration.
//!
//! - [`port`]: Traits the rendering and study collaborators implement
//! - [`slots`]: Slot lifecycle and per-slot broadcast
//! - [`broadcaster`]: Shared transform kept identical on every slot
//! - [`tools`]: Exclusive tool activation
//! - [`cine`]: Playback state machine
//! - [`measurements`]: Annotation aggregation
//! - [`loader`]: Load tags and the frame cache
//! - [`notices`]: User-facing error reporting
//! - [`snapshot`]: Read-side views for UIs
//! - [`viewer`]: The core tying all of the above together
//!
//! # Dependency Rule
//!
//! - Application layer depends on domain layer (uses domain types)
//! - Infrastructure layer implements application layer ports
//! - The runtime drives [`viewer::ViewerCore`] from a single task

pub mod broadcaster;
pub mod cine;
pub mod loader;
pub mod measurements;
pub mod notices;
pub mod port;
pub mod slots;
pub mod snapshot;
pub mod tools;
pub mod viewer;

pub use notices::{Notice, Severity};
pub use snapshot::{OverlayInfo, ViewerSnapshot};
pub use viewer::ViewerCore;
