// SPDX-License-Identifier: MPL-2.0
//! Infrastructure layer adapters.
//!
//! Concrete implementations of the port traits defined in
//! `application::port`.
//!
//! # Available Adapters
//!
//! - [`headless`]: In-memory rendering backend (implements [`RenderBackend`])
//! - [`memory`]: In-memory study source (implements [`StudySource`])
//!
//! [`RenderBackend`]: crate::application::port::RenderBackend
//! [`StudySource`]: crate::application::port::StudySource

pub mod headless;
pub mod memory;

pub use headless::{HeadlessBackend, HeadlessImage, HeadlessProbe};
pub use memory::{InMemoryStudySource, DEMO_FRAMES, DEMO_SERIES};
