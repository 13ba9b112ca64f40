// SPDX-License-Identifier: MPL-2.0
//! Port definitions (traits) for dependency inversion.
//!
//! # Available Ports
//!
//! - [`render`]: Rendering collaborator (surfaces, image loading, tools, annotations)
//! - [`study`]: Study data source (series lookup)
//!
//! # Design Notes
//!
//! - Traits use domain types only
//! - Asynchronous methods return boxed `'static` futures so callers can spawn them
//! - Failures are values ([`BackendError`], [`crate::error::Error`]), never panics

pub mod render;
pub mod study;

pub use render::{BackendError, LoadFuture, RenderBackend, RenderEvent, SurfaceId};
pub use study::{SeriesId, SeriesRecord, StudySource};
