// SPDX-License-Identifier: MPL-2.0
//! Rendering collaborator port.
//!
//! The viewer core never touches pixels. Everything visual goes through a
//! [`RenderBackend`]: enabling surfaces, loading and displaying images,
//! pushing transforms, switching tool modes and reading annotations back.
//! Notifications flow the other way as [`RenderEvent`] values.

use crate::domain::measurement::Annotation;
use crate::domain::sequence::ImageId;
use crate::domain::study::InstanceInfo;
use crate::domain::tool::{Tool, ToolOptions};
use crate::domain::transform::TransformState;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SurfaceId
// =============================================================================

/// Opaque handle of one rendering surface (a canvas, a texture, a window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(u64);

impl SurfaceId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

// =============================================================================
// BackendError
// =============================================================================

/// Errors reported by a rendering backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The surface was never enabled, or has been torn down.
    SurfaceGone(SurfaceId),

    /// The image could not be found by the loader.
    ImageNotFound(ImageId),

    /// The image was found but could not be decoded.
    Decode(String),

    /// Any other backend failure.
    Other(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::SurfaceGone(surface) => write!(f, "{surface} is not available"),
            BackendError::ImageNotFound(id) => write!(f, "image not found: {id}"),
            BackendError::Decode(msg) => write!(f, "decode failed: {msg}"),
            BackendError::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for BackendError {}

// =============================================================================
// RenderEvent
// =============================================================================

/// Notification emitted by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    /// A surface finished drawing a frame.
    RenderCompleted { surface: SurfaceId },
    AnnotationCreated { surface: SurfaceId, tool: Tool },
    AnnotationModified { surface: SurfaceId, tool: Tool },
    AnnotationRemoved { surface: SurfaceId, tool: Tool },
}

impl RenderEvent {
    #[must_use]
    pub fn surface(self) -> SurfaceId {
        match self {
            RenderEvent::RenderCompleted { surface }
            | RenderEvent::AnnotationCreated { surface, .. }
            | RenderEvent::AnnotationModified { surface, .. }
            | RenderEvent::AnnotationRemoved { surface, .. } => surface,
        }
    }

    #[must_use]
    pub fn is_annotation_change(self) -> bool {
        !matches!(self, RenderEvent::RenderCompleted { .. })
    }
}

// =============================================================================
// RenderBackend Trait
// =============================================================================

/// Future returned by [`RenderBackend::load_image`].
pub type LoadFuture<I> = BoxFuture<'static, Result<I, BackendError>>;

/// Port for the rendering collaborator.
///
/// All methods except [`load_image`](Self::load_image) are synchronous and
/// called from the task that owns the viewer core. Loading returns a
/// `'static` future so that it can run as a separate task; implementations
/// clone whatever handle they need into it.
///
/// Redraw requests are fire-and-forget. A backend only has to keep the most
/// recent transform per surface.
pub trait RenderBackend: Send + 'static {
    /// Decoded image handle. Cloned into the frame cache, so it should be cheap.
    type Image: Clone + Send + 'static;

    /// Prepares a surface for drawing.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be used.
    fn enable(&mut self, surface: SurfaceId) -> Result<(), BackendError>;

    /// Releases a surface. Never fails; releasing an unknown surface is a no-op.
    fn disable(&mut self, surface: SurfaceId);

    /// Starts loading an image.
    fn load_image(&self, id: &ImageId) -> LoadFuture<Self::Image>;

    /// Shows a loaded image on a surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is gone.
    fn display_image(&mut self, surface: SurfaceId, image: &Self::Image)
        -> Result<(), BackendError>;

    /// Reads the transform currently applied by the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is gone.
    fn transform(&self, surface: SurfaceId) -> Result<TransformState, BackendError>;

    /// Replaces the transform of a surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is gone.
    fn set_transform(
        &mut self,
        surface: SurfaceId,
        state: &TransformState,
    ) -> Result<(), BackendError>;

    /// Asks the surface to draw again with its current state.
    fn request_redraw(&mut self, surface: SurfaceId);

    /// Makes `tool` react to pointer input on the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is gone.
    fn set_tool_active(
        &mut self,
        surface: SurfaceId,
        tool: Tool,
        options: ToolOptions,
    ) -> Result<(), BackendError>;

    /// Keeps `tool`'s annotations visible but stops it reacting to input.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is gone.
    fn set_tool_passive(&mut self, surface: SurfaceId, tool: Tool) -> Result<(), BackendError>;

    /// Annotations of one kind currently held by the surface, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is gone.
    fn annotations(&self, surface: SurfaceId, kind: Tool) -> Result<Vec<Annotation>, BackendError>;

    /// Removes every annotation of one kind from the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is gone.
    fn clear_annotations(&mut self, surface: SurfaceId, kind: Tool) -> Result<(), BackendError>;

    /// Series / instance numbers of an image, when the backend knows them.
    fn instance_info(&self, _id: &ImageId) -> Option<InstanceInfo> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        let err = BackendError::SurfaceGone(SurfaceId::new(3));
        assert_eq!(err.to_string(), "surface#3 is not available");

        let err = BackendError::ImageNotFound(ImageId::new("wadouri:x"));
        assert!(err.to_string().contains("wadouri:x"));

        let err = BackendError::Decode("truncated".to_string());
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn render_event_surface_and_kind() {
        let surface = SurfaceId::new(7);
        let completed = RenderEvent::RenderCompleted { surface };
        let created = RenderEvent::AnnotationCreated {
            surface,
            tool: Tool::Length,
        };

        assert_eq!(completed.surface(), surface);
        assert!(!completed.is_annotation_change());
        assert!(created.is_annotation_change());
    }
}
