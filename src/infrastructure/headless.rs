// SPDX-License-Identifier: MPL-2.0
//! In-memory rendering backend.
//!
//! [`HeadlessBackend`] implements [`RenderBackend`] without drawing anything.
//! It records what the viewer asked of each surface so that tests, benches
//! and the demo binary can inspect it through a [`HeadlessProbe`], and it can
//! be told to fail specific surfaces or images and to delay loads.
//!
//! The backend and every probe share one state behind a mutex; the backend
//! itself is only ever driven from the task owning the viewer core.

use crate::application::port::render::{
    BackendError, LoadFuture, RenderBackend, RenderEvent, SurfaceId,
};
use crate::domain::measurement::Annotation;
use crate::domain::sequence::ImageId;
use crate::domain::study::InstanceInfo;
use crate::domain::tool::{Tool, ToolOptions};
use crate::domain::transform::TransformState;
use futures_util::future::{self, FutureExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Side length reported for every headless image.
const IMAGE_SIZE: u32 = 512;

/// A "decoded" headless image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessImage {
    pub id: ImageId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolMode {
    Active,
    Passive,
}

#[derive(Debug, Default)]
struct SurfaceRecord {
    enabled: bool,
    transform: Option<TransformState>,
    redraws: usize,
    tools: BTreeMap<Tool, ToolMode>,
    history: Vec<ImageId>,
    annotations: BTreeMap<Tool, Vec<Annotation>>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    surfaces: HashMap<SurfaceId, SurfaceRecord>,
    failing_surfaces: HashSet<SurfaceId>,
    failing_images: HashSet<ImageId>,
    delays: HashMap<ImageId, Duration>,
    default_delay: Duration,
    loads: Vec<ImageId>,
    instances: HashMap<ImageId, InstanceInfo>,
    events: Option<mpsc::UnboundedSender<RenderEvent>>,
}

impl HeadlessState {
    /// The record of a usable surface.
    fn surface_mut(&mut self, surface: SurfaceId) -> Result<&mut SurfaceRecord, BackendError> {
        if self.failing_surfaces.contains(&surface) {
            return Err(BackendError::SurfaceGone(surface));
        }
        match self.surfaces.get_mut(&surface) {
            Some(record) if record.enabled => Ok(record),
            _ => Err(BackendError::SurfaceGone(surface)),
        }
    }

    fn surface(&self, surface: SurfaceId) -> Result<&SurfaceRecord, BackendError> {
        if self.failing_surfaces.contains(&surface) {
            return Err(BackendError::SurfaceGone(surface));
        }
        match self.surfaces.get(&surface) {
            Some(record) if record.enabled => Ok(record),
            _ => Err(BackendError::SurfaceGone(surface)),
        }
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(events) = &self.events {
            // The receiver going away only means nobody listens any more.
            let _ = events.send(event);
        }
    }
}

type Shared = Arc<Mutex<HeadlessState>>;

fn lock(state: &Shared) -> MutexGuard<'_, HeadlessState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rendering backend that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Shared,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits render notifications on `events`, the way a real renderer would.
    #[must_use]
    pub fn with_events(self, events: mpsc::UnboundedSender<RenderEvent>) -> Self {
        lock(&self.state).events = Some(events);
        self
    }

    /// Inspection and fault-injection handle sharing this backend's state.
    #[must_use]
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl RenderBackend for HeadlessBackend {
    type Image = HeadlessImage;

    fn enable(&mut self, surface: SurfaceId) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        if state.failing_surfaces.contains(&surface) {
            return Err(BackendError::SurfaceGone(surface));
        }
        state.surfaces.entry(surface).or_default().enabled = true;
        Ok(())
    }

    fn disable(&mut self, surface: SurfaceId) {
        if let Some(record) = lock(&self.state).surfaces.get_mut(&surface) {
            record.enabled = false;
        }
    }

    fn load_image(&self, id: &ImageId) -> LoadFuture<HeadlessImage> {
        let (delay, result) = {
            let mut state = lock(&self.state);
            state.loads.push(id.clone());
            let delay = state
                .delays
                .get(id)
                .copied()
                .unwrap_or(state.default_delay);
            let result = if state.failing_images.contains(id) {
                Err(BackendError::ImageNotFound(id.clone()))
            } else {
                Ok(HeadlessImage {
                    id: id.clone(),
                    width: IMAGE_SIZE,
                    height: IMAGE_SIZE,
                })
            };
            (delay, result)
        };
        if delay.is_zero() {
            future::ready(result).boxed()
        } else {
            async move {
                tokio::time::sleep(delay).await;
                result
            }
            .boxed()
        }
    }

    fn display_image(
        &mut self,
        surface: SurfaceId,
        image: &HeadlessImage,
    ) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        state.surface_mut(surface)?.history.push(image.id.clone());
        state.emit(RenderEvent::RenderCompleted { surface });
        Ok(())
    }

    fn transform(&self, surface: SurfaceId) -> Result<TransformState, BackendError> {
        let state = lock(&self.state);
        Ok(state.surface(surface)?.transform.unwrap_or_default())
    }

    fn set_transform(
        &mut self,
        surface: SurfaceId,
        transform: &TransformState,
    ) -> Result<(), BackendError> {
        lock(&self.state).surface_mut(surface)?.transform = Some(*transform);
        Ok(())
    }

    fn request_redraw(&mut self, surface: SurfaceId) {
        let mut state = lock(&self.state);
        if let Ok(record) = state.surface_mut(surface) {
            record.redraws += 1;
            state.emit(RenderEvent::RenderCompleted { surface });
        }
    }

    fn set_tool_active(
        &mut self,
        surface: SurfaceId,
        tool: Tool,
        _options: ToolOptions,
    ) -> Result<(), BackendError> {
        lock(&self.state)
            .surface_mut(surface)?
            .tools
            .insert(tool, ToolMode::Active);
        Ok(())
    }

    fn set_tool_passive(&mut self, surface: SurfaceId, tool: Tool) -> Result<(), BackendError> {
        lock(&self.state)
            .surface_mut(surface)?
            .tools
            .insert(tool, ToolMode::Passive);
        Ok(())
    }

    fn annotations(&self, surface: SurfaceId, kind: Tool) -> Result<Vec<Annotation>, BackendError> {
        let state = lock(&self.state);
        Ok(state
            .surface(surface)?
            .annotations
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    fn clear_annotations(&mut self, surface: SurfaceId, kind: Tool) -> Result<(), BackendError> {
        lock(&self.state)
            .surface_mut(surface)?
            .annotations
            .remove(&kind);
        Ok(())
    }

    fn instance_info(&self, id: &ImageId) -> Option<InstanceInfo> {
        lock(&self.state).instances.get(id).cloned()
    }
}

/// Inspection and fault-injection handle for a [`HeadlessBackend`].
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    state: Shared,
}

impl HeadlessProbe {
    #[must_use]
    pub fn is_enabled(&self, surface: SurfaceId) -> bool {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .is_some_and(|record| record.enabled)
    }

    /// Makes every call on `surface` fail, except `disable`.
    pub fn fail_surface(&self, surface: SurfaceId) {
        lock(&self.state).failing_surfaces.insert(surface);
    }

    pub fn heal_surface(&self, surface: SurfaceId) {
        lock(&self.state).failing_surfaces.remove(&surface);
    }

    /// Makes every load of `id` fail.
    pub fn fail_image(&self, id: ImageId) {
        lock(&self.state).failing_images.insert(id);
    }

    pub fn set_load_delay(&self, id: ImageId, delay: Duration) {
        lock(&self.state).delays.insert(id, delay);
    }

    /// Latency of every load without a specific delay.
    pub fn set_default_delay(&self, delay: Duration) {
        lock(&self.state).default_delay = delay;
    }

    pub fn set_instance_info(&self, id: ImageId, info: InstanceInfo) {
        lock(&self.state).instances.insert(id, info);
    }

    /// Last transform pushed to the surface.
    #[must_use]
    pub fn transform_of(&self, surface: SurfaceId) -> Option<TransformState> {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .and_then(|record| record.transform)
    }

    /// Overwrites a surface's transform without the viewer knowing.
    pub fn set_surface_transform(&self, surface: SurfaceId, transform: TransformState) {
        lock(&self.state)
            .surfaces
            .entry(surface)
            .or_default()
            .transform = Some(transform);
    }

    /// Simulates an interactive drag inside one surface.
    pub fn pan_surface(&self, surface: SurfaceId, dx: f64, dy: f64) {
        let mut state = lock(&self.state);
        let record = state.surfaces.entry(surface).or_default();
        let panned = record.transform.unwrap_or_default().panned_by(dx, dy);
        record.transform = Some(panned);
        state.emit(RenderEvent::RenderCompleted { surface });
    }

    #[must_use]
    pub fn redraws(&self, surface: SurfaceId) -> usize {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .map_or(0, |record| record.redraws)
    }

    /// Tools in active mode on the surface, in tool order.
    #[must_use]
    pub fn active_tools(&self, surface: SurfaceId) -> Vec<Tool> {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .map(|record| {
                record
                    .tools
                    .iter()
                    .filter(|(_, mode)| **mode == ToolMode::Active)
                    .map(|(tool, _)| *tool)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Image currently shown on the surface.
    #[must_use]
    pub fn displayed(&self, surface: SurfaceId) -> Option<ImageId> {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .and_then(|record| record.history.last().cloned())
    }

    /// Every image shown on the surface, oldest first.
    #[must_use]
    pub fn display_history(&self, surface: SurfaceId) -> Vec<ImageId> {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .map(|record| record.history.clone())
            .unwrap_or_default()
    }

    /// Draws an annotation as if the user had done it.
    pub fn add_annotation(&self, surface: SurfaceId, tool: Tool, annotation: Annotation) {
        let mut state = lock(&self.state);
        state
            .surfaces
            .entry(surface)
            .or_default()
            .annotations
            .entry(tool)
            .or_default()
            .push(annotation);
        state.emit(RenderEvent::AnnotationCreated { surface, tool });
    }

    #[must_use]
    pub fn annotations_of(&self, surface: SurfaceId, tool: Tool) -> Vec<Annotation> {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .and_then(|record| record.annotations.get(&tool).cloned())
            .unwrap_or_default()
    }

    /// Every load started so far, in order.
    #[must_use]
    pub fn loads(&self) -> Vec<ImageId> {
        lock(&self.state).loads.clone()
    }

    #[must_use]
    pub fn load_count(&self) -> usize {
        lock(&self.state).loads.len()
    }
}
