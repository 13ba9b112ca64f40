// SPDX-License-Identifier: MPL-2.0
//! The viewer core.
//!
//! [`ViewerCore`] owns the whole synchronous state of one viewer: the image
//! sequence, the slot registry, the shared transform, the active tool, the
//! cine engine, the measurement snapshot and the frame cache. It is driven
//! from a single task (see [`crate::runtime`]) and never locks.
//!
//! Every operation that fails reports the error on the notice channel and
//! returns it to the caller. Operations other than layout and surface
//! management are no-ops while the open series is not DICOM.

use crate::application::broadcaster::TransformBroadcaster;
use crate::application::cine::{CinePlaybackEngine, FrameCallback, TimerSpec};
use crate::application::loader::{
    CacheStats, FrameCache, LoadCompletion, LoadJob, LoadRequest, LoadTag,
};
use crate::application::measurements::MeasurementAggregator;
use crate::application::notices::{Notice, NoticeChannel};
use crate::application::port::render::{RenderBackend, RenderEvent, SurfaceId};
use crate::application::port::study::SeriesRecord;
use crate::application::slots::{BroadcastReport, SlotState, ViewportSlotRegistry};
use crate::application::snapshot::ViewerSnapshot;
use crate::application::tools::ToolActivationMachine;
use crate::config::Config;
use crate::domain::layout::{GridLayout, SlotIndex};
use crate::domain::measurement::MeasurementSnapshot;
use crate::domain::playback::{CineState, FrameRate};
use crate::domain::sequence::{Direction, ImageId, SequenceNavigator, SequencePosition};
use crate::domain::study::{MediaKind, StudyMetadata};
use crate::domain::tool::Tool;
use crate::domain::transform::{TransformOp, TransformState};
use crate::error::{Error, Result};
use tokio::sync::{broadcast, watch};

pub struct ViewerCore<B: RenderBackend> {
    backend: B,
    navigator: SequenceNavigator,
    registry: ViewportSlotRegistry,
    broadcaster: TransformBroadcaster,
    tools: ToolActivationMachine,
    cine: CinePlaybackEngine,
    measurements: MeasurementAggregator,
    notices: NoticeChannel,
    snapshot_tx: watch::Sender<ViewerSnapshot>,
    cache: FrameCache<B::Image>,
    pending: Vec<LoadRequest>,
    media_kind: MediaKind,
    metadata: StudyMetadata,
    displayed_index: Option<usize>,
}

impl<B: RenderBackend> ViewerCore<B> {
    /// Creates a core with no series open and no surface bound.
    ///
    /// An invalid layout in `config` is reported as a notice and replaced
    /// by the default layout.
    pub fn new(backend: B, config: &Config) -> Self {
        let mut notices = NoticeChannel::new();
        let layout = config.layout().unwrap_or_else(|err| {
            notices.report(err);
            GridLayout::default()
        });
        let (snapshot_tx, _) = watch::channel(ViewerSnapshot::default());
        let mut core = Self {
            backend,
            navigator: SequenceNavigator::new(),
            registry: ViewportSlotRegistry::new(layout),
            broadcaster: TransformBroadcaster::new(config.transform_settings()),
            tools: ToolActivationMachine::new(),
            cine: CinePlaybackEngine::new(config.frame_rate()),
            measurements: MeasurementAggregator::new(),
            notices,
            snapshot_tx,
            cache: FrameCache::new(config.frame_cache_capacity()),
            pending: Vec::new(),
            media_kind: MediaKind::default(),
            metadata: StudyMetadata::default(),
            displayed_index: None,
        };
        core.publish();
        core
    }

    pub fn with_defaults(backend: B) -> Self {
        Self::new(backend, &Config::default())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn position(&self) -> SequencePosition {
        self.navigator.position()
    }

    pub fn current_image(&self) -> Option<&ImageId> {
        self.navigator.current_id()
    }

    pub fn displayed_index(&self) -> Option<usize> {
        self.displayed_index
    }

    pub fn transform(&self) -> TransformState {
        self.broadcaster.state()
    }

    pub fn active_tool(&self) -> Option<Tool> {
        self.tools.active()
    }

    pub fn cine_state(&self) -> CineState {
        self.cine.state()
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.cine.frame_rate()
    }

    /// Timer the runtime should be running for cine playback.
    pub fn cine_timer(&self) -> Option<TimerSpec> {
        self.cine.timer()
    }

    pub fn layout(&self) -> GridLayout {
        self.registry.layout()
    }

    pub fn slot_state(&self, slot: SlotIndex) -> Option<SlotState> {
        self.registry.state(slot)
    }

    pub fn measurements(&self) -> &MeasurementSnapshot {
        self.measurements.snapshot()
    }

    pub fn metadata(&self) -> &StudyMetadata {
        &self.metadata
    }

    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            position: self.navigator.position(),
            current_image: self.navigator.current_id().cloned(),
            displayed_index: self.displayed_index,
            transform: self.broadcaster.state(),
            active_tool: self.tools.active(),
            cine: self.cine.state(),
            frame_rate: self.cine.frame_rate(),
            layout: self.registry.layout(),
            slots: (0..self.registry.len())
                .filter_map(|slot| self.registry.state(slot))
                .collect(),
            measurements: self.measurements.snapshot().clone(),
            metadata: self.metadata.clone(),
            media_kind: self.media_kind,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn notice_sender(&self) -> broadcast::Sender<Notice> {
        self.notices.sender()
    }

    pub fn recent_notices(&self) -> Vec<Notice> {
        self.notices.recent()
    }

    // =========================================================================
    // Series and layout
    // =========================================================================

    /// Replaces the open series. Playback stops and the first image is loaded.
    pub fn open_series(&mut self, record: SeriesRecord) {
        self.cine.stop();
        self.navigator.set_sequence(record.image_ids);
        self.metadata = record.metadata;
        self.media_kind = record.media_kind;
        self.cache.clear();
        self.pending.clear();
        self.displayed_index = None;
        log::info!(
            "opened {:?} series with {} images",
            self.media_kind,
            self.navigator.len()
        );
        if self.media_kind.is_dicom() {
            if let Some(index) = self.navigator.current_index() {
                self.load_current(index);
            }
        }
        self.publish();
    }

    /// Resizes the grid. Surplus slots are disposed.
    pub fn set_layout(&mut self, layout: GridLayout) {
        let released = self.registry.resize(layout, &mut self.backend);
        log::info!("layout {layout}, {} surface(s) released", released.len());
        if !released.is_empty() {
            self.after_surfaces_lost();
        }
        self.publish();
    }

    /// Resizes the grid from an `RxC` string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] for a malformed string.
    pub fn set_layout_named(&mut self, layout: &str) -> Result<()> {
        match layout.parse::<GridLayout>() {
            Ok(layout) => {
                self.set_layout(layout);
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Binds a surface to a slot and brings it in line with the shared
    /// transform, the active tool and the current image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchSlot`] or [`Error::SlotUnresponsive`] when the
    /// slot cannot be bound.
    pub fn bind_surface(&mut self, slot: SlotIndex, surface: SurfaceId) -> Result<()> {
        if let Err(err) = self.registry.bind(slot, surface, &mut self.backend) {
            return self.fail(err);
        }
        let joined = self
            .broadcaster
            .push_to(surface, &mut self.backend)
            .and_then(|()| self.tools.apply_to(surface, &mut self.backend));
        if let Err(err) = joined {
            self.notices.report(Error::SlotUnresponsive {
                slot,
                reason: err.to_string(),
            });
        }
        if self.media_kind.is_dicom() {
            if let Some(index) = self.navigator.current_index() {
                self.load_current(index);
            }
        }
        self.publish();
        Ok(())
    }

    /// Releases the surface of a slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchSlot`] for a slot outside the layout.
    pub fn unbind_surface(&mut self, slot: SlotIndex) -> Result<()> {
        match self.registry.unbind(slot, &mut self.backend) {
            Ok(Some(_)) => self.after_surfaces_lost(),
            Ok(None) => {}
            Err(err) => return self.fail(err),
        }
        self.publish();
        Ok(())
    }

    /// Stops playback and disposes every slot.
    pub fn teardown(&mut self) {
        self.cine.dispose();
        let released = self.registry.dispose_all(&mut self.backend);
        self.pending.clear();
        log::info!("viewer torn down, {} surface(s) released", released.len());
        self.publish();
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Moves one image forward or back, clamping at the ends.
    ///
    /// Returns the new index, or `None` if nothing moved.
    pub fn navigate(&mut self, direction: Direction) -> Option<usize> {
        if !self.is_driven() {
            return None;
        }
        let index = self.navigator.advance(direction)?;
        self.load_current(index);
        self.publish();
        Some(index)
    }

    /// Jumps to an absolute index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when `index` is outside the sequence.
    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        if !self.is_driven() {
            return Ok(());
        }
        if let Err(err) = self.navigator.jump_to(index) {
            return self.fail(err);
        }
        self.load_current(index);
        self.publish();
        Ok(())
    }

    // =========================================================================
    // Transform and tools
    // =========================================================================

    /// Applies a transform operation to every bound slot.
    pub fn apply_transform(&mut self, op: TransformOp) -> TransformState {
        if self.is_driven() {
            let report = self
                .broadcaster
                .apply_op(op, &self.registry, &mut self.backend);
            self.report(report);
            self.publish();
        }
        self.broadcaster.state()
    }

    pub fn activate_tool(&mut self, tool: Tool) {
        if !self.is_driven() {
            return;
        }
        let report = self
            .tools
            .activate(tool, &self.registry, &mut self.backend);
        self.report(report);
        self.publish();
    }

    /// Activates a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTool`] for a name outside the tool set; the
    /// previous tool stays active.
    pub fn activate_tool_named(&mut self, name: &str) -> Result<()> {
        if !self.is_driven() {
            return Ok(());
        }
        match self
            .tools
            .activate_named(name, &self.registry, &mut self.backend)
        {
            Ok(report) => {
                self.report(report);
                self.publish();
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn release_tool(&mut self) {
        if !self.is_driven() {
            return;
        }
        let report = self.tools.release(&self.registry, &mut self.backend);
        self.report(report);
        self.publish();
    }

    // =========================================================================
    // Cine
    // =========================================================================

    /// Starts playback. Returns `false` when it was already playing or the
    /// sequence is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RendererLost`] when no slot is bound.
    pub fn play(&mut self) -> Result<bool> {
        if !self.is_driven() {
            return Ok(false);
        }
        if self.navigator.is_empty() {
            log::debug!("nothing to play");
            return Ok(false);
        }
        if !self.registry.has_bound() {
            return self.fail(Error::RendererLost);
        }
        let started = self.cine.play();
        self.publish();
        Ok(started)
    }

    /// Stops playback. Returns `false` when it was not playing.
    pub fn stop(&mut self) -> bool {
        if !self.is_driven() {
            return false;
        }
        let stopped = self.cine.stop();
        self.publish();
        stopped
    }

    /// Flips playback; returns whether it now plays.
    ///
    /// # Errors
    ///
    /// Same as [`Self::play`].
    pub fn toggle_cine(&mut self) -> Result<bool> {
        if self.cine.is_playing() {
            self.stop();
            Ok(false)
        } else {
            self.play()?;
            Ok(self.cine.is_playing())
        }
    }

    /// Changes the playback rate (clamped to 1..=30 fps).
    pub fn set_frame_rate(&mut self, fps: u32) -> FrameRate {
        if self.is_driven() {
            self.cine.set_frame_rate(FrameRate::new(fps));
            self.publish();
        }
        self.cine.frame_rate()
    }

    /// Stops playback for good and drops the frame callback.
    pub fn dispose_cine(&mut self) {
        self.cine.dispose();
        self.publish();
    }

    /// Registers the callback invoked with the new index on each cine step.
    pub fn set_frame_callback(&mut self, callback: FrameCallback) {
        self.cine.set_frame_callback(callback);
    }

    /// Advances playback by one frame. Called by the runtime's timer.
    pub fn cine_tick(&mut self) {
        if !self.is_driven() {
            return;
        }
        let generation = self.cine.generation();
        if let Some(index) = self.cine.tick(&mut self.navigator) {
            self.request_load(LoadTag::Cine { index, generation });
            self.publish();
        }
    }

    // =========================================================================
    // Measurements
    // =========================================================================

    /// Re-reads annotations from every bound slot.
    pub fn refresh_measurements(&mut self) {
        if !self.is_driven() {
            return;
        }
        let (report, changed) = self.measurements.refresh(&self.registry, &self.backend);
        self.report(report);
        if changed {
            self.publish();
        }
    }

    /// Removes every annotation from every bound slot.
    pub fn clear_measurements(&mut self) {
        if !self.is_driven() {
            return;
        }
        let report = self.measurements.clear(&self.registry, &mut self.backend);
        self.report(report);
        self.publish();
    }

    // =========================================================================
    // Backend notifications
    // =========================================================================

    pub fn handle_render_event(&mut self, event: RenderEvent) {
        let Some(slot) = self.registry.slot_of(event.surface()) else {
            log::debug!("ignoring {event:?} from an unbound surface");
            return;
        };
        if !self.is_driven() {
            return;
        }
        match event {
            RenderEvent::RenderCompleted { surface } => self.on_render_completed(slot, surface),
            RenderEvent::AnnotationCreated { .. }
            | RenderEvent::AnnotationModified { .. }
            | RenderEvent::AnnotationRemoved { .. } => self.refresh_measurements(),
        }
    }

    fn on_render_completed(&mut self, slot: SlotIndex, surface: SurfaceId) {
        let mut changed = false;
        if self.broadcaster.is_lagging(surface) {
            log::debug!("slot {slot} missed a transform update, pushing it again");
            if let Err(err) = self.broadcaster.push_to(surface, &mut self.backend) {
                self.notices.report(Error::SlotUnresponsive {
                    slot,
                    reason: err.to_string(),
                });
            }
        } else {
            changed |= self.adopt_observed(slot, surface);
        }
        changed |= self.refresh_instance_info();
        if changed {
            self.publish();
        }
    }

    /// Takes over a transform changed interactively inside one surface.
    fn adopt_observed(&mut self, slot: SlotIndex, surface: SurfaceId) -> bool {
        match self.backend.transform(surface) {
            Ok(observed) => {
                if let Some(report) =
                    self.broadcaster
                        .adopt(observed, &self.registry, &mut self.backend)
                {
                    log::debug!("slot {slot} diverged, adopting its transform");
                    self.report(report);
                    true
                } else {
                    false
                }
            }
            Err(err) => {
                self.notices.report(Error::SlotUnresponsive {
                    slot,
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Starts every queued load. The runtime spawns the returned jobs and
    /// feeds their results to [`Self::complete_load`].
    pub fn start_loads(&mut self) -> Vec<LoadJob<B::Image>> {
        self.pending
            .drain(..)
            .map(|request| LoadJob {
                future: self.backend.load_image(&request.image),
                tag: request.tag,
                image: request.image,
            })
            .collect()
    }

    /// Applies a finished load, unless it is stale.
    pub fn complete_load(&mut self, completion: LoadCompletion<B::Image>) {
        let LoadCompletion { tag, image, result } = completion;
        if !self.is_fresh(tag) {
            log::debug!("discarding stale load of {image} ({tag:?})");
            return;
        }
        match result {
            Ok(loaded) => {
                let report = if tag.is_cine() {
                    self.display_on_reference(&loaded)
                } else {
                    self.registry.for_each_bound(|_, surface| {
                        self.backend.display_image(surface, &loaded)
                    })
                };
                self.cache.insert(image, loaded);
                if tag.is_cine() {
                    self.cine.record_success();
                }
                self.displayed_index = Some(tag.index());
                self.report(report);
                self.refresh_instance_info();
                self.publish();
            }
            Err(err) => {
                let error = Error::LoadFailure {
                    image,
                    reason: err.to_string(),
                };
                if !tag.is_cine() || self.cine.record_failure() {
                    self.notices.report(error);
                } else {
                    log::debug!("{error}");
                }
            }
        }
    }

    fn is_fresh(&self, tag: LoadTag) -> bool {
        let current = self.navigator.current_index();
        match tag {
            LoadTag::Navigation { sequence, index } => {
                sequence == self.navigator.generation() && current == Some(index)
            }
            LoadTag::Cine { index, generation } => {
                self.cine.accepts(generation) && current == Some(index)
            }
        }
    }

    fn load_current(&mut self, index: usize) {
        self.request_load(LoadTag::Navigation {
            sequence: self.navigator.generation(),
            index,
        });
    }

    fn request_load(&mut self, tag: LoadTag) {
        let Some(image) = self.navigator.get(tag.index()).cloned() else {
            return;
        };
        if let Some(cached) = self.cache.get(&image) {
            self.complete_load(LoadCompletion {
                tag,
                image,
                result: Ok(cached),
            });
        } else {
            self.pending.push(LoadRequest { tag, image });
        }
    }

    fn display_on_reference(&mut self, image: &B::Image) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        if let Some((slot, surface)) = self.registry.reference() {
            match self.backend.display_image(surface, image) {
                Ok(()) => report.applied.push(slot),
                Err(err) => report.failures.push(Error::SlotUnresponsive {
                    slot,
                    reason: err.to_string(),
                }),
            }
        }
        report
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn is_driven(&self) -> bool {
        if self.media_kind.is_dicom() {
            true
        } else {
            log::debug!("ignoring operation on a {:?} series", self.media_kind);
            false
        }
    }

    fn refresh_instance_info(&mut self) -> bool {
        let info = self
            .navigator
            .current_id()
            .and_then(|id| self.backend.instance_info(id));
        match info {
            Some(info) if info != self.metadata.instance => {
                self.metadata.instance = info;
                true
            }
            _ => false,
        }
    }

    fn after_surfaces_lost(&mut self) {
        if self.cine.is_playing() && !self.registry.has_bound() {
            self.cine.stop();
            self.notices.report(Error::RendererLost);
        }
        self.refresh_measurements();
    }

    fn report(&mut self, report: BroadcastReport) {
        self.notices.report_all(report.failures);
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.notices.report(err.clone());
        Err(err)
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
