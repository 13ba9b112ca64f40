// SPDX-License-Identifier: MPL-2.0
//! Shared transform fan-out.
//!
//! The broadcaster owns the single logical [`TransformState`]. A mutation is
//! computed once, stored, then pushed to every bound slot together with a
//! redraw request. The stored value is authoritative as soon as
//! [`TransformBroadcaster::apply`] returns, whatever the backend does with
//! the redraw.
//!
//! A surface that rejected the last push is tracked as lagging until a later
//! push reaches it. Its own reported transform is then stale and must not
//! be adopted as the shared value.

use crate::application::port::render::{BackendError, RenderBackend, SurfaceId};
use crate::application::slots::{BroadcastReport, ViewportSlotRegistry};
use crate::domain::transform::{TransformOp, TransformSettings, TransformState};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct TransformBroadcaster {
    state: TransformState,
    settings: TransformSettings,
    lagging: HashSet<SurfaceId>,
}

impl TransformBroadcaster {
    #[must_use]
    pub fn new(settings: TransformSettings) -> Self {
        Self {
            state: TransformState::with_default_window(settings.default_window),
            settings,
            lagging: HashSet::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TransformState {
        self.state
    }

    #[must_use]
    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    /// Whether `surface` missed the latest push.
    #[must_use]
    pub fn is_lagging(&self, surface: SurfaceId) -> bool {
        self.lagging.contains(&surface)
    }

    /// Applies `mutator` to the shared state and pushes the result to every
    /// bound slot.
    pub fn apply<B, F>(
        &mut self,
        mutator: F,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> BroadcastReport
    where
        B: RenderBackend,
        F: FnOnce(TransformState) -> TransformState,
    {
        self.state = mutator(self.state);
        self.broadcast(registry, backend)
    }

    /// Applies a named operation.
    pub fn apply_op<B: RenderBackend>(
        &mut self,
        op: TransformOp,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> BroadcastReport {
        let settings = self.settings;
        self.apply(|state| op.apply(state, &settings), registry, backend)
    }

    /// Takes over a transform observed on one surface, if it differs from the
    /// shared value, and rebroadcasts it. Returns `None` when nothing changed.
    ///
    /// Only meaningful for a surface that is not lagging; use
    /// [`push_to`](Self::push_to) to bring a lagging one up to date instead.
    pub fn adopt<B: RenderBackend>(
        &mut self,
        observed: TransformState,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> Option<BroadcastReport> {
        if observed == self.state {
            return None;
        }
        Some(self.apply(|_| observed, registry, backend))
    }

    /// Pushes the current state to a single surface.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the surface rejects the transform.
    pub fn push_to<B: RenderBackend>(
        &mut self,
        surface: SurfaceId,
        backend: &mut B,
    ) -> Result<(), BackendError> {
        let pushed = push(&self.state, surface, backend);
        if pushed.is_ok() {
            self.lagging.remove(&surface);
        } else {
            self.lagging.insert(surface);
        }
        pushed
    }

    fn broadcast<B: RenderBackend>(
        &mut self,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> BroadcastReport {
        let state = self.state;
        let mut lagging = HashSet::new();
        let report = registry.for_each_bound(|_, surface| {
            let pushed = push(&state, surface, backend);
            if pushed.is_err() {
                lagging.insert(surface);
            }
            pushed
        });
        self.lagging = lagging;
        report
    }
}

fn push<B: RenderBackend>(
    state: &TransformState,
    surface: SurfaceId,
    backend: &mut B,
) -> Result<(), BackendError> {
    backend.set_transform(surface, state)?;
    backend.request_redraw(surface);
    Ok(())
}

impl Default for TransformBroadcaster {
    fn default() -> Self {
        Self::new(TransformSettings::default())
    }
}
