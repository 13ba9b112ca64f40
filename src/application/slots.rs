// SPDX-License-Identifier: MPL-2.0
//! Grid slot registry.
//!
//! Tracks which cells of the viewport grid are bound to a rendering surface.
//! Other components never index slots directly: they go through
//! [`ViewportSlotRegistry::for_each_bound`], which isolates per-slot failures.

use crate::application::port::render::{BackendError, RenderBackend, SurfaceId};
use crate::domain::layout::{GridLayout, SlotIndex};
use crate::error::{Error, Result};
use serde::Serialize;

/// Lifecycle of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "surface")]
pub enum SlotState {
    #[default]
    Unbound,
    Bound(SurfaceId),
    /// Torn down; the slot cannot be bound again.
    Disposed,
}

impl SlotState {
    #[must_use]
    pub fn surface(self) -> Option<SurfaceId> {
        match self {
            SlotState::Bound(surface) => Some(surface),
            SlotState::Unbound | SlotState::Disposed => None,
        }
    }
}

/// Outcome of a fan-out over the bound slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastReport {
    /// Slots the operation succeeded on, in slot order.
    pub applied: Vec<SlotIndex>,
    /// One [`Error::SlotUnresponsive`] per failed slot.
    pub failures: Vec<Error>,
}

impl BroadcastReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: BroadcastReport) {
        for slot in other.applied {
            if !self.applied.contains(&slot) {
                self.applied.push(slot);
            }
        }
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone)]
pub struct ViewportSlotRegistry {
    layout: GridLayout,
    slots: Vec<SlotState>,
}

impl ViewportSlotRegistry {
    #[must_use]
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            slots: vec![SlotState::Unbound; layout.slot_count()],
        }
    }

    #[must_use]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn state(&self, slot: SlotIndex) -> Option<SlotState> {
        self.slots.get(slot).copied()
    }

    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|s| s.surface().is_some()).count()
    }

    #[must_use]
    pub fn has_bound(&self) -> bool {
        self.slots.iter().any(|s| s.surface().is_some())
    }

    /// Bound slots in slot order.
    #[must_use]
    pub fn bound(&self) -> Vec<(SlotIndex, SurfaceId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, state)| state.surface().map(|surface| (slot, surface)))
            .collect()
    }

    /// The lowest-index bound slot.
    #[must_use]
    pub fn reference(&self) -> Option<(SlotIndex, SurfaceId)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(slot, state)| state.surface().map(|surface| (slot, surface)))
    }

    #[must_use]
    pub fn slot_of(&self, surface: SurfaceId) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|state| *state == SlotState::Bound(surface))
    }

    /// Changes the grid size.
    ///
    /// Surplus slots are disposed and their surfaces disabled; new slots start
    /// unbound. Returns the surfaces that were released.
    pub fn resize<B: RenderBackend>(
        &mut self,
        layout: GridLayout,
        backend: &mut B,
    ) -> Vec<SurfaceId> {
        let count = layout.slot_count();
        let released: Vec<SurfaceId> = self
            .slots
            .iter()
            .skip(count)
            .filter_map(|state| state.surface())
            .collect();
        for surface in &released {
            backend.disable(*surface);
        }
        self.slots.truncate(count);
        self.slots.resize(count, SlotState::Unbound);
        self.layout = layout;
        released
    }

    /// Binds `surface` to `slot`, enabling it.
    ///
    /// A surface already bound to the slot is released first. Returns that
    /// previous surface, if any.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuchSlot`] when `slot` is outside the layout or disposed
    /// - [`Error::SlotUnresponsive`] when the surface is bound to another slot
    ///   or the backend refuses to enable it (the slot is then left unbound)
    pub fn bind<B: RenderBackend>(
        &mut self,
        slot: SlotIndex,
        surface: SurfaceId,
        backend: &mut B,
    ) -> Result<Option<SurfaceId>> {
        let current = match self.slots.get(slot) {
            Some(SlotState::Disposed) | None => return Err(Error::NoSuchSlot(slot)),
            Some(state) => *state,
        };
        if current == SlotState::Bound(surface) {
            return Ok(None);
        }
        if let Some(other) = self.slot_of(surface) {
            return Err(Error::SlotUnresponsive {
                slot,
                reason: format!("{surface} is already bound to slot {other}"),
            });
        }

        let previous = current.surface();
        if let Some(previous) = previous {
            backend.disable(previous);
            self.slots[slot] = SlotState::Unbound;
        }
        backend
            .enable(surface)
            .map_err(|err| slot_error(slot, &err))?;
        self.slots[slot] = SlotState::Bound(surface);
        Ok(previous)
    }

    /// Releases the surface bound to `slot`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchSlot`] when `slot` is outside the layout.
    pub fn unbind<B: RenderBackend>(
        &mut self,
        slot: SlotIndex,
        backend: &mut B,
    ) -> Result<Option<SurfaceId>> {
        let state = self.slots.get_mut(slot).ok_or(Error::NoSuchSlot(slot))?;
        let released = state.surface();
        if let Some(surface) = released {
            backend.disable(surface);
            *state = SlotState::Unbound;
        }
        Ok(released)
    }

    /// Disposes every slot, disabling bound surfaces.
    pub fn dispose_all<B: RenderBackend>(&mut self, backend: &mut B) -> Vec<SurfaceId> {
        let mut released = Vec::new();
        for state in &mut self.slots {
            if let Some(surface) = state.surface() {
                backend.disable(surface);
                released.push(surface);
            }
            *state = SlotState::Disposed;
        }
        released
    }

    /// Runs `f` on every bound slot, in slot order.
    ///
    /// A failing slot is recorded as [`Error::SlotUnresponsive`] and the
    /// iteration carries on with the remaining slots.
    pub fn for_each_bound<F>(&self, mut f: F) -> BroadcastReport
    where
        F: FnMut(SlotIndex, SurfaceId) -> std::result::Result<(), BackendError>,
    {
        let mut report = BroadcastReport::default();
        for (slot, surface) in self.bound() {
            match f(slot, surface) {
                Ok(()) => report.applied.push(slot),
                Err(err) => report.failures.push(slot_error(slot, &err)),
            }
        }
        report
    }
}

fn slot_error(slot: SlotIndex, err: &BackendError) -> Error {
    Error::SlotUnresponsive {
        slot,
        reason: err.to_string(),
    }
}
