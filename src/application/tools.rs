// SPDX-License-Identifier: MPL-2.0
//! Single-active-tool state machine.
//!
//! At most one tool is active on every bound slot; all the others are
//! passive. Activation runs in two passes so that no slot ever has two active
//! tools, even transiently.

use crate::application::port::render::{BackendError, RenderBackend, SurfaceId};
use crate::application::slots::{BroadcastReport, ViewportSlotRegistry};
use crate::domain::tool::{Tool, ToolOptions};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ToolActivationMachine {
    active: Option<Tool>,
    options: ToolOptions,
}

impl ToolActivationMachine {
    /// Starts with [`Tool::Pan`] active.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Some(Tool::Pan),
            options: ToolOptions::default(),
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<Tool> {
        self.active
    }

    #[must_use]
    pub fn options(&self) -> ToolOptions {
        self.options
    }

    /// Makes `tool` the only active tool on every bound slot.
    pub fn activate<B: RenderBackend>(
        &mut self,
        tool: Tool,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> BroadcastReport {
        let mut report =
            registry.for_each_bound(|_, surface| set_passive_except(surface, Some(tool), backend));
        let options = self.options;
        report.merge(
            registry.for_each_bound(|_, surface| backend.set_tool_active(surface, tool, options)),
        );
        self.active = Some(tool);
        log::debug!("active tool: {tool}");
        report
    }

    /// Activates a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTool`](crate::error::Error::UnknownTool) for a
    /// name outside the tool set. Nothing is touched in that case.
    pub fn activate_named<B: RenderBackend>(
        &mut self,
        name: &str,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> Result<BroadcastReport> {
        let tool = name.parse::<Tool>()?;
        Ok(self.activate(tool, registry, backend))
    }

    /// Sets every tool passive; no tool is active afterwards.
    pub fn release<B: RenderBackend>(
        &mut self,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> BroadcastReport {
        self.active = None;
        registry.for_each_bound(|_, surface| set_passive_except(surface, None, backend))
    }

    /// Brings a freshly bound surface in line with the current activation.
    ///
    /// # Errors
    ///
    /// Returns the first backend error raised by the surface.
    pub fn apply_to<B: RenderBackend>(
        &self,
        surface: SurfaceId,
        backend: &mut B,
    ) -> std::result::Result<(), BackendError> {
        set_passive_except(surface, self.active, backend)?;
        if let Some(tool) = self.active {
            backend.set_tool_active(surface, tool, self.options)?;
        }
        Ok(())
    }
}

impl Default for ToolActivationMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn set_passive_except<B: RenderBackend>(
    surface: SurfaceId,
    keep: Option<Tool>,
    backend: &mut B,
) -> std::result::Result<(), BackendError> {
    for tool in Tool::ALL.into_iter().filter(|tool| Some(*tool) != keep) {
        backend.set_tool_passive(surface, tool)?;
    }
    Ok(())
}
