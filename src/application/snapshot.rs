// SPDX-License-Identifier: MPL-2.0
//! Read-side views of the viewer state.
//!
//! [`ViewerSnapshot`] is what UIs subscribe to; [`OverlayInfo`] is the text
//! drawn in the corners of a viewport, derived from a snapshot.

use crate::application::slots::SlotState;
use crate::domain::layout::GridLayout;
use crate::domain::measurement::MeasurementSnapshot;
use crate::domain::playback::{CineState, FrameRate};
use crate::domain::sequence::{ImageId, SequencePosition};
use crate::domain::study::{MediaKind, StudyMetadata};
use crate::domain::tool::Tool;
use crate::domain::transform::TransformState;
use serde::Serialize;

/// Consistent copy of everything a UI needs to render the viewer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ViewerSnapshot {
    pub position: SequencePosition,
    pub current_image: Option<ImageId>,
    /// Index of the image last shown on the reference slot.
    pub displayed_index: Option<usize>,
    pub transform: TransformState,
    pub active_tool: Option<Tool>,
    pub cine: CineState,
    pub frame_rate: FrameRate,
    pub layout: GridLayout,
    pub slots: Vec<SlotState>,
    pub measurements: MeasurementSnapshot,
    pub metadata: StudyMetadata,
    pub media_kind: MediaKind,
}

/// Corner overlay text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayInfo {
    pub patient_name: String,
    pub patient_id: String,
    pub study_date: String,
    pub modality: String,
    pub series: Option<String>,
    pub image: String,
    pub zoom: String,
    pub window_width: String,
    pub window_center: String,
    pub inverted: bool,
}

impl From<&ViewerSnapshot> for OverlayInfo {
    fn from(snapshot: &ViewerSnapshot) -> Self {
        let metadata = &snapshot.metadata;
        let window = snapshot.transform.window;
        Self {
            patient_name: metadata.patient_name.clone(),
            patient_id: format!("ID: {}", metadata.patient_id),
            study_date: format!("Date: {}", metadata.date_label()),
            modality: metadata.modality.clone(),
            series: metadata
                .instance
                .series_number
                .as_ref()
                .map(|number| format!("Series: {number}")),
            image: snapshot.position.label(),
            zoom: format!("Zoom: {}%", snapshot.transform.scale.percent()),
            window_width: format!("WW: {:.0}", window.width()),
            window_center: format!("WL: {:.0}", window.center()),
            inverted: snapshot.transform.inverted,
        }
    }
}
