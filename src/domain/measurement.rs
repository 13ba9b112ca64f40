// SPDX-License-Identifier: MPL-2.0
//! Annotation records and the aggregated measurement snapshot.

use crate::domain::layout::SlotIndex;
use crate::domain::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value computed by the rendering collaborator for one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AnnotationValue {
    Length { length_mm: f64 },
    Angle { degrees: f64 },
    Area { area_mm2: f64 },
    Probe { hu: f64 },
    Text { text: String },
    Bidirectional { shortest_mm: f64, longest_mm: f64 },
    /// Geometry only, nothing measured.
    Outline,
}

/// One annotation as reported by a rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Backend-assigned identifier, stable across modifications.
    pub id: String,
    pub value: AnnotationValue,
}

impl Annotation {
    #[must_use]
    pub fn new(id: impl Into<String>, value: AnnotationValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// An annotation together with the slot and tool kind it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub slot: SlotIndex,
    pub tool: Tool,
    pub annotation: Annotation,
}

impl Measurement {
    /// Display text for the measurement list.
    ///
    /// Tools without a textual representation, or a value that does not fit
    /// the tool kind, yield an empty string.
    #[must_use]
    pub fn label(&self) -> String {
        match (self.tool, &self.annotation.value) {
            (Tool::Length, AnnotationValue::Length { length_mm }) => format!("{length_mm:.2} mm"),
            (Tool::Angle | Tool::CobbAngle, AnnotationValue::Angle { degrees }) => {
                format!("{degrees:.2}°")
            }
            (Tool::RectangleRoi | Tool::EllipticalRoi, AnnotationValue::Area { area_mm2 }) => {
                format!("Area: {area_mm2:.2} mm²")
            }
            (Tool::Probe, AnnotationValue::Probe { hu }) => format!("HU: {hu}"),
            (Tool::TextMarker | Tool::ArrowAnnotate, AnnotationValue::Text { text }) => {
                text.clone()
            }
            (
                Tool::Bidirectional,
                AnnotationValue::Bidirectional {
                    shortest_mm,
                    longest_mm,
                },
            ) => format!("L1: {shortest_mm:.2} mm, L2: {longest_mm:.2} mm"),
            _ => String::new(),
        }
    }
}

/// Measurements grouped by tool kind.
///
/// Kinds with no measurement are absent rather than mapped to an empty list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct MeasurementSnapshot {
    by_tool: BTreeMap<Tool, Vec<Measurement>>,
}

impl MeasurementSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the measurements of one kind; an empty list removes the kind.
    pub fn set(&mut self, tool: Tool, measurements: Vec<Measurement>) {
        if measurements.is_empty() {
            self.by_tool.remove(&tool);
        } else {
            self.by_tool.insert(tool, measurements);
        }
    }

    #[must_use]
    pub fn get(&self, tool: Tool) -> &[Measurement] {
        self.by_tool.get(&tool).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_tool.is_empty()
    }

    /// Number of measurements across all kinds.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_tool.values().map(Vec::len).sum()
    }

    pub fn kinds(&self) -> impl Iterator<Item = Tool> + '_ {
        self.by_tool.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tool, &[Measurement])> {
        self.by_tool
            .iter()
            .map(|(tool, measurements)| (*tool, measurements.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(tool: Tool, value: AnnotationValue) -> Measurement {
        Measurement {
            slot: 0,
            tool,
            annotation: Annotation::new("a-1", value),
        }
    }

    #[test]
    fn labels_follow_tool_kind() {
        assert_eq!(
            measurement(Tool::Length, AnnotationValue::Length { length_mm: 12.346 }).label(),
            "12.35 mm"
        );
        assert_eq!(
            measurement(Tool::CobbAngle, AnnotationValue::Angle { degrees: 31.0 }).label(),
            "31.00°"
        );
        assert_eq!(
            measurement(Tool::EllipticalRoi, AnnotationValue::Area { area_mm2: 2.5 }).label(),
            "Area: 2.50 mm²"
        );
        assert_eq!(
            measurement(Tool::Probe, AnnotationValue::Probe { hu: -1000.0 }).label(),
            "HU: -1000"
        );
        assert_eq!(
            measurement(
                Tool::ArrowAnnotate,
                AnnotationValue::Text {
                    text: "lesion".into()
                }
            )
            .label(),
            "lesion"
        );
        assert_eq!(
            measurement(
                Tool::Bidirectional,
                AnnotationValue::Bidirectional {
                    shortest_mm: 4.0,
                    longest_mm: 9.5
                }
            )
            .label(),
            "L1: 4.00 mm, L2: 9.50 mm"
        );
    }

    #[test]
    fn freehand_and_mismatched_values_have_no_label() {
        assert_eq!(
            measurement(Tool::FreehandRoi, AnnotationValue::Area { area_mm2: 3.0 }).label(),
            ""
        );
        assert_eq!(
            measurement(Tool::Length, AnnotationValue::Outline).label(),
            ""
        );
    }

    #[test]
    fn snapshot_omits_empty_kinds() {
        let mut snapshot = MeasurementSnapshot::new();
        snapshot.set(
            Tool::Length,
            vec![measurement(Tool::Length, AnnotationValue::Length { length_mm: 1.0 })],
        );
        snapshot.set(Tool::Angle, Vec::new());

        assert_eq!(snapshot.kinds().collect::<Vec<_>>(), vec![Tool::Length]);
        assert_eq!(snapshot.total(), 1);
        assert!(snapshot.get(Tool::Angle).is_empty());

        snapshot.set(Tool::Length, Vec::new());
        assert!(snapshot.is_empty());
    }
}
