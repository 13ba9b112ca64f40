// SPDX-License-Identifier: MPL-2.0
//! Interactive tools.
//!
//! The set is closed: activation by name goes through [`Tool::from_str`],
//! which rejects anything outside it with [`Error::UnknownTool`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    #[default]
    Pan,
    Zoom,
    /// Window width / window center drag.
    WindowLevel,
    Length,
    Angle,
    CobbAngle,
    RectangleRoi,
    EllipticalRoi,
    FreehandRoi,
    Probe,
    TextMarker,
    ArrowAnnotate,
    Bidirectional,
    Magnify,
}

impl Tool {
    pub const ALL: [Tool; 14] = [
        Tool::Pan,
        Tool::Zoom,
        Tool::WindowLevel,
        Tool::Length,
        Tool::Angle,
        Tool::CobbAngle,
        Tool::RectangleRoi,
        Tool::EllipticalRoi,
        Tool::FreehandRoi,
        Tool::Probe,
        Tool::TextMarker,
        Tool::ArrowAnnotate,
        Tool::Bidirectional,
        Tool::Magnify,
    ];

    /// Tools that produce measurement records.
    pub const ANNOTATION_KINDS: [Tool; 10] = [
        Tool::Length,
        Tool::Angle,
        Tool::CobbAngle,
        Tool::RectangleRoi,
        Tool::EllipticalRoi,
        Tool::FreehandRoi,
        Tool::ArrowAnnotate,
        Tool::Bidirectional,
        Tool::Probe,
        Tool::TextMarker,
    ];

    /// Name understood by rendering backends.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Tool::Pan => "Pan",
            Tool::Zoom => "Zoom",
            Tool::WindowLevel => "Wwwc",
            Tool::Length => "Length",
            Tool::Angle => "Angle",
            Tool::CobbAngle => "CobbAngle",
            Tool::RectangleRoi => "RectangleRoi",
            Tool::EllipticalRoi => "EllipticalRoi",
            Tool::FreehandRoi => "FreehandRoi",
            Tool::Probe => "Probe",
            Tool::TextMarker => "TextMarker",
            Tool::ArrowAnnotate => "ArrowAnnotate",
            Tool::Bidirectional => "Bidirectional",
            Tool::Magnify => "Magnify",
        }
    }

    #[must_use]
    pub fn is_annotation(self) -> bool {
        Self::ANNOTATION_KINDS.contains(&self)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = Error;

    /// Case-insensitive; `-`, `_` and spaces are ignored, so `"cobb-angle"`,
    /// `"CobbAngle"` and `"cobb angle"` all name the same tool.
    fn from_str(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        if normalized == "windowlevel" {
            return Ok(Tool::WindowLevel);
        }
        Tool::ALL
            .into_iter()
            .find(|tool| tool.name().to_lowercase() == normalized)
            .ok_or_else(|| Error::UnknownTool(raw.to_string()))
    }
}

/// Options passed along with an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOptions {
    /// Bit mask of the pointer buttons the tool responds to (1 = primary).
    pub mouse_button_mask: u8,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            mouse_button_mask: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        for tool in Tool::ALL {
            assert_eq!(tool.name().parse::<Tool>().unwrap(), tool);
        }
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("cobb-angle".parse::<Tool>().unwrap(), Tool::CobbAngle);
        assert_eq!("rectangle_roi".parse::<Tool>().unwrap(), Tool::RectangleRoi);
        assert_eq!("window level".parse::<Tool>().unwrap(), Tool::WindowLevel);
        assert_eq!("WWWC".parse::<Tool>().unwrap(), Tool::WindowLevel);
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            "Laser".parse::<Tool>().unwrap_err(),
            Error::UnknownTool("Laser".to_string())
        );
        assert!("".parse::<Tool>().is_err());
    }

    #[test]
    fn navigation_tools_are_not_annotations() {
        assert!(!Tool::Pan.is_annotation());
        assert!(!Tool::Zoom.is_annotation());
        assert!(!Tool::WindowLevel.is_annotation());
        assert!(!Tool::Magnify.is_annotation());
        assert!(Tool::Length.is_annotation());
        assert_eq!(Tool::ALL.iter().filter(|t| t.is_annotation()).count(), 10);
    }

    #[test]
    fn default_tool_is_pan_with_primary_button() {
        assert_eq!(Tool::default(), Tool::Pan);
        assert_eq!(ToolOptions::default().mouse_button_mask, 1);
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Tool::CobbAngle).unwrap();
        assert_eq!(json, "\"cobb-angle\"");
    }
}
