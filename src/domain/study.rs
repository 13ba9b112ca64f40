// SPDX-License-Identifier: MPL-2.0
//! Study-level information shown next to the images.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder shown when the study carries no patient name.
pub const ANONYMOUS_PATIENT: &str = "Anonymous";

/// Kind of media the open series holds.
///
/// Only [`MediaKind::Dicom`] series are driven by the viewer core; video and
/// 3D content is handed to separate players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    #[default]
    Dicom,
    Video,
    Model3d,
}

impl MediaKind {
    #[must_use]
    pub fn is_dicom(self) -> bool {
        self == MediaKind::Dicom
    }
}

/// Series / instance numbers of the image currently displayed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub series_number: Option<String>,
    pub instance_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMetadata {
    pub patient_name: String,
    pub patient_id: String,
    pub study_date: Option<NaiveDate>,
    pub modality: String,
    #[serde(default)]
    pub instance: InstanceInfo,
}

impl Default for StudyMetadata {
    fn default() -> Self {
        Self {
            patient_name: ANONYMOUS_PATIENT.to_string(),
            patient_id: String::new(),
            study_date: None,
            modality: String::new(),
            instance: InstanceInfo::default(),
        }
    }
}

impl StudyMetadata {
    /// Builds metadata from raw tag values.
    ///
    /// A blank patient name becomes [`ANONYMOUS_PATIENT`]; an unparseable date
    /// is dropped.
    #[must_use]
    pub fn from_tags(patient_name: &str, patient_id: &str, study_date: &str, modality: &str) -> Self {
        let patient_name = patient_name.trim();
        Self {
            patient_name: if patient_name.is_empty() {
                ANONYMOUS_PATIENT.to_string()
            } else {
                patient_name.to_string()
            },
            patient_id: patient_id.trim().to_string(),
            study_date: parse_study_date(study_date),
            modality: modality.trim().to_string(),
            instance: InstanceInfo::default(),
        }
    }

    /// Study date as `YYYY-MM-DD`, empty when unknown.
    #[must_use]
    pub fn date_label(&self) -> String {
        self.study_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Parses a DICOM `DA` value (`YYYYMMDD`) or an ISO `YYYY-MM-DD` date.
#[must_use]
pub fn parse_study_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}
