// SPDX-License-Identifier: MPL-2.0
//! Study data source port.

use crate::domain::sequence::ImageId;
use crate::domain::study::{MediaKind, StudyMetadata};
use crate::error::Result;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a series in the data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the viewer needs to open a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Ordered image identifiers.
    pub image_ids: Vec<ImageId>,
    pub metadata: StudyMetadata,
    pub media_kind: MediaKind,
}

impl SeriesRecord {
    /// A DICOM series with default metadata.
    #[must_use]
    pub fn dicom(image_ids: Vec<ImageId>) -> Self {
        Self {
            image_ids,
            metadata: StudyMetadata::default(),
            media_kind: MediaKind::Dicom,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: StudyMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Port for the study data source (a PACS, a REST API, local files).
pub trait StudySource: Send + Sync {
    /// Fetches a series.
    ///
    /// The future resolves to [`Error::Source`](crate::error::Error::Source)
    /// when the series does not exist or cannot be read.
    fn series(&self, id: &SeriesId) -> BoxFuture<'static, Result<SeriesRecord>>;
}
