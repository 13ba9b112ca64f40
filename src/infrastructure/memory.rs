// SPDX-License-Identifier: MPL-2.0
//! In-memory study source.

use crate::application::port::study::{SeriesId, SeriesRecord, StudySource};
use crate::domain::sequence::ImageId;
use crate::error::{Error, Result};
use futures_util::future::{self, BoxFuture, FutureExt};
use std::collections::HashMap;

/// Identifier of the sample series.
pub const DEMO_SERIES: &str = "demo";

/// Number of images in the sample series.
pub const DEMO_FRAMES: usize = 10;

/// Study source backed by a map of series.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStudySource {
    series: HashMap<SeriesId, SeriesRecord>,
}

impl InMemoryStudySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding only the sample series: one image shown `frames` times.
    #[must_use]
    pub fn demo(image: impl Into<String>, frames: usize) -> Self {
        let image = ImageId::new(image);
        let mut source = Self::new();
        source.insert(
            SeriesId::new(DEMO_SERIES),
            SeriesRecord::dicom(vec![image; frames]),
        );
        source
    }

    /// Adds or replaces a series.
    pub fn insert(&mut self, id: SeriesId, record: SeriesRecord) {
        self.series.insert(id, record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl StudySource for InMemoryStudySource {
    fn series(&self, id: &SeriesId) -> BoxFuture<'static, Result<SeriesRecord>> {
        let record = self
            .series
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Source(format!("series {id} not found")));
        future::ready(record).boxed()
    }
}
