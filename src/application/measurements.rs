// SPDX-License-Identifier: MPL-2.0
//! Measurement aggregation across bound slots.
//!
//! Every refresh is a full resync: the aggregator re-reads each annotation
//! kind from each bound slot and replaces its snapshot. A slot only
//! contributes if all of its reads succeed, so a snapshot never mixes a
//! partial read with complete ones.

use crate::application::port::render::RenderBackend;
use crate::application::slots::{BroadcastReport, ViewportSlotRegistry};
use crate::domain::measurement::{Measurement, MeasurementSnapshot};
use crate::domain::tool::Tool;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MeasurementAggregator {
    snapshot: MeasurementSnapshot,
}

impl MeasurementAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> &MeasurementSnapshot {
        &self.snapshot
    }

    /// Re-reads every annotation kind on every bound slot.
    ///
    /// Returns the per-slot outcome and whether the snapshot changed.
    pub fn refresh<B: RenderBackend>(
        &mut self,
        registry: &ViewportSlotRegistry,
        backend: &B,
    ) -> (BroadcastReport, bool) {
        let mut collected: BTreeMap<Tool, Vec<Measurement>> = BTreeMap::new();
        let report = registry.for_each_bound(|slot, surface| {
            let mut slot_measurements = Vec::new();
            for tool in Tool::ANNOTATION_KINDS {
                let annotations = backend.annotations(surface, tool)?;
                slot_measurements.extend(annotations.into_iter().map(|annotation| Measurement {
                    slot,
                    tool,
                    annotation,
                }));
            }
            for measurement in slot_measurements {
                collected
                    .entry(measurement.tool)
                    .or_default()
                    .push(measurement);
            }
            Ok(())
        });

        let mut snapshot = MeasurementSnapshot::new();
        for (tool, measurements) in collected {
            snapshot.set(tool, measurements);
        }
        let changed = snapshot != self.snapshot;
        self.snapshot = snapshot;
        (report, changed)
    }

    /// Removes every annotation kind from every bound slot and empties the
    /// snapshot.
    pub fn clear<B: RenderBackend>(
        &mut self,
        registry: &ViewportSlotRegistry,
        backend: &mut B,
    ) -> BroadcastReport {
        let report = registry.for_each_bound(|_, surface| {
            for tool in Tool::ANNOTATION_KINDS {
                backend.clear_annotations(surface, tool)?;
            }
            Ok(())
        });
        self.snapshot = MeasurementSnapshot::new();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::port::render::SurfaceId;
    use crate::domain::layout::GridLayout;
    use crate::domain::measurement::{Annotation, AnnotationValue};
    use crate::infrastructure::headless::HeadlessBackend;

    fn setup(layout: GridLayout) -> (HeadlessBackend, ViewportSlotRegistry) {
        let mut backend = HeadlessBackend::new();
        let mut registry = ViewportSlotRegistry::new(layout);
        for slot in 0..layout.slot_count() {
            registry
                .bind(slot, SurfaceId::new(slot as u64), &mut backend)
                .unwrap();
        }
        (backend, registry)
    }

    fn length(id: &str, mm: f64) -> Annotation {
        Annotation::new(id, AnnotationValue::Length { length_mm: mm })
    }

    #[test]
    fn refresh_groups_by_kind_in_slot_order() {
        let (backend, registry) = setup(GridLayout::SIDE_BY_SIDE);
        let probe = backend.probe();
        probe.add_annotation(SurfaceId::new(1), Tool::Length, length("b", 2.0));
        probe.add_annotation(SurfaceId::new(0), Tool::Length, length("a", 1.0));
        probe.add_annotation(
            SurfaceId::new(0),
            Tool::Probe,
            Annotation::new("p", AnnotationValue::Probe { hu: 40.0 }),
        );

        let mut aggregator = MeasurementAggregator::new();
        let (report, changed) = aggregator.refresh(&registry, &backend);

        assert!(report.is_complete());
        assert!(changed);
        let lengths = aggregator.snapshot().get(Tool::Length);
        assert_eq!(lengths.len(), 2);
        assert_eq!((lengths[0].slot, lengths[0].annotation.id.as_str()), (0, "a"));
        assert_eq!((lengths[1].slot, lengths[1].annotation.id.as_str()), (1, "b"));
        assert_eq!(
            aggregator.snapshot().kinds().collect::<Vec<_>>(),
            vec![Tool::Length, Tool::Probe]
        );
    }

    #[test]
    fn refresh_twice_reports_no_change() {
        let (backend, registry) = setup(GridLayout::SINGLE);
        backend.probe().add_annotation(
            SurfaceId::new(0),
            Tool::Angle,
            Annotation::new("x", AnnotationValue::Angle { degrees: 30.0 }),
        );

        let mut aggregator = MeasurementAggregator::new();
        assert!(aggregator.refresh(&registry, &backend).1);
        assert!(!aggregator.refresh(&registry, &backend).1);
    }

    #[test]
    fn failing_slot_contributes_nothing() {
        let (backend, registry) = setup(GridLayout::SIDE_BY_SIDE);
        let probe = backend.probe();
        probe.add_annotation(SurfaceId::new(0), Tool::Length, length("a", 1.0));
        probe.add_annotation(SurfaceId::new(1), Tool::Length, length("b", 2.0));
        probe.fail_surface(SurfaceId::new(1));

        let mut aggregator = MeasurementAggregator::new();
        let (report, _) = aggregator.refresh(&registry, &backend);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(aggregator.snapshot().total(), 1);
        assert_eq!(aggregator.snapshot().get(Tool::Length)[0].slot, 0);
    }

    #[test]
    fn clear_empties_everything_and_is_idempotent() {
        let (mut backend, registry) = setup(GridLayout::QUAD);
        let probe = backend.probe();
        for slot in 0..4 {
            probe.add_annotation(SurfaceId::new(slot), Tool::Length, length("l", 3.0));
        }
        let mut aggregator = MeasurementAggregator::new();
        aggregator.refresh(&registry, &backend);
        assert_eq!(aggregator.snapshot().total(), 4);

        aggregator.clear(&registry, &mut backend);
        assert!(aggregator.snapshot().is_empty());
        aggregator.clear(&registry, &mut backend);
        assert!(aggregator.snapshot().is_empty());

        let (_, changed) = aggregator.refresh(&registry, &backend);
        assert!(!changed);
        assert!(probe.annotations_of(SurfaceId::new(2), Tool::Length).is_empty());
    }
}
