// SPDX-License-Identifier: MPL-2.0
use approx::assert_abs_diff_eq;
use cine_lens::application::port::{SeriesId, SeriesRecord, SurfaceId};
use cine_lens::application::{Notice, Severity, ViewerCore};
use cine_lens::config::{self, Config};
use cine_lens::domain::layout::GridLayout;
use cine_lens::domain::measurement::{Annotation, AnnotationValue};
use cine_lens::domain::sequence::{Direction, ImageId};
use cine_lens::domain::study::{MediaKind, StudyMetadata};
use cine_lens::domain::tool::Tool;
use cine_lens::domain::transform::{RotateDirection, TransformOp};
use cine_lens::error::Error;
use cine_lens::infrastructure::{
    HeadlessBackend, HeadlessProbe, InMemoryStudySource, DEMO_FRAMES, DEMO_SERIES,
};
use cine_lens::runtime::{ViewerHandle, ViewerRuntime};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

type Viewer = (
    ViewerHandle,
    JoinHandle<ViewerCore<HeadlessBackend>>,
    HeadlessProbe,
);

fn series(count: usize) -> SeriesRecord {
    SeriesRecord::dicom(
        (0..count)
            .map(|i| ImageId::new(format!("wadouri:ct/{i}")))
            .collect(),
    )
}

/// Spawns a viewer with every slot of `layout` bound to surface `slot`.
async fn viewer(layout: GridLayout, config: &Config) -> Viewer {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let backend = HeadlessBackend::new().with_events(events_tx);
    let probe = backend.probe();
    let (handle, task) = ViewerRuntime::spawn(ViewerCore::new(backend, config), events_rx);
    handle.set_layout(layout).await.unwrap();
    for slot in 0..layout.slot_count() {
        handle
            .bind_surface(slot, SurfaceId::new(slot as u64))
            .await
            .unwrap();
    }
    (handle, task, probe)
}

fn drain(notices: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    std::iter::from_fn(|| notices.try_recv().ok()).collect()
}

#[tokio::test(start_paused = true)]
async fn tool_is_exclusive_on_every_layout() {
    for layout in GridLayout::PRESETS {
        let (handle, _task, probe) = viewer(layout, &Config::default()).await;
        handle.open_series(series(3)).await.unwrap();

        handle.activate_tool(Tool::Length).await.unwrap();
        handle.activate_tool_named("Wwwc").await.unwrap();

        for slot in 0..layout.slot_count() {
            assert_eq!(
                probe.active_tools(SurfaceId::new(slot as u64)),
                vec![Tool::WindowLevel],
                "layout {layout}, slot {slot}"
            );
        }
        assert_eq!(
            handle.snapshot().await.unwrap().active_tool,
            Some(Tool::WindowLevel)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn transform_reaches_every_slot() {
    let (handle, _task, probe) = viewer(GridLayout::QUAD, &Config::default()).await;
    handle.open_series(series(3)).await.unwrap();

    handle.apply_transform(TransformOp::ZoomIn).await.unwrap();
    handle
        .apply_transform(TransformOp::Rotate(RotateDirection::CounterClockwise))
        .await
        .unwrap();
    let state = handle
        .apply_transform(TransformOp::FlipHorizontal)
        .await
        .unwrap();

    assert_eq!(state.rotation.degrees(), 270);
    assert!(state.horizontal_flip);
    for slot in 0..4 {
        assert_eq!(probe.transform_of(SurfaceId::new(slot)), Some(state));
    }
}

#[tokio::test(start_paused = true)]
async fn navigation_clamps_and_jump_reports_out_of_range() {
    let (handle, _task, _probe) = viewer(GridLayout::SINGLE, &Config::default()).await;
    handle.open_series(series(3)).await.unwrap();
    let mut notices = handle.notices();

    assert_eq!(handle.navigate(Direction::Previous).await.unwrap(), None);
    assert_eq!(handle.navigate(Direction::Next).await.unwrap(), Some(1));
    assert_eq!(
        handle.jump_to(9).await,
        Err(Error::OutOfRange { index: 9, len: 3 })
    );

    let position = handle.snapshot().await.unwrap().position;
    assert_eq!(position.index, Some(1));
    assert_eq!(position.label(), "Image: 2 / 3");
    let received = drain(&mut notices);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].severity(), Severity::Error);
}

#[tokio::test(start_paused = true)]
async fn annotations_drawn_on_slots_are_aggregated_and_cleared() {
    let (handle, _task, probe) = viewer(GridLayout::SIDE_BY_SIDE, &Config::default()).await;
    handle.open_series(series(2)).await.unwrap();

    probe.add_annotation(
        SurfaceId::new(1),
        Tool::Length,
        Annotation::new("l1", AnnotationValue::Length { length_mm: 42.5 }),
    );
    probe.add_annotation(
        SurfaceId::new(0),
        Tool::EllipticalRoi,
        Annotation::new("e1", AnnotationValue::Area { area_mm2: 310.0 }),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;

    let measurements = handle.snapshot().await.unwrap().measurements;
    assert_eq!(measurements.total(), 2);
    let length = &measurements.get(Tool::Length)[0];
    assert_eq!(length.slot, 1);
    assert_eq!(length.label(), "42.50 mm");
    assert_eq!(
        measurements.get(Tool::EllipticalRoi)[0].label(),
        "Area: 310.00 mm²"
    );

    handle.clear_measurements().await.unwrap();
    handle.clear_measurements().await.unwrap();
    assert!(handle.snapshot().await.unwrap().measurements.is_empty());
    assert!(probe
        .annotations_of(SurfaceId::new(1), Tool::Length)
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn losing_the_last_surface_stops_cine() {
    let (handle, _task, _probe) = viewer(GridLayout::SINGLE, &Config::default()).await;
    handle.open_series(series(5)).await.unwrap();
    let mut notices = handle.notices();

    assert!(handle.play().await.unwrap());
    handle.unbind_surface(0).await.unwrap();

    assert!(!handle.snapshot().await.unwrap().cine.is_playing());
    let errors: Vec<_> = drain(&mut notices)
        .into_iter()
        .filter_map(|notice| notice.error().cloned())
        .collect();
    assert_eq!(errors, vec![Error::RendererLost]);

    assert_eq!(handle.play().await, Err(Error::RendererLost));
}

#[tokio::test(start_paused = true)]
async fn failed_cine_frames_keep_playing() {
    let (handle, _task, probe) = viewer(GridLayout::SINGLE, &Config::default()).await;
    probe.fail_image(ImageId::new("wadouri:ct/1"));
    handle.open_series(series(4)).await.unwrap();
    let mut notices = handle.notices();

    handle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.cine.is_playing());
    assert_eq!(snapshot.displayed_index, Some(2));
    let failures: Vec<_> = drain(&mut notices)
        .into_iter()
        .filter(|notice| matches!(notice.error(), Some(Error::LoadFailure { .. })))
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity(), Severity::Warning);
}

#[tokio::test(start_paused = true)]
async fn frame_rate_changes_restart_the_timer() {
    let (handle, _task, _probe) = viewer(GridLayout::SINGLE, &Config::default()).await;
    handle.open_series(series(30)).await.unwrap();

    handle.play().await.unwrap();
    assert_eq!(handle.set_frame_rate(20).await.unwrap().fps(), 20);
    tokio::time::sleep(Duration::from_millis(520)).await;
    assert_eq!(handle.snapshot().await.unwrap().position.index, Some(10));

    assert_eq!(handle.set_frame_rate(500).await.unwrap().fps(), 30);
}

#[tokio::test(start_paused = true)]
async fn non_dicom_series_leaves_surfaces_alone() {
    let (handle, _task, probe) = viewer(GridLayout::SINGLE, &Config::default()).await;
    let mut record = series(4);
    record.media_kind = MediaKind::Video;
    handle.open_series(record).await.unwrap();

    assert_eq!(handle.navigate(Direction::Next).await.unwrap(), None);
    assert!(!handle.play().await.unwrap());
    handle.activate_tool(Tool::Angle).await.unwrap();

    assert!(probe.loads().is_empty());
    assert_eq!(probe.active_tools(SurfaceId::new(0)), vec![Tool::Pan]);
    assert_eq!(handle.snapshot().await.unwrap().media_kind, MediaKind::Video);
}

#[tokio::test(start_paused = true)]
async fn demo_series_loads_through_study_source() {
    let (handle, _task, probe) = viewer(GridLayout::SINGLE, &Config::default()).await;
    let source = InMemoryStudySource::demo("wadouri:sample.dcm", DEMO_FRAMES);

    handle
        .load_series(&source, &SeriesId::new(DEMO_SERIES))
        .await
        .unwrap();
    handle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1050)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.position.len, DEMO_FRAMES);
    assert_eq!(snapshot.position.index, Some(0));
    // One image repeated: everything after the first load is a cache hit.
    assert_eq!(probe.load_count(), 1);

    assert!(matches!(
        handle.load_series(&source, &SeriesId::new("missing")).await,
        Err(Error::Source(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn metadata_shows_up_in_overlay() {
    let (handle, _task, _probe) = viewer(GridLayout::SINGLE, &Config::default()).await;
    let record = series(2).with_metadata(StudyMetadata::from_tags("", "1234", "20230915", "MR"));
    handle.open_series(record).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    let overlay = cine_lens::application::OverlayInfo::from(&snapshot);
    assert_eq!(overlay.patient_name, "Anonymous");
    assert_eq!(overlay.study_date, "Date: 2023-09-15");
    assert_eq!(overlay.image, "Image: 1 / 2");
}

#[test]
fn settings_file_drives_a_new_viewer() {
    let dir = tempdir().expect("Failed to create temporary directory");
    let mut settings = Config::default();
    settings.layout.default = Some("2x2".to_string());
    settings.cine.frame_rate = Some(25);
    settings.display.zoom_in_factor = Some(2.0);
    config::save_with_override(&settings, Some(dir.path().to_path_buf()))
        .expect("Failed to write config file");

    let (loaded, warning) = config::load_with_override(Some(dir.path().to_path_buf()));
    assert!(warning.is_none());
    let backend = HeadlessBackend::new();
    let probe = backend.probe();
    let mut core = ViewerCore::new(backend, &loaded);
    for slot in 0..4 {
        core.bind_surface(slot, SurfaceId::new(slot as u64)).unwrap();
    }
    core.open_series(series(2));

    assert_eq!(core.layout(), GridLayout::QUAD);
    assert_eq!(core.frame_rate().fps(), 25);
    let state = core.apply_transform(TransformOp::ZoomIn);
    assert_abs_diff_eq!(state.scale.percent(), 200.0);
    assert_eq!(probe.transform_of(SurfaceId::new(3)), Some(state));
}
