// SPDX-License-Identifier: MPL-2.0
//! Async driver for the viewer core.
//!
//! [`ViewerRuntime::spawn`] moves a [`ViewerCore`] into a tokio task that
//! owns it exclusively. The task serialises four event sources:
//!
//! - commands from any number of [`ViewerHandle`]s
//! - the cine timer, rebuilt whenever the core's [`TimerSpec`] changes
//! - image-load completions from spawned load tasks
//! - render notifications from the backend
//!
//! Shutting down (or dropping every handle) tears the core down and hands it
//! back through the task's `JoinHandle`.

use crate::application::cine::TimerSpec;
use crate::application::loader::LoadCompletion;
use crate::application::notices::Notice;
use crate::application::port::render::{RenderBackend, RenderEvent, SurfaceId};
use crate::application::port::study::{SeriesId, SeriesRecord, StudySource};
use crate::application::snapshot::ViewerSnapshot;
use crate::application::viewer::ViewerCore;
use crate::config::COMMAND_QUEUE_CAPACITY;
use crate::domain::layout::{GridLayout, SlotIndex};
use crate::domain::playback::FrameRate;
use crate::domain::sequence::Direction;
use crate::domain::tool::Tool;
use crate::domain::transform::{TransformOp, TransformState};
use crate::error::{Error, Result};
use std::future;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

type Reply<T> = oneshot::Sender<T>;

/// Commands accepted by the viewer task.
#[derive(Debug)]
pub enum Command {
    OpenSeries(Box<SeriesRecord>, Reply<()>),
    SetLayout(GridLayout, Reply<()>),
    SetLayoutNamed(String, Reply<Result<()>>),
    BindSurface {
        slot: SlotIndex,
        surface: SurfaceId,
        reply: Reply<Result<()>>,
    },
    UnbindSurface {
        slot: SlotIndex,
        reply: Reply<Result<()>>,
    },
    Navigate(Direction, Reply<Option<usize>>),
    JumpTo(usize, Reply<Result<()>>),
    Transform(TransformOp, Reply<TransformState>),
    ActivateTool(Tool, Reply<()>),
    ActivateToolNamed(String, Reply<Result<()>>),
    ReleaseTool(Reply<()>),
    Play(Reply<Result<bool>>),
    Stop(Reply<bool>),
    ToggleCine(Reply<Result<bool>>),
    SetFrameRate(u32, Reply<FrameRate>),
    DisposeCine(Reply<()>),
    RefreshMeasurements(Reply<()>),
    ClearMeasurements(Reply<()>),
    Snapshot(Reply<ViewerSnapshot>),
    /// Stops the task; the core is torn down and returned.
    Shutdown,
}

struct CineTimer {
    spec: TimerSpec,
    interval: Interval,
}

/// The task owning a [`ViewerCore`].
pub struct ViewerRuntime<B: RenderBackend> {
    core: ViewerCore<B>,
    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<LoadCompletion<B::Image>>,
    completions_rx: mpsc::UnboundedReceiver<LoadCompletion<B::Image>>,
    render_events: Option<mpsc::UnboundedReceiver<RenderEvent>>,
    timer: Option<CineTimer>,
}

impl<B: RenderBackend> ViewerRuntime<B> {
    /// Spawns the viewer task on the current tokio runtime.
    ///
    /// `render_events` is the receiving end of the backend's notification
    /// channel; the task keeps running when it closes.
    pub fn spawn(
        core: ViewerCore<B>,
        render_events: mpsc::UnboundedReceiver<RenderEvent>,
    ) -> (ViewerHandle, JoinHandle<ViewerCore<B>>) {
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let handle = ViewerHandle {
            commands: command_tx,
            snapshots: core.subscribe(),
            notices: core.notice_sender(),
        };
        let runtime = Self {
            core,
            commands,
            completions_tx,
            completions_rx,
            render_events: Some(render_events),
            timer: None,
        };
        (handle, tokio::spawn(runtime.run()))
    }

    async fn run(mut self) -> ViewerCore<B> {
        log::debug!("viewer task started");
        loop {
            self.start_loads();
            self.sync_timer();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                generation = next_tick(&mut self.timer) => {
                    if self.core.cine_timer().map(|spec| spec.generation) == Some(generation) {
                        self.core.cine_tick();
                    }
                }
                Some(completion) = self.completions_rx.recv() => {
                    self.core.complete_load(completion);
                }
                event = next_event(&mut self.render_events) => match event {
                    Some(event) => self.core.handle_render_event(event),
                    None => {
                        log::debug!("render event channel closed");
                        self.render_events = None;
                    }
                },
            }
        }
        self.core.teardown();
        log::debug!("viewer task stopped");
        self.core
    }

    fn handle(&mut self, command: Command) {
        let core = &mut self.core;
        // A caller that stopped waiting for its reply is not an error.
        match command {
            Command::OpenSeries(record, reply) => {
                core.open_series(*record);
                let _ = reply.send(());
            }
            Command::SetLayout(layout, reply) => {
                core.set_layout(layout);
                let _ = reply.send(());
            }
            Command::SetLayoutNamed(layout, reply) => {
                let _ = reply.send(core.set_layout_named(&layout));
            }
            Command::BindSurface {
                slot,
                surface,
                reply,
            } => {
                let _ = reply.send(core.bind_surface(slot, surface));
            }
            Command::UnbindSurface { slot, reply } => {
                let _ = reply.send(core.unbind_surface(slot));
            }
            Command::Navigate(direction, reply) => {
                let _ = reply.send(core.navigate(direction));
            }
            Command::JumpTo(index, reply) => {
                let _ = reply.send(core.jump_to(index));
            }
            Command::Transform(op, reply) => {
                let _ = reply.send(core.apply_transform(op));
            }
            Command::ActivateTool(tool, reply) => {
                core.activate_tool(tool);
                let _ = reply.send(());
            }
            Command::ActivateToolNamed(name, reply) => {
                let _ = reply.send(core.activate_tool_named(&name));
            }
            Command::ReleaseTool(reply) => {
                core.release_tool();
                let _ = reply.send(());
            }
            Command::Play(reply) => {
                let _ = reply.send(core.play());
            }
            Command::Stop(reply) => {
                let _ = reply.send(core.stop());
            }
            Command::ToggleCine(reply) => {
                let _ = reply.send(core.toggle_cine());
            }
            Command::SetFrameRate(fps, reply) => {
                let _ = reply.send(core.set_frame_rate(fps));
            }
            Command::DisposeCine(reply) => {
                core.dispose_cine();
                let _ = reply.send(());
            }
            Command::RefreshMeasurements(reply) => {
                core.refresh_measurements();
                let _ = reply.send(());
            }
            Command::ClearMeasurements(reply) => {
                core.clear_measurements();
                let _ = reply.send(());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(core.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn start_loads(&mut self) {
        for job in self.core.start_loads() {
            let completions = self.completions_tx.clone();
            tokio::spawn(async move {
                let result = job.future.await;
                // The viewer task is gone; nobody needs the image.
                let _ = completions.send(LoadCompletion {
                    tag: job.tag,
                    image: job.image,
                    result,
                });
            });
        }
    }

    /// Keeps exactly one timer matching the core's current cine session.
    fn sync_timer(&mut self) {
        let wanted = self.core.cine_timer();
        if self.timer.as_ref().map(|timer| timer.spec) == wanted {
            return;
        }
        self.timer = wanted.map(|spec| {
            let mut interval = time::interval_at(Instant::now() + spec.interval, spec.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            CineTimer { spec, interval }
        });
    }
}

/// Resolves with the timer's generation on its next tick; never without one.
async fn next_tick(timer: &mut Option<CineTimer>) -> u64 {
    match timer {
        Some(timer) => {
            timer.interval.tick().await;
            timer.spec.generation
        }
        None => future::pending().await,
    }
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<RenderEvent>>,
) -> Option<RenderEvent> {
    match events {
        Some(events) => events.recv().await,
        None => future::pending().await,
    }
}

/// Cloneable handle to a running viewer task.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<ViewerSnapshot>,
    notices: broadcast::Sender<Notice>,
}

impl ViewerHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::Disconnected)?;
        response.await.map_err(|_| Error::Disconnected)
    }

    /// Latest published snapshot, without a round trip to the task.
    #[must_use]
    pub fn current(&self) -> ViewerSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewerSnapshot> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn open_series(&self, record: SeriesRecord) -> Result<()> {
        self.request(|reply| Command::OpenSeries(Box::new(record), reply))
            .await
    }

    /// Fetches a series from `source` and opens it.
    ///
    /// # Errors
    ///
    /// Returns the source error, also published as a notice.
    pub async fn load_series(&self, source: &impl StudySource, id: &SeriesId) -> Result<()> {
        match source.series(id).await {
            Ok(record) => self.open_series(record).await,
            Err(err) => {
                // No subscriber is not an error.
                let _ = self.notices.send(Notice::from_error(err.clone()));
                log::warn!("{err}");
                Err(err)
            }
        }
    }

    pub async fn set_layout(&self, layout: GridLayout) -> Result<()> {
        self.request(|reply| Command::SetLayout(layout, reply)).await
    }

    pub async fn set_layout_named(&self, layout: &str) -> Result<()> {
        let layout = layout.to_string();
        self.request(|reply| Command::SetLayoutNamed(layout, reply))
            .await?
    }

    pub async fn bind_surface(&self, slot: SlotIndex, surface: SurfaceId) -> Result<()> {
        self.request(|reply| Command::BindSurface {
            slot,
            surface,
            reply,
        })
        .await?
    }

    pub async fn unbind_surface(&self, slot: SlotIndex) -> Result<()> {
        self.request(|reply| Command::UnbindSurface { slot, reply })
            .await?
    }

    pub async fn navigate(&self, direction: Direction) -> Result<Option<usize>> {
        self.request(|reply| Command::Navigate(direction, reply))
            .await
    }

    pub async fn jump_to(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::JumpTo(index, reply)).await?
    }

    pub async fn apply_transform(&self, op: TransformOp) -> Result<TransformState> {
        self.request(|reply| Command::Transform(op, reply)).await
    }

    pub async fn activate_tool(&self, tool: Tool) -> Result<()> {
        self.request(|reply| Command::ActivateTool(tool, reply))
            .await
    }

    pub async fn activate_tool_named(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.request(|reply| Command::ActivateToolNamed(name, reply))
            .await?
    }

    pub async fn release_tool(&self) -> Result<()> {
        self.request(Command::ReleaseTool).await
    }

    pub async fn play(&self) -> Result<bool> {
        self.request(Command::Play).await?
    }

    pub async fn stop(&self) -> Result<bool> {
        self.request(Command::Stop).await
    }

    pub async fn toggle_cine(&self) -> Result<bool> {
        self.request(Command::ToggleCine).await?
    }

    pub async fn set_frame_rate(&self, fps: u32) -> Result<FrameRate> {
        self.request(|reply| Command::SetFrameRate(fps, reply))
            .await
    }

    pub async fn dispose_cine(&self) -> Result<()> {
        self.request(Command::DisposeCine).await
    }

    pub async fn refresh_measurements(&self) -> Result<()> {
        self.request(Command::RefreshMeasurements).await
    }

    pub async fn clear_measurements(&self) -> Result<()> {
        self.request(Command::ClearMeasurements).await
    }

    /// Snapshot taken by the task after every queued command ran.
    pub async fn snapshot(&self) -> Result<ViewerSnapshot> {
        self.request(Command::Snapshot).await
    }

    /// Asks the task to stop. Awaiting its `JoinHandle` returns the core.
    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| Error::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sequence::ImageId;
    use crate::application::slots::SlotState;
    use crate::infrastructure::headless::{HeadlessBackend, HeadlessProbe};
    use crate::test_utils::assert_abs_diff_eq;
    use std::time::Duration;

    fn series(count: usize) -> SeriesRecord {
        SeriesRecord::dicom((0..count).map(|i| ImageId::new(format!("img-{i}"))).collect())
    }

    async fn spawn_viewer() -> (
        ViewerHandle,
        JoinHandle<ViewerCore<HeadlessBackend>>,
        HeadlessProbe,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let backend = HeadlessBackend::new().with_events(events_tx);
        let probe = backend.probe();
        let (handle, task) = ViewerRuntime::spawn(ViewerCore::with_defaults(backend), events_rx);
        handle.bind_surface(0, SurfaceId::new(0)).await.unwrap();
        (handle, task, probe)
    }

    #[tokio::test(start_paused = true)]
    async fn cine_advances_at_frame_rate() {
        let (handle, _task, _probe) = spawn_viewer().await;
        handle.open_series(series(10)).await.unwrap();

        assert!(handle.play().await.unwrap());
        time::sleep(Duration::from_millis(2550)).await;
        assert_eq!(handle.snapshot().await.unwrap().position.index, Some(5));

        handle.stop().await.unwrap();
        handle.play().await.unwrap();
        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(handle.snapshot().await.unwrap().position.index, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_cine_does_not_tick() {
        let (handle, _task, _probe) = spawn_viewer().await;
        handle.open_series(series(4)).await.unwrap();

        handle.play().await.unwrap();
        handle.stop().await.unwrap();
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(handle.snapshot().await.unwrap().position.index, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_load_does_not_overwrite() {
        let (handle, _task, probe) = spawn_viewer().await;
        probe.set_load_delay(ImageId::new("img-3"), Duration::from_millis(500));
        handle.open_series(series(8)).await.unwrap();

        handle.jump_to(3).await.unwrap();
        handle.jump_to(5).await.unwrap();
        time::sleep(Duration::from_millis(600)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.displayed_index, Some(5));
        assert_eq!(probe.displayed(SurfaceId::new(0)), Some(ImageId::new("img-5")));
    }

    #[tokio::test(start_paused = true)]
    async fn load_from_previous_series_does_not_overwrite() {
        let (handle, _task, probe) = spawn_viewer().await;
        probe.set_load_delay(ImageId::new("a-0"), Duration::from_millis(500));
        let named = |prefix: &str| {
            SeriesRecord::dicom(
                (0..4)
                    .map(|i| ImageId::new(format!("{prefix}-{i}")))
                    .collect(),
            )
        };

        handle.open_series(named("a")).await.unwrap();
        handle.open_series(named("b")).await.unwrap();
        time::sleep(Duration::from_millis(600)).await;

        assert_eq!(probe.displayed(SurfaceId::new(0)), Some(ImageId::new("b-0")));
        assert_eq!(handle.snapshot().await.unwrap().displayed_index, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn recovered_slot_catches_up_with_shared_transform() {
        let (handle, _task, probe) = spawn_viewer().await;
        handle.set_layout(GridLayout::SIDE_BY_SIDE).await.unwrap();
        handle.bind_surface(1, SurfaceId::new(1)).await.unwrap();
        handle.open_series(series(3)).await.unwrap();

        probe.fail_surface(SurfaceId::new(1));
        let zoomed = handle.apply_transform(TransformOp::ZoomIn).await.unwrap();
        probe.heal_surface(SurfaceId::new(1));
        handle.navigate(Direction::Next).await.unwrap();
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.snapshot().await.unwrap().transform, zoomed);
        for slot in 0..2 {
            assert_eq!(probe.transform_of(SurfaceId::new(slot)), Some(zoomed));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interactive_pan_is_adopted() {
        let (handle, _task, probe) = spawn_viewer().await;
        handle.set_layout(GridLayout::SIDE_BY_SIDE).await.unwrap();
        handle.bind_surface(1, SurfaceId::new(1)).await.unwrap();
        handle.open_series(series(2)).await.unwrap();

        probe.pan_surface(SurfaceId::new(1), 12.0, 4.0);
        time::sleep(Duration::from_millis(10)).await;

        let transform = handle.snapshot().await.unwrap().transform;
        assert_abs_diff_eq!(transform.pan.x, 12.0);
        assert_eq!(probe.transform_of(SurfaceId::new(0)), Some(transform));
    }

    #[tokio::test]
    async fn shutdown_returns_torn_down_core() {
        let (handle, task, probe) = spawn_viewer().await;
        handle.shutdown().await.unwrap();

        let core = task.await.unwrap();
        assert!(!probe.is_enabled(SurfaceId::new(0)));
        assert_eq!(core.slot_state(0), Some(SlotState::Disposed));
        assert_eq!(handle.snapshot().await, Err(Error::Disconnected));
    }
}
