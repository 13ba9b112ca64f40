// SPDX-License-Identifier: MPL-2.0
use cine_lens::application::port::{SeriesId, SurfaceId};
use cine_lens::application::{OverlayInfo, ViewerCore, ViewerSnapshot};
use cine_lens::config::{self, Config};
use cine_lens::domain::layout::GridLayout;
use cine_lens::error::{Error, Result};
use cine_lens::infrastructure::{HeadlessBackend, InMemoryStudySource, DEMO_FRAMES, DEMO_SERIES};
use cine_lens::runtime::ViewerRuntime;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

const HELP: &str = "\
cine-lens: run the viewer core headlessly against the demo series

USAGE:
  cine-lens [OPTIONS] [IMAGE]

OPTIONS:
  --layout RxC        Grid layout (default from settings, else 1x1)
  --frames N          Images in the demo series (default 10)
  --fps N             Cine frame rate, 1-30
  --ticks N           Cine frames to play before printing (default 0)
  --config-dir DIR    Directory holding settings.toml
  -h, --help          Print this help
";

struct Flags {
    layout: Option<GridLayout>,
    frames: usize,
    fps: Option<u32>,
    ticks: u32,
    config_dir: Option<PathBuf>,
    image: String,
}

#[derive(Serialize)]
struct Report {
    snapshot: ViewerSnapshot,
    overlay: OverlayInfo,
}

fn parse_flags() -> Result<Option<Flags>> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(None);
    }
    let flag_error = |err: pico_args::Error| Error::Config(err.to_string());

    let flags = Flags {
        layout: args.opt_value_from_str("--layout").map_err(flag_error)?,
        frames: args
            .opt_value_from_str("--frames")
            .map_err(flag_error)?
            .unwrap_or(DEMO_FRAMES),
        fps: args.opt_value_from_str("--fps").map_err(flag_error)?,
        ticks: args
            .opt_value_from_str("--ticks")
            .map_err(flag_error)?
            .unwrap_or(0),
        config_dir: args.opt_value_from_str("--config-dir").map_err(flag_error)?,
        image: args
            .finish()
            .into_iter()
            .next()
            .and_then(|s| s.into_string().ok())
            .unwrap_or_else(|| "wadouri:demo/sample.dcm".to_string()),
    };
    Ok(Some(flags))
}

fn main() -> Result<()> {
    env_logger::init();

    let Some(flags) = parse_flags()? else {
        return Ok(());
    };

    let (mut settings, warning) = config::load_with_override(flags.config_dir.clone());
    if let Some(warning) = warning {
        log::warn!("{warning}");
    }
    if let Some(layout) = flags.layout {
        settings.layout.default = Some(layout.to_string());
    }
    if let Some(fps) = flags.fps {
        settings.cine.frame_rate = Some(fps);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()?;
    let report = runtime.block_on(run(&flags, &settings))?;

    let json = serde_json::to_string_pretty(&report).map_err(|err| Error::Io(err.to_string()))?;
    println!("{json}");
    Ok(())
}

async fn run(flags: &Flags, settings: &Config) -> Result<Report> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let backend = HeadlessBackend::new().with_events(events_tx);
    let core = ViewerCore::new(backend, settings);
    let slots = core.layout().slot_count();
    let (handle, task) = ViewerRuntime::spawn(core, events_rx);

    for slot in 0..slots {
        handle.bind_surface(slot, SurfaceId::new(slot as u64)).await?;
    }

    let source = InMemoryStudySource::demo(flags.image.as_str(), flags.frames);
    handle
        .load_series(&source, &SeriesId::new(DEMO_SERIES))
        .await?;

    if flags.ticks > 0 && handle.play().await? {
        let interval = settings.frame_rate().interval();
        // Half a frame of slack so the last tick lands before stopping.
        tokio::time::sleep(interval * flags.ticks + interval / 2).await;
        handle.stop().await?;
    }

    let snapshot = handle.snapshot().await?;
    handle.shutdown().await?;
    task.await.map_err(|err| Error::Io(err.to_string()))?;

    let overlay = OverlayInfo::from(&snapshot);
    Ok(Report { snapshot, overlay })
}
