use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use gcead_lib::{
    config::{AppConfig, DEFAULT_SAMPLES_PER_SECOND},
    driver::{PollDriver, SharedController},
    hardware::SimulatedHardware,
    io::{
        export::write_recording_csv,
        project::{read_project, JsonProjectStore},
    },
    ui::HeadlessUi,
    RecId, SessionController, StopOutcome, TickOutcome,
};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Instant,
};

#[derive(Parser)]
#[command(
    name = "gcead",
    version,
    about = "GC-EAD acquisition from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record from the simulated device into a project file
    Record {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        /// Stop after this many polls unless the duration limit hits first
        #[arg(long)]
        ticks: Option<u64>,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long)]
        duration_minutes: Option<u32>,
        #[arg(long)]
        gc_delay_ms: Option<u32>,
        /// Poll on a wall-clock timer thread instead of a virtual clock
        #[arg(long)]
        realtime: bool,
        /// Throw the recording away instead of committing it
        #[arg(long)]
        discard: bool,
    },
    /// Summarise the recordings stored in a project
    List { project: PathBuf },
    /// Write one recording as CSV
    Export {
        project: PathBuf,
        #[arg(long)]
        recording: u32,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SAMPLES_PER_SECOND)]
        samples_per_second: u32,
    },
    /// Write a configuration file with default settings
    ConfigInit {
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct RecordSummary {
    hardware: String,
    recording: Option<u32>,
    samples: usize,
    committed: bool,
    saved: bool,
    auto_stop: bool,
    project: Option<PathBuf>,
    recordings: usize,
}

#[derive(Serialize)]
struct RecordingListing {
    id: u32,
    time_of_recording: Option<String>,
    samples: usize,
    fid_sample_shift: i32,
    ead_factor: f64,
    fid_factor: f64,
}

#[derive(Serialize)]
struct ProjectListing {
    comment: String,
    recordings: Vec<RecordingListing>,
}

struct RecordArgs {
    config: Option<PathBuf>,
    out: PathBuf,
    ticks: Option<u64>,
    seed: u64,
    duration_minutes: Option<u32>,
    gc_delay_ms: Option<u32>,
    realtime: bool,
    discard: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Record {
            config,
            out,
            ticks,
            seed,
            duration_minutes,
            gc_delay_ms,
            realtime,
            discard,
        } => cmd_record(RecordArgs {
            config,
            out,
            ticks,
            seed,
            duration_minutes,
            gc_delay_ms,
            realtime,
            discard,
        })?,
        Commands::List { project } => cmd_list(&project)?,
        Commands::Export {
            project,
            recording,
            out,
            samples_per_second,
        } => cmd_export(&project, RecId(recording), &out, samples_per_second)?,
        Commands::ConfigInit { path, force } => cmd_config_init(&path, force)?,
    }
    Ok(())
}

fn cmd_record(args: RecordArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(minutes) = args.duration_minutes {
        config.recording.duration_minutes = minutes;
    }
    if let Some(delay) = args.gc_delay_ms {
        config.recording.gc_delay_ms = delay;
    }
    if args.ticks.is_none() && config.recording.duration_minutes == 0 {
        bail!("recording would never end: pass --ticks or a non-zero --duration-minutes");
    }

    let ui = HeadlessUi::new().with_save_path(args.out.clone());
    let mut controller = SessionController::new(
        config,
        Box::new(SimulatedHardware::new(args.seed)),
        Box::new(ui),
        Box::new(JsonProjectStore::new()),
    );
    controller.on_hardware_availability_changed();
    let id = controller
        .start_recording()
        .context("starting the recording")?;

    let (controller, outcome) = if args.realtime {
        run_realtime(controller, args.ticks, args.discard)?
    } else {
        run_virtual_clock(controller, args.ticks, args.discard)?
    };

    let (committed, saved, auto_stop) = match outcome {
        StopOutcome::Committed {
            saved, auto_stop, ..
        } => (true, saved, auto_stop),
        StopOutcome::Discarded => (false, false, false),
    };
    let samples = controller
        .document()
        .recording(id)
        .map(|rec| rec.sample_count())
        .unwrap_or(0);
    let summary = RecordSummary {
        hardware: controller.hardware().hardware_name(),
        recording: committed.then_some(id.0),
        samples,
        committed,
        saved,
        auto_stop,
        project: controller.document().filename().map(Path::to_path_buf),
        recordings: controller.document().recording_count(),
    };
    println!("{}", serde_json::to_string(&summary)?);
    if committed && !saved {
        bail!("recording could not be saved to {}", args.out.display());
    }
    Ok(())
}

/// Drive the timer with synthetic instants, one poll interval apart.
fn run_virtual_clock(
    mut controller: SessionController,
    ticks: Option<u64>,
    discard: bool,
) -> Result<(SessionController, StopOutcome)> {
    let interval = controller.poll_interval();
    let base = Instant::now();
    let mut fired = 0u64;
    let mut step = 1u32;
    while ticks.map_or(true, |limit| fired < limit) {
        let now = base + interval * step;
        step = step
            .checked_add(1)
            .ok_or_else(|| anyhow!("virtual clock overflowed"))?;
        match controller.on_timer(now) {
            Some(TickOutcome::Stopped(outcome)) => return Ok((controller, outcome)),
            Some(_) => fired += 1,
            None if !controller.is_recording() => bail!("recording ended unexpectedly"),
            None => {}
        }
    }
    let outcome = finish(&mut controller, discard)?;
    Ok((controller, outcome))
}

/// Run the polling thread against the wall clock.
fn run_realtime(
    controller: SessionController,
    ticks: Option<u64>,
    discard: bool,
) -> Result<(SessionController, StopOutcome)> {
    let interval = controller.poll_interval();
    let deadline = ticks.map(|n| Instant::now() + interval * n.min(u64::from(u32::MAX)) as u32);
    let shared: SharedController = Arc::new(Mutex::new(controller));
    let driver = PollDriver::spawn(Arc::clone(&shared));
    loop {
        std::thread::sleep(interval / 2);
        let recording = shared
            .lock()
            .map_err(|_| anyhow!("controller lock poisoned"))?
            .is_recording();
        if !recording || deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
    }
    driver.stop();

    let mut controller = Arc::try_unwrap(shared)
        .map_err(|_| anyhow!("controller still shared after the driver stopped"))?
        .into_inner()
        .map_err(|_| anyhow!("controller lock poisoned"))?;
    let outcome = if controller.is_recording() {
        finish(&mut controller, discard)?
    } else {
        let last = controller.document().recordings().last().map(|rec| rec.id());
        match last {
            Some(id) => StopOutcome::Committed {
                id,
                saved: !controller.document().is_dirty(),
                auto_stop: true,
            },
            None => StopOutcome::Discarded,
        }
    };
    Ok((controller, outcome))
}

fn finish(controller: &mut SessionController, discard: bool) -> Result<StopOutcome> {
    if discard {
        controller
            .discard_recording()?
            .ok_or_else(|| anyhow!("discard was declined"))
    } else {
        Ok(controller.save_recording()?)
    }
}

fn cmd_list(project: &Path) -> Result<()> {
    let doc = read_project(project)?;
    let listing = ProjectListing {
        comment: doc.comment().to_string(),
        recordings: doc
            .recordings()
            .iter()
            .map(|rec| RecordingListing {
                id: rec.id().0,
                time_of_recording: rec.time_of_recording().map(|t| t.to_rfc3339()),
                samples: rec.sample_count(),
                fid_sample_shift: rec.fid().sample_shift(),
                ead_factor: rec.ead().conversion_factor(),
                fid_factor: rec.fid().conversion_factor(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string(&listing)?);
    Ok(())
}

fn cmd_export(project: &Path, id: RecId, out: &Path, samples_per_second: u32) -> Result<()> {
    let doc = read_project(project)?;
    let rec = doc
        .recording(id)
        .ok_or_else(|| anyhow!("no recording {id} in {}", project.display()))?;
    write_recording_csv(out, rec, samples_per_second)?;
    log::info!("wrote {} samples to {}", rec.sample_count(), out.display());
    Ok(())
}

fn cmd_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    AppConfig::default().save(path)?;
    println!("{}", path.display());
    Ok(())
}
