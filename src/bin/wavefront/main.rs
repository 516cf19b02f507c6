//! wavefront CLI - run the path tracer viewer or dry-run the frame scheduler.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wavefront::scheduler::{audit_staging, GpuCommand, Kernel};
use wavefront::util::init_tracing;
use wavefront::{FrameScheduler, ScheduleParams, SchedulerState, Settings};

#[derive(Parser, Debug)]
#[command(name = "wavefront", version, about = "Wavefront GPU path tracer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the viewer with the built-in free camera engine
    Run {
        /// Settings file (default: config dir)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Directory holding the WGSL shaders
        #[arg(long)]
        shaders: Option<PathBuf>,
    },
    /// Print the command lists the scheduler would submit, without a GPU
    Plan {
        /// Number of displayed frames to plan
        #[arg(long, default_value_t = 2)]
        frames: u32,
        /// Settings file (default: config dir)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Print the effective settings as JSON
    Settings {
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(p) => Settings::load_from(p).with_context(|| format!("loading settings from {}", p.display())),
        None => Ok(Settings::load()),
    }
}

fn main() -> Result<()> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    tracing::debug!(
        "wavefront {} built {} {}",
        env!("CARGO_PKG_VERSION"),
        env!("WAVEFRONT_BUILD_DATE"),
        env!("WAVEFRONT_BUILD_TIME")
    );

    match cli.command.unwrap_or(Command::Run { settings: None, shaders: None }) {
        Command::Run { settings: path, shaders } => {
            let mut settings = load_settings(path.as_ref())?;
            if let Some(dir) = shaders {
                settings.shader_dir = dir;
            }
            cmd_run(settings, path)
        }
        Command::Plan { frames, settings } => cmd_plan(&load_settings(settings.as_ref())?, frames),
        Command::Settings { settings } => {
            let settings = load_settings(settings.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

#[cfg(feature = "viewer")]
fn cmd_run(settings: Settings, path: Option<PathBuf>) -> Result<()> {
    use wavefront::engine::FreeCamEngine;
    let engine = FreeCamEngine::from_settings(&settings);
    wavefront::viewer::run(settings, path, Box::new(engine))
}

#[cfg(not(feature = "viewer"))]
fn cmd_run(_settings: Settings, _path: Option<PathBuf>) -> Result<()> {
    anyhow::bail!("viewer not available; rebuild with --features viewer")
}

fn cmd_plan(settings: &Settings, frames: u32) -> Result<()> {
    let params = ScheduleParams::from_settings(settings)?;
    let scheduler = FrameScheduler::new(params);
    let mut state = SchedulerState::from_settings(settings);

    println!(
        "{}x{}  bounces {}  spp {}  filter {}  reprojection {}  iterations {}",
        params.width,
        params.height,
        params.bounce_limit,
        params.samples_per_frame,
        state.filter,
        state.reproj,
        params.filter_iterations
    );

    for _ in 0..frames {
        let frame = state.frame_index;
        let accum = state.accum.index();
        let plan = scheduler.plan_frame(&mut state);

        println!();
        println!(
            "frame {frame}  accum {accum}  samples -> {}  radiance cleared: {}",
            state.sample_index, plan.cleared_radiance
        );
        for (pass, segment) in plan.commands.segments().enumerate() {
            let kind = if segment.first().is_some_and(GpuCommand::is_dispatch) { "compute" } else { "encoder" };
            println!("  [{pass}] {kind}");
            for cmd in segment {
                println!("      {cmd}");
            }
        }

        let c = &plan.commands;
        println!(
            "  {} commands, {} compute passes, {} dispatches (intersect {}, shade {}, shadow {}, filter {})",
            c.len(),
            c.compute_passes(),
            c.dispatch_count(),
            c.dispatches_of(Kernel::Intersect),
            c.dispatches_of(Kernel::Shade),
            c.dispatches_of(Kernel::Shadow),
            c.dispatches_of(Kernel::Filter)
        );
        match audit_staging(c) {
            Ok(()) => println!("  indirect staging ok"),
            Err(e) => println!("  STALE: {e}"),
        }

        scheduler.end_frame(&mut state, 0);
    }
    Ok(())
}
