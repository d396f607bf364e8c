//! Kinema CLI
//!
//! Renders TOML scenes to JSON-lines frame streams.
//!
//! - `kinema render scene.toml --out frames.jsonl`
//! - `kinema check scene.toml`

mod scene;
mod sink;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kinema_animation::{MotionScheduler, RunOutcome};
use kinema_core::World;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scene::SceneFile;
use crate::sink::JsonLinesSink;

/// Procedural animation scene runner
#[derive(Parser, Debug)]
#[command(name = "kinema")]
#[command(about = "Render procedural animation scenes frame by frame")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a scene to JSON lines, one frame per line
    Render {
        /// Scene file
        scene: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip cosmetic effects
        #[arg(long)]
        draft: bool,

        /// Override the scene's frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Frames to hold at each early-stop checkpoint
        #[arg(long, default_value = "0")]
        checkpoint_wait: u32,
    },

    /// Validate a scene without rendering it
    Check {
        /// Scene file
        scene: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render {
            scene,
            out,
            draft,
            fps,
            checkpoint_wait,
        } => cmd_render(scene, out, draft, fps, checkpoint_wait),
        Commands::Check { scene } => cmd_check(scene),
    }
}

fn cmd_render(
    path: PathBuf,
    out: Option<PathBuf>,
    draft: bool,
    fps: Option<u32>,
    checkpoint_wait: u32,
) -> Result<()> {
    let scene = SceneFile::load(&path)?;
    let mut config = scene.render.clone();
    config.draft |= draft;
    if let Some(fps) = fps {
        config.fps = fps;
    }

    info!(scene = %path.display(), fps = config.fps, draft = config.draft, "rendering");

    let mut world = World::new(config);
    let volumes = scene.spawn(&mut world)?;
    let mut scheduler = MotionScheduler::new();
    let created = scene.schedule(&world, &volumes, &mut scheduler)?;
    if created == 0 {
        warn!("scene has no motions, nothing to render");
    }

    let writer: Box<dyn Write> = match &out {
        Some(file) => Box::new(
            File::create(file).with_context(|| format!("Failed to create {}", file.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = JsonLinesSink::new(BufWriter::new(writer), &volumes);

    loop {
        match scheduler.run_to_completion(&mut world, &mut sink)? {
            RunOutcome::Completed { frames } => {
                info!(frames, "run completed");
                break;
            }
            RunOutcome::Suspended {
                motion,
                frame_index,
                frames,
            } => {
                info!(
                    %motion,
                    frame_index,
                    frames,
                    wait = checkpoint_wait,
                    "checkpoint reached"
                );
                MotionScheduler::wait_frames(&mut world, &mut sink, checkpoint_wait)?;
            }
        }
    }

    sink.flush()?;
    info!(written = sink.written(), "done");
    Ok(())
}

fn cmd_check(path: PathBuf) -> Result<()> {
    let scene = SceneFile::load(&path)?;
    let mut world = World::new(scene.render.clone());
    let volumes = scene.spawn(&mut world)?;
    let mut scheduler = MotionScheduler::new();
    let created = scene.schedule(&world, &volumes, &mut scheduler)?;

    let longest = scheduler
        .iter()
        .map(|(_, record)| record.duration() as i64 - record.step())
        .max()
        .unwrap_or(0);
    info!(
        scene = %path.display(),
        volumes = volumes.len(),
        motions = created,
        skipped = scene.motion.len() - created,
        longest_frames = longest,
        "scene is valid"
    );
    Ok(())
}
