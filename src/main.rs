//! Planetarium: adopt a small planet and keep its vitals up, in the terminal.

mod app;
mod asteroid;
mod background;
mod catalog;
mod config;
mod error;
mod game;
mod input;
mod model;
mod planet;
mod render;
mod selector;
mod storage;
mod theme;
mod timer;
mod vitals;

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "planetarium")]
#[command(about = "Adopt a planet and keep it alive in your terminal")]
struct Args {
    /// Seed for the background and asteroid randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Number of drifting background dots
    #[arg(long)]
    dots: Option<usize>,

    /// Frame rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// Draw everything in the theme's foreground color
    #[arg(long)]
    no_color: bool,

    /// Forget the adopted pet and its progress before starting
    #[arg(long)]
    reset: bool,

    /// Where settings, saved state and the log live
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = config::project_paths(args.data_dir.as_deref())?;

    // stdout belongs to the UI, so logs go to a file
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
        .with_context(|| format!("could not open log file {}", paths.log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    tracing::info!(data_dir = %paths.log_path.parent().map(|p| p.display().to_string()).unwrap_or_default(), "starting");

    app::run(
        paths,
        app::Overrides {
            seed: args.seed,
            dots: args.dots,
            fps: args.fps,
            no_color: args.no_color,
            reset: args.reset,
        },
    )
}
