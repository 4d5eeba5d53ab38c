//! SkyScan replay binary.
//!
//! Copies `tile_<row>_<col>.<ext>` rasters and their JSON sidecars from a
//! source directory into the artifact store, one tile every `--delay`
//! seconds.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for skyscan-replay.
#[derive(Parser, Debug)]
#[command(name = "skyscan-replay")]
#[command(about = "Copy tiles into the artifact store one by one, simulating a live capture")]
#[command(version)]
struct Args {
    /// Directory containing the pre-rendered tiles.
    source: PathBuf,

    /// Artifact store directory watched by the server.
    dest: PathBuf,

    /// Seconds to wait between tiles.
    #[arg(short, long, default_value_t = 2.0)]
    delay: f64,

    /// Raster file extension.
    #[arg(long, default_value = "tif")]
    extension: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let delay = Duration::try_from_secs_f64(args.delay)
        .with_context(|| format!("invalid delay: {}", args.delay))?;

    skyscan_replay::replay(
        &args.source,
        &args.dest,
        &args.extension,
        delay,
        std::thread::sleep,
    )
    .context("replay failed")?;
    Ok(())
}
