use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tova::{ASYNC_WORKER_COUNT, ConfigError, RecordingSink, VoxelWorld, WorldConfig};

/// Headless terrain streaming driver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// World seed (overrides the config file)
    #[arg(long)]
    seed: Option<u32>,

    /// Number of update ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: usize,

    /// Background workers per pool; 0 runs everything on the main thread
    #[arg(long)]
    workers: Option<usize>,

    /// Blocks the viewpoint moves along +X each tick
    #[arg(long, default_value_t = 0.0)]
    walk: f64,

    /// Load a bincode world config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).clamp(1, ASYNC_WORKER_COUNT)
}

fn run(args: Args) -> Result<(), ConfigError> {
    let mut config = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.field.seed = seed;
    }
    config.validate()?;

    if let Some(path) = &args.write_config {
        config.save(path)?;
        tracing::info!("Wrote config to {}", path.display());
        return Ok(());
    }

    let workers = args.workers.unwrap_or_else(default_workers);
    let mut world = VoxelWorld::with_sink(config, RecordingSink::default())?.with_workers(workers);

    let spawn = world.spawn_point();
    tracing::info!("Spawn at ({:.1}, {:.1}, {:.1})", spawn.x, spawn.y, spawn.z);

    let started = Instant::now();
    let (mut x, z) = (spawn.x, spawn.z);
    for tick in 0..args.ticks {
        world.update(x, z);
        x += args.walk;

        if tick % 60 == 0 {
            let stats = world.debug_stats();
            tracing::info!(
                "tick {}: chunk {},{} loaded {} queued {}/{} in flight {}/{} zone {} blend {:.2} ground {:.0}",
                tick,
                stats.current_chunk_x,
                stats.current_chunk_z,
                stats.loaded_chunks,
                stats.pending_generations,
                stats.pending_meshes,
                stats.in_flight_generations,
                stats.in_flight_meshes,
                stats.zone.as_str(),
                stats.blend,
                world.height_at(x, z)
            );
        }
    }

    let stats = world.debug_stats();
    let sink = world.chunks().sink();
    tracing::info!(
        "Finished {} ticks in {:.2?}: {} chunks loaded, {} meshes, {} faces",
        args.ticks,
        started.elapsed(),
        stats.loaded_chunks,
        sink.meshes.len(),
        sink.face_count()
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting terrain streaming...");
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
