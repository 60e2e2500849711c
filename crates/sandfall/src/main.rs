mod config;
mod scene;
mod snapshot;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use sandfall_core::physics::ContactKind;
use sandfall_core::world::{TickStats, World};
use sandfall_core::{MaterialRegistry, RuleSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RunnerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of ticks to simulate (overrides config)
    #[arg(long)]
    ticks: Option<u64>,

    /// Seed for the world RNG (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Scene to load (overrides config)
    #[arg(long)]
    scene: Option<String>,

    /// RON rule file to use instead of the built-in materials
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Write a PNG of the scene after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print the accumulated statistics as RON after the run
    #[arg(long)]
    stats: bool,

    /// List available scenes
    #[arg(long)]
    list_scenes: bool,
}

fn load_registry(rules: Option<&Path>) -> Result<MaterialRegistry> {
    let Some(path) = rules else {
        return MaterialRegistry::builtin().context("Failed to compile built-in rules");
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file {:?}", path))?;
    let rules = RuleSet::from_ron(&source)
        .with_context(|| format!("Failed to parse rule file {:?}", path))?;
    MaterialRegistry::compile(&rules).with_context(|| format!("Invalid rules in {:?}", path))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args = Args::parse();

    // Handle --list-scenes flag
    if args.list_scenes {
        scene::list_scenes();
        return Ok(());
    }

    let mut config = RunnerConfig::load()?;
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(scene) = args.scene {
        config.run.scene = scene;
    }

    let registry = load_registry(args.rules.as_deref())?;
    let scene = scene::find(&config.run.scene).with_context(|| {
        format!(
            "Unknown scene '{}' (use --list-scenes)",
            config.run.scene
        )
    })?;

    log::info!("Starting Sandfall");
    let mut world = World::new(Arc::new(registry), config.simulation.clone());
    scene.load(&mut world).context("Failed to build scene")?;

    let mut rng = Xoshiro256StarStar::seed_from_u64(config.run.seed);
    let mut stats = TickStats::default();
    let mut contacts = 0usize;

    for tick in 1..=config.run.ticks {
        world.tick(&mut rng, &mut stats);
        contacts += world
            .drain_contact_events()
            .iter()
            .filter(|event| event.kind == ContactKind::Started)
            .count();

        if config.run.log_every > 0 && tick % config.run.log_every == 0 {
            log::info!(
                "Tick {}: {} free bodies, {} cells moved, {} reactions, {} detachments, {} settles",
                tick,
                world.free_bodies().len(),
                stats.cells_moved,
                stats.reactions,
                stats.detachments,
                stats.settles
            );
        }
    }

    log::info!(
        "Finished {} ticks: {} occupied cells, {} free bodies, {} contacts",
        config.run.ticks,
        world.occupied_count(),
        world.free_bodies().len(),
        contacts
    );

    if args.stats {
        let pretty = ron::ser::PrettyConfig::default();
        println!(
            "{}",
            ron::ser::to_string_pretty(&stats, pretty).context("Failed to serialize stats")?
        );
    }

    if let Some(path) = args.snapshot {
        let (width, height) = scene.size();
        snapshot::save_png(&world, scene.min_cell(), width, height, path)?;
    }

    Ok(())
}
