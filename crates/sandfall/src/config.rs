//! Runner configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `sandfall.ron` file (if exists)
//! 3. Environment variables prefixed with `SANDFALL_`
//!
//! Example environment variable: `SANDFALL_SIMULATION__SETTLE_TICKS=20`

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use sandfall_core::SimulationConfig;
use serde::{Deserialize, Serialize};

/// Main runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// What to run and for how long
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Ticks to simulate
    pub ticks: u64,
    /// Seed for the world RNG
    pub seed: u64,
    /// Scene name, see `--list-scenes`
    pub scene: String,
    /// Log a progress line every this many ticks (0 disables)
    pub log_every: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            seed: 42,
            scene: "collapse".to_string(),
            log_every: 60,
        }
    }
}

impl RunnerConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `sandfall.ron` file (if exists)
    /// 3. Environment variables prefixed with `SANDFALL_` (highest priority)
    pub fn load() -> Result<Self> {
        Self::load_from("sandfall")
    }

    /// Same layering with an explicit config file name
    pub fn load_from(file_name: &str) -> Result<Self> {
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("run.ticks", 600_i64)?
            .set_default("run.seed", 42_i64)?
            .set_default("run.scene", "collapse")?
            .set_default("run.log_every", 60_i64)?
            .set_default("simulation.simplify_tolerance", 0.9)?
            .set_default("simulation.settle_ticks", 10_i64)?
            .set_default("simulation.settle_speed", 0.01)?
            .set_default("simulation.max_detach_cells", 16384_i64)?
            .set_default("simulation.physics.gravity", 300.0)?
            .set_default("simulation.physics.time_scale", 0.6)?
            .set_default("simulation.physics.friction", 0.5)?
            .set_default("simulation.physics.density", 1.0)?
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name(file_name)
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (SANDFALL_RUN__TICKS, etc.)
            .add_source(Environment::with_prefix("SANDFALL").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
