//! Simulation tuning
//!
//! Plain serde structs with compiled defaults. The runner layers file and
//! environment overrides on top of these.

use serde::{Deserialize, Serialize};

/// World simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Max perpendicular deviation (cells) kept when simplifying silhouettes
    pub simplify_tolerance: f32,
    /// Consecutive still ticks before a free body is stamped back
    pub settle_ticks: u32,
    /// Linear and angular speed at or below which a body counts as still
    pub settle_speed: f32,
    /// Largest region that may detach as one free body
    pub max_detach_cells: usize,
    pub physics: PhysicsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance: 0.9,
            settle_ticks: 10,
            settle_speed: 0.01,
            max_detach_cells: 16384,
            physics: PhysicsConfig::default(),
        }
    }
}

/// Rigid-body settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration in cells/sec^2
    pub gravity: f32,
    /// Multiplier on the 1/60 s base step
    pub time_scale: f32,
    pub friction: f32,
    /// Collider density for free bodies
    pub density: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 300.0,
            time_scale: 0.6,
            friction: 0.5,
            density: 1.0,
        }
    }
}
