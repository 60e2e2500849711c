//! Sandfall core engine
//!
//! Chunked falling-sand world whose static material doubles as rigid-body
//! collision geometry. Unsupported regions detach into free bodies that fall
//! under physics and are stamped back into the grid once they come to rest.

pub mod config;
pub mod error;
pub mod physics;
pub mod simulation;
pub mod world;

pub use config::{PhysicsConfig, SimulationConfig};
pub use error::WorldError;
pub use physics::{BodyHandle, PhysicsEngine, RapierPhysics};
pub use world::World;

// Re-export the material data crate so users need only one dependency
pub use sandfall_simulation::{
    CHUNK_AREA, CHUNK_SIZE, Cell, MaterialId, MaterialRegistry, RegistryError, RuleSet,
};
