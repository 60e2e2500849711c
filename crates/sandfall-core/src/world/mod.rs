//! World module - chunks, free bodies and the tick pipeline

pub mod ca_update;
pub mod chunk;
pub mod chunk_manager;
pub mod chunk_status;
pub mod debris_system;
pub mod free_body;
pub mod generation;
pub mod grid;
pub mod render_data;
pub mod rng_trait;
pub mod silhouette;
pub mod stats;
#[allow(clippy::module_inception)]
mod world;

pub use ca_update::CellularAutomataUpdater;
pub use chunk::Chunk;
pub use chunk_manager::{ChunkManager, ChunkView};
pub use chunk_status::{ChunkStatus, InterestWindow};
pub use debris_system::DebrisSystem;
pub use free_body::FreeBody;
pub use generation::{Band, ChunkSource, LayeredGenerator};
pub use grid::{CellGrid, CellSpace, DirtyRect};
pub use render_data::{FreeBodyRenderData, RenderExtract};
pub use rng_trait::WorldRng;
pub use silhouette::SilhouetteBuilder;
pub use stats::{NoopStats, SimStats, TickStats};
pub use world::World;
