//! World - manages chunks, free bodies and the tick pipeline

use glam::{IVec2, Vec2};
use sandfall_simulation::{CHUNK_AREA, CHUNK_SIZE, Cell, MaterialId, MaterialRegistry};
use std::sync::Arc;

use super::ca_update::CellularAutomataUpdater;
use super::chunk::Chunk;
use super::chunk_manager::ChunkManager;
use super::chunk_status::{ChunkStatus, InterestWindow};
use super::debris_system::DebrisSystem;
use super::free_body::FreeBody;
use super::generation::ChunkSource;
use super::render_data::{FreeBodyRenderData, RenderExtract};
use super::rng_trait::WorldRng;
use super::silhouette::SilhouetteBuilder;
use super::stats::SimStats;
use crate::config::SimulationConfig;
use crate::error::WorldError;
use crate::physics::{BodyKind, ContactEvent, PhysicsEngine, RapierPhysics};
use crate::simulation::StructuralIntegritySystem;

/// The simulated world, composed of chunks and free bodies
pub struct World<P: PhysicsEngine = RapierPhysics> {
    /// Chunk storage and cross-chunk addressing
    chunk_manager: ChunkManager,

    /// Detached regions riding on dynamic bodies
    debris_system: DebrisSystem,

    /// Detachment analysis
    structural_system: StructuralIntegritySystem,

    physics: P,

    /// Compiled material rules shared with whoever loaded them
    registry: Arc<MaterialRegistry>,

    config: SimulationConfig,

    /// Chunks simulated this tick, `None` means nothing is simulated
    interest: Option<InterestWindow>,

    tick_count: u64,
}

impl World<RapierPhysics> {
    pub fn new(registry: Arc<MaterialRegistry>, config: SimulationConfig) -> Self {
        let physics = RapierPhysics::new(&config.physics);
        Self::with_physics(registry, config, physics)
    }
}

impl<P: PhysicsEngine> World<P> {
    /// World running on a caller-supplied physics engine
    pub fn with_physics(registry: Arc<MaterialRegistry>, config: SimulationConfig, physics: P) -> Self {
        log::info!(
            "World created: {} materials, {} interaction rules",
            registry.materials().len(),
            registry.interactions().rule_count()
        );
        Self {
            chunk_manager: ChunkManager::new(),
            debris_system: DebrisSystem::new(),
            structural_system: StructuralIntegritySystem::new(config.max_detach_cells),
            physics,
            registry,
            config,
            interest: None,
            tick_count: 0,
        }
    }

    /// Advance the world by one tick
    pub fn tick<R: WorldRng + ?Sized>(&mut self, rng: &mut R, stats: &mut dyn SimStats) {
        // 1. Activate chunks inside the interest window, retire the rest
        ChunkStatus::apply_interest(&mut self.chunk_manager, &mut self.physics, self.interest);
        let active = self.chunk_manager.active_positions();

        // 2. Clear touched flags
        for pos in &active {
            if let Some(chunk) = self.chunk_manager.chunks.get_mut(pos) {
                chunk.grid.clear_touched();
            }
        }
        self.debris_system.clear_touched();

        // 3. Step chunks, bottom row first
        for &pos in &active {
            let registry = &self.registry;
            self.chunk_manager.with_chunk_view(pos, |view| {
                CellularAutomataUpdater::update_grid(view, registry, &mut *rng, &mut *stats);
            });
        }

        // 4. Step free bodies
        self.debris_system
            .update_grids(&self.registry, &mut *rng, &mut *stats);

        // 5. Rigid bodies
        self.physics.step();

        // 6. Stamp settled free bodies back into the grid
        let materials = self.registry.materials();
        let settled = self.debris_system.collect_settled(
            &mut self.physics,
            self.config.settle_ticks,
            self.config.settle_speed,
        );
        for (body, state) in &settled {
            DebrisSystem::reconstruct_free_body(&mut self.chunk_manager, body, state, materials);
            stats.record_settle();
        }

        // 7. Detach unsupported regions next to changed solids
        let created = self.structural_system.process(
            &mut self.chunk_manager,
            &mut self.debris_system,
            &mut self.physics,
            materials,
            &active,
            self.config.simplify_tolerance,
            stats,
        );

        // 8. Rebuild terrain collision where static-ness changed
        let mut rebuilt = 0;
        for pos in &active {
            if let Some(chunk) = self.chunk_manager.chunks.get_mut(pos)
                && chunk.grid.needs_rebuild
            {
                let origin = chunk.origin().as_vec2();
                SilhouetteBuilder::rebuild(
                    &mut chunk.grid,
                    materials,
                    &mut self.physics,
                    BodyKind::Fixed,
                    origin,
                    self.config.simplify_tolerance,
                );
                rebuilt += 1;
            }
        }

        self.tick_count += 1;
        log::debug!(
            "Tick {}: {} active chunks, {} free bodies ({} created, {} settled), {} silhouettes rebuilt",
            self.tick_count,
            active.len(),
            self.debris_system.body_count(),
            created,
            settled.len(),
            rebuilt
        );
    }

    /// Simulate only the chunks in the inclusive rectangle spanned by the two
    /// chunk coordinates. Takes effect on the next tick.
    pub fn set_interest(&mut self, min_chunk: IVec2, max_chunk: IVec2) {
        self.interest = Some(InterestWindow::new(min_chunk, max_chunk));
    }

    /// Stop simulating every chunk from the next tick on
    pub fn clear_interest(&mut self) {
        self.interest = None;
    }

    pub fn interest(&self) -> Option<InterestWindow> {
        self.interest
    }

    /// Insert externally generated chunk content, replacing any chunk at
    /// `pos`. The chunk becomes active on the next tick inside the interest
    /// window.
    pub fn insert_chunk(&mut self, pos: IVec2, cells: Vec<Cell>) -> Result<(), WorldError> {
        if cells.len() != CHUNK_AREA {
            return Err(WorldError::ChunkSize {
                expected: CHUNK_AREA,
                actual: cells.len(),
            });
        }
        let materials = self.registry.materials();
        if let Some(cell) = cells
            .iter()
            .find(|cell| cell.material as usize >= materials.len())
        {
            return Err(WorldError::UnknownMaterial(cell.material));
        }

        let chunk = Chunk::from_cells(pos.x, pos.y, cells);
        if let Some(old) = self.chunk_manager.insert_chunk(chunk)
            && let Some(body) = old.grid.body()
        {
            self.physics.unregister_body(body);
        }
        log::info!("Chunk ({}, {}) inserted", pos.x, pos.y);
        Ok(())
    }

    /// Generate every missing chunk in the inclusive chunk rectangle.
    /// Returns the number of chunks inserted.
    pub fn populate(&mut self, source: &dyn ChunkSource, min_chunk: IVec2, max_chunk: IVec2) -> Result<usize, WorldError> {
        let window = InterestWindow::new(min_chunk, max_chunk);
        let mut inserted = 0;
        for y in window.min.y..=window.max.y {
            for x in window.min.x..=window.max.x {
                let pos = IVec2::new(x, y);
                if self.chunk_manager.has_chunk(pos) {
                    continue;
                }
                self.insert_chunk(pos, source.generate(pos, CHUNK_SIZE))?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    pub fn chunk(&self, pos: IVec2) -> Option<&Chunk> {
        self.chunk_manager.get_chunk(pos.x, pos.y)
    }

    pub fn chunk_manager(&self) -> &ChunkManager {
        &self.chunk_manager
    }

    /// Stored cell, `None` when no chunk is loaded there
    pub fn get_cell(&self, world_x: i32, world_y: i32) -> Option<Cell> {
        self.chunk_manager.get_cell(world_x, world_y)
    }

    /// Cell as the simulation sees it: unloaded or inactive space is boundary
    pub fn read_cell(&self, world_x: i32, world_y: i32) -> Cell {
        self.chunk_manager.read_cell(world_x, world_y)
    }

    /// Write a cell with full change tracking. Returns false when no chunk is
    /// loaded at the position.
    pub fn set_cell(&mut self, world_x: i32, world_y: i32, cell: Cell) -> bool {
        self.chunk_manager
            .write_cell(world_x, world_y, cell, self.registry.materials())
    }

    /// Place a fresh cell of `material`
    pub fn set_material(&mut self, world_x: i32, world_y: i32, material: u16) -> Result<bool, WorldError> {
        if material == MaterialId::BOUNDARY || material as usize >= self.registry.materials().len() {
            return Err(WorldError::UnknownMaterial(material));
        }
        Ok(self.set_cell(world_x, world_y, Cell::new(material)))
    }

    pub fn free_bodies(&self) -> &[FreeBody] {
        self.debris_system.free_bodies()
    }

    /// Pixels and current pose of every free body
    pub fn free_body_render_data(&self) -> Vec<FreeBodyRenderData> {
        let materials = self.registry.materials();
        self.debris_system
            .free_bodies()
            .iter()
            .map(|body| {
                let state = body
                    .body()
                    .and_then(|handle| self.physics.body_state(handle))
                    .unwrap_or_else(|| body.resting_state());
                RenderExtract::free_body(body, &state, materials)
            })
            .collect()
    }

    /// RGBA pixels of a world window, see [`RenderExtract::window_rgba`]
    pub fn window_rgba(&self, min_cell: IVec2, width: usize, height: usize) -> Vec<u8> {
        RenderExtract::window_rgba(
            &self.chunk_manager,
            self.registry.materials(),
            min_cell,
            width,
            height,
        )
    }

    /// Teleport a free body. Returns false for unknown ids or bodies without
    /// a physics body.
    pub fn move_free_body(&mut self, id: u64, position: Vec2) -> bool {
        match self.debris_system.get(id).and_then(FreeBody::body) {
            Some(handle) => {
                self.physics.set_body_position(handle, position);
                true
            }
            None => false,
        }
    }

    pub fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        self.physics.drain_contact_events()
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn registry(&self) -> &Arc<MaterialRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Occupied cells over every loaded chunk and free body
    pub fn occupied_count(&self) -> usize {
        let in_chunks: usize = self
            .chunk_manager
            .chunks
            .values()
            .map(|chunk| chunk.grid.occupied_count())
            .sum();
        let in_bodies: usize = self
            .debris_system
            .free_bodies()
            .iter()
            .map(FreeBody::cell_count)
            .sum();
        in_chunks + in_bodies
    }
}
