//! Debris system - lifecycle of free bodies

use glam::IVec2;
use sandfall_simulation::{Cell, MaterialRegistry, Materials};

use super::ca_update::CellularAutomataUpdater;
use super::chunk_manager::ChunkManager;
use super::free_body::FreeBody;
use super::rng_trait::WorldRng;
use super::silhouette::SilhouetteBuilder;
use super::stats::SimStats;
use crate::physics::{BodyKind, BodyState, PhysicsEngine};

/// Owns every free body and moves them between grid and physics
#[derive(Default)]
pub struct DebrisSystem {
    bodies: Vec<FreeBody>,
    next_id: u64,
}

impl DebrisSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn free_bodies(&self) -> &[FreeBody] {
        &self.bodies
    }

    pub fn get(&self, id: u64) -> Option<&FreeBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    /// Get count of free bodies (for debug stats)
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Turn world-positioned cells into a new free body with a dynamic
    /// physics body. Returns the free body id.
    pub fn spawn<P: PhysicsEngine>(
        &mut self,
        cells: &[(IVec2, Cell)],
        materials: &Materials,
        physics: &mut P,
        tolerance: f32,
    ) -> Option<u64> {
        let id = self.next_id;
        let mut body = FreeBody::from_cells(id, cells)?;
        self.next_id += 1;

        let position = body.origin.as_vec2();
        SilhouetteBuilder::rebuild(
            &mut body.grid,
            materials,
            physics,
            BodyKind::Dynamic,
            position,
            tolerance,
        );

        log::info!(
            "Free body {} created from {} cells at ({}, {})",
            id,
            cells.len(),
            body.origin.x,
            body.origin.y
        );

        self.bodies.push(body);
        Some(id)
    }

    pub fn clear_touched(&mut self) {
        for body in &mut self.bodies {
            body.grid.clear_touched();
        }
    }

    /// Step the cells inside every free body
    pub fn update_grids<R: WorldRng + ?Sized>(
        &mut self,
        registry: &MaterialRegistry,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        for body in &mut self.bodies {
            CellularAutomataUpdater::update_grid(body, registry, rng, stats);
        }
    }

    /// Remove and return bodies that have been still for `settle_ticks`
    /// consecutive polls, with their final pose. Bodies whose cells are all
    /// gone are discarded.
    pub fn collect_settled<P: PhysicsEngine>(
        &mut self,
        physics: &mut P,
        settle_ticks: u32,
        settle_speed: f32,
    ) -> Vec<(FreeBody, BodyState)> {
        let mut settled = Vec::new();
        let mut i = 0;

        while i < self.bodies.len() {
            let body = &mut self.bodies[i];

            if body.cell_count() == 0 {
                log::warn!("Free body {} has no cells left, discarding", body.id);
                let body = self.bodies.swap_remove(i);
                if let Some(handle) = body.body() {
                    physics.unregister_body(handle);
                }
                continue;
            }

            let state = body
                .body()
                .and_then(|handle| physics.body_state(handle))
                .unwrap_or_else(|| body.resting_state());

            if state.is_still(settle_speed) {
                body.still_ticks += 1;
            } else {
                body.still_ticks = 0;
            }

            if body.still_ticks >= settle_ticks {
                let body = self.bodies.swap_remove(i);
                if let Some(handle) = body.body() {
                    physics.unregister_body(handle);
                }
                settled.push((body, state));
            } else {
                i += 1;
            }
        }

        settled
    }

    /// Write a settled body's cells back into the world grid.
    ///
    /// Cells landing on anchored material or outside active chunks are
    /// dropped. Returns the number of cells placed.
    pub fn reconstruct_free_body(
        chunk_manager: &mut ChunkManager,
        body: &FreeBody,
        state: &BodyState,
        materials: &Materials,
    ) -> usize {
        let mut placed = 0;
        let mut dropped = 0;

        for (world, cell) in body.world_cells(state) {
            let target = chunk_manager.read_cell(world.x, world.y);
            if materials.get(target.material).is_anchored() {
                dropped += 1;
                continue;
            }
            if chunk_manager.write_cell(world.x, world.y, cell.at_rest(), materials) {
                placed += 1;
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            log::warn!(
                "Free body {}: {} cells stamped, {} dropped",
                body.id,
                placed,
                dropped
            );
        } else {
            log::info!("Free body {} settled, stamped {} cells", body.id, placed);
        }

        placed
    }

    /// Remove every free body and its physics body
    pub fn clear<P: PhysicsEngine>(&mut self, physics: &mut P) {
        for body in self.bodies.drain(..) {
            if let Some(handle) = body.body() {
                physics.unregister_body(handle);
            }
        }
    }
}
