//! Structural integrity checking and free body detachment
//!
//! Static material flagged as falling only stays put while it is connected,
//! through other static cells, to anchored material. Whenever a solid cell
//! changes, the connected region next to it is flood filled; a region that
//! never reaches an anchor is cut out of the grid and becomes a free body.

use ahash::AHashSet;
use glam::IVec2;
use sandfall_simulation::{Cell, Materials};

use crate::physics::PhysicsEngine;
use crate::world::chunk_manager::ChunkManager;
use crate::world::debris_system::DebrisSystem;
use crate::world::stats::SimStats;

/// Seed plus its four neighbours
const FILL_SEEDS: [IVec2; 5] = [
    IVec2::new(0, 0),
    IVec2::new(0, 1),
    IVec2::new(1, 0),
    IVec2::new(0, -1),
    IVec2::new(-1, 0),
];

const NEIGHBORS: [IVec2; 4] = [
    IVec2::new(0, 1),
    IVec2::new(1, 0),
    IVec2::new(0, -1),
    IVec2::new(-1, 0),
];

/// Result of one support flood fill
#[derive(Debug, PartialEq)]
pub enum FillOutcome {
    /// Nothing falling-static at the seed
    Empty,
    /// Region touches anchored material (or is too large to lift)
    Anchored,
    /// Region was already examined this tick
    AlreadyChecked,
    /// Unsupported region with its cells in world coordinates
    Detached(Vec<(IVec2, Cell)>),
}

/// Detachment analysis over the solids changed during a tick
pub struct StructuralIntegritySystem {
    /// Largest region that may detach; anything bigger counts as anchored
    max_cells: usize,
}

impl StructuralIntegritySystem {
    pub fn new(max_cells: usize) -> Self {
        Self { max_cells }
    }

    /// Drain the modified-solid queues of `positions` and detach every
    /// unsupported region found next to them. Returns the number of free
    /// bodies created.
    #[allow(clippy::too_many_arguments)]
    pub fn process<P: PhysicsEngine>(
        &self,
        chunk_manager: &mut ChunkManager,
        debris: &mut DebrisSystem,
        physics: &mut P,
        materials: &Materials,
        positions: &[IVec2],
        tolerance: f32,
        stats: &mut dyn SimStats,
    ) -> usize {
        let mut seeds = Vec::new();
        for pos in positions {
            if let Some(chunk) = chunk_manager.chunks.get_mut(pos) {
                let origin = chunk.origin();
                seeds.extend(
                    chunk
                        .grid
                        .take_modified_solids()
                        .into_iter()
                        .map(|local| origin + local),
                );
            }
        }
        if seeds.is_empty() {
            return 0;
        }

        log::trace!("Structural: {} modified solids to check", seeds.len());

        let mut checked: AHashSet<IVec2> = AHashSet::new();
        let mut created = 0;

        for seed in seeds {
            for offset in FILL_SEEDS {
                let outcome =
                    self.flood_fill(chunk_manager, materials, seed + offset, &mut checked);
                let FillOutcome::Detached(cells) = outcome else {
                    continue;
                };

                for (pos, _) in &cells {
                    chunk_manager.write_cell(pos.x, pos.y, Cell::EMPTY, materials);
                }
                stats.record_detachment(cells.len());
                if debris.spawn(&cells, materials, physics, tolerance).is_some() {
                    created += 1;
                }
            }
        }

        if created > 0 {
            log::debug!("Structural: detached {created} free bodies");
        }

        created
    }

    /// Collect the falling-static region connected to `start`.
    ///
    /// Every cell added to the region is also added to `checked`, so a
    /// region is examined at most once per tick.
    pub fn flood_fill(
        &self,
        chunk_manager: &ChunkManager,
        materials: &Materials,
        start: IVec2,
        checked: &mut AHashSet<IVec2>,
    ) -> FillOutcome {
        let mut found: AHashSet<IVec2> = AHashSet::new();
        let mut cells = Vec::new();
        let mut stack = vec![start];

        while let Some(pos) = stack.pop() {
            if found.contains(&pos) {
                continue;
            }
            if checked.contains(&pos) {
                return FillOutcome::AlreadyChecked;
            }

            let cell = chunk_manager.read_cell(pos.x, pos.y);
            if cell.is_empty() {
                continue;
            }
            let def = materials.get(cell.material);
            if !def.is_static {
                continue;
            }
            if !def.falling {
                return FillOutcome::Anchored;
            }

            found.insert(pos);
            checked.insert(pos);
            cells.push((pos, cell));

            if cells.len() > self.max_cells {
                log::debug!(
                    "Structural: region at ({}, {}) exceeds {} cells, treating as anchored",
                    start.x,
                    start.y,
                    self.max_cells
                );
                return FillOutcome::Anchored;
            }

            stack.extend(NEIGHBORS.iter().map(|offset| pos + *offset));
        }

        if cells.is_empty() {
            FillOutcome::Empty
        } else {
            FillOutcome::Detached(cells)
        }
    }
}
