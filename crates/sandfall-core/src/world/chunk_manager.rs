//! Chunk storage and world-coordinate cell access

use glam::IVec2;
use sandfall_simulation::{CHUNK_SIZE, Cell, Materials};
use std::collections::HashMap;

use super::chunk::Chunk;
use super::grid::{CellGrid, CellSpace};

/// Loaded chunks, keyed by chunk coordinates
#[derive(Default)]
pub struct ChunkManager {
    pub chunks: HashMap<IVec2, Chunk>,
}

/// Cell as the simulation sees it: missing or inactive chunks read as boundary
fn read_in(chunks: &HashMap<IVec2, Chunk>, world_x: i32, world_y: i32) -> Cell {
    let (pos, local_x, local_y) = ChunkManager::world_to_chunk_coords(world_x, world_y);
    match chunks.get(&pos) {
        Some(chunk) if chunk.active => chunk.grid.get(local_x, local_y),
        _ => Cell::BOUNDARY,
    }
}

fn write_in(
    chunks: &mut HashMap<IVec2, Chunk>,
    world_x: i32,
    world_y: i32,
    cell: Cell,
    materials: &Materials,
) -> bool {
    let (pos, local_x, local_y) = ChunkManager::world_to_chunk_coords(world_x, world_y);
    match chunks.get_mut(&pos) {
        Some(chunk) => chunk.grid.set(local_x, local_y, cell, materials),
        None => {
            log::trace!("Dropped write at ({world_x}, {world_y}): chunk {pos} not loaded");
            false
        }
    }
}

fn wake_in(chunks: &mut HashMap<IVec2, Chunk>, world_x: i32, world_y: i32) {
    let (pos, local_x, local_y) = ChunkManager::world_to_chunk_coords(world_x, world_y);
    if let Some(chunk) = chunks.get_mut(&pos) {
        chunk.grid.mark_dirty(local_x, local_y);
    }
}

impl ChunkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert world coordinates to chunk coordinates + local offset
    pub fn world_to_chunk_coords(world_x: i32, world_y: i32) -> (IVec2, usize, usize) {
        let chunk_x = world_x.div_euclid(CHUNK_SIZE as i32);
        let chunk_y = world_y.div_euclid(CHUNK_SIZE as i32);
        let local_x = world_x.rem_euclid(CHUNK_SIZE as i32) as usize;
        let local_y = world_y.rem_euclid(CHUNK_SIZE as i32) as usize;
        (IVec2::new(chunk_x, chunk_y), local_x, local_y)
    }

    /// Get chunk at chunk coordinates (not world coordinates)
    pub fn get_chunk(&self, chunk_x: i32, chunk_y: i32) -> Option<&Chunk> {
        self.chunks.get(&IVec2::new(chunk_x, chunk_y))
    }

    pub fn get_chunk_mut(&mut self, chunk_x: i32, chunk_y: i32) -> Option<&mut Chunk> {
        self.chunks.get_mut(&IVec2::new(chunk_x, chunk_y))
    }

    pub fn has_chunk(&self, pos: IVec2) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Insert a chunk, returning the one it replaced
    pub fn insert_chunk(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.pos(), chunk)
    }

    /// Stored cell regardless of chunk activity
    pub fn get_cell(&self, world_x: i32, world_y: i32) -> Option<Cell> {
        let (pos, local_x, local_y) = Self::world_to_chunk_coords(world_x, world_y);
        self.chunks
            .get(&pos)
            .map(|chunk| chunk.grid.get(local_x, local_y))
    }

    /// Cell as the simulation sees it (boundary outside active chunks)
    pub fn read_cell(&self, world_x: i32, world_y: i32) -> Cell {
        read_in(&self.chunks, world_x, world_y)
    }

    /// Write a cell and wake its neighbours in adjacent chunks.
    ///
    /// Returns false when no chunk is loaded at the position.
    pub fn write_cell(&mut self, world_x: i32, world_y: i32, cell: Cell, materials: &Materials) -> bool {
        let (pos, _, _) = Self::world_to_chunk_coords(world_x, world_y);
        if !self.chunks.contains_key(&pos) {
            return false;
        }
        if write_in(&mut self.chunks, world_x, world_y, cell, materials) {
            for (nx, ny) in [
                (world_x - 1, world_y),
                (world_x + 1, world_y),
                (world_x, world_y - 1),
                (world_x, world_y + 1),
            ] {
                if Self::world_to_chunk_coords(nx, ny).0 != pos {
                    wake_in(&mut self.chunks, nx, ny);
                }
            }
        }
        true
    }

    /// Active chunk positions in stepping order: bottom row first, left to right
    pub fn active_positions(&self) -> Vec<IVec2> {
        let mut positions: Vec<IVec2> = self
            .chunks
            .values()
            .filter(|chunk| chunk.active)
            .map(Chunk::pos)
            .collect();
        positions.sort_by_key(|pos| (-pos.y, pos.x));
        positions
    }

    /// Run `f` on one chunk while the rest of the world stays reachable
    /// through a [`ChunkView`].
    pub fn with_chunk_view<T>(&mut self, pos: IVec2, f: impl FnOnce(&mut ChunkView<'_>) -> T) -> Option<T> {
        let mut chunk = self.chunks.remove(&pos)?;
        let result = {
            let mut view = ChunkView {
                chunk: &mut chunk,
                neighbors: &mut self.chunks,
            };
            f(&mut view)
        };
        self.chunks.insert(pos, chunk);
        Some(result)
    }
}

/// One chunk lifted out of the map, with mutable access to its neighbours
pub struct ChunkView<'a> {
    chunk: &'a mut Chunk,
    neighbors: &'a mut HashMap<IVec2, Chunk>,
}

impl ChunkView<'_> {
    pub fn chunk(&self) -> &Chunk {
        self.chunk
    }

    fn to_world(&self, x: i32, y: i32) -> IVec2 {
        self.chunk.origin() + IVec2::new(x, y)
    }
}

impl CellSpace for ChunkView<'_> {
    fn grid(&self) -> &CellGrid {
        &self.chunk.grid
    }

    fn grid_mut(&mut self) -> &mut CellGrid {
        &mut self.chunk.grid
    }

    fn read_outside(&self, x: i32, y: i32) -> Cell {
        let world = self.to_world(x, y);
        read_in(self.neighbors, world.x, world.y)
    }

    fn write_outside(&mut self, x: i32, y: i32, cell: Cell, materials: &Materials) {
        let world = self.to_world(x, y);
        write_in(self.neighbors, world.x, world.y, cell, materials);
    }

    fn wake_outside(&mut self, x: i32, y: i32) {
        let world = self.to_world(x, y);
        wake_in(self.neighbors, world.x, world.y);
    }
}
