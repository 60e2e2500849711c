//! Chunk - fixed-size square of the world grid

use glam::IVec2;
use sandfall_simulation::{CHUNK_SIZE, Cell};

use super::grid::CellGrid;

/// A 64x64 region of the world
#[derive(Clone, Debug)]
pub struct Chunk {
    /// Chunk coordinates (not world coordinates)
    pub x: i32,
    pub y: i32,

    pub grid: CellGrid,

    /// Inside the interest window and stepped every tick
    pub active: bool,

    /// Activity at the previous interest update
    pub was_active: bool,
}

impl Chunk {
    pub fn new(x: i32, y: i32) -> Self {
        Self::from_cells(x, y, vec![Cell::EMPTY; CHUNK_SIZE * CHUNK_SIZE])
    }

    /// Chunk from `CHUNK_SIZE * CHUNK_SIZE` row-major cells
    pub fn from_cells(x: i32, y: i32, cells: Vec<Cell>) -> Self {
        Self {
            x,
            y,
            grid: CellGrid::from_cells(CHUNK_SIZE, CHUNK_SIZE, cells),
            active: false,
            was_active: false,
        }
    }

    pub fn pos(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// World coordinates of the top-left cell
    pub fn origin(&self) -> IVec2 {
        self.pos() * CHUNK_SIZE as i32
    }
}
