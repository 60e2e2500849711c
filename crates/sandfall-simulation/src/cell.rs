//! Cell types and constants
//!
//! Foundational types for the cell-based simulation.

use crate::MaterialId;
use serde::{Deserialize, Serialize};

/// Size of a chunk in cells (64x64)
pub const CHUNK_SIZE: usize = 64;

/// Total cells in a chunk
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

/// A single cell of the world grid.
///
/// Cells are plain values: reading a neighbour copies it, so later writes to
/// the grid never alias a snapshot held by the stepper.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Material id (0 = air)
    pub material: u16,
    /// Velocity in cells per tick
    pub vx: f32,
    pub vy: f32,
    /// Sub-cell offset, kept in [0, 1)
    pub ox: f32,
    pub oy: f32,
    /// Written during the current tick
    pub touched: bool,
}

impl Cell {
    pub const EMPTY: Cell = Cell::new(MaterialId::AIR);

    /// Value reported for positions outside loaded, active space
    pub const BOUNDARY: Cell = Cell::new(MaterialId::BOUNDARY);

    pub const fn new(material: u16) -> Self {
        Self {
            material,
            vx: 0.0,
            vy: 0.0,
            ox: 0.5,
            oy: 0.5,
            touched: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.material == MaterialId::AIR
    }

    /// Same cell with velocity cleared and the offset centred
    pub fn at_rest(self) -> Self {
        Self {
            vx: 0.0,
            vy: 0.0,
            ox: 0.5,
            oy: 0.5,
            ..self
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let cell = Cell::default();
        assert!(cell.is_empty());
        assert!(!cell.touched);
    }

    #[test]
    fn test_boundary_is_occupied() {
        assert!(!Cell::BOUNDARY.is_empty());
        assert_eq!(Cell::BOUNDARY.material, MaterialId::BOUNDARY);
    }

    #[test]
    fn test_at_rest_keeps_material() {
        let cell = Cell {
            material: 7,
            vx: 2.0,
            vy: -3.0,
            ox: 0.1,
            oy: 0.9,
            touched: true,
        };
        let rested = cell.at_rest();
        assert_eq!(rested.material, 7);
        assert_eq!((rested.vx, rested.vy), (0.0, 0.0));
        assert_eq!((rested.ox, rested.oy), (0.5, 0.5));
        assert!(rested.touched);
    }
}
