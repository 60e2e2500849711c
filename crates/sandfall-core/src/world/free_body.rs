//! Free bodies - detached static material simulated as rigid bodies

use glam::{IVec2, Vec2};
use sandfall_simulation::{Cell, Materials};

use super::grid::{CellGrid, CellSpace};
use crate::physics::{BodyHandle, BodyState};

/// A detached region of cells riding on a dynamic physics body.
///
/// The grid has one empty cell of margin on every side. `origin` is the world
/// position of the grid's (0, 0) corner when the body was created; the body
/// pose maps grid-local coordinates to the world from then on.
#[derive(Clone, Debug)]
pub struct FreeBody {
    pub id: u64,
    pub grid: CellGrid,
    pub origin: IVec2,
    pub(crate) still_ticks: u32,
}

impl FreeBody {
    /// Build from world-positioned cells. Returns `None` for an empty set.
    pub fn from_cells(id: u64, cells: &[(IVec2, Cell)]) -> Option<Self> {
        let first = cells.first()?.0;
        let (min, max) = cells
            .iter()
            .fold((first, first), |(min, max), (p, _)| (min.min(*p), max.max(*p)));

        let origin = min - IVec2::ONE;
        let size = (max - min + IVec2::ONE) + IVec2::splat(2);
        let (width, height) = (size.x as usize, size.y as usize);

        let mut grid_cells = vec![Cell::EMPTY; width * height];
        for (pos, cell) in cells {
            let local = *pos - origin;
            grid_cells[local.y as usize * width + local.x as usize] = Cell {
                touched: false,
                ..cell.at_rest()
            };
        }

        Some(Self {
            id,
            grid: CellGrid::from_cells(width, height, grid_cells),
            origin,
            still_ticks: 0,
        })
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.grid.body()
    }

    pub fn cell_count(&self) -> usize {
        self.grid.occupied_count()
    }

    /// Pose to use when the physics engine has no body for us
    pub fn resting_state(&self) -> BodyState {
        BodyState {
            position: self.origin.as_vec2(),
            ..Default::default()
        }
    }

    /// World cell each occupied grid cell lands on under `state`
    pub fn world_cells(&self, state: &BodyState) -> Vec<(IVec2, Cell)> {
        let mut placed = Vec::with_capacity(self.cell_count());
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let cell = self.grid.get(x, y);
                if cell.is_empty() {
                    continue;
                }
                let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let world = state.transform_point(center).floor().as_ivec2();
                placed.push((world, cell));
            }
        }
        placed
    }
}

impl CellSpace for FreeBody {
    fn grid(&self) -> &CellGrid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut CellGrid {
        &mut self.grid
    }

    fn read_outside(&self, _x: i32, _y: i32) -> Cell {
        Cell::BOUNDARY
    }

    fn write_outside(&mut self, _x: i32, _y: i32, _cell: Cell, _materials: &Materials) {}
}
