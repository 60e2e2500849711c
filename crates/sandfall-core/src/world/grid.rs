//! Cell storage shared by chunks and free bodies

use glam::{IVec2, Vec2};
use sandfall_simulation::{Cell, Materials};

use crate::physics::BodyHandle;

/// Inclusive bounding box of cells that need stepping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRect {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl DirtyRect {
    pub fn new(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Rectangular cell grid with change tracking
///
/// Every material change is recorded three ways: the surrounding cells join
/// the dirty rect, solid changes queue a detachment check, and static-ness
/// changes flag the collision silhouette for rebuild.
#[derive(Clone, Debug)]
pub struct CellGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    dirty_rect: Option<DirtyRect>,
    modified_solids: Vec<IVec2>,
    pub(crate) body: Option<BodyHandle>,
    pub(crate) polygons: Vec<Vec<Vec2>>,
    pub(crate) needs_rebuild: bool,
}

impl CellGrid {
    /// Empty grid, fully dirty
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_cells(width, height, vec![Cell::EMPTY; width * height])
    }

    /// Wrap existing cells (row-major, `width * height` long).
    pub fn from_cells(width: usize, height: usize, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        let mut grid = Self {
            width,
            height,
            cells,
            dirty_rect: None,
            modified_solids: Vec::new(),
            body: None,
            polygons: Vec::new(),
            needs_rebuild: true,
        };
        grid.mark_all_dirty();
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Cell at local coordinates
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Cell {
        debug_assert!(x < self.width && y < self.height);
        self.cells[y * self.width + x]
    }

    /// Cell at signed local coordinates, `None` outside the grid
    #[inline]
    pub fn get_local(&self, x: i32, y: i32) -> Option<Cell> {
        self.contains(x, y).then(|| self.get(x as usize, y as usize))
    }

    /// Write a cell, marking it touched for the current tick.
    ///
    /// Returns true when the material changed.
    pub fn set(&mut self, x: usize, y: usize, cell: Cell, materials: &Materials) -> bool {
        let index = y * self.width + x;
        let old = self.cells[index];
        self.cells[index] = Cell {
            touched: true,
            ..cell
        };

        if old.material == cell.material {
            return false;
        }

        let before = materials.get(old.material);
        let after = materials.get(cell.material);
        let static_changed = before.is_static != after.is_static;
        if (before.is_static || after.is_static)
            && (static_changed || before.falling != after.falling)
        {
            self.modified_solids.push(IVec2::new(x as i32, y as i32));
        }
        if static_changed {
            self.needs_rebuild = true;
        }

        self.mark_dirty_around(x, y);
        true
    }

    /// Add one cell to the dirty rect
    pub fn mark_dirty(&mut self, x: usize, y: usize) {
        match &mut self.dirty_rect {
            Some(rect) => rect.expand(x, y),
            None => self.dirty_rect = Some(DirtyRect::new(x, y)),
        }
    }

    /// Add the 3x3 neighbourhood of a cell (clipped to the grid)
    pub fn mark_dirty_around(&mut self, x: usize, y: usize) {
        let max_x = (x + 1).min(self.width - 1);
        let max_y = (y + 1).min(self.height - 1);
        self.mark_dirty(x.saturating_sub(1), y.saturating_sub(1));
        self.mark_dirty(max_x, max_y);
    }

    pub fn mark_all_dirty(&mut self) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        self.dirty_rect = Some(DirtyRect {
            min_x: 0,
            min_y: 0,
            max_x: self.width - 1,
            max_y: self.height - 1,
        });
    }

    pub fn dirty_rect(&self) -> Option<DirtyRect> {
        self.dirty_rect
    }

    /// Current dirty rect, leaving the grid clean
    pub fn take_dirty_rect(&mut self) -> Option<DirtyRect> {
        self.dirty_rect.take()
    }

    pub fn clear_touched(&mut self) {
        for cell in &mut self.cells {
            cell.touched = false;
        }
    }

    /// Local positions whose solid state changed since the last call
    pub fn take_modified_solids(&mut self) -> Vec<IVec2> {
        std::mem::take(&mut self.modified_solids)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    /// Simplified silhouette polygons from the last rebuild, in local cell units
    pub fn polygons(&self) -> &[Vec<Vec2>] {
        &self.polygons
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }
}

/// A grid plus whatever surrounds it
///
/// The stepper works in the grid's local coordinates. Reads outside the grid
/// are answered by the implementor, which is how chunks see their neighbours
/// and free bodies see a solid boundary.
pub trait CellSpace {
    fn grid(&self) -> &CellGrid;

    fn grid_mut(&mut self) -> &mut CellGrid;

    /// Cell at local coordinates outside the grid
    fn read_outside(&self, x: i32, y: i32) -> Cell;

    /// Write at local coordinates outside the grid
    fn write_outside(&mut self, x: i32, y: i32, cell: Cell, materials: &Materials);

    /// Schedule a cell outside the grid for stepping
    fn wake_outside(&mut self, _x: i32, _y: i32) {}

    #[inline]
    fn read(&self, x: i32, y: i32) -> Cell {
        match self.grid().get_local(x, y) {
            Some(cell) => cell,
            None => self.read_outside(x, y),
        }
    }

    fn write(&mut self, x: i32, y: i32, cell: Cell, materials: &Materials) {
        if !self.grid().contains(x, y) {
            self.write_outside(x, y, cell, materials);
            return;
        }
        if self.grid_mut().set(x as usize, y as usize, cell, materials) {
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if !self.grid().contains(nx, ny) {
                    self.wake_outside(nx, ny);
                }
            }
        }
    }

    /// Keep a cell scheduled for the next tick
    fn mark_active(&mut self, x: i32, y: i32) {
        if self.grid().contains(x, y) {
            self.grid_mut().mark_dirty(x as usize, y as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandfall_simulation::MaterialRegistry;

    fn registry() -> MaterialRegistry {
        MaterialRegistry::builtin().unwrap()
    }

    #[test]
    fn test_dirty_rect_expand() {
        let mut rect = DirtyRect::new(5, 5);
        rect.expand(2, 8);
        rect.expand(7, 1);
        assert_eq!(
            rect,
            DirtyRect {
                min_x: 2,
                min_y: 1,
                max_x: 7,
                max_y: 8
            }
        );
    }

    #[test]
    fn test_new_grid_is_fully_dirty() {
        let mut grid = CellGrid::new(8, 4);
        let rect = grid.take_dirty_rect().unwrap();
        assert_eq!((rect.min_x, rect.min_y, rect.max_x, rect.max_y), (0, 0, 7, 3));
        assert!(grid.take_dirty_rect().is_none());
    }

    #[test]
    fn test_set_marks_neighbourhood() {
        let registry = registry();
        let sand = registry.id_of("sand").unwrap();
        let mut grid = CellGrid::new(8, 8);
        grid.take_dirty_rect();

        assert!(grid.set(0, 4, Cell::new(sand), registry.materials()));
        let rect = grid.take_dirty_rect().unwrap();
        assert_eq!((rect.min_x, rect.min_y, rect.max_x, rect.max_y), (0, 3, 1, 5));
        assert!(grid.get(0, 4).touched);
    }

    #[test]
    fn test_same_material_write_is_quiet() {
        let registry = registry();
        let mut grid = CellGrid::new(4, 4);
        grid.take_dirty_rect();

        assert!(!grid.set(1, 1, Cell::EMPTY, registry.materials()));
        assert!(grid.dirty_rect().is_none());
    }

    #[test]
    fn test_solid_changes_are_tracked() {
        let registry = registry();
        let materials = registry.materials();
        let wood = registry.id_of("wood").unwrap();
        let rock = registry.id_of("rock").unwrap();
        let sand = registry.id_of("sand").unwrap();
        let mut grid = CellGrid::new(4, 4);
        grid.needs_rebuild = false;

        grid.set(0, 0, Cell::new(sand), materials);
        assert!(grid.take_modified_solids().is_empty());
        assert!(!grid.needs_rebuild());

        grid.set(1, 0, Cell::new(wood), materials);
        grid.set(2, 0, Cell::new(rock), materials);
        assert_eq!(
            grid.take_modified_solids(),
            vec![IVec2::new(1, 0), IVec2::new(2, 0)]
        );
        assert!(grid.needs_rebuild());

        grid.needs_rebuild = false;
        // Anchored to falling: static-ness unchanged, falling changed
        grid.set(2, 0, Cell::new(wood), materials);
        assert_eq!(grid.take_modified_solids(), vec![IVec2::new(2, 0)]);
        assert!(!grid.needs_rebuild());
    }

    #[test]
    fn test_clear_touched() {
        let registry = registry();
        let mut grid = CellGrid::new(2, 2);
        grid.set(0, 0, Cell::new(1), registry.materials());
        grid.clear_touched();
        assert!(grid.cells().iter().all(|c| !c.touched));
    }
}
