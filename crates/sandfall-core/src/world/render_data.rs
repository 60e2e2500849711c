//! Read-only extraction of pixel data for presentation layers

use glam::{IVec2, Vec2};
use serde::Serialize;
use sandfall_simulation::{Cell, Materials};

use super::chunk_manager::ChunkManager;
use super::free_body::FreeBody;
use super::grid::CellGrid;
use crate::physics::BodyState;

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Pixels of one free body plus the pose to draw them with
#[derive(Clone, Debug, Serialize)]
pub struct FreeBodyRenderData {
    pub id: u64,
    /// World position of the grid's local origin
    pub position: Vec2,
    /// Radians around `position`
    pub rotation: f32,
    pub width: usize,
    pub height: usize,
    /// Row-major RGBA, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

pub struct RenderExtract;

impl RenderExtract {
    fn cell_color(cell: Cell, materials: &Materials) -> [u8; 4] {
        if cell.is_empty() {
            TRANSPARENT
        } else {
            materials.get(cell.material).color
        }
    }

    /// RGBA pixels of a world window starting at `min_cell`.
    ///
    /// Air and unloaded cells are transparent. Inactive chunks still render
    /// their stored cells.
    pub fn window_rgba(
        chunk_manager: &ChunkManager,
        materials: &Materials,
        min_cell: IVec2,
        width: usize,
        height: usize,
    ) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(width * height * 4);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let color = chunk_manager
                    .get_cell(min_cell.x + x, min_cell.y + y)
                    .map_or(TRANSPARENT, |cell| Self::cell_color(cell, materials));
                rgba.extend_from_slice(&color);
            }
        }
        rgba
    }

    /// RGBA pixels of a whole grid
    pub fn grid_rgba(grid: &CellGrid, materials: &Materials) -> Vec<u8> {
        grid.cells()
            .iter()
            .flat_map(|&cell| Self::cell_color(cell, materials))
            .collect()
    }

    pub fn free_body(body: &FreeBody, state: &BodyState, materials: &Materials) -> FreeBodyRenderData {
        FreeBodyRenderData {
            id: body.id,
            position: state.position,
            rotation: state.rotation,
            width: body.grid.width(),
            height: body.grid.height(),
            rgba: Self::grid_rgba(&body.grid, materials),
        }
    }
}
