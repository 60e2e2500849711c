//! Chunk content sources

use glam::IVec2;
use sandfall_simulation::{Cell, MaterialRegistry, RegistryError};

/// Supplies the initial cells of a chunk
pub trait ChunkSource {
    /// Row-major `size * size` cells for the chunk at `chunk` (chunk coordinates)
    fn generate(&self, chunk: IVec2, size: usize) -> Vec<Cell>;
}

/// Horizontal band: every cell at or below `top` (world y) until the next band
#[derive(Clone, Debug, PartialEq)]
pub struct Band {
    pub top: i32,
    pub material: u16,
}

/// Flat terrain made of horizontal material bands
///
/// Cells above the first band are air. Bands are sorted by `top` so later
/// (deeper) bands take over from earlier ones.
#[derive(Clone, Debug, Default)]
pub struct LayeredGenerator {
    bands: Vec<Band>,
}

impl LayeredGenerator {
    pub fn new(mut bands: Vec<Band>) -> Self {
        bands.sort_by_key(|band| band.top);
        Self { bands }
    }

    /// Bands given as `(top, material name)` pairs
    pub fn from_names(registry: &MaterialRegistry, bands: &[(i32, &str)]) -> Result<Self, RegistryError> {
        let bands = bands
            .iter()
            .map(|&(top, name)| {
                registry
                    .id_of(name)
                    .map(|material| Band { top, material })
                    .ok_or_else(|| RegistryError::UnknownMaterial {
                        name: name.to_string(),
                        context: "terrain band".to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(bands))
    }

    /// Material at world row `y`
    pub fn material_at(&self, y: i32) -> u16 {
        self.bands
            .iter()
            .rev()
            .find(|band| band.top <= y)
            .map_or(0, |band| band.material)
    }
}

impl ChunkSource for LayeredGenerator {
    fn generate(&self, chunk: IVec2, size: usize) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(size * size);
        for local_y in 0..size {
            let material = self.material_at(chunk.y * size as i32 + local_y as i32);
            cells.extend(std::iter::repeat_n(Cell::new(material), size));
        }
        cells
    }
}
