//! Material definitions and registry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved material IDs
pub struct MaterialId;

impl MaterialId {
    pub const AIR: u16 = 0;
    /// Synthetic solid reported outside loaded space, never stored in a grid
    pub const BOUNDARY: u16 = u16::MAX;
}

/// A spontaneous per-tick transformation of a material
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub probability: f32,
    pub into: u16,
}

/// Definition of a material's properties
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDef {
    pub id: u16,
    pub name: String,

    /// Relative density, only ever compared against other densities
    pub density: f32,

    /// Never moves; participates in collision geometry
    pub is_static: bool,
    /// Static material that detaches when it loses anchored support
    pub falling: bool,
    /// Processed by the automaton (reactions, conversions, motion)
    pub dynamic: bool,
    pub liquid: bool,
    pub gas: bool,
    pub sand: bool,

    /// Display color (RGBA)
    pub color: [u8; 4],

    /// Tried in order each tick, first success wins
    pub conversions: Vec<Conversion>,
}

impl MaterialDef {
    pub fn air() -> Self {
        Self {
            id: MaterialId::AIR,
            name: "air".to_string(),
            density: 0.0,
            is_static: false,
            falling: false,
            dynamic: false,
            liquid: false,
            gas: false,
            sand: false,
            color: [0, 0, 0, 0],
            conversions: Vec::new(),
        }
    }

    pub fn boundary() -> Self {
        Self {
            id: MaterialId::BOUNDARY,
            name: "boundary".to_string(),
            density: f32::INFINITY,
            is_static: true,
            falling: false,
            dynamic: false,
            liquid: false,
            gas: false,
            sand: false,
            color: [0, 0, 0, 0],
            conversions: Vec::new(),
        }
    }

    /// Static and not subject to detachment
    pub fn is_anchored(&self) -> bool {
        self.is_static && !self.falling
    }
}

/// Registry of all materials, indexed by id (index 0 is air)
pub struct Materials {
    materials: Vec<MaterialDef>,
    by_name: HashMap<String, u16>,
    boundary: MaterialDef,
}

impl Materials {
    /// Build from declared materials. Ids must already equal `index + 1`.
    pub(crate) fn from_declared(declared: Vec<MaterialDef>) -> Self {
        let mut materials = Vec::with_capacity(declared.len() + 1);
        materials.push(MaterialDef::air());
        materials.extend(declared);

        let by_name = materials
            .iter()
            .map(|def| (def.name.clone(), def.id))
            .collect();

        Self {
            materials,
            by_name,
            boundary: MaterialDef::boundary(),
        }
    }

    /// Look up a material. Ids outside the registry resolve to the boundary material.
    pub fn get(&self, id: u16) -> &MaterialDef {
        self.materials.get(id as usize).unwrap_or(&self.boundary)
    }

    /// Resolve a name; `""` and `"air"` both name the empty material
    pub fn id_of(&self, name: &str) -> Option<u16> {
        if name.is_empty() {
            return Some(MaterialId::AIR);
        }
        self.by_name.get(name).copied()
    }

    /// Number of materials including air
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialDef> {
        self.materials.iter()
    }

    pub(crate) fn set_conversions(&mut self, id: u16, conversions: Vec<Conversion>) {
        if let Some(def) = self.materials.get_mut(id as usize) {
            def.conversions = conversions;
        }
    }
}
