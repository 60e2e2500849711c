//! Material simulation data for Sandfall
//!
//! This crate provides the foundational data types for the cell simulation:
//! - Declarative rule data (RuleSet) loaded from RON
//! - The compiled registry (MaterialRegistry, Materials, InteractionTable)
//! - Cell types (Cell, CHUNK_SIZE)

mod cell;
mod error;
mod interactions;
mod materials;
mod registry;
pub mod rules;

pub use cell::{CHUNK_AREA, CHUNK_SIZE, Cell};
pub use error::RegistryError;
pub use interactions::{InteractionRule, InteractionTable};
pub use materials::{Conversion, MaterialDef, MaterialId, Materials};
pub use registry::MaterialRegistry;
pub use rules::RuleSet;
