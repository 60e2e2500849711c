//! Errors raised while loading and compiling material rule data

use thiserror::Error;

/// Fatal problems in declarative rule data. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to parse rule data: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("unknown material '{name}' referenced by {context}")]
    UnknownMaterial { name: String, context: String },

    #[error("material '{0}' is declared more than once")]
    DuplicateMaterial(String),

    #[error("material name '{0}' is reserved for air")]
    ReservedName(String),

    #[error("material '{name}' has non-positive density {density}")]
    InvalidDensity { name: String, density: f32 },

    #[error("probability {probability} outside [0, 1] in {context}")]
    InvalidProbability { probability: f32, context: String },

    #[error("too many materials declared ({0})")]
    TooManyMaterials(usize),
}
