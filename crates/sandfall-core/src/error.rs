//! World error types

use sandfall_simulation::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("chunk data has {actual} cells, expected {expected}")]
    ChunkSize { expected: usize, actual: usize },

    #[error("material id {0} is not in the registry")]
    UnknownMaterial(u16),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
