//! World-level simulation systems that run after cell stepping

pub mod structural;

pub use structural::{FillOutcome, StructuralIntegritySystem};
