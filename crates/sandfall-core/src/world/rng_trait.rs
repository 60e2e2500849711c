//! RNG trait abstraction for world simulation
//!
//! Allows the world to run on:
//! - `thread_rng()` for interactive runs
//! - a seeded generator for reproducible runs and tests

/// Random number generator trait for world simulation
pub trait WorldRng {
    /// Generate random boolean with 50% probability
    fn gen_bool(&mut self) -> bool;

    /// Generate random f32 in [0.0, 1.0)
    fn gen_f32(&mut self) -> f32;

    /// Check if random value is less than probability threshold
    fn check_probability(&mut self, probability: f32) -> bool {
        self.gen_f32() < probability
    }

    /// Uniform index in `0..n`
    fn gen_index(&mut self, n: usize) -> usize {
        ((self.gen_f32() * n as f32) as usize).min(n.saturating_sub(1))
    }
}

// Blanket implementation for any type implementing rand::Rng
impl<T: ?Sized + rand::Rng> WorldRng for T {
    fn gen_bool(&mut self) -> bool {
        rand::Rng::r#gen(self)
    }

    fn gen_f32(&mut self) -> f32 {
        rand::Rng::r#gen(self)
    }
}
