//! Simulation statistics collection trait

use serde::Serialize;

/// Trait for collecting simulation statistics
///
/// The stepper and the body systems report what they did through this trait,
/// so callers decide whether counting is worth it.
pub trait SimStats {
    /// Record that a cell moved to another position
    fn record_cell_moved(&mut self);

    /// Record that a pairwise interaction rule fired
    fn record_reaction(&mut self);

    /// Record that a spontaneous conversion fired
    fn record_conversion(&mut self);

    /// Record a density swap between two cells
    fn record_swap(&mut self);

    /// Record that a connected region of `cells` cells became a free body
    fn record_detachment(&mut self, cells: usize);

    /// Record that a free body settled and was stamped back into the grid
    fn record_settle(&mut self);
}

/// A no-op implementation for when stats collection is not needed
#[derive(Default)]
pub struct NoopStats;

impl SimStats for NoopStats {
    fn record_cell_moved(&mut self) {}
    fn record_reaction(&mut self) {}
    fn record_conversion(&mut self) {}
    fn record_swap(&mut self) {}
    fn record_detachment(&mut self, _cells: usize) {}
    fn record_settle(&mut self) {}
}

/// Plain counters, reset by the caller
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    pub cells_moved: u64,
    pub reactions: u64,
    pub conversions: u64,
    pub swaps: u64,
    pub detachments: u64,
    pub detached_cells: u64,
    pub settles: u64,
}

impl TickStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl SimStats for TickStats {
    fn record_cell_moved(&mut self) {
        self.cells_moved += 1;
    }

    fn record_reaction(&mut self) {
        self.reactions += 1;
    }

    fn record_conversion(&mut self) {
        self.conversions += 1;
    }

    fn record_swap(&mut self) {
        self.swaps += 1;
    }

    fn record_detachment(&mut self, cells: usize) {
        self.detachments += 1;
        self.detached_cells += cells as u64;
    }

    fn record_settle(&mut self) {
        self.settles += 1;
    }
}
