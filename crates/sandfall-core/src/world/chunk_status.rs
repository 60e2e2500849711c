//! Chunk activation against the interest window

use glam::IVec2;

use super::chunk_manager::ChunkManager;
use crate::physics::PhysicsEngine;

/// Inclusive rectangle of chunk coordinates that should be simulated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterestWindow {
    pub min: IVec2,
    pub max: IVec2,
}

impl InterestWindow {
    pub fn new(a: IVec2, b: IVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, pos: IVec2) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

/// Chunk status management utilities
pub struct ChunkStatus;

impl ChunkStatus {
    /// Activate chunks inside `window` and deactivate the rest.
    ///
    /// Deactivated chunks drop their collision body and are flagged for a
    /// rebuild; newly activated chunks are stepped in full on their first
    /// tick. Returns the number of chunks that became active.
    pub fn apply_interest<P: PhysicsEngine>(
        chunk_manager: &mut ChunkManager,
        physics: &mut P,
        window: Option<InterestWindow>,
    ) -> usize {
        let mut activated = 0;
        let mut deactivated = 0;

        for (pos, chunk) in chunk_manager.chunks.iter_mut() {
            let active = window.is_some_and(|w| w.contains(*pos));
            chunk.was_active = chunk.active;

            if chunk.active && !active {
                if let Some(body) = chunk.grid.body.take() {
                    physics.unregister_body(body);
                }
                chunk.grid.needs_rebuild = true;
                deactivated += 1;
            } else if !chunk.active && active {
                chunk.grid.mark_all_dirty();
                activated += 1;
            }
            chunk.active = active;
        }

        if activated > 0 || deactivated > 0 {
            log::debug!("Chunks: {activated} activated, {deactivated} deactivated");
        }

        activated
    }
}
