//! Cellular automata update - one pass over a grid's dirty rect
//!
//! Rows are processed bottom to top; the column direction is picked at random
//! per pass so flows don't drift to one side. A cell that was already written
//! this tick is skipped, which keeps a falling cell from being moved twice.

use sandfall_simulation::{Cell, MaterialDef, MaterialId, MaterialRegistry, Materials};

use super::grid::CellSpace;
use super::rng_trait::WorldRng;
use super::stats::SimStats;

const MAX_VX: f32 = 4.0;
const MAX_VY: f32 = 5.0;

/// Per-tick gravity for non-gas cells
const GRAVITY: f32 = 0.5;
/// Gas buoyancy, applied before damping
const BUOYANCY: f32 = 0.25;
const GAS_DAMPING: f32 = 0.8;

const LIQUID_AIR_DRAG: f32 = 0.99;
const SAND_FRICTION: f32 = 0.9;

/// Neighbour directions in reaction priority: down, right, left, up
const REACTION_DIRS: [(i32, i32); 4] = [(0, 1), (1, 0), (-1, 0), (0, -1)];

/// Random exchange directions for gas: right, down, left, up
const GAS_DIRS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Integration walk can never need more steps than the velocity clamp allows
const MAX_WALK_STEPS: usize = 16;

/// Sub-cell offset wrapped into [0, 1)
fn wrap_offset(value: f32) -> f32 {
    let wrapped = value.rem_euclid(1.0);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Cellular automata updater
pub struct CellularAutomataUpdater;

impl CellularAutomataUpdater {
    /// Step every cell in the grid's dirty rect once.
    ///
    /// The dirty rect is consumed; cells that stay busy re-mark themselves
    /// so they are stepped again next tick.
    pub fn update_grid<S, R>(
        space: &mut S,
        registry: &MaterialRegistry,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) where
        S: CellSpace + ?Sized,
        R: WorldRng + ?Sized,
    {
        let Some(rect) = space.grid_mut().take_dirty_rect() else {
            return;
        };

        let flip_x = rng.gen_bool();
        let columns = rect.max_x - rect.min_x;

        for y in (rect.min_y..=rect.max_y).rev() {
            for i in 0..=columns {
                let x = if flip_x {
                    rect.max_x - i
                } else {
                    rect.min_x + i
                };
                Self::update_cell(space, x as i32, y as i32, registry, rng, stats);
            }
        }
    }

    fn update_cell<S, R>(
        space: &mut S,
        x: i32,
        y: i32,
        registry: &MaterialRegistry,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) where
        S: CellSpace + ?Sized,
        R: WorldRng + ?Sized,
    {
        let materials = registry.materials();
        let cell = space.read(x, y);
        if cell.is_empty() {
            return;
        }

        let def = materials.get(cell.material);
        if !def.dynamic {
            return;
        }

        if cell.touched {
            space.mark_active(x, y);
            return;
        }

        let down = space.read(x, y + 1);
        let right = space.read(x + 1, y);
        let left = space.read(x - 1, y);
        let up = space.read(x, y - 1);

        if Self::try_reactions(space, x, y, cell, [down, right, left, up], registry, rng, stats) {
            return;
        }

        if Self::try_conversions(space, x, y, cell, def, materials, rng, stats) {
            return;
        }

        if def.is_static {
            return;
        }

        let mut next = cell;

        if def.gas {
            next.vy = (next.vy - BUOYANCY) * GAS_DAMPING;
        } else {
            next.vy += GRAVITY;
        }

        // Contact with an occupied neighbour kills velocity toward it
        if next.vy > 0.0 && !down.is_empty() {
            next.vy = 0.0;
            next.oy = 0.5;
        }
        if next.vy < 0.0 && !up.is_empty() {
            next.vy = 0.0;
            next.oy = 0.5;
        }
        if next.vx > 0.0 && !right.is_empty() {
            next.vx = 0.0;
            next.ox = 0.5;
        }
        if next.vx < 0.0 && !left.is_empty() {
            next.vx = 0.0;
            next.ox = 0.5;
        }

        // Buried in its own material: nothing can change, let it sleep
        if [down, up, left, right]
            .iter()
            .all(|n| n.material == cell.material)
        {
            space.write(x, y, next, materials);
            return;
        }
        space.mark_active(x, y);

        if def.liquid {
            if !down.is_empty() {
                Self::spread(space, x, y + 1, &mut next, right, left, rng);
            } else {
                next.vx *= LIQUID_AIR_DRAG;
            }
        }

        if def.gas {
            if !up.is_empty() {
                Self::spread(space, x, y - 1, &mut next, right, left, rng);
            } else {
                next.vx = rng.gen_f32() * 2.0 - 1.0;
            }
        }

        if def.sand && !down.is_empty() {
            let down_left = space.read(x - 1, y + 1);
            let down_right = space.read(x + 1, y + 1);
            next.vx *= SAND_FRICTION;
            let flow_right = right.is_empty() && down_right.is_empty();
            let flow_left = left.is_empty() && down_left.is_empty();
            match rng.gen_index(3) {
                0 if flow_right => next.vx += 0.4 + rng.gen_f32() * 0.2,
                2 if flow_left => next.vx -= 0.4 + rng.gen_f32() * 0.2,
                _ => {}
            }
        }

        next.vx = next.vx.clamp(-MAX_VX, MAX_VX);
        next.vy = next.vy.clamp(-MAX_VY, MAX_VY);

        let moved = Self::integrate(space, x, y, next, materials);
        if moved {
            stats.record_cell_moved();
        } else {
            Self::density_swaps(space, x, y, def, down, right, materials, rng, stats);
        }
    }

    /// Fire the first applicable pairwise rule with a neighbour
    #[allow(clippy::too_many_arguments)]
    fn try_reactions<S, R>(
        space: &mut S,
        x: i32,
        y: i32,
        cell: Cell,
        neighbors: [Cell; 4],
        registry: &MaterialRegistry,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) -> bool
    where
        S: CellSpace + ?Sized,
        R: WorldRng + ?Sized,
    {
        let interactions = registry.interactions();
        for ((dx, dy), other) in REACTION_DIRS.into_iter().zip(neighbors) {
            if other.touched {
                continue;
            }
            let Some(rule) = interactions.get(cell.material, other.material) else {
                continue;
            };

            space.mark_active(x, y);
            if rng.check_probability(rule.probability) {
                let materials = registry.materials();
                let result_self = Cell {
                    material: rule.result_self,
                    ..cell
                };
                let result_other = Cell {
                    material: rule.result_other,
                    ..other
                };
                space.write(x, y, result_self, materials);
                space.write(x + dx, y + dy, result_other, materials);
                stats.record_reaction();
                return true;
            }
        }
        false
    }

    /// Try the material's spontaneous conversions in order
    #[allow(clippy::too_many_arguments)]
    fn try_conversions<S, R>(
        space: &mut S,
        x: i32,
        y: i32,
        cell: Cell,
        def: &MaterialDef,
        materials: &Materials,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) -> bool
    where
        S: CellSpace + ?Sized,
        R: WorldRng + ?Sized,
    {
        for conversion in &def.conversions {
            space.mark_active(x, y);
            if rng.check_probability(conversion.probability) {
                let converted = Cell {
                    material: conversion.into,
                    ..cell
                };
                space.write(x, y, converted, materials);
                stats.record_conversion();
                return true;
            }
        }
        false
    }

    /// Sideways push for a fluid resting on (or pressed against) the row `support_y`
    fn spread<S, R>(
        space: &S,
        x: i32,
        support_y: i32,
        next: &mut Cell,
        right: Cell,
        left: Cell,
        rng: &mut R,
    ) where
        S: CellSpace + ?Sized,
        R: WorldRng + ?Sized,
    {
        let diagonal_left = space.read(x - 1, support_y);
        let diagonal_right = space.read(x + 1, support_y);
        match rng.gen_index(3) {
            0 if right.is_empty() => {
                let mut push = 0.4 + rng.gen_f32() * 0.2;
                if diagonal_right.is_empty() {
                    push *= 2.0;
                }
                next.vx += push;
            }
            2 if left.is_empty() => {
                let mut push = 0.4 + rng.gen_f32() * 0.2;
                if diagonal_left.is_empty() {
                    push *= 2.0;
                }
                next.vx -= push;
            }
            _ => {}
        }
    }

    /// Move the cell along its velocity, one cell at a time, stopping at the
    /// first occupied cell. Returns true when it ended up somewhere else.
    fn integrate<S>(space: &mut S, x: i32, y: i32, mut cell: Cell, materials: &Materials) -> bool
    where
        S: CellSpace + ?Sized,
    {
        let tx = x as f32 + cell.ox + cell.vx;
        let ty = y as f32 + cell.oy + cell.vy;
        let tx_floor = tx.floor() as i32;
        let ty_floor = ty.floor() as i32;

        if tx_floor == x && ty_floor == y {
            cell.ox += cell.vx;
            cell.oy += cell.vy;
            space.write(x, y, cell, materials);
            return false;
        }

        let cur_xf = x as f32 + cell.ox;
        let cur_yf = y as f32 + cell.oy;
        let target_angle = (ty - cur_yf).atan2(tx - cur_xf);
        let x_dir = (tx_floor - x).signum();
        let y_dir = (ty_floor - y).signum();

        let (mut cur_x, mut cur_y) = (x, y);
        let mut collided = false;
        let mut steps = 0;

        while (cur_x != tx_floor || cur_y != ty_floor) && steps < MAX_WALK_STEPS {
            steps += 1;
            let (old_x, old_y) = (cur_x, cur_y);

            let step_y = if tx_floor == cur_x {
                true
            } else if ty_floor == cur_y {
                false
            } else {
                // Take whichever step keeps closer to the original heading
                let y_angle = ((ty_floor - cur_y - y_dir) as f32).atan2((tx_floor - cur_x) as f32);
                let x_angle = ((ty_floor - cur_y) as f32).atan2((tx_floor - cur_x - x_dir) as f32);
                (x_angle - target_angle).abs() >= (y_angle - target_angle).abs()
            };

            if step_y {
                cur_y += y_dir;
            } else {
                cur_x += x_dir;
            }

            if !space.read(cur_x, cur_y).is_empty() {
                cur_x = old_x;
                cur_y = old_y;
                if step_y {
                    cell.vy = 0.0;
                } else {
                    cell.vx = 0.0;
                }
                cell.ox = 0.5;
                cell.oy = 0.5;
                collided = true;
                break;
            }
        }

        if !collided {
            cell.ox = wrap_offset(tx);
            cell.oy = wrap_offset(ty);
        }

        if cur_x == x && cur_y == y {
            space.write(x, y, cell, materials);
            return false;
        }

        space.write(x, y, Cell::EMPTY, materials);
        space.write(cur_x, cur_y, cell, materials);
        true
    }

    /// Density-driven exchanges for a cell that stayed in place
    #[allow(clippy::too_many_arguments)]
    fn density_swaps<S, R>(
        space: &mut S,
        x: i32,
        y: i32,
        def: &MaterialDef,
        down: Cell,
        right: Cell,
        materials: &Materials,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) where
        S: CellSpace + ?Sized,
        R: WorldRng + ?Sized,
    {
        if !down.is_empty() {
            let below = materials.get(down.material);
            let fluid = below.liquid || def.liquid || below.gas || def.gas;
            if !below.is_static && below.density <= def.density && fluid {
                if rng.gen_f32() > below.density / def.density {
                    Self::swap(space, (x, y), (x, y + 1), materials, stats);
                } else if below.density == def.density && rng.gen_f32() > 0.99 {
                    // Equal densities mix slowly
                    Self::swap(space, (x, y), (x, y + 1), materials, stats);
                }
            }
        }

        if !right.is_empty() {
            let beside = materials.get(right.material);
            if !beside.is_static && (beside.liquid || def.liquid) {
                // Solids floating on liquids jitter more so the liquid can flow past
                let floating = (beside.density < def.density && def.liquid)
                    || (def.density < beside.density && beside.liquid);
                let threshold = if floating { 0.7 } else { 0.99 };
                if rng.gen_f32() > threshold {
                    Self::swap(space, (x, y), (x + 1, y), materials, stats);
                }
            }
        }

        if def.gas && rng.gen_f32() > 0.7 {
            let dir = rng.gen_index(GAS_DIRS.len());
            let (dx, dy) = GAS_DIRS[dir];
            let target = space.read(x + dx, y + dy);
            if target.is_empty() {
                Self::swap(space, (x, y), (x + dx, y + dy), materials, stats);
                return;
            }

            let other = materials.get(target.material);
            let (mut top, mut bottom) = (def.density, other.density);
            let mut horizontal = dir == 0 || dir == 2;
            if dir == 3 {
                std::mem::swap(&mut top, &mut bottom);
            }
            if rng.gen_f32() > 0.5 {
                horizontal = true;
            }
            let density_ok = other.gas && (horizontal || top >= bottom);
            if !other.is_static && (!other.gas || density_ok) {
                Self::swap(space, (x, y), (x + dx, y + dy), materials, stats);
            }
        }
    }

    /// Exchange two cells. Boundary positions never take part.
    fn swap<S>(
        space: &mut S,
        a: (i32, i32),
        b: (i32, i32),
        materials: &Materials,
        stats: &mut dyn SimStats,
    ) where
        S: CellSpace + ?Sized,
    {
        let first = space.read(a.0, a.1);
        let second = space.read(b.0, b.1);
        if first.material == MaterialId::BOUNDARY || second.material == MaterialId::BOUNDARY {
            return;
        }
        space.write(a.0, a.1, second, materials);
        space.write(b.0, b.1, first, materials);
        stats.record_swap();
    }
}
