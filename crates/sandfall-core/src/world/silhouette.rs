//! Collision silhouettes traced from static cells
//!
//! A grid's static cells are outlined by walking cell corners with the solid
//! side always on the right. Outer boundaries come out with positive shoelace
//! area, holes with negative area. Each loop is then simplified before it is
//! handed to the physics engine.

use ahash::AHashSet;
use glam::{IVec2, Vec2};
use sandfall_simulation::Materials;

use super::grid::CellGrid;
use crate::physics::{BodyDesc, BodyKind, PhysicsEngine};

/// Walk directions: up, right, down, left (y grows downward)
const DIRS: [IVec2; 4] = [
    IVec2::new(0, -1),
    IVec2::new(1, 0),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
];

/// Cell on the right-hand side of an edge leaving a corner in each direction
const RIGHT_SIDE: [IVec2; 4] = [
    IVec2::new(0, -1),
    IVec2::new(0, 0),
    IVec2::new(-1, 0),
    IVec2::new(-1, -1),
];

const UP: usize = 0;

/// Silhouette tracing, simplification and body rebuild
pub struct SilhouetteBuilder;

impl SilhouetteBuilder {
    /// Trace every boundary loop of the grid's static cells.
    ///
    /// Loops are lists of cell corners, one per unit edge walked.
    pub fn trace(grid: &CellGrid, materials: &Materials) -> Vec<Vec<IVec2>> {
        let (width, height) = (grid.width() as i32, grid.height() as i32);
        let solid = |p: IVec2| {
            grid.get_local(p.x, p.y)
                .is_some_and(|cell| materials.get(cell.material).is_static)
        };
        let max_steps = 4 * (width as usize + 1) * (height as usize + 1);

        let mut traversed: AHashSet<(IVec2, usize)> = AHashSet::new();
        let mut loops = Vec::new();

        for j in 0..height {
            let mut last_solid = false;
            for i in 0..width {
                let here = solid(IVec2::new(i, j));
                // Left edge of a solid run, walked upward with the solid on the right
                let start = IVec2::new(i, j + 1);
                if here && !last_solid && !traversed.contains(&(start, UP)) {
                    let corners = Self::walk(start, &solid, &mut traversed, max_steps);
                    if corners.len() > 2 {
                        loops.push(corners);
                    }
                }
                last_solid = here;
            }
        }

        loops
    }

    fn walk(
        start: IVec2,
        solid: &impl Fn(IVec2) -> bool,
        traversed: &mut AHashSet<(IVec2, usize)>,
        max_steps: usize,
    ) -> Vec<IVec2> {
        let mut corners = Vec::new();
        let mut pos = start;
        let mut dir = UP;

        loop {
            corners.push(pos);
            traversed.insert((pos, dir));
            pos += DIRS[dir];

            let Some(next) = Self::next_direction(pos, dir, solid) else {
                break;
            };
            if pos == start && next == UP {
                break;
            }
            if corners.len() > max_steps {
                log::warn!("Silhouette walk from {start} did not close after {max_steps} steps");
                break;
            }
            dir = next;
        }

        corners
    }

    /// Next edge to follow from `pos` after arriving in direction `dir`.
    ///
    /// Prefers turning left when the cell ahead-right is solid, otherwise
    /// goes straight and then turns clockwise.
    fn next_direction(pos: IVec2, dir: usize, solid: &impl Fn(IVec2) -> bool) -> Option<usize> {
        let left = (dir + 3) % 4;
        let candidates = if solid(pos + RIGHT_SIDE[dir]) {
            [left, dir, (dir + 1) % 4, (dir + 2) % 4]
        } else {
            [dir, (dir + 1) % 4, (dir + 2) % 4, left]
        };
        candidates
            .into_iter()
            .find(|&d| solid(pos + RIGHT_SIDE[d]))
    }

    /// Reduce a closed loop to its significant corners.
    ///
    /// Starts from the first point and the point furthest from it, then keeps
    /// splitting each segment at its most distant point while that distance
    /// exceeds `tolerance`.
    pub fn simplify(points: &[Vec2], tolerance: f32) -> Vec<Vec2> {
        let Some(&first) = points.first() else {
            return Vec::new();
        };

        let mut closed = points.to_vec();
        closed.push(first);

        let mut furthest = None;
        let mut furthest_distance = 0.0;
        for (i, p) in closed.iter().enumerate() {
            let distance = p.distance(first);
            if distance > furthest_distance {
                furthest_distance = distance;
                furthest = Some(i);
            }
        }
        let Some(furthest) = furthest else {
            return points.to_vec();
        };

        let mut segments = vec![0, furthest, closed.len() - 1];
        let mut i = 0;
        while i + 1 < segments.len() {
            let (start, end) = (segments[i], segments[i + 1]);
            let mut max_distance = 0.0;
            let mut split = None;
            for j in start + 1..end {
                let distance = line_to_point(closed[start], closed[end], closed[j]);
                if distance > max_distance {
                    max_distance = distance;
                    split = Some(j);
                }
            }
            match split {
                Some(j) if max_distance > tolerance => segments.insert(i + 1, j),
                _ => i += 1,
            }
        }

        segments[..segments.len() - 1]
            .iter()
            .map(|&index| closed[index])
            .collect()
    }

    /// Signed shoelace area; positive for outer boundaries
    pub fn signed_area(points: &[Vec2]) -> f32 {
        let n = points.len();
        let twice: f32 = (0..n)
            .map(|i| {
                let (a, b) = (points[i], points[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice / 2.0
    }

    /// Traced and simplified loops with fewer than three points dropped
    pub fn build(grid: &CellGrid, materials: &Materials, tolerance: f32) -> Vec<Vec<Vec2>> {
        Self::trace(grid, materials)
            .into_iter()
            .map(|corners| {
                let points: Vec<Vec2> = corners.iter().map(|c| c.as_vec2()).collect();
                Self::simplify(&points, tolerance)
            })
            .filter(|polygon| polygon.len() >= 3)
            .collect()
    }

    /// Replace the grid's collision body with one matching its current cells.
    ///
    /// Dynamic bodies only use outer loops; one with no usable outline falls
    /// back to the bounding rectangle of its occupied cells.
    pub fn rebuild<P: PhysicsEngine>(
        grid: &mut CellGrid,
        materials: &Materials,
        physics: &mut P,
        kind: BodyKind,
        position: Vec2,
        tolerance: f32,
    ) {
        if let Some(old) = grid.body.take() {
            physics.unregister_body(old);
        }

        grid.polygons = Self::build(grid, materials, tolerance);
        grid.needs_rebuild = false;

        let colliders = match kind {
            BodyKind::Fixed => grid.polygons.clone(),
            BodyKind::Dynamic => {
                let outer: Vec<Vec<Vec2>> = grid
                    .polygons
                    .iter()
                    .filter(|p| Self::signed_area(p) > 0.0)
                    .cloned()
                    .collect();
                if outer.is_empty() {
                    Self::bounding_rect(grid).into_iter().collect()
                } else {
                    outer
                }
            }
        };

        if colliders.is_empty() {
            return;
        }

        grid.body = physics.register_body(&BodyDesc {
            kind,
            position,
            polygons: &colliders,
        });
        if grid.body.is_none() {
            log::debug!(
                "No collider could be built for {:?} body at ({:.0}, {:.0})",
                kind,
                position.x,
                position.y
            );
        }
    }

    /// Rectangle around all occupied cells, in outer-loop winding
    fn bounding_rect(grid: &CellGrid) -> Option<Vec<Vec2>> {
        let mut min = IVec2::MAX;
        let mut max = IVec2::MIN;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if !grid.get(x, y).is_empty() {
                    let p = IVec2::new(x as i32, y as i32);
                    min = min.min(p);
                    max = max.max(p);
                }
            }
        }
        if min.x > max.x {
            return None;
        }
        let (min, max) = (min.as_vec2(), (max + IVec2::ONE).as_vec2());
        Some(vec![
            Vec2::new(min.x, max.y),
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
        ])
    }
}

/// Perpendicular distance from `p` to the line through `l1` and `l2`
fn line_to_point(l1: Vec2, l2: Vec2, p: Vec2) -> f32 {
    let length = l1.distance(l2);
    if length <= f32::EPSILON {
        return p.distance(l1);
    }
    ((l2.y - l1.y) * p.x - (l2.x - l1.x) * p.y + l2.x * l1.y - l2.y * l1.x).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandfall_simulation::{Cell, MaterialRegistry};

    fn grid_with(registry: &MaterialRegistry, size: usize, material: &str, cells: &[(usize, usize)]) -> CellGrid {
        let id = registry.id_of(material).unwrap();
        let mut grid = CellGrid::new(size, size);
        for &(x, y) in cells {
            grid.set(x, y, Cell::new(id), registry.materials());
        }
        grid
    }

    fn block(x0: usize, y0: usize, w: usize, h: usize) -> Vec<(usize, usize)> {
        (y0..y0 + h)
            .flat_map(|y| (x0..x0 + w).map(move |x| (x, y)))
            .collect()
    }

    #[test]
    fn test_single_cell_loop() {
        let registry = MaterialRegistry::builtin().unwrap();
        let grid = grid_with(&registry, 4, "stone", &[(1, 1)]);
        let loops = SilhouetteBuilder::trace(&grid, registry.materials());
        assert_eq!(
            loops,
            vec![vec![
                IVec2::new(1, 2),
                IVec2::new(1, 1),
                IVec2::new(2, 1),
                IVec2::new(2, 2)
            ]]
        );
    }

    #[test]
    fn test_rectangle_simplifies_to_corners() {
        let registry = MaterialRegistry::builtin().unwrap();
        let grid = grid_with(&registry, 16, "stone", &block(2, 3, 6, 4));
        let polygons = SilhouetteBuilder::build(&grid, registry.materials(), 0.9);

        assert_eq!(polygons.len(), 1);
        let polygon = &polygons[0];
        assert_eq!(polygon.len(), 4);
        for corner in [
            Vec2::new(2.0, 3.0),
            Vec2::new(8.0, 3.0),
            Vec2::new(8.0, 7.0),
            Vec2::new(2.0, 7.0),
        ] {
            assert!(polygon.contains(&corner), "missing corner {corner}");
        }
        assert_eq!(SilhouetteBuilder::signed_area(polygon), 24.0);
    }

    #[test]
    fn test_hole_has_negative_area() {
        let registry = MaterialRegistry::builtin().unwrap();
        let mut cells = block(1, 1, 6, 6);
        cells.retain(|&(x, y)| !(3..=4).contains(&x) || !(3..=4).contains(&y));
        let grid = grid_with(&registry, 8, "stone", &cells);

        let loops = SilhouetteBuilder::trace(&grid, registry.materials());
        assert_eq!(loops.len(), 2);
        let areas: Vec<f32> = loops
            .iter()
            .map(|l| {
                let points: Vec<Vec2> = l.iter().map(|c| c.as_vec2()).collect();
                SilhouetteBuilder::signed_area(&points)
            })
            .collect();
        assert_eq!(areas, vec![36.0, -4.0]);
    }

    #[test]
    fn test_separate_islands() {
        let registry = MaterialRegistry::builtin().unwrap();
        let mut cells = block(0, 0, 2, 2);
        cells.extend(block(5, 5, 2, 2));
        let grid = grid_with(&registry, 8, "stone", &cells);
        assert_eq!(SilhouetteBuilder::trace(&grid, registry.materials()).len(), 2);
    }

    #[test]
    fn test_diagonal_cells_do_not_loop_forever() {
        let registry = MaterialRegistry::builtin().unwrap();
        let grid = grid_with(&registry, 4, "stone", &[(1, 1), (2, 2)]);
        let loops = SilhouetteBuilder::trace(&grid, registry.materials());
        let total: usize = loops.iter().map(Vec::len).sum();
        assert_eq!(total, 8, "two touching squares have eight unit edges");
    }

    #[test]
    fn test_non_static_cells_are_ignored() {
        let registry = MaterialRegistry::builtin().unwrap();
        let grid = grid_with(&registry, 8, "water", &block(0, 0, 4, 4));
        assert!(SilhouetteBuilder::trace(&grid, registry.materials()).is_empty());
    }

    #[test]
    fn test_line_to_point() {
        let d = line_to_point(Vec2::ZERO, Vec2::new(4.0, 0.0), Vec2::new(1.0, 2.0));
        assert_eq!(d, 2.0);
        assert_eq!(line_to_point(Vec2::ONE, Vec2::ONE, Vec2::new(1.0, 4.0)), 3.0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        use crate::config::PhysicsConfig;
        use crate::physics::RapierPhysics;

        let registry = MaterialRegistry::builtin().unwrap();
        let mut grid = grid_with(&registry, 16, "stone", &block(0, 10, 16, 6));
        let mut physics = RapierPhysics::new(&PhysicsConfig::default());

        SilhouetteBuilder::rebuild(&mut grid, registry.materials(), &mut physics, BodyKind::Fixed, Vec2::ZERO, 0.9);
        let first = grid.polygons().to_vec();
        SilhouetteBuilder::rebuild(&mut grid, registry.materials(), &mut physics, BodyKind::Fixed, Vec2::ZERO, 0.9);

        assert_eq!(grid.polygons(), first.as_slice());
        assert_eq!(physics.body_count(), 1);
        assert!(!grid.needs_rebuild());
    }
}
