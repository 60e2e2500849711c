//! Integration tests for detachment, free bodies and settling
//!
//! Settling is exercised with a scripted physics engine so the landing pose
//! is known exactly; one falling block also runs end to end on rapier.

use glam::{IVec2, Vec2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use sandfall_core::physics::{BodyDesc, BodyHandle, BodyKind, BodyState, ContactEvent, PhysicsEngine};
use sandfall_core::world::{TickStats, World};
use sandfall_core::{CHUNK_AREA, Cell, MaterialRegistry, SimulationConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// Physics double: dynamic bodies report a resting pose shifted by
/// `landing_offset` from where they were registered.
#[derive(Default)]
struct LandingPhysics {
    bodies: HashMap<u64, (BodyKind, Vec2)>,
    next_handle: u64,
    landing_offset: Vec2,
    steps: usize,
}

impl PhysicsEngine for LandingPhysics {
    fn register_body(&mut self, desc: &BodyDesc<'_>) -> Option<BodyHandle> {
        self.next_handle += 1;
        self.bodies
            .insert(self.next_handle, (desc.kind, desc.position));
        Some(BodyHandle(self.next_handle))
    }

    fn unregister_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle.0);
    }

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        let (kind, position) = self.bodies.get(&handle.0)?;
        let offset = match kind {
            BodyKind::Dynamic => self.landing_offset,
            BodyKind::Fixed => Vec2::ZERO,
        };
        Some(BodyState {
            position: *position + offset,
            ..Default::default()
        })
    }

    fn set_body_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle.0) {
            body.1 = position;
        }
    }

    fn step(&mut self) {
        self.steps += 1;
    }

    fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        Vec::new()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

fn registry() -> Arc<MaterialRegistry> {
    Arc::new(MaterialRegistry::builtin().unwrap())
}

fn add_empty_chunk<P: PhysicsEngine>(world: &mut World<P>) {
    world
        .insert_chunk(IVec2::ZERO, vec![Cell::EMPTY; CHUNK_AREA])
        .unwrap();
    world.set_interest(IVec2::ZERO, IVec2::ZERO);
}

fn landing_world(offset: Vec2) -> World<LandingPhysics> {
    let physics = LandingPhysics {
        landing_offset: offset,
        ..Default::default()
    };
    let mut world = World::with_physics(registry(), SimulationConfig::default(), physics);
    add_empty_chunk(&mut world);
    world
}

fn rapier_world() -> World {
    let mut world = World::new(registry(), SimulationConfig::default());
    add_empty_chunk(&mut world);
    world
}

fn id<P: PhysicsEngine>(world: &World<P>, name: &str) -> u16 {
    world.registry().id_of(name).unwrap()
}

fn fill<P: PhysicsEngine>(world: &mut World<P>, min: IVec2, max: IVec2, material: u16) {
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            world.set_material(x, y, material).unwrap();
        }
    }
}

fn material_at<P: PhysicsEngine>(world: &World<P>, x: i32, y: i32) -> u16 {
    world.get_cell(x, y).unwrap().material
}

fn count_in_chunks<P: PhysicsEngine>(world: &World<P>, material: u16) -> usize {
    world
        .chunk_manager()
        .chunks
        .values()
        .map(|chunk| chunk.grid.cells().iter().filter(|c| c.material == material).count())
        .sum()
}

// ============================================================================
// Detachment
// ============================================================================

#[test]
fn test_removing_support_detaches_block() {
    let mut world = rapier_world();
    let mut rng = Xoshiro256StarStar::seed_from_u64(1);
    let mut stats = TickStats::default();
    let wood = id(&world, "wood");
    let rock = id(&world, "rock");

    // 3x3 falling block hanging on a single anchored cell
    fill(&mut world, IVec2::new(19, 37), IVec2::new(21, 39), wood);
    world.set_material(20, 40, rock).unwrap();
    world.tick(&mut rng, &mut stats);
    assert!(world.free_bodies().is_empty(), "block is supported");
    assert_eq!(count_in_chunks(&world, wood), 9);

    world.set_material(20, 40, 0).unwrap();
    world.tick(&mut rng, &mut stats);

    assert_eq!(world.free_bodies().len(), 1);
    assert_eq!(world.free_bodies()[0].cell_count(), 9);
    for y in 37..=39 {
        for x in 19..=21 {
            assert!(world.get_cell(x, y).unwrap().is_empty());
        }
    }
    assert_eq!(stats.detachments, 1);
    assert_eq!(stats.detached_cells, 9);
}

#[test]
fn test_lone_falling_cell_detaches() {
    let mut world = rapier_world();
    let mut rng = Xoshiro256StarStar::seed_from_u64(2);
    let wood = id(&world, "wood");
    let rock = id(&world, "rock");

    world.set_material(30, 30, rock).unwrap();
    world.tick(&mut rng, &mut TickStats::default());
    assert!(world.free_bodies().is_empty());

    // Anchored cell turned into falling material with no static neighbour
    world.set_material(30, 30, wood).unwrap();
    world.tick(&mut rng, &mut TickStats::default());

    assert_eq!(world.free_bodies().len(), 1);
    assert_eq!(world.free_bodies()[0].cell_count(), 1);
    assert!(world.get_cell(30, 30).unwrap().is_empty());
}

#[test]
fn test_falling_center_of_anchored_block_stays() {
    let mut world = rapier_world();
    let mut rng = Xoshiro256StarStar::seed_from_u64(3);
    let wood = id(&world, "wood");
    let rock = id(&world, "rock");

    fill(&mut world, IVec2::new(29, 29), IVec2::new(31, 31), rock);
    world.tick(&mut rng, &mut TickStats::default());

    world.set_material(30, 30, wood).unwrap();
    world.tick(&mut rng, &mut TickStats::default());

    assert!(world.free_bodies().is_empty());
    assert_eq!(material_at(&world, 30, 30), wood);
}

#[test]
fn test_block_on_chunk_edge_is_anchored() {
    let mut world = rapier_world();
    let mut rng = Xoshiro256StarStar::seed_from_u64(4);
    let wood = id(&world, "wood");

    // Bottom row touches unloaded space, which reads as anchored boundary
    fill(&mut world, IVec2::new(5, 61), IVec2::new(7, 63), wood);
    world.tick(&mut rng, &mut TickStats::default());

    assert!(world.free_bodies().is_empty());
    assert_eq!(count_in_chunks(&world, wood), 9);
}

// ============================================================================
// Settling
// ============================================================================

#[test]
fn test_free_body_settles_after_still_ticks() {
    // Lands so the block's bottom row rests on the rock floor at y = 30
    let mut world = landing_world(Vec2::new(0.0, 17.0));
    let mut rng = Xoshiro256StarStar::seed_from_u64(5);
    let mut stats = TickStats::default();
    let wood = id(&world, "wood");
    let rock = id(&world, "rock");

    fill(&mut world, IVec2::new(0, 30), IVec2::new(63, 30), rock);
    fill(&mut world, IVec2::new(10, 10), IVec2::new(12, 12), wood);

    world.tick(&mut rng, &mut stats);
    assert_eq!(world.free_bodies().len(), 1);
    assert_eq!(count_in_chunks(&world, wood), 0);

    // Still on every poll, but stamping waits for the full streak
    for _ in 0..9 {
        world.tick(&mut rng, &mut stats);
    }
    assert_eq!(world.free_bodies().len(), 1);
    assert_eq!(stats.settles, 0);
    assert_eq!(world.physics().steps, 10);

    world.tick(&mut rng, &mut stats);
    assert!(world.free_bodies().is_empty());
    assert_eq!(stats.settles, 1);
    for y in 27..=29 {
        for x in 10..=12 {
            let cell = world.get_cell(x, y).unwrap();
            assert_eq!(cell.material, wood);
            assert_eq!((cell.vx, cell.vy, cell.ox, cell.oy), (0.0, 0.0, 0.5, 0.5));
        }
    }
    assert!(world.get_cell(11, 11).unwrap().is_empty());

    // Stamped block rests on the anchored floor and stays put
    for _ in 0..5 {
        world.tick(&mut rng, &mut stats);
    }
    assert!(world.free_bodies().is_empty());
    assert_eq!(count_in_chunks(&world, wood), 9);
    assert_eq!(stats.detachments, 1);
}

#[test]
fn test_stamping_skips_anchored_destinations() {
    // Middle row of the block lands inside the rock floor
    let mut world = landing_world(Vec2::new(0.0, 19.0));
    let mut rng = Xoshiro256StarStar::seed_from_u64(6);
    let wood = id(&world, "wood");
    let rock = id(&world, "rock");

    fill(&mut world, IVec2::new(0, 30), IVec2::new(63, 30), rock);
    fill(&mut world, IVec2::new(10, 10), IVec2::new(12, 12), wood);

    for _ in 0..12 {
        world.tick(&mut rng, &mut TickStats::default());
    }

    assert!(world.free_bodies().is_empty());
    for x in 10..=12 {
        assert_eq!(material_at(&world, x, 29), wood);
        assert_eq!(material_at(&world, x, 30), rock);
        assert_eq!(material_at(&world, x, 31), wood);
    }
    assert_eq!(count_in_chunks(&world, wood), 6);
    assert_eq!(count_in_chunks(&world, rock), 64);
}

#[test]
fn test_move_free_body_changes_landing() {
    let mut world = landing_world(Vec2::ZERO);
    let mut rng = Xoshiro256StarStar::seed_from_u64(7);
    let wood = id(&world, "wood");
    let rock = id(&world, "rock");

    fill(&mut world, IVec2::new(0, 50), IVec2::new(63, 50), rock);
    world.set_material(20, 20, wood).unwrap();
    world.tick(&mut rng, &mut TickStats::default());

    let body = &world.free_bodies()[0];
    let (body_id, origin) = (body.id, body.origin);
    // Single cell body: grid origin sits one cell up and left of the cell
    assert_eq!(origin, IVec2::new(19, 19));
    assert!(world.move_free_body(body_id, Vec2::new(39.0, 48.0)));

    for _ in 0..11 {
        world.tick(&mut rng, &mut TickStats::default());
    }

    assert!(world.free_bodies().is_empty());
    assert!(world.get_cell(20, 20).unwrap().is_empty());
    assert_eq!(material_at(&world, 40, 49), wood);
}

#[test]
fn test_free_body_render_data_uses_body_pose() {
    let mut world = landing_world(Vec2::new(3.0, 4.0));
    let mut rng = Xoshiro256StarStar::seed_from_u64(8);
    let wood = id(&world, "wood");

    fill(&mut world, IVec2::new(10, 10), IVec2::new(11, 10), wood);
    world.tick(&mut rng, &mut TickStats::default());

    let render = world.free_body_render_data();
    assert_eq!(render.len(), 1);
    let data = &render[0];
    assert_eq!((data.width, data.height), (4, 3));
    assert_eq!(data.rgba.len(), 4 * 3 * 4);
    assert_eq!(data.position, Vec2::new(12.0, 13.0));
    // Cell (1, 1) of the body grid holds wood
    let offset = (4 + 1) * 4;
    assert_eq!(&data.rgba[offset..offset + 4], &world.registry().get(wood).color);
}

// ============================================================================
// Rigid-body run
// ============================================================================

#[test]
fn test_falling_block_settles_without_phantom_solids() {
    let mut world = rapier_world();
    let mut rng = Xoshiro256StarStar::seed_from_u64(9);
    let mut stats = TickStats::default();
    let wood = id(&world, "wood");
    let rock = id(&world, "rock");

    fill(&mut world, IVec2::new(0, 50), IVec2::new(63, 50), rock);
    fill(&mut world, IVec2::new(30, 20), IVec2::new(33, 23), wood);

    for _ in 0..400 {
        world.tick(&mut rng, &mut stats);
        let in_bodies: usize = world.free_bodies().iter().map(|b| b.cell_count()).sum();
        let total = count_in_chunks(&world, wood) + in_bodies;
        assert!(total <= 16, "{total} wood cells exist, only 16 were placed");
        if stats.settles == 0 {
            assert_eq!(total, 16);
        }
        assert_eq!(count_in_chunks(&world, rock), 64);
    }

    assert!(stats.detachments >= 1);
    for y in 20..=23 {
        for x in 30..=33 {
            assert!(world.get_cell(x, y).unwrap().is_empty());
        }
    }

    // The block came to rest on the rock row and was stamped back whole
    assert!(stats.settles >= 1);
    assert!(world.free_bodies().is_empty());
    assert_eq!(count_in_chunks(&world, wood), 16);
    let mut bottom_row = 0;
    for y in 0..64 {
        for x in 0..64 {
            if material_at(&world, x, y) == wood {
                assert!((46..=49).contains(&y), "wood left at ({x}, {y})");
                if y == 49 {
                    bottom_row += 1;
                }
            }
        }
    }
    assert!(bottom_row > 0, "no wood resting on the rock row");
}
