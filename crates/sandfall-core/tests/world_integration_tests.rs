//! Integration tests for the world tick pipeline
//!
//! These drive a full `World` (chunks, stepper, rapier physics) through its
//! public API only.

use glam::IVec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use sandfall_core::world::{Band, LayeredGenerator, NoopStats, TickStats, World};
use sandfall_core::{CHUNK_AREA, Cell, MaterialId, MaterialRegistry, PhysicsEngine, SimulationConfig};
use std::sync::Arc;

fn new_world() -> World {
    let registry = Arc::new(MaterialRegistry::builtin().unwrap());
    World::new(registry, SimulationConfig::default())
}

/// Empty chunks over the inclusive rectangle, all inside the interest window
fn open_world(min: IVec2, max: IVec2) -> World {
    let mut world = new_world();
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            world
                .insert_chunk(IVec2::new(x, y), vec![Cell::EMPTY; CHUNK_AREA])
                .unwrap();
        }
    }
    world.set_interest(min, max);
    world
}

fn id(world: &World, name: &str) -> u16 {
    world.registry().id_of(name).unwrap()
}

fn count_in_chunks(world: &World, material: u16) -> usize {
    world
        .chunk_manager()
        .chunks
        .values()
        .map(|chunk| {
            chunk
                .grid
                .cells()
                .iter()
                .filter(|c| c.material == material)
                .count()
        })
        .sum()
}

fn run(world: &mut World, ticks: usize, seed: u64) -> TickStats {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let mut stats = TickStats::default();
    for _ in 0..ticks {
        world.tick(&mut rng, &mut stats);
    }
    stats
}

// ============================================================================
// Boundary and interest
// ============================================================================

#[test]
fn test_unloaded_space_reads_as_boundary() {
    let world = open_world(IVec2::ZERO, IVec2::ZERO);
    assert_eq!(world.read_cell(-1, 0), Cell::BOUNDARY);
    assert_eq!(world.read_cell(0, 64), Cell::BOUNDARY);
    assert_eq!(world.get_cell(-1, 0), None);
    assert_eq!(world.get_cell(0, 0), Some(Cell::EMPTY));
}

#[test]
fn test_sand_rests_on_world_edge() {
    let mut world = open_world(IVec2::ZERO, IVec2::ZERO);
    let sand = id(&world, "sand");
    world.set_material(5, 0, sand).unwrap();

    run(&mut world, 60, 1);

    assert_eq!(world.get_cell(5, 63).map(|c| c.material), Some(sand));
    assert_eq!(count_in_chunks(&world, sand), 1);
}

#[test]
fn test_leaving_interest_window_freezes_chunk() {
    let mut world = open_world(IVec2::ZERO, IVec2::ZERO);
    world
        .insert_chunk(IVec2::new(1, 0), vec![Cell::EMPTY; CHUNK_AREA])
        .unwrap();
    let stone = id(&world, "stone");
    let sand = id(&world, "sand");
    for x in 0..64 {
        world.set_material(x, 63, stone).unwrap();
    }

    run(&mut world, 1, 2);
    assert!(world.chunk(IVec2::ZERO).unwrap().grid.body().is_some());
    assert_eq!(world.physics().body_count(), 1);

    // Move the window to the neighbour
    world.set_interest(IVec2::new(1, 0), IVec2::new(1, 0));
    world.set_material(20, 10, sand).unwrap();
    run(&mut world, 20, 3);

    let chunk = world.chunk(IVec2::ZERO).unwrap();
    assert!(!chunk.active);
    assert!(chunk.grid.body().is_none());
    assert!(chunk.grid.needs_rebuild());
    assert_eq!(world.physics().body_count(), 0);
    assert_eq!(world.read_cell(20, 10), Cell::BOUNDARY);
    assert_eq!(
        world.get_cell(20, 10).map(|c| c.material),
        Some(sand),
        "inactive chunks are not stepped"
    );
}

// ============================================================================
// Motion
// ============================================================================

#[test]
fn test_falling_liquid_speed_clamps_at_five() {
    let mut world = open_world(IVec2::ZERO, IVec2::new(0, 2));
    let water = id(&world, "water");
    world.set_material(30, 0, water).unwrap();

    let mut rng = Xoshiro256StarStar::seed_from_u64(4);
    let mut max_vy: f32 = 0.0;
    for _ in 0..20 {
        world.tick(&mut rng, &mut NoopStats);
        for y in 0..192 {
            if let Some(cell) = world.get_cell(30, y)
                && cell.material == water
            {
                max_vy = max_vy.max(cell.vy);
            }
        }
    }

    assert_eq!(max_vy, 5.0);
    assert_eq!(count_in_chunks(&world, water), 1);
}

#[test]
fn test_fast_sand_never_tunnels_through_chunk_border() {
    let mut world = open_world(IVec2::ZERO, IVec2::new(0, 1));
    let stone = id(&world, "stone");
    let sand = id(&world, "sand");
    for x in 0..64 {
        world.set_material(x, 64, stone).unwrap();
    }
    world.set_material(10, 0, sand).unwrap();

    run(&mut world, 80, 5);

    assert_eq!(world.get_cell(10, 63).map(|c| c.material), Some(sand));
    for y in 65..128 {
        assert!(world.get_cell(10, y).unwrap().is_empty(), "nothing below the stone row");
    }
}

#[test]
fn test_mixed_materials_are_conserved_in_closed_box() {
    let mut world = open_world(IVec2::ZERO, IVec2::ZERO);
    let stone = id(&world, "stone");
    let sand = id(&world, "sand");
    let water = id(&world, "water");

    for i in 10..=40 {
        world.set_material(i, 10, stone).unwrap();
        world.set_material(i, 40, stone).unwrap();
        world.set_material(10, i, stone).unwrap();
        world.set_material(40, i, stone).unwrap();
    }
    for y in 12..20 {
        for x in 12..39 {
            let material = if (x + y) % 2 == 0 { sand } else { water };
            world.set_material(x, y, material).unwrap();
        }
    }
    let sand_before = count_in_chunks(&world, sand);
    let water_before = count_in_chunks(&world, water);
    let stone_before = count_in_chunks(&world, stone);

    let stats = run(&mut world, 200, 6);

    assert_eq!(count_in_chunks(&world, sand), sand_before);
    assert_eq!(count_in_chunks(&world, water), water_before);
    assert_eq!(count_in_chunks(&world, stone), stone_before);
    assert!(stats.cells_moved > 0);
    // Sand is denser than water, so the bottom row ends up sand
    let bottom_sand = (11..40)
        .filter(|&x| world.get_cell(x, 39).unwrap().material == sand)
        .count();
    assert!(bottom_sand > 14, "only {bottom_sand} sand cells on the floor");
}

#[test]
fn test_reaction_crosses_chunk_border() {
    let mut world = open_world(IVec2::ZERO, IVec2::new(1, 0));
    let stone = id(&world, "stone");
    let water = id(&world, "water");
    let lava = id(&world, "lava");
    let steam = id(&world, "steam");
    let hotrock = id(&world, "hotrock");

    // Water and lava side by side in a stone cup straddling x = 64
    for x in 61..=66 {
        world.set_material(x, 31, stone).unwrap();
    }
    world.set_material(62, 30, stone).unwrap();
    world.set_material(65, 30, stone).unwrap();
    world.set_material(63, 30, water).unwrap();
    world.set_material(64, 30, lava).unwrap();

    run(&mut world, 1, 7);

    // The left chunk is stepped first, so the water reacts with its neighbour
    assert_eq!(world.get_cell(63, 30).unwrap().material, steam);
    assert_eq!(world.get_cell(64, 30).unwrap().material, hotrock);
}

// ============================================================================
// Population
// ============================================================================

#[test]
fn test_populate_fills_missing_chunks_once() {
    let mut world = new_world();
    let stone = id(&world, "stone");
    let generator = LayeredGenerator::new(vec![Band {
        top: 40,
        material: stone,
    }]);

    let inserted = world
        .populate(&generator, IVec2::new(-1, 0), IVec2::new(1, 1))
        .unwrap();
    assert_eq!(inserted, 6);
    assert_eq!(
        world.populate(&generator, IVec2::new(-1, 0), IVec2::new(1, 1)).unwrap(),
        0
    );

    assert_eq!(world.get_cell(-30, 39).unwrap().material, MaterialId::AIR);
    assert_eq!(world.get_cell(-30, 40).unwrap().material, stone);
    assert_eq!(world.get_cell(100, 127).unwrap().material, stone);
}

#[test]
fn test_populated_terrain_registers_collision_per_chunk() {
    let mut world = new_world();
    let stone = id(&world, "stone");
    let generator = LayeredGenerator::new(vec![Band {
        top: 40,
        material: stone,
    }]);
    world
        .populate(&generator, IVec2::new(0, 0), IVec2::new(1, 1))
        .unwrap();
    world.set_interest(IVec2::new(0, 0), IVec2::new(1, 1));

    run(&mut world, 1, 8);

    assert_eq!(world.physics().body_count(), 4);
    let rgba = world.window_rgba(IVec2::new(0, 39), 1, 2);
    assert_eq!(&rgba[..4], &[0, 0, 0, 0]);
    assert_eq!(&rgba[4..], &world.registry().get(stone).color);
}
