//! Demo scenes

use glam::IVec2;
use sandfall_core::world::{Band, ChunkSource, LayeredGenerator, World};
use sandfall_core::{CHUNK_SIZE, RegistryError, WorldError};

/// A scene definition with metadata and builder function
pub struct SceneDef {
    pub name: &'static str,
    pub description: &'static str,
    /// Inclusive chunk rectangle that is loaded and simulated
    pub min_chunk: IVec2,
    pub max_chunk: IVec2,
    pub build: fn(&mut World) -> Result<(), WorldError>,
}

impl SceneDef {
    /// World cell of the top-left corner of the scene
    pub fn min_cell(&self) -> IVec2 {
        self.min_chunk * CHUNK_SIZE as i32
    }

    /// Scene size in cells
    pub fn size(&self) -> (usize, usize) {
        let chunks = self.max_chunk - self.min_chunk + IVec2::ONE;
        (
            chunks.x as usize * CHUNK_SIZE,
            chunks.y as usize * CHUNK_SIZE,
        )
    }

    /// Load the chunks, build the content and start simulating it
    pub fn load(&self, world: &mut World) -> Result<(), WorldError> {
        let generator = LayeredGenerator::default();
        world.populate(&generator, self.min_chunk, self.max_chunk)?;
        (self.build)(world)?;
        world.set_interest(self.min_chunk, self.max_chunk);
        log::info!("Scene '{}' loaded: {}", self.name, self.description);
        Ok(())
    }
}

pub fn scenes() -> Vec<SceneDef> {
    vec![
        SceneDef {
            name: "sandbox",
            description: "Sand pile and water pool on stone ground",
            min_chunk: IVec2::new(-1, 0),
            max_chunk: IVec2::new(1, 1),
            build: build_sandbox,
        },
        SceneDef {
            name: "collapse",
            description: "Wooden bridge loses a pillar and falls as a rigid body",
            min_chunk: IVec2::new(-1, 0),
            max_chunk: IVec2::new(1, 1),
            build: build_collapse,
        },
        SceneDef {
            name: "reactions",
            description: "Lava meets water inside a stone basin",
            min_chunk: IVec2::new(0, 0),
            max_chunk: IVec2::new(1, 1),
            build: build_reactions,
        },
        SceneDef {
            name: "strata",
            description: "Layered terrain with a sand rain",
            min_chunk: IVec2::new(-2, 0),
            max_chunk: IVec2::new(1, 1),
            build: build_strata,
        },
    ]
}

pub fn find(name: &str) -> Option<SceneDef> {
    scenes().into_iter().find(|scene| scene.name == name)
}

/// List all available scenes
pub fn list_scenes() {
    println!("Available scenes:");
    println!();
    for scene in scenes() {
        println!("  {:<10} {}", scene.name, scene.description);
    }
}

fn material(world: &World, name: &str) -> Result<u16, WorldError> {
    world.registry().id_of(name).ok_or_else(|| {
        WorldError::Registry(RegistryError::UnknownMaterial {
            name: name.to_string(),
            context: "scene".to_string(),
        })
    })
}

fn fill_rect(world: &mut World, min: IVec2, max: IVec2, id: u16) -> Result<(), WorldError> {
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            world.set_material(x, y, id)?;
        }
    }
    Ok(())
}

/// Stone ground with a sand pyramid on the left and a water pool on the right
fn build_sandbox(world: &mut World) -> Result<(), WorldError> {
    let stone = material(world, "stone")?;
    let sand = material(world, "sand")?;
    let water = material(world, "water")?;

    fill_rect(world, IVec2::new(-64, 112), IVec2::new(127, 127), stone)?;
    for row in 0..32 {
        let half = 32 - row;
        fill_rect(
            world,
            IVec2::new(-40 - half / 2, 40 + row),
            IVec2::new(-40 + half / 2, 40 + row),
            sand,
        )?;
    }
    fill_rect(world, IVec2::new(70, 60), IVec2::new(120, 90), water)
}

/// Wooden deck on two rock pillars. The left pillar is knocked out and the
/// right one cut below the deck, so the deck detaches on the first tick.
fn build_collapse(world: &mut World) -> Result<(), WorldError> {
    let stone = material(world, "stone")?;
    let rock = material(world, "rock")?;
    let wood = material(world, "wood")?;

    fill_rect(world, IVec2::new(-64, 120), IVec2::new(127, 127), stone)?;
    fill_rect(world, IVec2::new(-30, 70), IVec2::new(-24, 119), rock)?;
    fill_rect(world, IVec2::new(60, 70), IVec2::new(66, 119), rock)?;
    fill_rect(world, IVec2::new(-30, 62), IVec2::new(66, 69), wood)?;
    fill_rect(world, IVec2::new(-30, 70), IVec2::new(-24, 119), 0)?;
    fill_rect(world, IVec2::new(60, 70), IVec2::new(66, 72), 0)?;
    Ok(())
}

/// Water poured next to a lava pool
fn build_reactions(world: &mut World) -> Result<(), WorldError> {
    let stone = material(world, "stone")?;
    let lava = material(world, "lava")?;
    let water = material(world, "water")?;

    fill_rect(world, IVec2::new(10, 100), IVec2::new(117, 110), stone)?;
    fill_rect(world, IVec2::new(10, 60), IVec2::new(14, 99), stone)?;
    fill_rect(world, IVec2::new(113, 60), IVec2::new(117, 99), stone)?;
    fill_rect(world, IVec2::new(15, 85), IVec2::new(60, 99), lava)?;
    fill_rect(world, IVec2::new(70, 40), IVec2::new(110, 60), water)
}

/// Horizontal bands of terrain with sand raining on top
fn build_strata(world: &mut World) -> Result<(), WorldError> {
    let sand = material(world, "sand")?;
    let bands = [
        (90, material(world, "dirt")?),
        (100, material(world, "stone")?),
        (118, material(world, "rock")?),
    ];
    let generator = LayeredGenerator::new(
        bands
            .iter()
            .map(|&(top, material)| Band { top, material })
            .collect(),
    );
    for y in 0..2 {
        for x in -2..2 {
            let pos = IVec2::new(x, y);
            world.insert_chunk(pos, generator.generate(pos, CHUNK_SIZE))?;
        }
    }
    for x in (-120..120).step_by(6) {
        world.set_material(x, 10 + (x.rem_euclid(18)), sand)?;
    }
    Ok(())
}
