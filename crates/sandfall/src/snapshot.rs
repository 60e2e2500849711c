//! PNG snapshots of a world window

use anyhow::{Context, Result};
use glam::{IVec2, Vec2};
use image::{ImageBuffer, Rgba};
use sandfall_core::physics::PhysicsEngine;
use sandfall_core::world::World;
use std::path::Path;

/// RGBA pixels of the window with free bodies drawn over the grid
pub fn render<P: PhysicsEngine>(world: &World<P>, min_cell: IVec2, width: usize, height: usize) -> Vec<u8> {
    let mut rgba = world.window_rgba(min_cell, width, height);

    for body in world.free_body_render_data() {
        let rotation = Vec2::from_angle(body.rotation);
        for y in 0..body.height {
            for x in 0..body.width {
                let src = (y * body.width + x) * 4;
                let color = &body.rgba[src..src + 4];
                if color[3] == 0 {
                    continue;
                }
                let local = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let pixel = (rotation.rotate(local) + body.position).floor().as_ivec2() - min_cell;
                if pixel.x < 0 || pixel.y < 0 || pixel.x as usize >= width || pixel.y as usize >= height {
                    continue;
                }
                let dst = (pixel.y as usize * width + pixel.x as usize) * 4;
                rgba[dst..dst + 4].copy_from_slice(color);
            }
        }
    }

    rgba
}

/// Save a window of the world as PNG
pub fn save_png<P: PhysicsEngine>(
    world: &World<P>,
    min_cell: IVec2,
    width: usize,
    height: usize,
    path: impl AsRef<Path>,
) -> Result<()> {
    let buffer = render(world, min_cell, width, height);
    let img: ImageBuffer<Rgba<u8>, _> = ImageBuffer::from_raw(width as u32, height as u32, buffer)
        .ok_or_else(|| anyhow::anyhow!("Failed to create image buffer"))?;

    img.save(path.as_ref())
        .with_context(|| format!("Failed to write snapshot {:?}", path.as_ref()))?;
    log::info!("Snapshot saved to {:?}", path.as_ref());
    Ok(())
}
