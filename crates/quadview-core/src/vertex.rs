//! Quad vertex layout and geometry.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// One interleaved quad vertex: position followed by texture coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl QuadVertex {
    /// Size of one vertex in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
    /// Byte offset of the texture coordinates.
    pub const UV_OFFSET: u32 = std::mem::size_of::<Vec3>() as u32;

    const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: Vec3::new(x, y, 0.0),
            uv: Vec2::new(u, v),
        }
    }
}

/// Number of vertices in the quad triangle strip.
pub const QUAD_VERTEX_COUNT: u32 = 4;

/// Build the triangle-strip quad for a surface of `surface` pixels showing a texture of
/// `texture` pixels, letterboxed so the texture keeps its aspect ratio.
///
/// Order is left-top, left-bottom, right-top, right-bottom.
pub fn quad_vertices(surface: (u32, u32), texture: (u32, u32)) -> [QuadVertex; 4] {
    let half = aspect_half_extent(surface, texture);
    [
        QuadVertex::new(-half.x, -half.y, 0.0, 0.0),
        QuadVertex::new(-half.x, half.y, 0.0, 1.0),
        QuadVertex::new(half.x, -half.y, 1.0, 0.0),
        QuadVertex::new(half.x, half.y, 1.0, 1.0),
    ]
}

/// Half extent of the quad in normalized device coordinates.
fn aspect_half_extent(surface: (u32, u32), texture: (u32, u32)) -> Vec2 {
    if surface.0 == 0 || surface.1 == 0 || texture.0 == 0 || texture.1 == 0 {
        return Vec2::ONE;
    }
    let scale = Vec2::new(surface.0 as f32, surface.1 as f32)
        / Vec2::new(texture.0 as f32, texture.1 as f32);
    Vec2::splat(scale.min_element()) / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn layout_matches_vertex_input() {
        assert_eq!(QuadVertex::STRIDE, 20);
        assert_eq!(QuadVertex::UV_OFFSET, 12);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&quad_vertices((4, 4), (4, 4))).len(), 80);
    }

    #[test]
    fn square_texture_on_square_surface_fills_screen() {
        let quad = quad_vertices((512, 512), (64, 64));
        assert_eq!(quad[0].position, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(quad[3].position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(quad[1].uv, Vec2::new(0.0, 1.0));
        assert_eq!(quad[2].uv, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn wide_surface_letterboxes_horizontally() {
        let quad = quad_vertices((1280, 720), (256, 256));
        assert_relative_eq!(quad[3].position.x, 720.0 / 1280.0);
        assert_relative_eq!(quad[3].position.y, 1.0);
    }

    #[test]
    fn tall_surface_letterboxes_vertically() {
        let quad = quad_vertices((1080, 2340), (512, 256));
        // scale_w = 2.109, scale_h = 9.14 -> x spans fully, y shrinks.
        assert_relative_eq!(quad[3].position.x, 1.0);
        assert_relative_eq!(
            quad[3].position.y,
            (1080.0 / 512.0) / (2340.0 / 256.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn degenerate_sizes_fall_back_to_full_screen() {
        let quad = quad_vertices((0, 720), (256, 256));
        assert_eq!(quad[3].position, Vec3::new(1.0, 1.0, 0.0));
    }
}
