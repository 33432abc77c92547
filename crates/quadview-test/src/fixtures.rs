//! Test fixtures: generated textures, shader stand-ins and a window.

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgba};
use quadview_core::MemoryAssetSource;
use quadview_gpu::NativeWindow;
use quadview_render::config::DEFAULT_TEXTURE;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle};

use crate::Result;

/// Texel at `(x, y)` of the generated checkerboard.
pub fn checker_texel(x: u32, y: u32) -> [u8; 4] {
    if (x + y) % 2 == 0 {
        [255, 255, 255, 255]
    } else {
        [x as u8, y as u8, 0x80, 255]
    }
}

/// A PNG-encoded checkerboard of the given size.
pub fn checker_png(width: u32, height: u32) -> Result<Vec<u8>> {
    let image = ImageBuffer::from_fn(width, height, |x, y| Rgba(checker_texel(x, y)));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Smallest well-formed SPIR-V module header.
pub fn spirv_stub() -> Vec<u8> {
    [0x0723_0203_u32, 0x0001_0000, 0, 1, 0]
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect()
}

/// Assets for a renderer with default asset names: a checkerboard texture and both
/// shader stages.
pub fn assets(texture_width: u32, texture_height: u32) -> Result<MemoryAssetSource> {
    Ok(MemoryAssetSource::new()
        .with(DEFAULT_TEXTURE, checker_png(texture_width, texture_height)?)
        .with(quadview_shaders::VERTEX_SHADER, spirv_stub())
        .with(quadview_shaders::FRAGMENT_SHADER, spirv_stub()))
}

/// A window handle the mock provider accepts.
pub fn window() -> NativeWindow {
    NativeWindow::new(
        RawDisplayHandle::Web(WebDisplayHandle::new()),
        RawWindowHandle::Web(WebWindowHandle::new(1)),
    )
}
