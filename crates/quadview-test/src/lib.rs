//! Test harness for the quadview renderer.
//!
//! Drives the renderer against a recording mock of the Vulkan provider, so the
//! initialization, upload, frame and teardown paths can be checked without a GPU.

pub mod fixtures;
pub mod mock;

#[cfg(test)]
mod scenarios;

pub use mock::{MockConfig, MockEvent, MockGpu};

use quadview_render::{Renderer, RendererConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("GPU error: {0}")]
    Gpu(#[from] quadview_gpu::GpuError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Create a renderer on `gpu` and initialize it for the fixture window with a
/// checkerboard texture of `texture` pixels.
pub fn ready_renderer(
    gpu: &MockGpu,
    config: RendererConfig,
    window_size: (u32, u32),
    texture: (u32, u32),
) -> Result<Renderer> {
    let assets = fixtures::assets(texture.0, texture.1)?;
    let mut renderer = Renderer::new(gpu.loader(), config);
    renderer.initialize(&fixtures::window(), window_size, &assets)?;
    Ok(renderer)
}
