//! The renderer: owns every GPU object and drives frames.

use quadview_core::vertex::QUAD_VERTEX_COUNT;
use quadview_core::AssetSource;
use quadview_gpu::error::{GpuError, Result};
use quadview_gpu::{
    DeviceContext, DeviceContextBuilder, GlobalApi, NativeWindow, PresentationSurface, Swapchain,
};

use crate::config::RendererConfig;
use crate::frame::{FrameOrchestrator, FrameOutcome, FramePass};
use crate::quad::{QuadBuffer, QuadPipeline};
use crate::texture::{Texture, TexturePath};

/// Counts describing the live GPU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererStats {
    pub extent: (u32, u32),
    pub image_count: usize,
    pub command_buffers: usize,
    pub semaphores: usize,
    pub framebuffers_created: usize,
    pub texture_path: TexturePath,
}

/// Everything created after the device context, released in reverse creation order.
struct GpuState {
    surface: Option<PresentationSurface>,
    swapchain: Option<Swapchain>,
    texture: Option<Texture>,
    quad: Option<QuadPipeline>,
    vertices: Option<QuadBuffer>,
    frames: Option<FrameOrchestrator>,
    // Dropped last.
    ctx: DeviceContext,
}

impl GpuState {
    fn new(ctx: DeviceContext) -> Self {
        Self {
            surface: None,
            swapchain: None,
            texture: None,
            quad: None,
            vertices: None,
            frames: None,
            ctx,
        }
    }

    fn populate(
        &mut self,
        config: &RendererConfig,
        window: &NativeWindow,
        size: (u32, u32),
        assets: &dyn AssetSource,
    ) -> Result<()> {
        let ctx = &self.ctx;
        let device = ctx.device();

        let surface = self.surface.insert(PresentationSurface::create(ctx, window)?);
        let swapchain = self.swapchain.insert(Swapchain::new(ctx, surface, size, None)?);
        let extent = (swapchain.extent.width, swapchain.extent.height);
        let format = swapchain.format;

        let texture = self.texture.insert(Texture::load(
            ctx,
            assets,
            &config.texture,
            config.upload_timeout_ns,
        )?);

        let vertex_spirv = assets.read(&config.vertex_shader)?;
        let fragment_spirv = assets.read(&config.fragment_shader)?;
        self.quad = Some(QuadPipeline::new(
            device,
            format,
            texture,
            &vertex_spirv,
            &fragment_spirv,
        )?);

        self.vertices = Some(QuadBuffer::new(device, extent, texture.extent())?);

        let swapchain = self
            .swapchain
            .take()
            .ok_or_else(|| GpuError::InvalidState("Swapchain missing".to_string()))?;
        self.frames = Some(FrameOrchestrator::new(ctx, swapchain)?);
        Ok(())
    }

    fn draw(&mut self, config: &RendererConfig) -> Result<FrameOutcome> {
        let (Some(quad), Some(vertices), Some(frames)) =
            (&self.quad, &self.vertices, self.frames.as_mut())
        else {
            return Err(GpuError::InvalidState("Renderer is not complete".to_string()));
        };

        let pass = FramePass {
            render_pass: quad.render_pass,
            pipeline: &quad.pipeline,
            descriptor_set: quad.descriptor_set,
            vertex_buffer: vertices.handle(),
            vertex_count: QUAD_VERTEX_COUNT,
            clear_color: config.clear_color,
        };
        frames.draw_frame(&self.ctx, &pass, config.handle_resize)
    }

    fn rebuild(&mut self, desired: (u32, u32)) -> Result<()> {
        self.ctx.wait_idle()?;

        let (Some(surface), Some(texture), Some(vertices)) =
            (&self.surface, &self.texture, &self.vertices)
        else {
            return Err(GpuError::InvalidState("Renderer is not complete".to_string()));
        };
        let frames = self
            .frames
            .take()
            .ok_or_else(|| GpuError::InvalidState("Renderer is not complete".to_string()))?;

        let frames = self.frames.insert(frames.recreate(&self.ctx, surface, desired)?);
        let extent = frames.extent();
        vertices.update(self.ctx.device(), (extent.width, extent.height), texture.extent())?;
        Ok(())
    }

    fn stats(&self) -> Option<RendererStats> {
        let frames = self.frames.as_ref()?;
        let texture = self.texture.as_ref()?;
        let extent = frames.extent();
        Some(RendererStats {
            extent: (extent.width, extent.height),
            image_count: frames.image_count(),
            command_buffers: frames.command_buffer_count(),
            semaphores: frames.semaphore_count(),
            framebuffers_created: frames.framebuffers_created(),
            texture_path: texture.path,
        })
    }

    /// Wait for the device, then destroy everything in reverse creation order.
    fn release(&mut self) {
        if let Err(e) = self.ctx.wait_idle() {
            tracing::warn!("wait_idle failed during teardown: {e}");
        }
        let device = self.ctx.device();

        if let Some(frames) = self.frames.take() {
            frames.destroy(&self.ctx);
        }
        if let Some(mut vertices) = self.vertices.take() {
            vertices.destroy(device);
        }
        if let Some(quad) = self.quad.take() {
            quad.destroy(device);
        }
        if let Some(mut texture) = self.texture.take() {
            texture.destroy(device);
        }
        if let Some(swapchain) = self.swapchain.take() {
            swapchain.destroy(&self.ctx);
        }
        if let Some(surface) = self.surface.take() {
            surface.destroy(&self.ctx);
        }
    }
}

/// Renders one textured quad per frame into a window.
///
/// The renderer is Ready only after [`Renderer::initialize`] completed every step.
/// Drawing while not Ready does nothing.
pub struct Renderer {
    config: RendererConfig,
    loader: Box<dyn GlobalApi>,
    state: Option<GpuState>,
    requested_size: (u32, u32),
}

impl Renderer {
    /// Create an uninitialized renderer that will load through `loader`.
    pub fn new(loader: Box<dyn GlobalApi>, config: RendererConfig) -> Self {
        Self {
            config,
            loader,
            state: None,
            requested_size: (0, 0),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Whether every GPU object exists and frames can be drawn.
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// Counts describing the live GPU state, if Ready.
    pub fn stats(&self) -> Option<RendererStats> {
        self.state.as_ref().and_then(GpuState::stats)
    }

    /// Create every GPU object for `window`.
    ///
    /// `size` is the window size, used when the surface does not dictate an extent. On
    /// failure everything created so far is released and the renderer stays uninitialized.
    pub fn initialize(
        &mut self,
        window: &NativeWindow,
        size: (u32, u32),
        assets: &dyn AssetSource,
    ) -> Result<()> {
        if self.state.is_some() {
            tracing::debug!("Renderer already initialized");
            return Ok(());
        }

        let ctx = DeviceContextBuilder::new()
            .app_name(self.config.app_name.clone())
            .validation(self.config.validation)
            .build(self.loader.as_ref(), window.display)?;

        let mut state = GpuState::new(ctx);
        if let Err(e) = state.populate(&self.config, window, size, assets) {
            state.release();
            return Err(e);
        }

        if let Some(stats) = state.stats() {
            tracing::info!(
                "Renderer ready: {}x{}, {} images, {:?} texture upload",
                stats.extent.0,
                stats.extent.1,
                stats.image_count,
                stats.texture_path
            );
        }
        self.requested_size = size;
        self.state = Some(state);
        Ok(())
    }

    /// Draw and present one frame. Does nothing unless Ready.
    pub fn draw_frame(&mut self) -> Result<()> {
        let Some(state) = self.state.as_mut() else {
            tracing::trace!("draw_frame skipped: renderer not ready");
            return Ok(());
        };

        match state.draw(&self.config)? {
            FrameOutcome::Presented { .. } => Ok(()),
            FrameOutcome::OutOfDate => {
                tracing::debug!("Swapchain out of date, rebuilding");
                self.rebuild(self.requested_size)
            }
        }
    }

    /// React to a new window size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.config.handle_resize {
            tracing::debug!("Resize to {width}x{height} ignored");
            return Ok(());
        }
        if width == 0 || height == 0 {
            tracing::debug!("Ignoring zero-sized resize {width}x{height}");
            return Ok(());
        }

        self.requested_size = (width, height);
        if self.state.is_none() {
            return Ok(());
        }
        self.rebuild((width, height))?;
        if let Some(stats) = self.stats() {
            tracing::info!("Resized to {}x{}", stats.extent.0, stats.extent.1);
        }
        Ok(())
    }

    /// Rebuild the swapchain. A failed rebuild leaves nothing to draw with, so the
    /// renderer is torn down and is no longer Ready.
    fn rebuild(&mut self, desired: (u32, u32)) -> Result<()> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        if let Err(e) = state.rebuild(desired) {
            tracing::error!("Swapchain rebuild failed: {e}");
            self.destroy();
            return Err(e);
        }
        Ok(())
    }

    /// Release every GPU object. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.release();
            tracing::info!("Renderer destroyed");
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.destroy();
    }
}
