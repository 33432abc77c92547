//! Surface management for windowed rendering.
//!
//! Binds a native window to the device context and negotiates the color format the
//! swapchain is created with.

use ash::vk;

use crate::context::DeviceContext;
use crate::error::{GpuError, Result};
use crate::loader::NativeWindow;
use crate::swapchain::select_surface_format;

/// Presentation surface with its negotiated format.
#[derive(Debug)]
pub struct PresentationSurface {
    /// The Vulkan surface handle.
    pub surface: vk::SurfaceKHR,
    /// Format and color space shared by every swapchain built on this surface.
    pub format: vk::SurfaceFormatKHR,
}

impl PresentationSurface {
    /// Create a surface for `window` and check that the graphics queue can present to it.
    pub fn create(ctx: &DeviceContext, window: &NativeWindow) -> Result<Self> {
        let instance = ctx.instance();
        let surface = instance.create_surface(window)?;

        let negotiated = (|| {
            if !instance.surface_support(ctx.physical_device(), ctx.queue_family(), surface)? {
                return Err(GpuError::PresentNotSupported(ctx.queue_family()));
            }
            let formats = instance.surface_formats(ctx.physical_device(), surface)?;
            select_surface_format(&formats)
        })();

        match negotiated {
            Ok(format) => {
                tracing::debug!(
                    "Surface created ({:?}, {:?})",
                    format.format,
                    format.color_space
                );
                Ok(Self { surface, format })
            }
            Err(e) => {
                instance.destroy_surface(surface);
                Err(e)
            }
        }
    }

    /// Query the current surface capabilities.
    pub fn capabilities(&self, ctx: &DeviceContext) -> Result<vk::SurfaceCapabilitiesKHR> {
        ctx.instance()
            .surface_capabilities(ctx.physical_device(), self.surface)
    }

    /// Destroy the surface. Every swapchain built on it must already be gone.
    pub fn destroy(&self, ctx: &DeviceContext) {
        ctx.instance().destroy_surface(self.surface);
    }
}
