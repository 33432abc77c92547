//! Swapchain management.

use ash::vk;

use crate::context::DeviceContext;
use crate::error::{GpuError, Result};
use crate::loader::DeviceApi;
use crate::surface::PresentationSurface;

/// The only color format the renderer presents with.
pub const SURFACE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Number of swapchain images requested from the surface.
pub const REQUESTED_IMAGE_COUNT: u32 = 3;

/// Swapchain wrapper.
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain on `surface`.
    ///
    /// `desired` is only used when the surface leaves the extent to the swapchain. Passing
    /// `old` retires that swapchain; the caller still destroys it afterwards.
    pub fn new(
        ctx: &DeviceContext,
        surface: &PresentationSurface,
        desired: (u32, u32),
        old: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let caps = surface.capabilities(ctx)?;
        let extent = oriented_extent(
            calculate_extent(&caps, desired.0, desired.1),
            caps.current_transform,
        );
        let image_count = requested_image_count(&caps);

        let queue_families = [ctx.queue_family()];
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(surface.format.format)
            .image_color_space(surface.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_families)
            .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .composite_alpha(select_composite_alpha(caps.supported_composite_alpha))
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(false)
            .old_swapchain(old.unwrap_or(vk::SwapchainKHR::null()));

        let device = ctx.device();
        let handle = device.create_swapchain(&create_info)?;
        let images = match device.swapchain_images(handle) {
            Ok(images) => images,
            Err(e) => {
                device.destroy_swapchain(handle);
                return Err(e);
            }
        };

        tracing::info!(
            "Swapchain created: {}x{} ({} images)",
            extent.width,
            extent.height,
            images.len()
        );

        Ok(Self {
            handle,
            images,
            format: surface.format.format,
            extent,
        })
    }

    /// Number of presentable images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire the next image, waiting as long as it takes.
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn acquire_next_image(
        &self,
        ctx: &DeviceContext,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)> {
        ctx.device()
            .acquire_next_image(self.handle, u64::MAX, semaphore)
    }

    /// Present an image once `wait_semaphore` is signaled.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn present(
        &self,
        ctx: &DeviceContext,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool> {
        ctx.device()
            .queue_present(ctx.queue(), self.handle, image_index, wait_semaphore)
    }

    /// Destroy the swapchain. Views and framebuffers of its images must already be gone.
    pub fn destroy(&self, ctx: &DeviceContext) {
        ctx.device().destroy_swapchain(self.handle);
    }
}

/// Whether an error means the swapchain no longer matches the surface.
pub fn is_out_of_date(error: &GpuError) -> bool {
    matches!(error, GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DATE_KHR))
}

/// Pick the exact renderer format from the surface formats.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| format.format == SURFACE_FORMAT)
        .copied()
        .ok_or_else(|| GpuError::FormatNotSupported(format!("{SURFACE_FORMAT:?}")))
}

/// Requested image count, kept within the surface limits.
pub fn requested_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = REQUESTED_IMAGE_COUNT.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Swap width and height when the display is rotated a quarter turn.
pub fn oriented_extent(extent: vk::Extent2D, transform: vk::SurfaceTransformFlagsKHR) -> vk::Extent2D {
    if transform.intersects(
        vk::SurfaceTransformFlagsKHR::ROTATE_90 | vk::SurfaceTransformFlagsKHR::ROTATE_270,
    ) {
        vk::Extent2D {
            width: extent.height,
            height: extent.width,
        }
    } else {
        extent
    }
}

/// INHERIT when the surface allows it, otherwise OPAQUE.
pub fn select_composite_alpha(
    supported: vk::CompositeAlphaFlagsKHR,
) -> vk::CompositeAlphaFlagsKHR {
    if supported.contains(vk::CompositeAlphaFlagsKHR::INHERIT) {
        vk::CompositeAlphaFlagsKHR::INHERIT
    } else {
        vk::CompositeAlphaFlagsKHR::OPAQUE
    }
}

/// View and framebuffer of one swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTargets {
    pub view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
}

impl SlotTargets {
    /// Create the view and framebuffer for one swapchain image.
    pub fn create(
        device: &dyn DeviceApi,
        image: vk::Image,
        format: vk::Format,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let view = device.create_image_view(&view_info)?;

        let attachments = [view];
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        match device.create_framebuffer(&framebuffer_info) {
            Ok(framebuffer) => Ok(Self { view, framebuffer }),
            Err(e) => {
                device.destroy_image_view(view);
                Err(e)
            }
        }
    }
}

/// Lazily populated per-image targets, one slot per swapchain image.
#[derive(Debug, Default)]
pub struct ImageSlots {
    slots: Vec<Option<SlotTargets>>,
}

impl ImageSlots {
    /// Create `count` empty slots.
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Targets of a slot, if created.
    pub fn get(&self, index: usize) -> Option<SlotTargets> {
        self.slots.get(index).copied().flatten()
    }

    /// Return the slot's targets, creating them on first use.
    pub fn get_or_create<F>(&mut self, index: usize, create: F) -> Result<SlotTargets>
    where
        F: FnOnce() -> Result<SlotTargets>,
    {
        let count = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            GpuError::InvalidState(format!("Image index {index} out of range ({count} slots)"))
        })?;
        if let Some(targets) = slot {
            return Ok(*targets);
        }
        let targets = create()?;
        *slot = Some(targets);
        Ok(targets)
    }

    /// Number of slots whose targets exist.
    pub fn created_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Destroy every created framebuffer and view, leaving the slots empty.
    pub fn destroy(&mut self, device: &dyn DeviceApi) {
        for targets in self.slots.iter_mut().filter_map(Option::take) {
            device.destroy_framebuffer(targets.framebuffer);
            device.destroy_image_view(targets.view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn caps(current: (u32, u32), min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    fn targets(raw: u64) -> SlotTargets {
        SlotTargets {
            view: vk::ImageView::from_raw(raw),
            framebuffer: vk::Framebuffer::from_raw(raw + 100),
        }
    }

    #[test]
    fn extent_uses_current_when_defined() {
        let extent = calculate_extent(&caps((800, 600), 2, 8), 1920, 1080);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn extent_clamps_desired_when_undefined() {
        let extent = calculate_extent(&caps((u32::MAX, u32::MAX), 2, 8), 9000, 720);
        assert_eq!((extent.width, extent.height), (4096, 720));
    }

    #[test]
    fn rotated_transform_swaps_extent() {
        let extent = vk::Extent2D {
            width: 1080,
            height: 2340,
        };
        let rotated = oriented_extent(extent, vk::SurfaceTransformFlagsKHR::ROTATE_90);
        assert_eq!((rotated.width, rotated.height), (2340, 1080));
        let same = oriented_extent(extent, vk::SurfaceTransformFlagsKHR::ROTATE_180);
        assert_eq!(same, extent);
    }

    #[test]
    fn image_count_respects_limits() {
        assert_eq!(requested_image_count(&caps((1, 1), 2, 0)), 3);
        assert_eq!(requested_image_count(&caps((1, 1), 2, 2)), 2);
        assert_eq!(requested_image_count(&caps((1, 1), 4, 8)), 4);
    }

    #[test]
    fn composite_alpha_prefers_inherit() {
        assert_eq!(
            select_composite_alpha(
                vk::CompositeAlphaFlagsKHR::OPAQUE | vk::CompositeAlphaFlagsKHR::INHERIT
            ),
            vk::CompositeAlphaFlagsKHR::INHERIT
        );
        assert_eq!(
            select_composite_alpha(vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED),
            vk::CompositeAlphaFlagsKHR::OPAQUE
        );
    }

    #[test]
    fn surface_format_is_exact() {
        let offered = [
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        assert_eq!(
            select_surface_format(&offered).unwrap().format,
            vk::Format::R8G8B8A8_UNORM
        );
        assert!(matches!(
            select_surface_format(&offered[..1]),
            Err(GpuError::FormatNotSupported(_))
        ));
    }

    #[test]
    fn slots_are_created_once() {
        let mut slots = ImageSlots::new(3);
        let mut calls = 0;
        for index in [0, 1, 0, 2, 1, 0] {
            slots
                .get_or_create(index, || {
                    calls += 1;
                    Ok(targets(index as u64 + 1))
                })
                .unwrap();
        }
        assert_eq!(calls, 3);
        assert_eq!(slots.created_count(), 3);
        assert_eq!(slots.get(1), Some(targets(2)));
    }

    #[test]
    fn failed_creation_leaves_slot_empty() {
        let mut slots = ImageSlots::new(2);
        let result = slots.get_or_create(1, || Err(GpuError::InvalidState("boom".into())));
        assert!(result.is_err());
        assert_eq!(slots.get(1), None);
        assert!(slots.get_or_create(5, || Ok(targets(1))).is_err());
    }

    #[test]
    fn out_of_date_detection() {
        assert!(is_out_of_date(&GpuError::Vulkan(
            vk::Result::ERROR_OUT_OF_DATE_KHR
        )));
        assert!(!is_out_of_date(&GpuError::Vulkan(
            vk::Result::ERROR_DEVICE_LOST
        )));
    }
}
