//! Capability provider interfaces.
//!
//! Vulkan entry points live in three scopes: global commands that need no instance,
//! instance commands resolved against a `VkInstance`, and device commands resolved against
//! a `VkDevice`. Each scope is a trait here. A loader for the global scope is created once
//! at startup and hands out the narrower scopes as they are created, so nothing in the
//! renderer reaches for a global function table.
//!
//! [`crate::vulkan`] provides the ash-backed implementation. Tests use a recording mock.
//!
//! Handles passed into a provider must have been created by that same provider and must
//! still be alive. Methods take `&self`; the providers are `Send + Sync` but the renderer
//! drives them from one thread at a time.

use ash::vk;
use gpu_allocator::MemoryLocation;
use raw_window_handle::{
    HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle,
};

use crate::error::{GpuError, Result};

/// Native display and window handles for surface creation.
#[derive(Debug, Clone, Copy)]
pub struct NativeWindow {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

impl NativeWindow {
    /// Wrap raw handles.
    pub fn new(display: RawDisplayHandle, window: RawWindowHandle) -> Self {
        Self { display, window }
    }

    /// Take the raw handles of a window.
    pub fn from_window<W>(window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;
        Ok(Self::new(display.as_raw(), window_handle.as_raw()))
    }
}

/// Parameters for instance creation.
#[derive(Debug, Clone)]
pub struct InstanceDesc<'a> {
    pub app_name: &'a str,
    pub api_version: u32,
    pub extensions: &'a [String],
    pub validation: bool,
}

/// Parameters for logical device creation.
#[derive(Debug, Clone)]
pub struct DeviceDesc<'a> {
    /// Family of the single queue to create.
    pub queue_family: u32,
    pub extensions: &'a [String],
}

/// Parameters for a memory allocation.
#[derive(Debug, Clone)]
pub struct AllocationDesc<'a> {
    pub name: &'a str,
    pub requirements: vk::MemoryRequirements,
    pub location: MemoryLocation,
    /// Linear resources (buffers, linear-tiled images) versus optimal-tiled images.
    pub linear: bool,
}

/// A block of device memory handed out by [`DeviceApi::allocate_memory`].
///
/// Not `Clone`: it is returned to the provider exactly once through
/// [`DeviceApi::free_memory`].
#[derive(Debug, PartialEq, Eq)]
pub struct GpuMemory {
    /// Provider-specific allocation key.
    pub id: u64,
    pub memory: vk::DeviceMemory,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub location: MemoryLocation,
}

/// One queue submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct Submission<'a> {
    pub command_buffers: &'a [vk::CommandBuffer],
    pub wait_semaphores: &'a [vk::Semaphore],
    pub wait_stages: &'a [vk::PipelineStageFlags],
    pub signal_semaphores: &'a [vk::Semaphore],
}

/// Global scope: commands available before an instance exists.
pub trait GlobalApi: Send + Sync {
    /// Highest instance-level API version the loader supports.
    fn instance_version(&self) -> Result<u32>;

    /// Names of all supported instance extensions.
    fn instance_extensions(&self) -> Result<Vec<String>>;

    /// Instance extensions needed to present to windows of `display`.
    fn surface_extensions(&self, display: RawDisplayHandle) -> Result<Vec<String>>;

    /// Create an instance and resolve its instance-level commands.
    fn create_instance(&self, desc: &InstanceDesc<'_>) -> Result<Box<dyn InstanceApi>>;
}

/// Instance scope.
pub trait InstanceApi: Send + Sync {
    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>>;

    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties;

    /// Names of all extensions supported by `physical_device`.
    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<String>>;

    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties>;

    fn format_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatProperties;

    /// Create a logical device and resolve its device-level commands.
    fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<Box<dyn DeviceApi>>;

    fn create_surface(&self, window: &NativeWindow) -> Result<vk::SurfaceKHR>;

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool>;

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>>;

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR>;

    fn destroy_surface(&self, surface: vk::SurfaceKHR);

    /// Destroy the instance. Every object created from it must already be gone.
    fn destroy_instance(&self);
}

/// Device scope.
pub trait DeviceApi: Send + Sync {
    fn queue(&self, family: u32, index: u32) -> vk::Queue;

    fn wait_idle(&self) -> Result<()>;

    /// Destroy the device. Every object created from it must already be gone.
    fn destroy_device(&self);

    // Swapchain

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR<'_>)
        -> Result<vk::SwapchainKHR>;

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>>;

    /// Returns the image index and whether the swapchain is suboptimal.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)>;

    /// Returns whether the swapchain is suboptimal.
    fn queue_present(
        &self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool>;

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    // Memory

    fn allocate_memory(&self, desc: &AllocationDesc<'_>) -> Result<GpuMemory>;

    fn free_memory(&self, memory: GpuMemory) -> Result<()>;

    /// Map `memory` and hand its bytes to `write`.
    fn write_memory(&self, memory: &GpuMemory, write: &mut dyn FnMut(&mut [u8])) -> Result<()>;

    // Buffers and images

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> Result<vk::Buffer>;

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: &GpuMemory) -> Result<()>;

    fn destroy_buffer(&self, buffer: vk::Buffer);

    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image>;

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements;

    fn image_subresource_layout(
        &self,
        image: vk::Image,
        subresource: vk::ImageSubresource,
    ) -> vk::SubresourceLayout;

    fn bind_image_memory(&self, image: vk::Image, memory: &GpuMemory) -> Result<()>;

    fn destroy_image(&self, image: vk::Image);

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);

    fn create_sampler(&self, info: &vk::SamplerCreateInfo<'_>) -> Result<vk::Sampler>;

    fn destroy_sampler(&self, sampler: vk::Sampler);

    // Descriptors

    fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> Result<vk::DescriptorSetLayout>;

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> Result<vk::DescriptorPool>;

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo<'_>,
    ) -> Result<Vec<vk::DescriptorSet>>;

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]);

    // Render pass and pipeline

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo<'_>) -> Result<vk::RenderPass>;

    fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo<'_>) -> Result<vk::Framebuffer>;

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule>;

    fn destroy_shader_module(&self, module: vk::ShaderModule);

    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> Result<vk::PipelineLayout>;

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> Result<vk::Pipeline>;

    fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    // Command buffers

    fn create_command_pool(&self, info: &vk::CommandPoolCreateInfo<'_>)
        -> Result<vk::CommandPool>;

    fn destroy_command_pool(&self, pool: vk::CommandPool);

    fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> Result<Vec<vk::CommandBuffer>>;

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> Result<()>;

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()>;

    fn cmd_pipeline_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier<'_>],
    );

    fn cmd_copy_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageCopy],
    );

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo<'_>);

    fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport);

    fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D);

    fn cmd_bind_graphics_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);

    fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    );

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer);

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32);

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);

    // Synchronization

    fn create_semaphore(&self) -> Result<vk::Semaphore>;

    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence>;

    fn destroy_fence(&self, fence: vk::Fence);

    /// Wait for `fence`; an expired timeout is reported as `vk::Result::TIMEOUT`.
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()>;

    fn queue_submit(
        &self,
        queue: vk::Queue,
        submission: &Submission<'_>,
        fence: vk::Fence,
    ) -> Result<()>;
}
