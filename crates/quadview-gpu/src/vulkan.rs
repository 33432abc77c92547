//! ash-backed capability providers.
//!
//! The `unsafe` blocks in this module rely on the provider contract described in
//! [`crate::loader`]: every handle passed in was created by this provider and is alive.

use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use parking_lot::Mutex;
use raw_window_handle::RawDisplayHandle;

use crate::error::{GpuError, Result};
use crate::loader::{
    AllocationDesc, DeviceApi, DeviceDesc, GlobalApi, GpuMemory, InstanceApi, InstanceDesc,
    NativeWindow, Submission,
};

/// Validation layer enabled when requested.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

fn is_validation_layer(props: &vk::LayerProperties) -> bool {
    // SAFETY: layer names are NUL-terminated by the driver.
    let name = unsafe { CStr::from_ptr(props.layer_name.as_ptr()) };
    name == VALIDATION_LAYER
}

/// Global scope backed by the system Vulkan loader.
pub struct VulkanLoader {
    entry: ash::Entry,
}

impl VulkanLoader {
    /// Load the Vulkan library and resolve the global commands.
    pub fn load() -> Result<Self> {
        // SAFETY: the loaded library is kept alive by `entry` for as long as any scope
        // created from it exists, since every scope holds a clone.
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::LoaderUnavailable(e.to_string()))?;
        Ok(Self { entry })
    }
}

fn extension_name(props: &vk::ExtensionProperties) -> String {
    // SAFETY: the driver fills `extension_name` with a NUL-terminated string.
    unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn to_cstrings(names: &[String]) -> Result<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str())
                .map_err(|e| GpuError::InvalidState(format!("Invalid name {name:?}: {e}")))
        })
        .collect()
}

impl GlobalApi for VulkanLoader {
    fn instance_version(&self) -> Result<u32> {
        // A 1.0 loader does not expose vkEnumerateInstanceVersion.
        let version = unsafe { self.entry.try_enumerate_instance_version()? };
        Ok(version.unwrap_or(vk::API_VERSION_1_0))
    }

    fn instance_extensions(&self) -> Result<Vec<String>> {
        let props = unsafe { self.entry.enumerate_instance_extension_properties(None)? };
        Ok(props.iter().map(extension_name).collect())
    }

    fn surface_extensions(&self, display: RawDisplayHandle) -> Result<Vec<String>> {
        let names = ash_window::enumerate_required_extensions(display)?;
        Ok(names
            .iter()
            .map(|&name| {
                // SAFETY: ash-window returns pointers to static NUL-terminated names.
                unsafe { CStr::from_ptr(name) }
                    .to_string_lossy()
                    .into_owned()
            })
            .collect())
    }

    fn create_instance(&self, desc: &InstanceDesc<'_>) -> Result<Box<dyn InstanceApi>> {
        let app_name = CString::new(desc.app_name)
            .map_err(|e| GpuError::InvalidState(format!("Invalid application name: {e}")))?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(desc.api_version);

        #[allow(unused_mut)]
        let mut extensions = to_cstrings(desc.extensions)?;
        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        extensions.push(ash::khr::portability_enumeration::NAME.to_owned());
        let extension_names: Vec<*const c_char> =
            extensions.iter().map(|ext| ext.as_ptr()).collect();

        let mut layers: Vec<&CStr> = Vec::new();
        if desc.validation {
            let available = unsafe { self.entry.enumerate_instance_layer_properties()? };
            let found = available.iter().any(is_validation_layer);
            if found {
                layers.push(VALIDATION_LAYER);
            } else {
                tracing::warn!(
                    "Validation layer {} not available",
                    VALIDATION_LAYER.to_string_lossy()
                );
            }
        }
        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        let instance = unsafe { self.entry.create_instance(&create_info, None)? };
        let surface_loader = ash::khr::surface::Instance::new(&self.entry, &instance);

        Ok(Box::new(VulkanInstance {
            entry: self.entry.clone(),
            instance,
            surface_loader,
        }))
    }
}

/// Instance scope.
pub struct VulkanInstance {
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
}

impl InstanceApi for VulkanInstance {
    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        Ok(unsafe { self.instance.enumerate_physical_devices()? })
    }

    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        unsafe { self.instance.get_physical_device_properties(physical_device) }
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<String>> {
        let props = unsafe {
            self.instance
                .enumerate_device_extension_properties(physical_device)?
        };
        Ok(props.iter().map(extension_name).collect())
    }

    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(physical_device)
        }
    }

    fn format_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(physical_device, format)
        }
    }

    fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<Box<dyn DeviceApi>> {
        let queue_priority = 1.0_f32;
        let queue_create_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(desc.queue_family)
            .queue_priorities(std::slice::from_ref(&queue_priority));

        let extensions = to_cstrings(desc.extensions)?;
        let extension_names: Vec<*const c_char> =
            extensions.iter().map(|ext| ext.as_ptr()).collect();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&extension_names);

        let device = unsafe {
            self.instance
                .create_device(physical_device, &device_create_info, None)?
        };
        let swapchain_loader = ash::khr::swapchain::Device::new(&self.instance, &device);

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: self.instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: gpu_allocator::AllocatorDebugSettings {
                log_memory_information: cfg!(debug_assertions),
                log_leaks_on_shutdown: true,
                store_stack_traces: false,
                log_allocations: false,
                log_frees: false,
                log_stack_traces: false,
            },
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(GpuError::AllocationFailed(e.to_string()));
            }
        };

        Ok(Box::new(VulkanDevice {
            device,
            swapchain_loader,
            allocator: Mutex::new(Some(allocator)),
            allocations: Mutex::new(HashMap::new()),
            next_allocation: AtomicU64::new(1),
        }))
    }

    fn create_surface(&self, window: &NativeWindow) -> Result<vk::SurfaceKHR> {
        unsafe {
            ash_window::create_surface(
                &self.entry,
                &self.instance,
                window.display,
                window.window,
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool> {
        Ok(unsafe {
            self.surface_loader.get_physical_device_surface_support(
                physical_device,
                queue_family,
                surface,
            )?
        })
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        Ok(unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, surface)?
        })
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)?
        })
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        unsafe { self.surface_loader.destroy_surface(surface, None) };
    }

    fn destroy_instance(&self) {
        unsafe { self.instance.destroy_instance(None) };
    }
}

/// Device scope with gpu-allocator backed memory.
pub struct VulkanDevice {
    device: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,
    allocator: Mutex<Option<Allocator>>,
    allocations: Mutex<HashMap<u64, Allocation>>,
    next_allocation: AtomicU64,
}

impl DeviceApi for VulkanDevice {
    fn queue(&self, family: u32, index: u32) -> vk::Queue {
        unsafe { self.device.get_device_queue(family, index) }
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    fn destroy_device(&self) {
        let mut allocator = self.allocator.lock();
        let leaked: Vec<(u64, Allocation)> = self.allocations.lock().drain().collect();
        if let Some(allocator) = allocator.as_mut() {
            for (id, allocation) in leaked {
                tracing::warn!("Freeing leaked allocation {id}");
                let _ = allocator.free(allocation);
            }
        }
        // The allocator releases its memory blocks on drop, before the device goes away.
        drop(allocator.take());
        unsafe { self.device.destroy_device(None) };
    }

    fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> Result<vk::SwapchainKHR> {
        unsafe { self.swapchain_loader.create_swapchain(info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        Ok(unsafe { self.swapchain_loader.get_swapchain_images(swapchain)? })
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)> {
        Ok(unsafe {
            self.swapchain_loader.acquire_next_image(
                swapchain,
                timeout_ns,
                semaphore,
                vk::Fence::null(),
            )?
        })
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn queue_present(
        &self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        Ok(unsafe { self.swapchain_loader.queue_present(queue, &present_info)? })
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn allocate_memory(&self, desc: &AllocationDesc<'_>) -> Result<GpuMemory> {
        let allocation = self
            .allocator
            .lock()
            .as_mut()
            .ok_or_else(|| GpuError::InvalidState("Allocator not initialized".to_string()))?
            .allocate(&AllocationCreateDesc {
                name: desc.name,
                requirements: desc.requirements,
                location: desc.location,
                linear: desc.linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| GpuError::AllocationFailed(format!("{}: {e}", desc.name)))?;

        let id = self.next_allocation.fetch_add(1, Ordering::Relaxed);
        let memory = GpuMemory {
            id,
            // SAFETY: the memory object outlives the allocation, which we keep below.
            memory: unsafe { allocation.memory() },
            offset: allocation.offset(),
            size: allocation.size(),
            location: desc.location,
        };
        self.allocations.lock().insert(id, allocation);
        Ok(memory)
    }

    fn free_memory(&self, memory: GpuMemory) -> Result<()> {
        let allocation = self.allocations.lock().remove(&memory.id).ok_or_else(|| {
            GpuError::InvalidState(format!("Unknown allocation {}", memory.id))
        })?;
        self.allocator
            .lock()
            .as_mut()
            .ok_or_else(|| GpuError::InvalidState("Allocator not initialized".to_string()))?
            .free(allocation)
            .map_err(|e| GpuError::AllocationFailed(e.to_string()))
    }

    fn write_memory(&self, memory: &GpuMemory, write: &mut dyn FnMut(&mut [u8])) -> Result<()> {
        let mut allocations = self.allocations.lock();
        let allocation = allocations.get_mut(&memory.id).ok_or_else(|| {
            GpuError::InvalidState(format!("Unknown allocation {}", memory.id))
        })?;
        let bytes = allocation.mapped_slice_mut().ok_or_else(|| {
            GpuError::InvalidState(format!("Allocation {} is not host visible", memory.id))
        })?;
        write(bytes);
        Ok(())
    }

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> Result<vk::Buffer> {
        Ok(unsafe { self.device.create_buffer(info, None)? })
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        unsafe { self.device.get_buffer_memory_requirements(buffer) }
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: &GpuMemory) -> Result<()> {
        unsafe {
            self.device
                .bind_buffer_memory(buffer, memory.memory, memory.offset)?
        };
        Ok(())
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) };
    }

    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image> {
        Ok(unsafe { self.device.create_image(info, None)? })
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        unsafe { self.device.get_image_memory_requirements(image) }
    }

    fn image_subresource_layout(
        &self,
        image: vk::Image,
        subresource: vk::ImageSubresource,
    ) -> vk::SubresourceLayout {
        unsafe { self.device.get_image_subresource_layout(image, subresource) }
    }

    fn bind_image_memory(&self, image: vk::Image, memory: &GpuMemory) -> Result<()> {
        unsafe {
            self.device
                .bind_image_memory(image, memory.memory, memory.offset)?
        };
        Ok(())
    }

    fn destroy_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) };
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView> {
        Ok(unsafe { self.device.create_image_view(info, None)? })
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn create_sampler(&self, info: &vk::SamplerCreateInfo<'_>) -> Result<vk::Sampler> {
        Ok(unsafe { self.device.create_sampler(info, None)? })
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) };
    }

    fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> Result<vk::DescriptorSetLayout> {
        Ok(unsafe { self.device.create_descriptor_set_layout(info, None)? })
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) };
    }

    fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> Result<vk::DescriptorPool> {
        Ok(unsafe { self.device.create_descriptor_pool(info, None)? })
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) };
    }

    fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo<'_>,
    ) -> Result<Vec<vk::DescriptorSet>> {
        Ok(unsafe { self.device.allocate_descriptor_sets(info)? })
    }

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]) {
        unsafe { self.device.update_descriptor_sets(writes, &[]) };
    }

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo<'_>) -> Result<vk::RenderPass> {
        Ok(unsafe { self.device.create_render_pass(info, None)? })
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) };
    }

    fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> Result<vk::Framebuffer> {
        Ok(unsafe { self.device.create_framebuffer(info, None)? })
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) };
    }

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        unsafe { self.device.create_shader_module(&info, None) }
            .map_err(|e| GpuError::ShaderCompilation(e.to_string()))
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) };
    }

    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> Result<vk::PipelineLayout> {
        unsafe { self.device.create_pipeline_layout(info, None) }
            .map_err(|e| GpuError::PipelineCreation(e.to_string()))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) };
    }

    fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> Result<vk::Pipeline> {
        let pipelines = unsafe {
            self.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(info),
                None,
            )
        }
        .map_err(|(_pipelines, e)| GpuError::PipelineCreation(e.to_string()))?;
        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| GpuError::PipelineCreation("No pipeline returned".to_string()))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) };
    }

    fn create_command_pool(
        &self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> Result<vk::CommandPool> {
        Ok(unsafe { self.device.create_command_pool(info, None)? })
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> Result<Vec<vk::CommandBuffer>> {
        Ok(unsafe { self.device.allocate_command_buffers(info)? })
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        unsafe { self.device.free_command_buffers(pool, buffers) };
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> Result<()> {
        unsafe { self.device.begin_command_buffer(cmd, info)? };
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        unsafe { self.device.end_command_buffer(cmd)? };
        Ok(())
    }

    fn cmd_pipeline_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier<'_>],
    ) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                image_barriers,
            );
        }
    }

    fn cmd_copy_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageCopy],
    ) {
        unsafe {
            self.device
                .cmd_copy_image(cmd, src, src_layout, dst, dst_layout, regions);
        }
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo<'_>) {
        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, info, vk::SubpassContents::INLINE);
        }
    }

    fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        unsafe { self.device.cmd_set_viewport(cmd, 0, &[viewport]) };
    }

    fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D) {
        unsafe { self.device.cmd_set_scissor(cmd, 0, &[scissor]) };
    }

    fn cmd_bind_graphics_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                &[],
            );
        }
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        unsafe { self.device.cmd_bind_vertex_buffers(cmd, 0, &[buffer], &[0]) };
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        unsafe { self.device.cmd_draw(cmd, vertex_count, instance_count, 0, 0) };
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) };
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let create_info = vk::SemaphoreCreateInfo::default();
        Ok(unsafe { self.device.create_semaphore(&create_info, None)? })
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        Ok(unsafe { self.device.create_fence(&create_info, None)? })
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) };
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
        unsafe { self.device.wait_for_fences(&[fence], true, timeout_ns)? };
        Ok(())
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn queue_submit(
        &self,
        queue: vk::Queue,
        submission: &Submission<'_>,
        fence: vk::Fence,
    ) -> Result<()> {
        let submit_info = vk::SubmitInfo::default()
            .command_buffers(submission.command_buffers)
            .wait_semaphores(submission.wait_semaphores)
            .wait_dst_stage_mask(submission.wait_stages)
            .signal_semaphores(submission.signal_semaphores);
        unsafe { self.device.queue_submit(queue, &[submit_info], fence)? };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &CStr) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, src) in props.layer_name.iter_mut().zip(name.to_bytes()) {
            *dst = *src as c_char;
        }
        props
    }

    #[test]
    fn validation_layer_is_recognized_by_name() {
        assert!(is_validation_layer(&layer(VALIDATION_LAYER)));
        assert!(!is_validation_layer(&layer(c"VK_LAYER_LUNARG_monitor")));
        assert!(!is_validation_layer(&vk::LayerProperties::default()));
    }
}
