//! Recording capability provider.
//!
//! [`MockGpu`] implements all three provider scopes without a driver. Handles are plain
//! counters, image memory is a byte vector and every call is appended to an event log,
//! so tests can assert on what the renderer asked for and in which order.
//!
//! Besides the log the mock tracks:
//! - live objects, to catch leaks and double destroys
//! - the layout each image was last transitioned to
//! - semaphores with a signal nobody has waited on yet

use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::c_char;
use std::sync::Arc;

use ash::vk::{self, Handle};
use parking_lot::Mutex;
use quadview_gpu::error::{GpuError, Result};
use quadview_gpu::{
    AllocationDesc, DeviceApi, DeviceDesc, GlobalApi, GpuMemory, InstanceApi, InstanceDesc,
    MemoryLocation, NativeWindow, Submission,
};
use raw_window_handle::RawDisplayHandle;

/// Raw value of the first physical device; further devices count up from here.
const PHYSICAL_DEVICE_BASE: u64 = 0x100;

/// What the mock device reports.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub api_version: u32,
    pub instance_extensions: Vec<String>,
    pub surface_extensions: Vec<String>,
    pub device_count: usize,
    pub device_name: String,
    pub vendor_id: u32,
    pub device_extensions: Vec<String>,
    pub queue_families: Vec<vk::QueueFlags>,
    pub present_support: bool,
    pub surface_formats: Vec<vk::Format>,
    pub surface_capabilities: vk::SurfaceCapabilitiesKHR,
    /// Features reported for the texture format.
    pub texture_format: vk::FormatProperties,
    /// Row pitch alignment of linear images in bytes.
    pub row_alignment: u64,
    /// Let every fence wait expire.
    pub fence_timeout: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        let surface_extensions = vec![
            "VK_KHR_surface".to_string(),
            "VK_KHR_android_surface".to_string(),
        ];
        Self {
            api_version: vk::API_VERSION_1_1,
            instance_extensions: surface_extensions.clone(),
            surface_extensions,
            device_count: 1,
            device_name: "Mock GPU".to_string(),
            vendor_id: 0x5143,
            device_extensions: vec!["VK_KHR_swapchain".to_string()],
            queue_families: vec![vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER],
            present_support: true,
            surface_formats: vec![vk::Format::R8G8B8A8_UNORM],
            surface_capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 3,
                max_image_count: 0,
                current_extent: vk::Extent2D {
                    width: 1080,
                    height: 1920,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::INHERIT
                    | vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            },
            texture_format: vk::FormatProperties {
                linear_tiling_features: vk::FormatFeatureFlags::SAMPLED_IMAGE,
                optimal_tiling_features: vk::FormatFeatureFlags::SAMPLED_IMAGE,
                buffer_features: vk::FormatFeatureFlags::empty(),
            },
            row_alignment: 256,
            fence_timeout: false,
        }
    }
}

impl MockConfig {
    /// Report a different instance API version.
    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Only optimal tiling can be sampled, forcing a staging upload.
    pub fn optimal_only(mut self) -> Self {
        self.texture_format.linear_tiling_features = vk::FormatFeatureFlags::empty();
        self
    }

    /// Neither tiling can be sampled.
    pub fn unsampleable(mut self) -> Self {
        self.texture_format = vk::FormatProperties::default();
        self
    }

    /// Surface size dictated by the display.
    pub fn with_surface_extent(mut self, width: u32, height: u32) -> Self {
        self.surface_capabilities.current_extent = vk::Extent2D { width, height };
        self
    }
}

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    CreateInstance { api_version: u32, extensions: Vec<String>, validation: bool },
    DestroyInstance,
    CreateDevice { queue_family: u32, extensions: Vec<String> },
    DestroyDevice,
    WaitIdle,
    CreateSurface { surface: u64 },
    DestroySurface { surface: u64 },
    CreateSwapchain {
        swapchain: u64,
        min_image_count: u32,
        format: vk::Format,
        extent: (u32, u32),
        present_mode: vk::PresentModeKHR,
        composite_alpha: vk::CompositeAlphaFlagsKHR,
        old_swapchain: u64,
    },
    DestroySwapchain { swapchain: u64 },
    AcquireNextImage { semaphore: u64, image_index: u32 },
    QueuePresent { image_index: u32, wait_semaphore: u64 },
    AllocateMemory { name: String, size: u64, location: MemoryLocation },
    FreeMemory { name: String },
    CreateBuffer { buffer: u64, size: u64 },
    DestroyBuffer { buffer: u64 },
    CreateImage { image: u64, tiling: vk::ImageTiling, initial_layout: vk::ImageLayout },
    DestroyImage { image: u64 },
    CreateImageView { view: u64, image: u64 },
    DestroyImageView { view: u64 },
    CreateSampler,
    DestroySampler,
    CreateDescriptorSetLayout,
    DestroyDescriptorSetLayout,
    CreateDescriptorPool,
    DestroyDescriptorPool,
    AllocateDescriptorSets { count: u32 },
    UpdateDescriptorSets { writes: usize },
    CreateRenderPass,
    DestroyRenderPass,
    CreateFramebuffer { framebuffer: u64, extent: (u32, u32) },
    DestroyFramebuffer { framebuffer: u64 },
    CreateShaderModule,
    DestroyShaderModule,
    CreatePipelineLayout,
    DestroyPipelineLayout,
    CreateGraphicsPipeline { stages: u32 },
    DestroyPipeline,
    CreateCommandPool { flags: vk::CommandPoolCreateFlags },
    DestroyCommandPool,
    AllocateCommandBuffers { count: u32 },
    FreeCommandBuffers { count: usize },
    BeginCommandBuffer { cmd: u64 },
    EndCommandBuffer { cmd: u64 },
    PipelineBarrier { image: u64, old_layout: vk::ImageLayout, new_layout: vk::ImageLayout },
    CopyImage { src: u64, dst: u64 },
    BeginRenderPass { framebuffer: u64, clear_color: [f32; 4] },
    SetViewport { width: f32, height: f32 },
    SetScissor,
    BindPipeline,
    BindDescriptorSet,
    BindVertexBuffer,
    Draw { vertex_count: u32, instance_count: u32 },
    EndRenderPass,
    CreateSemaphore { semaphore: u64 },
    DestroySemaphore { semaphore: u64 },
    CreateFence,
    DestroyFence,
    WaitForFence { timeout_ns: u64 },
    QueueSubmit {
        command_buffers: Vec<u64>,
        wait_semaphores: Vec<u64>,
        signal_semaphores: Vec<u64>,
        fence: u64,
    },
}

impl MockEvent {
    /// Name of the call without its arguments.
    pub fn name(&self) -> String {
        let debug = format!("{self:?}");
        debug
            .split(|c: char| !c.is_ascii_alphanumeric())
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

struct MemoryBlock {
    name: String,
    bytes: Vec<u8>,
    location: MemoryLocation,
}

#[derive(Clone, Copy)]
struct ImageRecord {
    width: u32,
    height: u32,
    tiling: vk::ImageTiling,
}

struct SwapchainRecord {
    images: Vec<vk::Image>,
    next: usize,
}

struct Shared {
    config: MockConfig,
    next_handle: u64,
    events: Vec<MockEvent>,
    live: HashMap<u64, &'static str>,
    invalid_destroys: Vec<(u64, &'static str)>,
    images: HashMap<u64, ImageRecord>,
    buffer_sizes: HashMap<u64, u64>,
    pool_buffers: HashMap<u64, Vec<u64>>,
    memory: HashMap<u64, MemoryBlock>,
    swapchains: HashMap<u64, SwapchainRecord>,
    layouts: HashMap<u64, vk::ImageLayout>,
    signaled_fences: HashSet<u64>,
    pending_semaphores: HashSet<u64>,
    semaphore_violations: Vec<u64>,
    acquire_results: VecDeque<vk::Result>,
    present_results: VecDeque<vk::Result>,
    swapchain_results: VecDeque<vk::Result>,
    instance_alive: bool,
    device_alive: bool,
}

impl Shared {
    fn new(config: MockConfig) -> Self {
        Self {
            config,
            next_handle: 0x1000,
            events: Vec::new(),
            live: HashMap::new(),
            invalid_destroys: Vec::new(),
            images: HashMap::new(),
            buffer_sizes: HashMap::new(),
            pool_buffers: HashMap::new(),
            memory: HashMap::new(),
            swapchains: HashMap::new(),
            layouts: HashMap::new(),
            signaled_fences: HashSet::new(),
            pending_semaphores: HashSet::new(),
            semaphore_violations: Vec::new(),
            acquire_results: VecDeque::new(),
            present_results: VecDeque::new(),
            swapchain_results: VecDeque::new(),
            instance_alive: false,
            device_alive: false,
        }
    }

    fn create(&mut self, kind: &'static str) -> u64 {
        self.next_handle += 1;
        self.live.insert(self.next_handle, kind);
        self.next_handle
    }

    fn destroy(&mut self, raw: u64, kind: &'static str) {
        if raw == 0 {
            return;
        }
        match self.live.get(&raw) {
            Some(live_kind) if *live_kind == kind => {
                self.live.remove(&raw);
            }
            _ => self.invalid_destroys.push((raw, kind)),
        }
    }

    fn row_pitch(&self, width: u32) -> u64 {
        let row = u64::from(width) * 4;
        let align = self.config.row_alignment.max(1);
        row.div_ceil(align) * align
    }

    /// Signal a semaphore, flagging it if an earlier signal was never waited on.
    fn signal(&mut self, semaphore: u64) {
        if !self.pending_semaphores.insert(semaphore) {
            self.semaphore_violations.push(semaphore);
        }
    }
}

/// The mock provider. Clones share the same device state.
#[derive(Clone)]
pub struct MockGpu {
    shared: Arc<Mutex<Shared>>,
}

impl Default for MockGpu {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockGpu {
    pub fn new(config: MockConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::new(config))),
        }
    }

    /// A boxed clone to hand to the renderer.
    pub fn loader(&self) -> Box<dyn GlobalApi> {
        Box::new(self.clone())
    }

    /// Every call recorded so far.
    pub fn events(&self) -> Vec<MockEvent> {
        self.shared.lock().events.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_events(&self) {
        self.shared.lock().events.clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&MockEvent) -> bool) -> usize {
        self.shared.lock().events.iter().filter(|e| pred(e)).count()
    }

    /// Objects created and not yet destroyed, sorted by handle.
    pub fn live_objects(&self) -> Vec<(u64, &'static str)> {
        let shared = self.shared.lock();
        let mut live: Vec<_> = shared.live.iter().map(|(h, k)| (*h, *k)).collect();
        live.sort_unstable();
        live
    }

    /// Number of live objects of one kind.
    pub fn live_count(&self, kind: &str) -> usize {
        self.shared.lock().live.values().filter(|k| **k == kind).count()
    }

    /// Destroy calls on handles that were not live.
    pub fn invalid_destroys(&self) -> Vec<(u64, &'static str)> {
        self.shared.lock().invalid_destroys.clone()
    }

    /// Semaphores signaled again before their previous signal was waited on.
    pub fn semaphore_violations(&self) -> Vec<u64> {
        self.shared.lock().semaphore_violations.clone()
    }

    /// Layout the image was created in or last transitioned to.
    pub fn image_layout(&self, image: vk::Image) -> Option<vk::ImageLayout> {
        self.shared.lock().layouts.get(&image.as_raw()).copied()
    }

    /// Bytes of the first live allocation called `name`.
    pub fn memory_contents(&self, name: &str) -> Option<Vec<u8>> {
        let shared = self.shared.lock();
        shared
            .memory
            .values()
            .find(|block| block.name == name)
            .map(|block| block.bytes.clone())
    }

    /// Row pitch reported for a linear image of `width` texels.
    pub fn row_pitch(&self, width: u32) -> u64 {
        self.shared.lock().row_pitch(width)
    }

    /// Make the next acquire return `result`. Suboptimal counts as success.
    pub fn fail_next_acquire(&self, result: vk::Result) {
        self.shared.lock().acquire_results.push_back(result);
    }

    /// Make the next present return `result`. Suboptimal counts as success.
    pub fn fail_next_present(&self, result: vk::Result) {
        self.shared.lock().present_results.push_back(result);
    }

    /// Make the next swapchain creation fail with `result`.
    pub fn fail_next_swapchain(&self, result: vk::Result) {
        self.shared.lock().swapchain_results.push_back(result);
    }

    /// Change the extent the surface reports from now on.
    pub fn set_surface_extent(&self, width: u32, height: u32) {
        self.shared.lock().config.surface_capabilities.current_extent =
            vk::Extent2D { width, height };
    }

    pub fn instance_alive(&self) -> bool {
        self.shared.lock().instance_alive
    }

    pub fn device_alive(&self) -> bool {
        self.shared.lock().device_alive
    }

    fn record(&self, event: MockEvent) {
        self.shared.lock().events.push(event);
    }
}

impl GlobalApi for MockGpu {
    fn instance_version(&self) -> Result<u32> {
        Ok(self.shared.lock().config.api_version)
    }

    fn instance_extensions(&self) -> Result<Vec<String>> {
        Ok(self.shared.lock().config.instance_extensions.clone())
    }

    fn surface_extensions(&self, _display: RawDisplayHandle) -> Result<Vec<String>> {
        Ok(self.shared.lock().config.surface_extensions.clone())
    }

    fn create_instance(&self, desc: &InstanceDesc<'_>) -> Result<Box<dyn InstanceApi>> {
        let mut shared = self.shared.lock();
        shared.instance_alive = true;
        shared.events.push(MockEvent::CreateInstance {
            api_version: desc.api_version,
            extensions: desc.extensions.to_vec(),
            validation: desc.validation,
        });
        Ok(Box::new(MockInstance { gpu: self.clone() }))
    }
}

/// Instance scope of [`MockGpu`].
pub struct MockInstance {
    gpu: MockGpu,
}

impl InstanceApi for MockInstance {
    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        let count = self.gpu.shared.lock().config.device_count as u64;
        Ok((0..count)
            .map(|i| vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + i))
            .collect())
    }

    fn physical_device_properties(
        &self,
        _physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        let shared = self.gpu.shared.lock();
        let mut props = vk::PhysicalDeviceProperties {
            api_version: shared.config.api_version,
            vendor_id: shared.config.vendor_id,
            device_type: vk::PhysicalDeviceType::INTEGRATED_GPU,
            ..Default::default()
        };
        let max = props.device_name.len() - 1;
        for (dst, src) in props
            .device_name
            .iter_mut()
            .zip(shared.config.device_name.bytes().take(max))
        {
            *dst = src as c_char;
        }
        props
    }

    fn device_extensions(&self, _physical_device: vk::PhysicalDevice) -> Result<Vec<String>> {
        Ok(self.gpu.shared.lock().config.device_extensions.clone())
    }

    fn queue_family_properties(
        &self,
        _physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.gpu
            .shared
            .lock()
            .config
            .queue_families
            .iter()
            .map(|flags| vk::QueueFamilyProperties {
                queue_flags: *flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    fn format_properties(
        &self,
        _physical_device: vk::PhysicalDevice,
        format: vk::Format,
    ) -> vk::FormatProperties {
        if format == vk::Format::R8G8B8A8_UNORM {
            self.gpu.shared.lock().config.texture_format
        } else {
            vk::FormatProperties::default()
        }
    }

    fn create_device(
        &self,
        _physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<Box<dyn DeviceApi>> {
        let mut shared = self.gpu.shared.lock();
        shared.device_alive = true;
        shared.events.push(MockEvent::CreateDevice {
            queue_family: desc.queue_family,
            extensions: desc.extensions.to_vec(),
        });
        Ok(Box::new(MockDevice {
            gpu: self.gpu.clone(),
        }))
    }

    fn create_surface(&self, _window: &NativeWindow) -> Result<vk::SurfaceKHR> {
        let mut shared = self.gpu.shared.lock();
        let surface = shared.create("surface");
        shared.events.push(MockEvent::CreateSurface { surface });
        Ok(vk::SurfaceKHR::from_raw(surface))
    }

    fn surface_support(
        &self,
        _physical_device: vk::PhysicalDevice,
        _queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> Result<bool> {
        Ok(self.gpu.shared.lock().config.present_support)
    }

    fn surface_formats(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        Ok(self
            .gpu
            .shared
            .lock()
            .config
            .surface_formats
            .iter()
            .map(|format| vk::SurfaceFormatKHR {
                format: *format,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            })
            .collect())
    }

    fn surface_capabilities(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(self.gpu.shared.lock().config.surface_capabilities)
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        let mut shared = self.gpu.shared.lock();
        shared.destroy(surface.as_raw(), "surface");
        shared.events.push(MockEvent::DestroySurface {
            surface: surface.as_raw(),
        });
    }

    fn destroy_instance(&self) {
        let mut shared = self.gpu.shared.lock();
        shared.instance_alive = false;
        shared.events.push(MockEvent::DestroyInstance);
    }
}

/// Device scope of [`MockGpu`].
pub struct MockDevice {
    gpu: MockGpu,
}

impl MockDevice {
    fn create(&self, kind: &'static str, event: impl FnOnce(u64) -> MockEvent) -> u64 {
        let mut shared = self.gpu.shared.lock();
        let raw = shared.create(kind);
        shared.events.push(event(raw));
        raw
    }

    fn destroy(&self, raw: u64, kind: &'static str, event: MockEvent) {
        let mut shared = self.gpu.shared.lock();
        shared.destroy(raw, kind);
        shared.events.push(event);
    }
}

impl DeviceApi for MockDevice {
    fn queue(&self, family: u32, index: u32) -> vk::Queue {
        vk::Queue::from_raw(0x10 + u64::from(family) * 8 + u64::from(index))
    }

    fn wait_idle(&self) -> Result<()> {
        self.gpu.record(MockEvent::WaitIdle);
        Ok(())
    }

    fn destroy_device(&self) {
        let mut shared = self.gpu.shared.lock();
        shared.device_alive = false;
        shared.events.push(MockEvent::DestroyDevice);
    }

    fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> Result<vk::SwapchainKHR> {
        let mut shared = self.gpu.shared.lock();
        if let Some(error) = shared.swapchain_results.pop_front() {
            return Err(GpuError::Vulkan(error));
        }
        let swapchain = shared.create("swapchain");
        let images = (0..info.min_image_count)
            .map(|_| {
                shared.next_handle += 1;
                vk::Image::from_raw(shared.next_handle)
            })
            .collect();
        shared
            .swapchains
            .insert(swapchain, SwapchainRecord { images, next: 0 });
        shared.events.push(MockEvent::CreateSwapchain {
            swapchain,
            min_image_count: info.min_image_count,
            format: info.image_format,
            extent: (info.image_extent.width, info.image_extent.height),
            present_mode: info.present_mode,
            composite_alpha: info.composite_alpha,
            old_swapchain: info.old_swapchain.as_raw(),
        });
        Ok(vk::SwapchainKHR::from_raw(swapchain))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        self.gpu
            .shared
            .lock()
            .swapchains
            .get(&swapchain.as_raw())
            .map(|record| record.images.clone())
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR))
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)> {
        let mut shared = self.gpu.shared.lock();
        let suboptimal = match shared.acquire_results.pop_front() {
            None => false,
            Some(vk::Result::SUBOPTIMAL_KHR) => true,
            Some(error) => return Err(GpuError::Vulkan(error)),
        };

        let record = shared
            .swapchains
            .get_mut(&swapchain.as_raw())
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR))?;
        let image_index = record.next as u32;
        record.next = (record.next + 1) % record.images.len().max(1);

        shared.signal(semaphore.as_raw());
        shared.events.push(MockEvent::AcquireNextImage {
            semaphore: semaphore.as_raw(),
            image_index,
        });
        Ok((image_index, suboptimal))
    }

    fn queue_present(
        &self,
        _queue: vk::Queue,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool> {
        let mut shared = self.gpu.shared.lock();
        // The wait is consumed even when presentation fails.
        shared.pending_semaphores.remove(&wait_semaphore.as_raw());
        let suboptimal = match shared.present_results.pop_front() {
            None => false,
            Some(vk::Result::SUBOPTIMAL_KHR) => true,
            Some(error) => return Err(GpuError::Vulkan(error)),
        };
        shared.events.push(MockEvent::QueuePresent {
            image_index,
            wait_semaphore: wait_semaphore.as_raw(),
        });
        Ok(suboptimal)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut shared = self.gpu.shared.lock();
        shared.swapchains.remove(&swapchain.as_raw());
        shared.destroy(swapchain.as_raw(), "swapchain");
        shared.events.push(MockEvent::DestroySwapchain {
            swapchain: swapchain.as_raw(),
        });
    }

    fn allocate_memory(&self, desc: &AllocationDesc<'_>) -> Result<GpuMemory> {
        let mut shared = self.gpu.shared.lock();
        let id = shared.create("memory");
        let size = desc.requirements.size;
        shared.memory.insert(
            id,
            MemoryBlock {
                name: desc.name.to_string(),
                bytes: vec![0; size as usize],
                location: desc.location,
            },
        );
        shared.events.push(MockEvent::AllocateMemory {
            name: desc.name.to_string(),
            size,
            location: desc.location,
        });
        Ok(GpuMemory {
            id,
            memory: vk::DeviceMemory::from_raw(id),
            offset: 0,
            size,
            location: desc.location,
        })
    }

    fn free_memory(&self, memory: GpuMemory) -> Result<()> {
        let mut shared = self.gpu.shared.lock();
        let block = shared
            .memory
            .remove(&memory.id)
            .ok_or_else(|| GpuError::AllocationFailed(format!("Unknown allocation {}", memory.id)))?;
        shared.destroy(memory.id, "memory");
        shared.events.push(MockEvent::FreeMemory { name: block.name });
        Ok(())
    }

    fn write_memory(&self, memory: &GpuMemory, write: &mut dyn FnMut(&mut [u8])) -> Result<()> {
        let mut block = {
            let mut shared = self.gpu.shared.lock();
            shared.memory.remove(&memory.id).ok_or_else(|| {
                GpuError::AllocationFailed(format!("Unknown allocation {}", memory.id))
            })?
        };
        let result = if block.location == MemoryLocation::GpuOnly {
            Err(GpuError::AllocationFailed(format!(
                "{} is not host visible",
                block.name
            )))
        } else {
            write(&mut block.bytes);
            Ok(())
        };
        self.gpu.shared.lock().memory.insert(memory.id, block);
        result
    }

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> Result<vk::Buffer> {
        let size = info.size;
        let raw = self.create("buffer", |buffer| MockEvent::CreateBuffer { buffer, size });
        self.gpu.shared.lock().buffer_sizes.insert(raw, size);
        Ok(vk::Buffer::from_raw(raw))
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        let size = self
            .gpu
            .shared
            .lock()
            .buffer_sizes
            .get(&buffer.as_raw())
            .copied()
            .unwrap_or_default();
        vk::MemoryRequirements {
            size,
            alignment: 256,
            memory_type_bits: 1,
        }
    }

    fn bind_buffer_memory(&self, _buffer: vk::Buffer, _memory: &GpuMemory) -> Result<()> {
        Ok(())
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        self.gpu.shared.lock().buffer_sizes.remove(&buffer.as_raw());
        self.destroy(
            buffer.as_raw(),
            "buffer",
            MockEvent::DestroyBuffer {
                buffer: buffer.as_raw(),
            },
        );
    }

    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image> {
        let tiling = info.tiling;
        let initial_layout = info.initial_layout;
        let raw = self.create("image", |image| MockEvent::CreateImage {
            image,
            tiling,
            initial_layout,
        });
        let mut shared = self.gpu.shared.lock();
        shared.images.insert(
            raw,
            ImageRecord {
                width: info.extent.width,
                height: info.extent.height,
                tiling,
            },
        );
        shared.layouts.insert(raw, initial_layout);
        Ok(vk::Image::from_raw(raw))
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        let shared = self.gpu.shared.lock();
        let size = shared.images.get(&image.as_raw()).map_or(0, |record| {
            let row = if record.tiling == vk::ImageTiling::LINEAR {
                shared.row_pitch(record.width)
            } else {
                u64::from(record.width) * 4
            };
            row * u64::from(record.height)
        });
        vk::MemoryRequirements {
            size,
            alignment: 256,
            memory_type_bits: 1,
        }
    }

    fn image_subresource_layout(
        &self,
        image: vk::Image,
        _subresource: vk::ImageSubresource,
    ) -> vk::SubresourceLayout {
        let shared = self.gpu.shared.lock();
        let Some(record) = shared.images.get(&image.as_raw()).copied() else {
            return vk::SubresourceLayout::default();
        };
        let row_pitch = shared.row_pitch(record.width);
        vk::SubresourceLayout {
            offset: 0,
            size: row_pitch * u64::from(record.height),
            row_pitch,
            array_pitch: 0,
            depth_pitch: 0,
        }
    }

    fn bind_image_memory(&self, _image: vk::Image, _memory: &GpuMemory) -> Result<()> {
        Ok(())
    }

    fn destroy_image(&self, image: vk::Image) {
        {
            let mut shared = self.gpu.shared.lock();
            shared.images.remove(&image.as_raw());
            shared.layouts.remove(&image.as_raw());
        }
        self.destroy(
            image.as_raw(),
            "image",
            MockEvent::DestroyImage {
                image: image.as_raw(),
            },
        );
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView> {
        let image = info.image.as_raw();
        let raw = self.create("image_view", |view| MockEvent::CreateImageView { view, image });
        Ok(vk::ImageView::from_raw(raw))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.destroy(
            view.as_raw(),
            "image_view",
            MockEvent::DestroyImageView {
                view: view.as_raw(),
            },
        );
    }

    fn create_sampler(&self, _info: &vk::SamplerCreateInfo<'_>) -> Result<vk::Sampler> {
        let raw = self.create("sampler", |_| MockEvent::CreateSampler);
        Ok(vk::Sampler::from_raw(raw))
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.destroy(sampler.as_raw(), "sampler", MockEvent::DestroySampler);
    }

    fn create_descriptor_set_layout(
        &self,
        _info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> Result<vk::DescriptorSetLayout> {
        let raw = self.create("descriptor_set_layout", |_| {
            MockEvent::CreateDescriptorSetLayout
        });
        Ok(vk::DescriptorSetLayout::from_raw(raw))
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.destroy(
            layout.as_raw(),
            "descriptor_set_layout",
            MockEvent::DestroyDescriptorSetLayout,
        );
    }

    fn create_descriptor_pool(
        &self,
        _info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> Result<vk::DescriptorPool> {
        let raw = self.create("descriptor_pool", |_| MockEvent::CreateDescriptorPool);
        Ok(vk::DescriptorPool::from_raw(raw))
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.destroy(pool.as_raw(), "descriptor_pool", MockEvent::DestroyDescriptorPool);
    }

    fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo<'_>,
    ) -> Result<Vec<vk::DescriptorSet>> {
        let mut shared = self.gpu.shared.lock();
        let count = info.descriptor_set_count;
        shared.events.push(MockEvent::AllocateDescriptorSets { count });
        // Sets are owned by their pool and never destroyed individually.
        Ok((0..count)
            .map(|_| {
                shared.next_handle += 1;
                vk::DescriptorSet::from_raw(shared.next_handle)
            })
            .collect())
    }

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]) {
        self.gpu.record(MockEvent::UpdateDescriptorSets {
            writes: writes.len(),
        });
    }

    fn create_render_pass(&self, _info: &vk::RenderPassCreateInfo<'_>) -> Result<vk::RenderPass> {
        let raw = self.create("render_pass", |_| MockEvent::CreateRenderPass);
        Ok(vk::RenderPass::from_raw(raw))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroy(render_pass.as_raw(), "render_pass", MockEvent::DestroyRenderPass);
    }

    fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo<'_>) -> Result<vk::Framebuffer> {
        let extent = (info.width, info.height);
        let raw = self.create("framebuffer", |framebuffer| MockEvent::CreateFramebuffer {
            framebuffer,
            extent,
        });
        Ok(vk::Framebuffer::from_raw(raw))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.destroy(
            framebuffer.as_raw(),
            "framebuffer",
            MockEvent::DestroyFramebuffer {
                framebuffer: framebuffer.as_raw(),
            },
        );
    }

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule> {
        if code.first() != Some(&0x0723_0203) {
            return Err(GpuError::Vulkan(vk::Result::ERROR_INVALID_SHADER_NV));
        }
        let raw = self.create("shader_module", |_| MockEvent::CreateShaderModule);
        Ok(vk::ShaderModule::from_raw(raw))
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.destroy(module.as_raw(), "shader_module", MockEvent::DestroyShaderModule);
    }

    fn create_pipeline_layout(
        &self,
        _info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> Result<vk::PipelineLayout> {
        let raw = self.create("pipeline_layout", |_| MockEvent::CreatePipelineLayout);
        Ok(vk::PipelineLayout::from_raw(raw))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.destroy(layout.as_raw(), "pipeline_layout", MockEvent::DestroyPipelineLayout);
    }

    fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> Result<vk::Pipeline> {
        let stages = info.stage_count;
        let raw = self.create("pipeline", |_| MockEvent::CreateGraphicsPipeline { stages });
        Ok(vk::Pipeline::from_raw(raw))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.destroy(pipeline.as_raw(), "pipeline", MockEvent::DestroyPipeline);
    }

    fn create_command_pool(
        &self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> Result<vk::CommandPool> {
        let flags = info.flags;
        let raw = self.create("command_pool", |_| MockEvent::CreateCommandPool { flags });
        Ok(vk::CommandPool::from_raw(raw))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        {
            let mut shared = self.gpu.shared.lock();
            // Buffers still allocated from the pool go with it.
            for buffer in shared.pool_buffers.remove(&pool.as_raw()).unwrap_or_default() {
                shared.destroy(buffer, "command_buffer");
            }
        }
        self.destroy(pool.as_raw(), "command_pool", MockEvent::DestroyCommandPool);
    }

    fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let mut shared = self.gpu.shared.lock();
        let count = info.command_buffer_count;
        let raws: Vec<u64> = (0..count).map(|_| shared.create("command_buffer")).collect();
        shared
            .pool_buffers
            .entry(info.command_pool.as_raw())
            .or_default()
            .extend(&raws);
        shared.events.push(MockEvent::AllocateCommandBuffers { count });
        Ok(raws.into_iter().map(vk::CommandBuffer::from_raw).collect())
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut shared = self.gpu.shared.lock();
        for buffer in buffers {
            let raw = buffer.as_raw();
            shared.destroy(raw, "command_buffer");
            if let Some(owned) = shared.pool_buffers.get_mut(&pool.as_raw()) {
                owned.retain(|b| *b != raw);
            }
        }
        shared.events.push(MockEvent::FreeCommandBuffers {
            count: buffers.len(),
        });
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        _info: &vk::CommandBufferBeginInfo<'_>,
    ) -> Result<()> {
        self.gpu.record(MockEvent::BeginCommandBuffer { cmd: cmd.as_raw() });
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        self.gpu.record(MockEvent::EndCommandBuffer { cmd: cmd.as_raw() });
        Ok(())
    }

    fn cmd_pipeline_barrier(
        &self,
        _cmd: vk::CommandBuffer,
        _src_stage: vk::PipelineStageFlags,
        _dst_stage: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier<'_>],
    ) {
        let mut shared = self.gpu.shared.lock();
        for barrier in image_barriers {
            let image = barrier.image.as_raw();
            shared.layouts.insert(image, barrier.new_layout);
            shared.events.push(MockEvent::PipelineBarrier {
                image,
                old_layout: barrier.old_layout,
                new_layout: barrier.new_layout,
            });
        }
    }

    fn cmd_copy_image(
        &self,
        _cmd: vk::CommandBuffer,
        src: vk::Image,
        _src_layout: vk::ImageLayout,
        dst: vk::Image,
        _dst_layout: vk::ImageLayout,
        _regions: &[vk::ImageCopy],
    ) {
        self.gpu.record(MockEvent::CopyImage {
            src: src.as_raw(),
            dst: dst.as_raw(),
        });
    }

    fn cmd_begin_render_pass(&self, _cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo<'_>) {
        let clear_color = if info.clear_value_count > 0 && !info.p_clear_values.is_null() {
            // SAFETY: the builder set the pointer from a live slice of `clear_value_count`
            // values, and the renderer only clears color attachments.
            unsafe { (*info.p_clear_values).color.float32 }
        } else {
            [0.0; 4]
        };
        self.gpu.record(MockEvent::BeginRenderPass {
            framebuffer: info.framebuffer.as_raw(),
            clear_color,
        });
    }

    fn cmd_set_viewport(&self, _cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        self.gpu.record(MockEvent::SetViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    fn cmd_set_scissor(&self, _cmd: vk::CommandBuffer, _scissor: vk::Rect2D) {
        self.gpu.record(MockEvent::SetScissor);
    }

    fn cmd_bind_graphics_pipeline(&self, _cmd: vk::CommandBuffer, _pipeline: vk::Pipeline) {
        self.gpu.record(MockEvent::BindPipeline);
    }

    fn cmd_bind_descriptor_set(
        &self,
        _cmd: vk::CommandBuffer,
        _layout: vk::PipelineLayout,
        _set: vk::DescriptorSet,
    ) {
        self.gpu.record(MockEvent::BindDescriptorSet);
    }

    fn cmd_bind_vertex_buffer(&self, _cmd: vk::CommandBuffer, _buffer: vk::Buffer) {
        self.gpu.record(MockEvent::BindVertexBuffer);
    }

    fn cmd_draw(&self, _cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        self.gpu.record(MockEvent::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn cmd_end_render_pass(&self, _cmd: vk::CommandBuffer) {
        self.gpu.record(MockEvent::EndRenderPass);
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let raw = self.create("semaphore", |semaphore| MockEvent::CreateSemaphore { semaphore });
        Ok(vk::Semaphore::from_raw(raw))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.gpu
            .shared
            .lock()
            .pending_semaphores
            .remove(&semaphore.as_raw());
        self.destroy(
            semaphore.as_raw(),
            "semaphore",
            MockEvent::DestroySemaphore {
                semaphore: semaphore.as_raw(),
            },
        );
    }

    fn create_fence(&self, _signaled: bool) -> Result<vk::Fence> {
        let raw = self.create("fence", |_| MockEvent::CreateFence);
        Ok(vk::Fence::from_raw(raw))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.gpu.shared.lock().signaled_fences.remove(&fence.as_raw());
        self.destroy(fence.as_raw(), "fence", MockEvent::DestroyFence);
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
        let mut shared = self.gpu.shared.lock();
        shared.events.push(MockEvent::WaitForFence { timeout_ns });
        if shared.config.fence_timeout || !shared.signaled_fences.contains(&fence.as_raw()) {
            return Err(GpuError::Vulkan(vk::Result::TIMEOUT));
        }
        Ok(())
    }

    fn queue_submit(
        &self,
        _queue: vk::Queue,
        submission: &Submission<'_>,
        fence: vk::Fence,
    ) -> Result<()> {
        let mut shared = self.gpu.shared.lock();
        for semaphore in submission.wait_semaphores {
            shared.pending_semaphores.remove(&semaphore.as_raw());
        }
        for semaphore in submission.signal_semaphores {
            shared.signal(semaphore.as_raw());
        }
        if fence != vk::Fence::null() {
            shared.signaled_fences.insert(fence.as_raw());
        }
        shared.events.push(MockEvent::QueueSubmit {
            command_buffers: submission
                .command_buffers
                .iter()
                .map(|cmd| cmd.as_raw())
                .collect(),
            wait_semaphores: submission
                .wait_semaphores
                .iter()
                .map(|s| s.as_raw())
                .collect(),
            signal_semaphores: submission
                .signal_semaphores
                .iter()
                .map(|s| s.as_raw())
                .collect(),
            fence: fence.as_raw(),
        });
        Ok(())
    }
}
