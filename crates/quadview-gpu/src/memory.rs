//! GPU buffers and images with their memory.

use ash::vk;
use bytemuck::Pod;
use gpu_allocator::MemoryLocation;

use crate::error::{GpuError, Result};
use crate::loader::{AllocationDesc, DeviceApi, GpuMemory};

fn free_or_warn(device: &dyn DeviceApi, memory: GpuMemory, what: &str) {
    if let Err(e) = device.free_memory(memory) {
        tracing::warn!("Failed to free {what} memory: {e}");
    }
}

/// A GPU buffer with its allocation.
#[derive(Debug)]
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub memory: Option<GpuMemory>,
    pub size: u64,
}

impl GpuBuffer {
    /// Create a buffer and bind freshly allocated memory to it.
    pub fn new(
        device: &dyn DeviceApi,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Self> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = device.create_buffer(&buffer_info)?;

        let requirements = device.buffer_memory_requirements(buffer);
        let memory = match device.allocate_memory(&AllocationDesc {
            name,
            requirements,
            location,
            linear: true,
        }) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_buffer(buffer);
                return Err(e);
            }
        };

        if let Err(e) = device.bind_buffer_memory(buffer, &memory) {
            free_or_warn(device, memory, name);
            device.destroy_buffer(buffer);
            return Err(e);
        }

        Ok(Self {
            buffer,
            memory: Some(memory),
            size,
        })
    }

    /// Write data to the start of the buffer (must be host-visible).
    pub fn write<T: Pod>(&self, device: &dyn DeviceApi, data: &[T]) -> Result<()> {
        self.write_bytes(device, 0, bytemuck::cast_slice(data))
    }

    /// Write raw bytes to the buffer at the given offset (must be host-visible).
    pub fn write_bytes(&self, device: &dyn DeviceApi, offset: u64, data: &[u8]) -> Result<()> {
        let memory = self
            .memory
            .as_ref()
            .ok_or_else(|| GpuError::InvalidState("Buffer has no memory".to_string()))?;
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| GpuError::InvalidState("Offset overflow".to_string()))?;
        if end > self.size {
            return Err(GpuError::InvalidState(
                "Data range too large for buffer".to_string(),
            ));
        }
        device.write_memory(memory, &mut |bytes| {
            bytes[offset as usize..end as usize].copy_from_slice(data);
        })
    }

    /// Destroy the buffer and free its memory.
    pub fn destroy(&mut self, device: &dyn DeviceApi) {
        device.destroy_buffer(self.buffer);
        if let Some(memory) = self.memory.take() {
            free_or_warn(device, memory, "buffer");
        }
        self.buffer = vk::Buffer::null();
    }
}

/// A GPU image with its allocation.
#[derive(Debug)]
pub struct GpuImage {
    pub image: vk::Image,
    pub memory: Option<GpuMemory>,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub tiling: vk::ImageTiling,
}

impl GpuImage {
    /// Create an image and bind freshly allocated memory to it.
    pub fn new(
        device: &dyn DeviceApi,
        create_info: &vk::ImageCreateInfo<'_>,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Self> {
        let image = device.create_image(create_info)?;

        let requirements = device.image_memory_requirements(image);
        let memory = match device.allocate_memory(&AllocationDesc {
            name,
            requirements,
            location,
            linear: create_info.tiling == vk::ImageTiling::LINEAR,
        }) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_image(image);
                return Err(e);
            }
        };

        if let Err(e) = device.bind_image_memory(image, &memory) {
            free_or_warn(device, memory, name);
            device.destroy_image(image);
            return Err(e);
        }

        Ok(Self {
            image,
            memory: Some(memory),
            format: create_info.format,
            extent: create_info.extent,
            tiling: create_info.tiling,
        })
    }

    /// Layout of the color subresource at mip 0, layer 0. Meaningful for linear tiling.
    pub fn color_layout(&self, device: &dyn DeviceApi) -> vk::SubresourceLayout {
        device.image_subresource_layout(
            self.image,
            vk::ImageSubresource {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                array_layer: 0,
            },
        )
    }

    /// Write into the mapped image memory (must be host-visible).
    pub fn write_with(&self, device: &dyn DeviceApi, write: &mut dyn FnMut(&mut [u8])) -> Result<()> {
        let memory = self
            .memory
            .as_ref()
            .ok_or_else(|| GpuError::InvalidState("Image has no memory".to_string()))?;
        device.write_memory(memory, write)
    }

    /// Destroy the image and free its memory.
    pub fn destroy(&mut self, device: &dyn DeviceApi) {
        device.destroy_image(self.image);
        if let Some(memory) = self.memory.take() {
            free_or_warn(device, memory, "image");
        }
        self.image = vk::Image::null();
    }
}
