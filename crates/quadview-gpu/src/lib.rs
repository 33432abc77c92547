//! Vulkan abstraction layer for the quadview renderer.
//!
//! This crate provides:
//! - Capability provider traits for the global, instance and device scopes
//! - The ash-backed provider with gpu-allocator memory management
//! - Instance and device creation
//! - Surface, swapchain and lazily built per-image targets
//! - Command buffer, synchronization, descriptor and pipeline helpers

pub mod capabilities;
pub mod command;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod loader;
pub mod memory;
pub mod pipeline;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod vulkan;

pub use capabilities::{DeviceSummary, GpuVendor};
pub use context::{DeviceContext, DeviceContextBuilder};
pub use descriptors::{write_combined_image_sampler, DescriptorPool, DescriptorSetLayoutBuilder};
pub use error::{GpuError, Result};
pub use loader::{
    AllocationDesc, DeviceApi, DeviceDesc, GlobalApi, GpuMemory, InstanceApi, InstanceDesc,
    NativeWindow, Submission,
};
pub use memory::{GpuBuffer, GpuImage};
pub use pipeline::{create_color_render_pass, GraphicsPipeline, GraphicsPipelineConfig};
pub use surface::PresentationSurface;
pub use swapchain::{ImageSlots, Swapchain};
pub use sync::SemaphoreRotation;
pub use vulkan::VulkanLoader;

// Re-exported so downstream crates name the same memory locations as the provider.
pub use gpu_allocator::MemoryLocation;
