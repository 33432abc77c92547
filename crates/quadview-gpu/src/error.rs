//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader library could not be loaded.
    #[error("Vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),

    /// Instance API version is too old.
    #[error("Vulkan {found} is below the required {required}")]
    UnsupportedApiVersion { found: String, required: String },

    /// No physical device found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No queue family with graphics support.
    #[error("No graphics-capable queue family")]
    NoGraphicsQueue,

    /// Required extension not supported.
    #[error("Required extension not supported: {0}")]
    ExtensionNotSupported(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// The queue family cannot present to the surface.
    #[error("Queue family {0} cannot present to the surface")]
    PresentNotSupported(u32),

    /// Required format is not offered.
    #[error("Format not supported: {0}")]
    FormatNotSupported(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Shader module creation failed.
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// A bounded wait expired.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Asset loading or decoding failed.
    #[error("Asset error: {0}")]
    Asset(#[from] quadview_core::Error),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

/// Format a packed Vulkan version as `major.minor.patch`.
pub fn format_version(version: u32) -> String {
    format!(
        "{}.{}.{}",
        vk::api_version_major(version),
        vk::api_version_minor(version),
        vk::api_version_patch(version)
    )
}
