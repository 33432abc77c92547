//! Vulkan instance creation.

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::error::{format_version, GpuError, Result};
use crate::loader::{GlobalApi, InstanceApi, InstanceDesc};

/// Lowest instance API version the renderer accepts.
pub const MIN_API_VERSION: u32 = vk::API_VERSION_1_1;

/// Required device extensions.
pub fn required_device_extensions() -> Vec<String> {
    vec![ash::khr::swapchain::NAME.to_string_lossy().into_owned()]
}

/// Check whether `name` is present in an extension list.
pub fn has_extension(available: &[String], name: &str) -> bool {
    available.iter().any(|ext| ext == name)
}

/// Create an instance with the surface extensions for `display` enabled.
///
/// Fails before anything is created if the instance version is below
/// [`MIN_API_VERSION`] or a required extension is missing.
pub fn create_instance(
    global: &dyn GlobalApi,
    display: RawDisplayHandle,
    app_name: &str,
    validation: bool,
) -> Result<Box<dyn InstanceApi>> {
    let version = global.instance_version()?;
    if version < MIN_API_VERSION {
        return Err(GpuError::UnsupportedApiVersion {
            found: format_version(version),
            required: format_version(MIN_API_VERSION),
        });
    }

    let required = global.surface_extensions(display)?;
    let available = global.instance_extensions()?;
    if let Some(missing) = required.iter().find(|ext| !has_extension(&available, ext)) {
        return Err(GpuError::ExtensionNotSupported(missing.clone()));
    }

    tracing::debug!(
        "Creating instance (Vulkan {}, extensions: {:?})",
        format_version(version),
        required
    );

    global.create_instance(&InstanceDesc {
        app_name,
        api_version: MIN_API_VERSION,
        extensions: &required,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapchain_extension_is_required() {
        assert_eq!(required_device_extensions(), vec!["VK_KHR_swapchain"]);
    }

    #[test]
    fn extension_lookup_is_exact() {
        let available = vec!["VK_KHR_surface".to_string(), "VK_KHR_xcb_surface".to_string()];
        assert!(has_extension(&available, "VK_KHR_surface"));
        assert!(!has_extension(&available, "VK_KHR_surface2"));
    }
}
