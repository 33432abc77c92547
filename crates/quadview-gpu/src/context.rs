//! Device context management.

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::capabilities::DeviceSummary;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, has_extension, required_device_extensions};
use crate::loader::{DeviceApi, DeviceDesc, GlobalApi, InstanceApi};

/// Instance, logical device and the single graphics queue.
///
/// Dropping the context waits for the device to go idle, then destroys the device and
/// the instance. Everything created from the device must be destroyed first.
pub struct DeviceContext {
    instance: Box<dyn InstanceApi>,
    physical_device: vk::PhysicalDevice,
    device: Box<dyn DeviceApi>,
    queue_family: u32,
    queue: vk::Queue,
    summary: DeviceSummary,
}

impl DeviceContext {
    /// Get the instance scope.
    pub fn instance(&self) -> &dyn InstanceApi {
        self.instance.as_ref()
    }

    /// Get the device scope.
    pub fn device(&self) -> &dyn DeviceApi {
        self.device.as_ref()
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the graphics queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Get the graphics queue.
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// Get the selected device summary.
    pub fn summary(&self) -> &DeviceSummary {
        &self.summary
    }

    /// Query format support on the selected device.
    pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        self.instance.format_properties(self.physical_device, format)
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            tracing::warn!("wait_idle failed during teardown: {e}");
        }
        self.device.destroy_device();
        self.instance.destroy_instance();
        tracing::debug!("Device context destroyed");
    }
}

/// Builder for creating a device context.
pub struct DeviceContextBuilder {
    app_name: String,
    validation: bool,
}

impl Default for DeviceContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "quadview".to_string(),
            validation: false,
        }
    }
}

impl DeviceContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.validation = enable;
        self
    }

    /// Build the device context.
    pub fn build(&self, global: &dyn GlobalApi, display: RawDisplayHandle) -> Result<DeviceContext> {
        let instance = create_instance(global, display, &self.app_name, self.validation)?;

        match select_device(instance.as_ref()) {
            Ok((physical_device, queue_family, device)) => {
                let queue = device.queue(queue_family, 0);
                let summary = DeviceSummary::query(instance.as_ref(), physical_device);
                tracing::info!("Selected GPU: {}", summary.summary());

                Ok(DeviceContext {
                    instance,
                    physical_device,
                    device,
                    queue_family,
                    queue,
                    summary,
                })
            }
            Err(e) => {
                instance.destroy_instance();
                Err(e)
            }
        }
    }
}

/// Pick the first physical device and create a logical device with one graphics queue.
fn select_device(
    instance: &dyn InstanceApi,
) -> Result<(vk::PhysicalDevice, u32, Box<dyn DeviceApi>)> {
    let physical_device = instance
        .enumerate_physical_devices()?
        .first()
        .copied()
        .ok_or(GpuError::NoSuitableDevice)?;

    let extensions = required_device_extensions();
    let available = instance.device_extensions(physical_device)?;
    if let Some(missing) = extensions.iter().find(|ext| !has_extension(&available, ext)) {
        return Err(GpuError::ExtensionNotSupported(missing.clone()));
    }

    let queue_family = find_graphics_queue_family(&instance.queue_family_properties(physical_device))
        .ok_or(GpuError::NoGraphicsQueue)?;

    let device = instance.create_device(
        physical_device,
        &DeviceDesc {
            queue_family,
            extensions: &extensions,
        },
    )?;

    Ok((physical_device, queue_family, device))
}

/// Index of the first queue family with graphics support.
pub fn find_graphics_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|index| index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn first_graphics_family_wins() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
        ];
        assert_eq!(find_graphics_queue_family(&families), Some(1));
    }

    #[test]
    fn no_graphics_family() {
        let families = [family(vk::QueueFlags::COMPUTE)];
        assert_eq!(find_graphics_queue_family(&families), None);
    }
}
