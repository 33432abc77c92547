//! GPU identification.

use ash::vk;

use crate::error::format_version;
use crate::loader::InstanceApi;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Arm,
    Qualcomm,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            0x13B5 => Self::Arm,
            0x5143 => Self::Qualcomm,
            other => Self::Other(other),
        }
    }
}

/// What gets logged about the selected device.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    /// Device name
    pub name: String,
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Vulkan API version
    pub api_version: u32,
}

impl DeviceSummary {
    /// Query the summary of a physical device.
    pub fn query(instance: &dyn InstanceApi, physical_device: vk::PhysicalDevice) -> Self {
        let props = instance.physical_device_properties(physical_device);
        let name = props
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "<unnamed>".to_string());

        Self {
            name,
            vendor: GpuVendor::from_vendor_id(props.vendor_id),
            api_version: props.api_version,
        }
    }

    /// Get a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, Vulkan {})",
            self.name,
            self.vendor,
            format_version(self.api_version)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x5143), GpuVendor::Qualcomm);
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn summary_line() {
        let summary = DeviceSummary {
            name: "Adreno 640".to_string(),
            vendor: GpuVendor::Qualcomm,
            api_version: vk::API_VERSION_1_1,
        };
        assert_eq!(summary.summary(), "Adreno 640 (Qualcomm, Vulkan 1.1.0)");
    }
}
