//! Synchronization primitives.

use ash::vk;

use crate::error::{GpuError, Result};
use crate::loader::DeviceApi;

/// Wait for a fence to be signaled, giving up after `timeout_ns`.
#[cfg_attr(
    feature = "profiling-tracy",
    tracing::instrument(level = "trace", skip_all)
)]
pub fn wait_for_fence(device: &dyn DeviceApi, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
    match device.wait_for_fence(fence, timeout_ns) {
        Err(GpuError::Vulkan(vk::Result::TIMEOUT)) => Err(GpuError::Timeout(format!(
            "fence not signaled within {timeout_ns} ns"
        ))),
        other => other,
    }
}

/// Acquire and render semaphores used together by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphorePair {
    /// Signaled when the acquired image is ready to be rendered to.
    pub acquire: vk::Semaphore,
    /// Signaled when rendering is complete and the image can be presented.
    pub render: vk::Semaphore,
}

impl SemaphorePair {
    fn new(device: &dyn DeviceApi) -> Result<Self> {
        let acquire = device.create_semaphore()?;
        match device.create_semaphore() {
            Ok(render) => Ok(Self { acquire, render }),
            Err(e) => {
                device.destroy_semaphore(acquire);
                Err(e)
            }
        }
    }

    fn destroy(&self, device: &dyn DeviceApi) {
        device.destroy_semaphore(self.acquire);
        device.destroy_semaphore(self.render);
    }
}

/// Per-image semaphore pairs plus one spare pair.
///
/// A frame always works with the spare pair. Once it is submitted for image `i`, the pair
/// previously installed for `i` becomes the spare: the image being acquired again means
/// the frame that used that pair has been presented.
#[derive(Debug)]
pub struct SemaphoreRotation {
    slots: Vec<SemaphorePair>,
    free: SemaphorePair,
}

impl SemaphoreRotation {
    /// Create pairs for `image_count` images plus the spare.
    pub fn new(device: &dyn DeviceApi, image_count: usize) -> Result<Self> {
        let mut pairs = Vec::with_capacity(image_count + 1);
        for _ in 0..=image_count {
            match SemaphorePair::new(device) {
                Ok(pair) => pairs.push(pair),
                Err(e) => {
                    for pair in &pairs {
                        pair.destroy(device);
                    }
                    return Err(e);
                }
            }
        }
        let free = pairs
            .pop()
            .ok_or_else(|| GpuError::InvalidState("No semaphore pairs created".to_string()))?;
        Ok(Self::from_pairs(pairs, free))
    }

    /// Assemble a rotation from existing pairs.
    pub fn from_pairs(slots: Vec<SemaphorePair>, free: SemaphorePair) -> Self {
        Self { slots, free }
    }

    /// The pair the next frame works with.
    pub fn working_pair(&self) -> SemaphorePair {
        self.free
    }

    /// Install the working pair in slot `image_index` and free the pair it replaces.
    pub fn rotate(&mut self, image_index: usize) -> Result<()> {
        let count = self.slots.len();
        let slot = self.slots.get_mut(image_index).ok_or_else(|| {
            GpuError::InvalidState(format!("Image index {image_index} out of range ({count} slots)"))
        })?;
        std::mem::swap(&mut self.free, slot);
        Ok(())
    }

    /// The pair installed for an image.
    pub fn slot(&self, image_index: usize) -> Option<SemaphorePair> {
        self.slots.get(image_index).copied()
    }

    /// Number of image slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Total number of semaphores owned.
    pub fn total(&self) -> usize {
        (self.slots.len() + 1) * 2
    }

    /// Destroy every semaphore. None may be in use.
    pub fn destroy(&mut self, device: &dyn DeviceApi) {
        for pair in self.slots.drain(..) {
            pair.destroy(device);
        }
        self.free.destroy(device);
        self.free = SemaphorePair {
            acquire: vk::Semaphore::null(),
            render: vk::Semaphore::null(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::collections::{HashMap, HashSet};

    fn pair(n: u64) -> SemaphorePair {
        SemaphorePair {
            acquire: vk::Semaphore::from_raw(2 * n + 1),
            render: vk::Semaphore::from_raw(2 * n + 2),
        }
    }

    fn rotation(images: u64) -> SemaphoreRotation {
        SemaphoreRotation::from_pairs((0..images).map(pair).collect(), pair(images))
    }

    #[test]
    fn counts() {
        let rotation = rotation(3);
        assert_eq!(rotation.slot_count(), 3);
        assert_eq!(rotation.total(), 8);
    }

    #[test]
    fn rotate_swaps_working_and_slot() {
        let mut rotation = rotation(3);
        let working = rotation.working_pair();
        rotation.rotate(1).unwrap();
        assert_eq!(rotation.slot(1), Some(working));
        assert_eq!(rotation.working_pair(), pair(1));
    }

    #[test]
    fn working_pair_is_never_in_flight() {
        let mut rotation = rotation(3);
        let mut in_flight: HashMap<usize, SemaphorePair> = HashMap::new();
        let order = [0, 1, 2, 0, 1, 2, 2, 0, 1, 1, 0, 2, 0, 0, 1];

        for &image in &order {
            let working = rotation.working_pair();
            assert!(
                !in_flight.values().any(|&p| p == working),
                "pair {working:?} reused while image still in flight"
            );
            in_flight.insert(image, working);
            rotation.rotate(image).unwrap();
        }

        let mut all = HashSet::new();
        for index in 0..rotation.slot_count() {
            let p = rotation.slot(index).unwrap();
            all.insert(p.acquire);
            all.insert(p.render);
        }
        all.insert(rotation.working_pair().acquire);
        all.insert(rotation.working_pair().render);
        assert_eq!(all.len(), rotation.total());
    }

    #[test]
    fn rotate_rejects_unknown_image() {
        let mut rotation = rotation(2);
        assert!(rotation.rotate(2).is_err());
        assert_eq!(rotation.working_pair(), pair(2));
    }
}
