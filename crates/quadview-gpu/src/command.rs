//! Command buffer management.

use ash::vk;

use crate::error::{GpuError, Result};
use crate::loader::{DeviceApi, Submission};
use crate::sync::wait_for_fence;

/// Command pool for allocating command buffers.
#[derive(Debug)]
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    pub fn new(
        device: &dyn DeviceApi,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = device.create_command_pool(&create_info)?;

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate multiple primary command buffers.
    pub fn allocate_command_buffers(
        &self,
        device: &dyn DeviceApi,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        device.allocate_command_buffers(&alloc_info)
    }

    /// Free command buffers allocated from this pool.
    pub fn free_command_buffers(&self, device: &dyn DeviceApi, buffers: &[vk::CommandBuffer]) {
        if !buffers.is_empty() {
            device.free_command_buffers(self.pool, buffers);
        }
    }

    /// Destroy the command pool and every buffer still allocated from it.
    pub fn destroy(&self, device: &dyn DeviceApi) {
        device.destroy_command_pool(self.pool);
    }
}

/// Begin recording a command buffer.
pub fn begin_command_buffer(
    device: &dyn DeviceApi,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
    device.begin_command_buffer(cmd, &begin_info)
}

/// End recording a command buffer.
pub fn end_command_buffer(device: &dyn DeviceApi, cmd: vk::CommandBuffer) -> Result<()> {
    device.end_command_buffer(cmd)
}

/// Submit command buffers to a queue.
#[cfg_attr(
    feature = "profiling-tracy",
    tracing::instrument(level = "trace", skip_all)
)]
pub fn submit_command_buffers(
    device: &dyn DeviceApi,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    device.queue_submit(
        queue,
        &Submission {
            command_buffers,
            wait_semaphores,
            wait_stages,
            signal_semaphores,
        },
        fence,
    )
}

/// Record and run a one-shot command buffer, waiting at most `timeout_ns` for it.
///
/// The buffer comes from a dedicated transient pool that is destroyed afterwards, along
/// with the fence, whether or not the wait succeeded. When the wait fails the device is
/// drained first, so nothing the submission references is released while still pending.
pub fn execute_one_shot<F>(
    device: &dyn DeviceApi,
    queue_family: u32,
    queue: vk::Queue,
    timeout_ns: u64,
    record: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let pool = CommandPool::new(device, queue_family, vk::CommandPoolCreateFlags::TRANSIENT)?;
    let result = (|| {
        let cmd = pool
            .allocate_command_buffers(device, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| GpuError::InvalidState("No command buffer allocated".to_string()))?;

        begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(cmd);
        end_command_buffer(device, cmd)?;

        let fence = device.create_fence(false)?;
        let submitted = submit_command_buffers(device, queue, &[cmd], &[], &[], &[], fence)
            .and_then(|()| wait_for_fence(device, fence, timeout_ns));
        if let Err(e) = &submitted {
            tracing::warn!("One-shot submission did not complete ({e}), waiting for device idle");
            if let Err(idle) = device.wait_idle() {
                tracing::warn!("wait_idle failed after one-shot submission: {idle}");
            }
        }
        device.destroy_fence(fence);
        submitted
    })();
    pool.destroy(device);
    result
}
