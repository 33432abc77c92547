//! Per-frame acquire, record, submit and present.

use ash::vk;
use quadview_gpu::command::{
    begin_command_buffer, end_command_buffer, submit_command_buffers, CommandPool,
};
use quadview_gpu::error::{GpuError, Result};
use quadview_gpu::swapchain::{is_out_of_date, SlotTargets};
use quadview_gpu::{
    DeviceApi, DeviceContext, GraphicsPipeline, ImageSlots, PresentationSurface,
    SemaphoreRotation, Swapchain,
};

/// What a frame draws.
#[derive(Debug, Clone, Copy)]
pub struct FramePass<'a> {
    pub render_pass: vk::RenderPass,
    pub pipeline: &'a GraphicsPipeline,
    pub descriptor_set: vk::DescriptorSet,
    pub vertex_buffer: vk::Buffer,
    pub vertex_count: u32,
    pub clear_color: [f32; 4],
}

/// Result of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The image was presented.
    Presented { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface; nothing was presented.
    OutOfDate,
}

/// Swapchain plus everything kept per swapchain image: lazily created targets, one
/// command buffer and a semaphore pair per image.
pub struct FrameOrchestrator {
    swapchain: Swapchain,
    slots: ImageSlots,
    command_pool: CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    semaphores: SemaphoreRotation,
}

impl FrameOrchestrator {
    /// Take ownership of `swapchain` and create its per-image state.
    ///
    /// On failure everything, including the swapchain, is destroyed.
    pub fn new(ctx: &DeviceContext, swapchain: Swapchain) -> Result<Self> {
        let command_pool = match CommandPool::new(
            ctx.device(),
            ctx.queue_family(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        ) {
            Ok(pool) => pool,
            Err(e) => {
                swapchain.destroy(ctx);
                return Err(e);
            }
        };
        Self::with_pool(ctx, swapchain, command_pool)
    }

    fn with_pool(ctx: &DeviceContext, swapchain: Swapchain, command_pool: CommandPool) -> Result<Self> {
        let device = ctx.device();
        let count = swapchain.image_count();

        let command_buffers = match command_pool.allocate_command_buffers(device, count as u32) {
            Ok(buffers) => buffers,
            Err(e) => {
                command_pool.destroy(device);
                swapchain.destroy(ctx);
                return Err(e);
            }
        };

        let semaphores = match SemaphoreRotation::new(device, count) {
            Ok(semaphores) => semaphores,
            Err(e) => {
                command_pool.destroy(device);
                swapchain.destroy(ctx);
                return Err(e);
            }
        };

        tracing::debug!(
            "Per-image state created: {} command buffers, {} semaphores",
            command_buffers.len(),
            semaphores.total()
        );

        Ok(Self {
            swapchain,
            slots: ImageSlots::new(count),
            command_pool,
            command_buffers,
            semaphores,
        })
    }

    /// Replace the swapchain with one sized for the surface's current state.
    ///
    /// The old swapchain is handed to the new one for retirement and then destroyed.
    /// The device must be idle. On failure everything is destroyed.
    pub fn recreate(
        mut self,
        ctx: &DeviceContext,
        surface: &PresentationSurface,
        desired: (u32, u32),
    ) -> Result<Self> {
        self.release_per_image(ctx.device());

        let created = Swapchain::new(ctx, surface, desired, Some(self.swapchain.handle));
        self.swapchain.destroy(ctx);

        match created {
            Ok(swapchain) => Self::with_pool(ctx, swapchain, self.command_pool),
            Err(e) => {
                self.command_pool.destroy(ctx.device());
                Err(e)
            }
        }
    }

    /// Render and present one frame.
    ///
    /// With `tolerate_out_of_date`, an out-of-date swapchain yields
    /// [`FrameOutcome::OutOfDate`] instead of an error.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn draw_frame(
        &mut self,
        ctx: &DeviceContext,
        pass: &FramePass<'_>,
        tolerate_out_of_date: bool,
    ) -> Result<FrameOutcome> {
        let working = self.semaphores.working_pair();

        let (image_index, acquire_suboptimal) =
            match self.swapchain.acquire_next_image(ctx, working.acquire) {
                Ok(acquired) => acquired,
                Err(e) if tolerate_out_of_date && is_out_of_date(&e) => {
                    return Ok(FrameOutcome::OutOfDate)
                }
                Err(e) => return Err(e),
            };
        let index = image_index as usize;

        let device = ctx.device();
        let image = *self.swapchain.images.get(index).ok_or_else(|| {
            GpuError::InvalidState(format!("Acquired unknown image {image_index}"))
        })?;
        let format = self.swapchain.format;
        let extent = self.swapchain.extent;
        let targets = self.slots.get_or_create(index, || {
            tracing::debug!("Creating view and framebuffer for image {image_index}");
            SlotTargets::create(device, image, format, pass.render_pass, extent)
        })?;

        let cmd = self.command_buffers.get(index).copied().ok_or_else(|| {
            GpuError::InvalidState(format!("No command buffer for image {image_index}"))
        })?;
        record_frame(device, cmd, targets.framebuffer, extent, pass)?;

        submit_command_buffers(
            device,
            ctx.queue(),
            &[cmd],
            &[working.acquire],
            &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
            &[working.render],
            vk::Fence::null(),
        )?;

        let present_suboptimal = match self.swapchain.present(ctx, image_index, working.render) {
            Ok(suboptimal) => suboptimal,
            Err(e) if tolerate_out_of_date && is_out_of_date(&e) => {
                // The submission still used the working pair; keep the rotation honest.
                self.semaphores.rotate(index)?;
                return Ok(FrameOutcome::OutOfDate);
            }
            Err(e) => return Err(e),
        };

        self.semaphores.rotate(index)?;

        Ok(FrameOutcome::Presented {
            image_index,
            suboptimal: acquire_suboptimal || present_suboptimal,
        })
    }

    /// Current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    /// Number of swapchain images.
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Number of images whose view and framebuffer exist.
    pub fn framebuffers_created(&self) -> usize {
        self.slots.created_count()
    }

    /// Number of per-image command buffers.
    pub fn command_buffer_count(&self) -> usize {
        self.command_buffers.len()
    }

    /// Number of semaphores owned.
    pub fn semaphore_count(&self) -> usize {
        self.semaphores.total()
    }

    fn release_per_image(&mut self, device: &dyn DeviceApi) {
        self.slots.destroy(device);
        self.command_pool
            .free_command_buffers(device, &self.command_buffers);
        self.command_buffers.clear();
        self.semaphores.destroy(device);
    }

    /// Destroy per-image state, the command pool and the swapchain. The device must be idle.
    pub fn destroy(mut self, ctx: &DeviceContext) {
        self.release_per_image(ctx.device());
        self.command_pool.destroy(ctx.device());
        self.swapchain.destroy(ctx);
    }
}

fn record_frame(
    device: &dyn DeviceApi,
    cmd: vk::CommandBuffer,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
    pass: &FramePass<'_>,
) -> Result<()> {
    begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;

    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: pass.clear_color,
        },
    }];
    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    let begin_info = vk::RenderPassBeginInfo::default()
        .render_pass(pass.render_pass)
        .framebuffer(framebuffer)
        .render_area(render_area)
        .clear_values(&clear_values);
    device.cmd_begin_render_pass(cmd, &begin_info);

    device.cmd_set_viewport(
        cmd,
        vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        },
    );
    device.cmd_set_scissor(cmd, render_area);

    device.cmd_bind_graphics_pipeline(cmd, pass.pipeline.pipeline);
    device.cmd_bind_descriptor_set(cmd, pass.pipeline.layout, pass.descriptor_set);
    device.cmd_bind_vertex_buffer(cmd, pass.vertex_buffer);
    device.cmd_draw(cmd, pass.vertex_count, 1);

    device.cmd_end_render_pass(cmd);
    end_command_buffer(device, cmd)
}
