//! The quad pipeline and its vertex buffer.

use ash::vk;
use gpu_allocator::MemoryLocation;
use quadview_core::vertex::QUAD_VERTEX_COUNT;
use quadview_core::{quad_vertices, QuadVertex};
use quadview_gpu::error::Result;
use quadview_gpu::pipeline::spirv_words;
use quadview_gpu::{
    create_color_render_pass, write_combined_image_sampler, DescriptorPool,
    DescriptorSetLayoutBuilder, DeviceApi, GpuBuffer, GraphicsPipeline, GraphicsPipelineConfig,
};

use crate::texture::Texture;

/// Vertex buffer binding of the quad.
pub fn vertex_bindings() -> Vec<vk::VertexInputBindingDescription> {
    vec![vk::VertexInputBindingDescription {
        binding: 0,
        stride: QuadVertex::STRIDE,
        input_rate: vk::VertexInputRate::VERTEX,
    }]
}

/// Position and texture coordinate attributes.
pub fn vertex_attributes() -> Vec<vk::VertexInputAttributeDescription> {
    vec![
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: QuadVertex::UV_OFFSET,
        },
    ]
}

/// Descriptor set, render pass and graphics pipeline that draw the textured quad.
#[derive(Debug)]
pub struct QuadPipeline {
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub descriptor_pool: DescriptorPool,
    pub descriptor_set: vk::DescriptorSet,
    pub render_pass: vk::RenderPass,
    pub pipeline: GraphicsPipeline,
}

impl QuadPipeline {
    /// Create the pipeline objects for a swapchain of `format`, sampling `texture`.
    pub fn new(
        device: &dyn DeviceApi,
        format: vk::Format,
        texture: &Texture,
        vertex_spirv: &[u8],
        fragment_spirv: &[u8],
    ) -> Result<Self> {
        let vertex_shader = spirv_words(vertex_spirv)?;
        let fragment_shader = spirv_words(fragment_spirv)?;

        // Binding 0: the texture, sampled by the fragment stage
        let descriptor_set_layout = DescriptorSetLayoutBuilder::new()
            .combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;

        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 1,
        }];
        let descriptor_pool = match DescriptorPool::new(device, 1, &pool_sizes) {
            Ok(pool) => pool,
            Err(e) => {
                device.destroy_descriptor_set_layout(descriptor_set_layout);
                return Err(e);
            }
        };

        let release_descriptors = || {
            descriptor_pool.destroy(device);
            device.destroy_descriptor_set_layout(descriptor_set_layout);
        };

        let descriptor_set = match descriptor_pool.allocate_one(device, descriptor_set_layout) {
            Ok(set) => set,
            Err(e) => {
                release_descriptors();
                return Err(e);
            }
        };
        write_combined_image_sampler(
            device,
            descriptor_set,
            0,
            texture.sampler,
            texture.view,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );

        let render_pass = match create_color_render_pass(device, format) {
            Ok(render_pass) => render_pass,
            Err(e) => {
                release_descriptors();
                return Err(e);
            }
        };

        let config = GraphicsPipelineConfig {
            vertex_shader,
            fragment_shader,
            vertex_bindings: vertex_bindings(),
            vertex_attributes: vertex_attributes(),
            topology: vk::PrimitiveTopology::TRIANGLE_STRIP,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::CLOCKWISE,
            render_pass,
            ..Default::default()
        };
        let pipeline = match GraphicsPipeline::new(device, &config, &[descriptor_set_layout]) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                device.destroy_render_pass(render_pass);
                release_descriptors();
                return Err(e);
            }
        };

        tracing::debug!("Quad pipeline created");

        Ok(Self {
            descriptor_set_layout,
            descriptor_pool,
            descriptor_set,
            render_pass,
            pipeline,
        })
    }

    /// Destroy the pipeline, render pass and descriptor objects.
    pub fn destroy(&self, device: &dyn DeviceApi) {
        self.pipeline.destroy(device);
        device.destroy_render_pass(self.render_pass);
        self.descriptor_pool.destroy(device);
        device.destroy_descriptor_set_layout(self.descriptor_set_layout);
    }
}

/// Host-visible vertex buffer holding the aspect-corrected quad.
#[derive(Debug)]
pub struct QuadBuffer {
    buffer: GpuBuffer,
}

impl QuadBuffer {
    /// Size of the four quad vertices in bytes.
    pub const SIZE: u64 = QuadVertex::STRIDE as u64 * QUAD_VERTEX_COUNT as u64;

    /// Create the buffer and write the quad for the given surface and texture sizes.
    pub fn new(device: &dyn DeviceApi, surface: (u32, u32), texture: (u32, u32)) -> Result<Self> {
        let buffer = GpuBuffer::new(
            device,
            Self::SIZE,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            MemoryLocation::CpuToGpu,
            "quad_vertices",
        )?;
        let mut quad = Self { buffer };
        if let Err(e) = quad.update(device, surface, texture) {
            quad.destroy(device);
            return Err(e);
        }
        Ok(quad)
    }

    /// Rewrite the vertices for a new surface size.
    pub fn update(&self, device: &dyn DeviceApi, surface: (u32, u32), texture: (u32, u32)) -> Result<()> {
        let vertices = quad_vertices(surface, texture);
        self.buffer.write(device, &vertices)
    }

    /// Get the raw buffer handle.
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.buffer
    }

    /// Destroy the buffer.
    pub fn destroy(&mut self, device: &dyn DeviceApi) {
        self.buffer.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_input_matches_vertex_layout() {
        let bindings = vertex_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].stride, 20);

        let attributes = vertex_attributes();
        assert_eq!(attributes[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[1].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attributes[1].offset, 12);
    }

    #[test]
    fn buffer_holds_four_vertices() {
        assert_eq!(QuadBuffer::SIZE, 80);
    }
}
