//! Texture upload.
//!
//! Decoded RGBA8 pixels reach the GPU in one of two ways, picked from the format
//! features of the device:
//! - **Direct**: the pixels are written into a linear, host-visible image that is
//!   sampled as is after a single layout transition.
//! - **Staging**: the pixels are written into a linear staging image and copied into a
//!   device-local optimal image, after which the staging image is released.

use ash::vk;
use gpu_allocator::MemoryLocation;
use quadview_core::{AssetSource, DecodedImage};
use quadview_gpu::command::execute_one_shot;
use quadview_gpu::error::{GpuError, Result};
use quadview_gpu::{DeviceApi, DeviceContext, GpuImage};

/// Texture image format.
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// How texel data reaches a sampleable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexturePath {
    /// Sample the linear image the pixels were written into.
    Direct,
    /// Copy from a linear staging image into an optimal image.
    Staging,
}

/// Pick the upload path from the texture format's features.
pub fn choose_upload_path(props: &vk::FormatProperties) -> Result<TexturePath> {
    if props
        .linear_tiling_features
        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE)
    {
        Ok(TexturePath::Direct)
    } else if props
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE)
    {
        Ok(TexturePath::Staging)
    } else {
        Err(GpuError::FormatNotSupported(format!(
            "{TEXTURE_FORMAT:?} cannot be sampled"
        )))
    }
}

/// Copy tightly packed rows into image memory laid out with `layout`.
///
/// Row `r` lands at `layout.offset + r * layout.row_pitch`. Bytes between rows are left
/// untouched.
pub fn copy_rows_pitched(
    dst: &mut [u8],
    layout: &vk::SubresourceLayout,
    image: &DecodedImage,
) -> Result<()> {
    let row_bytes = image.row_bytes();
    let row_pitch = layout.row_pitch as usize;
    let offset = layout.offset as usize;
    if image.height() == 0 {
        return Ok(());
    }
    if row_pitch < row_bytes {
        return Err(GpuError::InvalidState(format!(
            "Row pitch {row_pitch} is smaller than a row ({row_bytes} bytes)"
        )));
    }
    let end = offset + (image.height() as usize - 1) * row_pitch + row_bytes;
    if end > dst.len() {
        return Err(GpuError::InvalidState(format!(
            "Image memory too small: need {end} bytes, have {}",
            dst.len()
        )));
    }

    for r in 0..image.height() {
        let start = offset + r as usize * row_pitch;
        dst[start..start + row_bytes].copy_from_slice(image.row(r));
    }
    Ok(())
}

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn layout_barrier(
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
) -> vk::ImageMemoryBarrier<'static> {
    vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_range())
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
}

fn image_info(
    width: u32,
    height: u32,
    tiling: vk::ImageTiling,
    usage: vk::ImageUsageFlags,
    initial_layout: vk::ImageLayout,
) -> vk::ImageCreateInfo<'static> {
    vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(TEXTURE_FORMAT)
        .extent(vk::Extent3D {
            width,
            height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(tiling)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(initial_layout)
}

/// Create a host-visible linear image and fill it with `pixels`.
fn create_filled_linear_image(
    device: &dyn DeviceApi,
    pixels: &DecodedImage,
    usage: vk::ImageUsageFlags,
    name: &str,
) -> Result<GpuImage> {
    let info = image_info(
        pixels.width(),
        pixels.height(),
        vk::ImageTiling::LINEAR,
        usage,
        vk::ImageLayout::PREINITIALIZED,
    );
    let mut image = GpuImage::new(device, &info, MemoryLocation::CpuToGpu, name)?;

    let layout = image.color_layout(device);
    let mut copied = Ok(());
    let written = image.write_with(device, &mut |bytes| {
        copied = copy_rows_pitched(bytes, &layout, pixels);
    });
    if let Err(e) = written.and(copied) {
        image.destroy(device);
        return Err(e);
    }
    Ok(image)
}

/// A sampled texture ready for the fragment stage.
#[derive(Debug)]
pub struct Texture {
    pub image: GpuImage,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub width: u32,
    pub height: u32,
    pub path: TexturePath,
}

impl Texture {
    /// Read, decode and upload the named texture asset.
    pub fn load(
        ctx: &DeviceContext,
        assets: &dyn AssetSource,
        name: &str,
        timeout_ns: u64,
    ) -> Result<Self> {
        let bytes = assets.read(name)?;
        let pixels = DecodedImage::decode(&bytes)?;
        tracing::debug!(
            "Decoded texture {name}: {}x{}",
            pixels.width(),
            pixels.height()
        );
        Self::upload(ctx, &pixels, timeout_ns)
    }

    /// Upload decoded pixels, leaving the image in SHADER_READ_ONLY_OPTIMAL.
    pub fn upload(ctx: &DeviceContext, pixels: &DecodedImage, timeout_ns: u64) -> Result<Self> {
        let path = choose_upload_path(&ctx.format_properties(TEXTURE_FORMAT))?;
        let device = ctx.device();

        let mut image = match path {
            TexturePath::Direct => upload_direct(ctx, pixels, timeout_ns)?,
            TexturePath::Staging => upload_staged(ctx, pixels, timeout_ns)?,
        };

        match create_view_and_sampler(device, image.image) {
            Ok((view, sampler)) => {
                tracing::debug!(
                    "Texture uploaded ({}x{}, {:?} path)",
                    pixels.width(),
                    pixels.height(),
                    path
                );
                Ok(Self {
                    image,
                    view,
                    sampler,
                    width: pixels.width(),
                    height: pixels.height(),
                    path,
                })
            }
            Err(e) => {
                image.destroy(device);
                Err(e)
            }
        }
    }

    /// Texture size in pixels.
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Destroy the sampler, view and image.
    pub fn destroy(&mut self, device: &dyn DeviceApi) {
        device.destroy_sampler(self.sampler);
        device.destroy_image_view(self.view);
        self.image.destroy(device);
    }
}

fn upload_direct(ctx: &DeviceContext, pixels: &DecodedImage, timeout_ns: u64) -> Result<GpuImage> {
    let device = ctx.device();
    let mut image =
        create_filled_linear_image(device, pixels, vk::ImageUsageFlags::SAMPLED, "texture")?;

    let transitioned = execute_one_shot(device, ctx.queue_family(), ctx.queue(), timeout_ns, |cmd| {
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::HOST,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            &[layout_barrier(
                image.image,
                vk::ImageLayout::PREINITIALIZED,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::AccessFlags::HOST_WRITE,
                vk::AccessFlags::SHADER_READ,
            )],
        );
    });

    if let Err(e) = transitioned {
        image.destroy(device);
        return Err(e);
    }
    Ok(image)
}

fn upload_staged(ctx: &DeviceContext, pixels: &DecodedImage, timeout_ns: u64) -> Result<GpuImage> {
    let device = ctx.device();
    let mut staging = create_filled_linear_image(
        device,
        pixels,
        vk::ImageUsageFlags::TRANSFER_SRC,
        "texture_staging",
    )?;

    let dst_info = image_info(
        pixels.width(),
        pixels.height(),
        vk::ImageTiling::OPTIMAL,
        vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        vk::ImageLayout::UNDEFINED,
    );
    let mut texture = match GpuImage::new(device, &dst_info, MemoryLocation::GpuOnly, "texture") {
        Ok(image) => image,
        Err(e) => {
            staging.destroy(device);
            return Err(e);
        }
    };

    let copied = execute_one_shot(device, ctx.queue_family(), ctx.queue(), timeout_ns, |cmd| {
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::HOST,
            vk::PipelineStageFlags::TRANSFER,
            &[layout_barrier(
                staging.image,
                vk::ImageLayout::PREINITIALIZED,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::AccessFlags::HOST_WRITE,
                vk::AccessFlags::TRANSFER_READ,
            )],
        );
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            &[layout_barrier(
                texture.image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
            )],
        );

        let layers = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let region = vk::ImageCopy {
            src_subresource: layers,
            src_offset: vk::Offset3D::default(),
            dst_subresource: layers,
            dst_offset: vk::Offset3D::default(),
            extent: vk::Extent3D {
                width: pixels.width(),
                height: pixels.height(),
                depth: 1,
            },
        };
        device.cmd_copy_image(
            cmd,
            staging.image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            texture.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );

        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            &[layout_barrier(
                texture.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
            )],
        );
    });

    // The copy has finished (or the wait gave up), so the staging image can go.
    staging.destroy(device);
    if let Err(e) = copied {
        texture.destroy(device);
        return Err(e);
    }
    Ok(texture)
}

fn create_view_and_sampler(
    device: &dyn DeviceApi,
    image: vk::Image,
) -> Result<(vk::ImageView, vk::Sampler)> {
    let sampler_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::NEAREST)
        .min_filter(vk::Filter::NEAREST)
        .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .mip_lod_bias(0.0)
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .compare_enable(false)
        .compare_op(vk::CompareOp::NEVER)
        .min_lod(0.0)
        .max_lod(0.0)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
        .unnormalized_coordinates(false);
    let sampler = device.create_sampler(&sampler_info)?;

    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(TEXTURE_FORMAT)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::R,
            g: vk::ComponentSwizzle::G,
            b: vk::ComponentSwizzle::B,
            a: vk::ComponentSwizzle::A,
        })
        .subresource_range(color_range());
    match device.create_image_view(&view_info) {
        Ok(view) => Ok((view, sampler)),
        Err(e) => {
            device.destroy_sampler(sampler);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DecodedImage {
        let pixels = (0..width * height * 4).map(|i| (i % 251) as u8).collect();
        DecodedImage::from_rgba8(width, height, pixels).unwrap()
    }

    fn features(linear: vk::FormatFeatureFlags, optimal: vk::FormatFeatureFlags) -> vk::FormatProperties {
        vk::FormatProperties {
            linear_tiling_features: linear,
            optimal_tiling_features: optimal,
            buffer_features: vk::FormatFeatureFlags::empty(),
        }
    }

    #[test]
    fn linear_sampling_selects_direct_path() {
        let props = features(
            vk::FormatFeatureFlags::SAMPLED_IMAGE,
            vk::FormatFeatureFlags::SAMPLED_IMAGE,
        );
        assert_eq!(choose_upload_path(&props).unwrap(), TexturePath::Direct);
    }

    #[test]
    fn optimal_only_selects_staging_path() {
        let props = features(
            vk::FormatFeatureFlags::TRANSFER_SRC,
            vk::FormatFeatureFlags::SAMPLED_IMAGE,
        );
        assert_eq!(choose_upload_path(&props).unwrap(), TexturePath::Staging);
    }

    #[test]
    fn unsampleable_format_is_rejected() {
        let props = features(
            vk::FormatFeatureFlags::empty(),
            vk::FormatFeatureFlags::COLOR_ATTACHMENT,
        );
        assert!(matches!(
            choose_upload_path(&props),
            Err(GpuError::FormatNotSupported(_))
        ));
    }

    #[test]
    fn rows_land_at_pitch_offsets() {
        let image = gradient(3, 4);
        let layout = vk::SubresourceLayout {
            offset: 16,
            size: 16 + 4 * 64,
            row_pitch: 64,
            array_pitch: 0,
            depth_pitch: 0,
        };
        let mut dst = vec![0xAAu8; layout.size as usize];
        copy_rows_pitched(&mut dst, &layout, &image).unwrap();

        assert!(dst[..16].iter().all(|&b| b == 0xAA));
        for r in 0..4u32 {
            let start = 16 + r as usize * 64;
            assert_eq!(&dst[start..start + 12], image.row(r));
            assert!(dst[start + 12..start + 64].iter().all(|&b| b == 0xAA));
        }
    }

    #[test]
    fn tight_pitch_copies_contiguously() {
        let image = gradient(5, 2);
        let layout = vk::SubresourceLayout {
            offset: 0,
            size: 40,
            row_pitch: 20,
            array_pitch: 0,
            depth_pitch: 0,
        };
        let mut dst = vec![0u8; 40];
        copy_rows_pitched(&mut dst, &layout, &image).unwrap();
        assert_eq!(dst, image.pixels());
    }

    #[test]
    fn short_destination_is_rejected() {
        let image = gradient(4, 4);
        let layout = vk::SubresourceLayout {
            offset: 0,
            size: 0,
            row_pitch: 16,
            array_pitch: 0,
            depth_pitch: 0,
        };
        let mut dst = vec![0u8; 63];
        assert!(copy_rows_pitched(&mut dst, &layout, &image).is_err());

        let narrow = vk::SubresourceLayout {
            row_pitch: 8,
            ..layout
        };
        let mut dst = vec![0u8; 256];
        assert!(copy_rows_pitched(&mut dst, &narrow, &image).is_err());
    }
}
