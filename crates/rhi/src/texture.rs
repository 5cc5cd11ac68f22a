//! Sampled textures loaded from files or raw pixels.
//!
//! A texture bundles a device-local image, a sampler, and the
//! `vk::DescriptorImageInfo` snapshot descriptor writers bind from. Pixels
//! go through a staging buffer and a one-shot transfer submission; by the
//! time a constructor returns, the image is in `SHADER_READ_ONLY_OPTIMAL`
//! and ready to sample.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::buffer::{Buffer, BufferUsage};
use crate::command::{CommandBuffer, one_time_submit};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::image::Image;
use crate::sampler::Sampler;

/// Sampled 2D texture.
pub struct Texture {
    image: Image,
    sampler: Sampler,
    descriptor: vk::DescriptorImageInfo,
}

impl Texture {
    /// Loads a texture from an image file, converting to 8-bit RGBA.
    ///
    /// `format` selects the color space: `R8G8B8A8_SRGB` for color maps,
    /// `R8G8B8A8_UNORM` for data maps (normals, roughness) that must not be
    /// gamma-decoded when sampled.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or the upload fails.
    pub fn from_file(device: Arc<Device>, path: &Path, format: vk::Format) -> RhiResult<Self> {
        let decoded = image::open(path).map_err(|e| {
            RhiError::TextureError(format!("failed to load image {}: {e}", path.display()))
        })?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        debug!("Loaded texture {} ({width}x{height})", path.display());

        Self::from_pixels(device, format, width, height, rgba.as_raw())
    }

    /// Creates a texture from tightly packed 8-bit RGBA pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if `pixels` does not match the dimensions or the
    /// upload fails.
    pub fn from_pixels(
        device: Arc<Device>,
        format: vk::Format,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> RhiResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RhiError::TextureError(format!(
                "pixel data is {} bytes, expected {} for {width}x{height} RGBA",
                pixels.len(),
                expected
            )));
        }

        let staging = Buffer::new_with_data(device.clone(), BufferUsage::Staging, pixels)?;

        let extent = vk::Extent2D { width, height };
        let image = Image::new(
            device.clone(),
            format,
            extent,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;

        one_time_submit(&device, |cmd: &CommandBuffer| {
            image.transition_layout(
                cmd,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(
                    vk::ImageSubresourceLayers::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .mip_level(0)
                        .base_array_layer(0)
                        .layer_count(1),
                )
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                });

            cmd.copy_buffer_to_image(
                staging.handle(),
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&region),
            );

            image.transition_layout(
                cmd,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        })?;
        // The submission has drained; `staging` can drop safely here.

        let sampler = Sampler::linear_repeat(device)?;

        let descriptor = vk::DescriptorImageInfo {
            sampler: sampler.handle(),
            image_view: image.view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        };

        Ok(Self {
            image,
            sampler,
            descriptor,
        })
    }

    /// Returns the descriptor info snapshot for set writers.
    #[inline]
    pub fn descriptor_info(&self) -> vk::DescriptorImageInfo {
        self.descriptor
    }

    /// Returns the underlying image.
    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Returns the texture's sampler.
    #[inline]
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}
