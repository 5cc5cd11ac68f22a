//! Depth attachment paired with the swapchain.
//!
//! One depth image sized to the swapchain extent. It lives in the UNDEFINED
//! layout between frames; the frame manager transitions it to the depth
//! attachment layout at the start of every render pass, so recreation after
//! a resize needs no extra synchronization beyond the swapchain's own.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use ember_rhi::RhiResult;
use ember_rhi::command::CommandBuffer;
use ember_rhi::device::Device;
use ember_rhi::image::Image;

/// Depth format used by every pipeline in the engine.
///
/// D32_SFLOAT is universally supported for depth attachments, so no
/// format-fallback query is needed.
pub const DEFAULT_DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Depth attachment for the forward pass.
pub struct DepthBuffer {
    image: Image,
}

impl DepthBuffer {
    /// Creates a depth buffer covering `extent`.
    ///
    /// # Errors
    ///
    /// Returns an error if image or view creation fails.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D) -> RhiResult<Self> {
        let image = Image::new(
            device,
            DEFAULT_DEPTH_FORMAT,
            extent,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        debug!(
            "Created depth buffer {}x{}",
            extent.width, extent.height
        );

        Ok(Self { image })
    }

    /// Records the per-frame UNDEFINED -> depth attachment transition.
    ///
    /// Previous contents are discarded; the render pass clears the buffer
    /// anyway.
    pub fn prepare_for_rendering(&self, cmd: &CommandBuffer) {
        self.image.transition_layout(
            cmd,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        );
    }

    /// Returns the image view to attach.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Returns the depth format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.image.format()
    }

    /// Returns the buffer extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_depth_only() {
        assert_eq!(DEFAULT_DEPTH_FORMAT, vk::Format::D32_SFLOAT);
    }
}
