//! Dynamic rendering attachment helpers (Vulkan 1.3).
//!
//! No `VkRenderPass` objects: each frame the renderer describes its color
//! and depth attachments inline and records between `begin_rendering` and
//! `end_rendering`. [`RenderingInfoBundle`] owns the attachment info arrays
//! so the borrowed `vk::RenderingInfo` stays valid while recording.
//!
//! # Example
//!
//! ```no_run
//! use ash::vk;
//! use ember_rhi::command::CommandBuffer;
//! use ember_rhi::rendering::{ColorAttachment, DepthAttachment, RenderingConfig};
//!
//! # fn example(color_view: vk::ImageView, depth_view: vk::ImageView, cmd: &CommandBuffer) {
//! let config = RenderingConfig::new(800, 600)
//!     .with_color_attachment(
//!         ColorAttachment::new(color_view).with_clear_color([0.01, 0.01, 0.01, 1.0]),
//!     )
//!     .with_depth_attachment(DepthAttachment::new(depth_view));
//!
//! let bundle = config.build();
//! cmd.begin_rendering(&bundle.info());
//! // draw calls
//! cmd.end_rendering();
//! # }
//! ```

use ash::vk;

/// Color attachment description for one rendering scope.
///
/// Defaults: `COLOR_ATTACHMENT_OPTIMAL` layout, clear on load to opaque
/// black, store on end.
#[derive(Clone)]
pub struct ColorAttachment {
    pub image_view: vk::ImageView,
    pub layout: vk::ImageLayout,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub clear_value: vk::ClearColorValue,
}

impl ColorAttachment {
    /// Creates a color attachment over `image_view` with the defaults above.
    #[inline]
    pub fn new(image_view: vk::ImageView) -> Self {
        Self {
            image_view,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            clear_value: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        }
    }

    /// Sets the clear color as RGBA floats.
    #[inline]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_value = vk::ClearColorValue { float32: color };
        self
    }

    /// Sets the load operation.
    #[inline]
    pub fn with_load_op(mut self, load_op: vk::AttachmentLoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    /// Sets the store operation.
    #[inline]
    pub fn with_store_op(mut self, store_op: vk::AttachmentStoreOp) -> Self {
        self.store_op = store_op;
        self
    }

    /// Converts into the Vulkan attachment info.
    #[inline]
    pub fn to_rendering_attachment_info(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.image_view)
            .image_layout(self.layout)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .clear_value(vk::ClearValue {
                color: self.clear_value,
            })
    }
}

impl std::fmt::Debug for ColorAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // ClearColorValue is a union; show the float32 variant.
        let clear_color = unsafe { self.clear_value.float32 };
        f.debug_struct("ColorAttachment")
            .field("image_view", &self.image_view)
            .field("layout", &self.layout)
            .field("load_op", &self.load_op)
            .field("store_op", &self.store_op)
            .field("clear_value", &clear_color)
            .finish()
    }
}

/// Depth attachment description for one rendering scope.
///
/// Defaults: `DEPTH_STENCIL_ATTACHMENT_OPTIMAL` layout, clear on load to
/// 1.0 (far plane), contents discarded at the end of the scope. Every pass
/// that reads the depth buffer records inside the same scope, so nothing
/// needs the values afterwards.
#[derive(Clone, Debug)]
pub struct DepthAttachment {
    pub image_view: vk::ImageView,
    pub layout: vk::ImageLayout,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub clear_value: vk::ClearDepthStencilValue,
}

impl DepthAttachment {
    /// Creates a depth attachment over `image_view` with the defaults above.
    #[inline]
    pub fn new(image_view: vk::ImageView) -> Self {
        Self {
            image_view,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::DONT_CARE,
            clear_value: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        }
    }

    /// Sets the clear depth value.
    #[inline]
    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_value.depth = depth;
        self
    }

    /// Converts into the Vulkan attachment info.
    #[inline]
    pub fn to_rendering_attachment_info(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.image_view)
            .image_layout(self.layout)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .clear_value(vk::ClearValue {
                depth_stencil: self.clear_value,
            })
    }
}

/// Attachment set and render area for one rendering scope.
#[derive(Clone, Debug, Default)]
pub struct RenderingConfig {
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_attachment: Option<DepthAttachment>,
    pub render_area: vk::Rect2D,
}

impl RenderingConfig {
    /// Creates a configuration rendering to a `width` by `height` area at
    /// offset zero.
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            color_attachments: Vec::new(),
            depth_attachment: None,
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width, height },
            },
        }
    }

    /// Creates a configuration covering `extent`.
    #[inline]
    pub fn from_extent(extent: vk::Extent2D) -> Self {
        Self::new(extent.width, extent.height)
    }

    /// Adds a color attachment.
    #[inline]
    pub fn with_color_attachment(mut self, attachment: ColorAttachment) -> Self {
        self.color_attachments.push(attachment);
        self
    }

    /// Sets the depth attachment.
    #[inline]
    pub fn with_depth_attachment(mut self, attachment: DepthAttachment) -> Self {
        self.depth_attachment = Some(attachment);
        self
    }

    /// Returns the render area extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.render_area.extent
    }

    /// Materializes the attachment infos into a bundle whose borrowed
    /// `vk::RenderingInfo` can be handed to `begin_rendering`.
    pub fn build(&self) -> RenderingInfoBundle {
        RenderingInfoBundle::new(self)
    }
}

/// Owns the attachment info arrays a `vk::RenderingInfo` points into.
///
/// Keep the bundle alive until `begin_rendering` has been recorded.
pub struct RenderingInfoBundle {
    color_attachments: Vec<vk::RenderingAttachmentInfo<'static>>,
    depth_attachment: Option<vk::RenderingAttachmentInfo<'static>>,
    render_area: vk::Rect2D,
}

impl RenderingInfoBundle {
    fn new(config: &RenderingConfig) -> Self {
        let color_attachments = config
            .color_attachments
            .iter()
            .map(|a| a.to_rendering_attachment_info())
            .collect();

        let depth_attachment = config
            .depth_attachment
            .as_ref()
            .map(|a| a.to_rendering_attachment_info());

        Self {
            color_attachments,
            depth_attachment,
            render_area: config.render_area,
        }
    }

    /// Returns the `vk::RenderingInfo` referencing this bundle's storage.
    pub fn info(&self) -> vk::RenderingInfo<'_> {
        let mut info = vk::RenderingInfo::default()
            .render_area(self.render_area)
            .layer_count(1)
            .color_attachments(&self.color_attachments);

        if let Some(ref depth) = self.depth_attachment {
            info = info.depth_attachment(depth);
        }

        info
    }

    /// Returns the render area.
    #[inline]
    pub fn render_area(&self) -> vk::Rect2D {
        self.render_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_attachment_defaults_clear_to_black() {
        let attachment = ColorAttachment::new(vk::ImageView::null());
        assert_eq!(attachment.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
        let clear = unsafe { attachment.clear_value.float32 };
        assert_eq!(clear, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn color_attachment_clear_color_override() {
        let attachment =
            ColorAttachment::new(vk::ImageView::null()).with_clear_color([0.01, 0.01, 0.01, 1.0]);
        let clear = unsafe { attachment.clear_value.float32 };
        assert_eq!(clear, [0.01, 0.01, 0.01, 1.0]);
    }

    #[test]
    fn depth_attachment_defaults_clear_to_far_plane() {
        let attachment = DepthAttachment::new(vk::ImageView::null());
        assert_eq!(
            attachment.layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(attachment.clear_value.depth, 1.0);
        assert_eq!(attachment.clear_value.stencil, 0);
    }

    #[test]
    fn config_collects_attachments_and_area() {
        let config = RenderingConfig::new(1920, 1080)
            .with_color_attachment(ColorAttachment::new(vk::ImageView::null()))
            .with_depth_attachment(DepthAttachment::new(vk::ImageView::null()));

        assert_eq!(config.color_attachments.len(), 1);
        assert!(config.depth_attachment.is_some());
        assert_eq!(config.extent().width, 1920);
        assert_eq!(config.extent().height, 1080);
        assert_eq!(config.render_area.offset.x, 0);
    }

    #[test]
    fn bundle_info_covers_render_area() {
        let config = RenderingConfig::from_extent(vk::Extent2D {
            width: 800,
            height: 600,
        })
        .with_color_attachment(ColorAttachment::new(vk::ImageView::null()));

        let bundle = config.build();
        let info = bundle.info();

        assert_eq!(info.render_area.extent.width, 800);
        assert_eq!(info.render_area.extent.height, 600);
        assert_eq!(info.layer_count, 1);
        assert_eq!(info.color_attachment_count, 1);
        assert_eq!(bundle.render_area().extent.width, 800);
    }
}
