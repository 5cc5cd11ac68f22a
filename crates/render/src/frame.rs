//! Frame orchestration.
//!
//! [`FrameManager`] is the begin/end state machine around one frame:
//!
//! ```text
//! begin_frame          wait slot fence, acquire image, start recording
//!   begin_render_pass  transition attachments, begin dynamic rendering
//!   end_render_pass    end dynamic rendering, transition to present
//! end_frame            submit, present, advance the frame counter
//! ```
//!
//! `begin_render_pass`/`end_render_pass` run exactly once per frame;
//! calling any step out of order is a programming error and panics. A stale
//! surface is not: `begin_frame` returns [`RhiError::SurfaceOutOfDate`] and
//! leaves the slot untouched so the caller can recreate the swapchain and
//! simply skip the tick, and `end_frame` maps out-of-date/suboptimal
//! presents to `Ok(true)` ("recreate before the next frame").
//!
//! Simulation and uniform updates belong between `begin_frame` and
//! `begin_render_pass`; render functions must not mutate object transforms.
//!
//! [`RhiError::SurfaceOutOfDate`]: ember_rhi::RhiError::SurfaceOutOfDate

use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace};

use ember_rhi::RhiResult;
use ember_rhi::command::{CommandBuffer, CommandPool};
use ember_rhi::descriptor::DescriptorPool;
use ember_rhi::device::Device;
use ember_rhi::image::record_layout_transition;
use ember_rhi::rendering::{ColorAttachment, DepthAttachment, RenderingConfig};
use ember_rhi::swapchain::Swapchain;
use ember_rhi::sync::{FrameSync, MAX_FRAMES_IN_FLIGHT};
use ember_scene::Camera;

use crate::depth_buffer::DepthBuffer;

/// Background color for the forward pass.
const CLEAR_COLOR: [f32; 4] = [0.01, 0.01, 0.01, 1.0];

/// Everything a render subsystem sees of the frame in progress.
pub struct FrameContext<'a> {
    /// Frame slot index, `0..MAX_FRAMES_IN_FLIGHT`.
    pub frame_index: usize,
    /// Seconds since the previous frame.
    pub frame_time: f32,
    /// The command buffer being recorded.
    pub cmd: &'a CommandBuffer,
    /// Camera whose matrices are in this frame's global UBO.
    pub camera: &'a Camera,
    /// This frame's global descriptor set (set 0 in every pipeline).
    pub global_set: vk::DescriptorSet,
    /// This frame's transient descriptor pool, reset at frame start.
    pub frame_pool: &'a DescriptorPool,
}

/// Per-frame command buffers and sync objects plus the frame state machine.
pub struct FrameManager {
    device: Arc<Device>,
    // Pool must outlive the buffers allocated from it.
    _command_pool: CommandPool,
    commands: Vec<CommandBuffer>,
    sync: Vec<FrameSync>,
    current_frame: usize,
    /// `Some` between `begin_frame` and `end_frame`.
    image_index: Option<u32>,
    /// Swapchain image acquired this frame; valid while a pass is active.
    pass_image: vk::Image,
    pass_active: bool,
    /// Acquire reported the surface suboptimal; folded into `end_frame`'s
    /// recreate signal.
    suboptimal_acquire: bool,
}

impl FrameManager {
    /// Creates the command buffers and sync objects for every frame slot.
    ///
    /// # Errors
    ///
    /// Returns an error if pool, buffer, or sync object creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let command_pool = CommandPool::new(device.clone(), device.graphics_family())?;

        let mut commands = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut sync = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            commands.push(CommandBuffer::new(device.clone(), &command_pool)?);
            sync.push(FrameSync::new(device.clone())?);
        }

        debug!("Frame manager ready ({} frames in flight)", MAX_FRAMES_IN_FLIGHT);

        Ok(Self {
            device,
            _command_pool: command_pool,
            commands,
            sync,
            current_frame: 0,
            image_index: None,
            pass_image: vk::Image::null(),
            pass_active: false,
            suboptimal_acquire: false,
        })
    }

    /// Starts the frame: waits for this slot's previous use to finish on
    /// the GPU, acquires a swapchain image, and begins command recording.
    ///
    /// After this returns, the slot's per-frame resources (descriptor pool,
    /// uniform slots) are safe to touch.
    ///
    /// # Panics
    ///
    /// Panics if a frame is already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SurfaceOutOfDate`](ember_rhi::RhiError) when no
    /// image can be acquired; the caller recreates the swapchain and skips
    /// this tick. The slot fence stays signaled in that case, so the next
    /// `begin_frame` proceeds normally.
    pub fn begin_frame(&mut self, swapchain: &Swapchain) -> RhiResult<()> {
        assert!(
            self.image_index.is_none(),
            "begin_frame called while a frame is already in progress"
        );

        let sync = &self.sync[self.current_frame];
        sync.in_flight_fence().wait(u64::MAX)?;

        // Acquire before resetting the fence; a failed acquire must leave
        // the fence signaled for the retry.
        let (image_index, suboptimal) = swapchain.acquire_next_image(sync.image_available())?;
        sync.in_flight_fence().reset()?;

        if suboptimal {
            debug!("Acquired suboptimal swapchain image");
        }
        self.suboptimal_acquire = suboptimal;

        self.commands[self.current_frame].begin()?;
        self.image_index = Some(image_index);

        trace!(
            "Frame {} started on swapchain image {}",
            self.current_frame, image_index
        );
        Ok(())
    }

    /// Transitions the acquired image and the depth buffer to attachment
    /// layouts, begins dynamic rendering, and sets the full-extent viewport
    /// and scissor.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in progress or the pass was already begun this
    /// frame.
    pub fn begin_render_pass(&mut self, swapchain: &Swapchain, depth: &DepthBuffer) {
        let Some(image_index) = self.image_index else {
            panic!("begin_render_pass called outside a frame");
        };
        assert!(!self.pass_active, "render pass already begun this frame");

        let cmd = &self.commands[self.current_frame];
        let color_image = swapchain.image(image_index as usize);

        record_layout_transition(
            cmd,
            color_image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        );
        depth.prepare_for_rendering(cmd);

        let extent = swapchain.extent();
        let config = RenderingConfig::from_extent(extent)
            .with_color_attachment(
                ColorAttachment::new(swapchain.image_view(image_index as usize))
                    .with_clear_color(CLEAR_COLOR),
            )
            .with_depth_attachment(DepthAttachment::new(depth.view()));
        let bundle = config.build();
        cmd.begin_rendering(&bundle.info());

        cmd.set_viewport(&vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        cmd.set_scissor(&vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        });

        self.pass_image = color_image;
        self.pass_active = true;
    }

    /// Ends dynamic rendering and transitions the image for presentation.
    ///
    /// # Panics
    ///
    /// Panics if no render pass is active.
    pub fn end_render_pass(&mut self) {
        assert!(self.pass_active, "end_render_pass called with no active render pass");

        let cmd = &self.commands[self.current_frame];
        cmd.end_rendering();
        record_layout_transition(
            cmd,
            self.pass_image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );

        self.pass_active = false;
    }

    /// Finishes the frame: ends recording, submits, presents, and advances
    /// the frame counter.
    ///
    /// Returns `true` when the swapchain should be recreated before the
    /// next frame (suboptimal or out-of-date at acquire or present); the
    /// presented frame itself is still valid.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in progress or the render pass is still open.
    ///
    /// # Errors
    ///
    /// Returns an error if recording, submission, or presentation fails for
    /// a reason other than surface staleness.
    pub fn end_frame(&mut self, swapchain: &Swapchain) -> RhiResult<bool> {
        let Some(image_index) = self.image_index else {
            panic!("end_frame called outside a frame");
        };
        assert!(
            !self.pass_active,
            "end_frame called with the render pass still open"
        );

        let sync = &self.sync[self.current_frame];
        let cmd = &self.commands[self.current_frame];
        cmd.end()?;

        let wait_semaphores = [sync.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished()];
        let command_buffers = [cmd.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .submit_graphics(&[submit_info], sync.in_flight_fence().handle())?;
        }

        let needs_recreate = swapchain.present(
            self.device.present_queue(),
            image_index,
            sync.render_finished(),
        )?;

        self.image_index = None;
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

        trace!("Frame ended (recreate: {})", needs_recreate);
        Ok(needs_recreate || std::mem::take(&mut self.suboptimal_acquire))
    }

    /// Returns the command buffer being recorded.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in progress.
    pub fn current_command(&self) -> &CommandBuffer {
        assert!(
            self.image_index.is_some(),
            "current_command called outside a frame"
        );
        &self.commands[self.current_frame]
    }

    /// Returns the current frame slot index.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in progress; the slot only identifies in-use
    /// per-frame resources while a frame is recording.
    pub fn frame_index(&self) -> usize {
        assert!(
            self.image_index.is_some(),
            "frame_index called outside a frame"
        );
        self.current_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_manager_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FrameManager>();
    }

    #[test]
    fn clear_color_is_near_black_opaque() {
        assert_eq!(CLEAR_COLOR[3], 1.0);
        assert!(CLEAR_COLOR[..3].iter().all(|&c| c < 0.1));
    }
}
