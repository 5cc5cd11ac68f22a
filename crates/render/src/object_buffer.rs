//! Per-object transform buffers, one per frame in flight.
//!
//! Every scene object owns one fixed slot in each frame's uniform buffer;
//! the slot index is the object id. Each frame the live objects' model and
//! normal matrices are rewritten into the current frame's buffer and flushed
//! slot by slot, so untouched slots never reach the mapped-memory flush.
//!
//! Writing slot k of frame buffer f is only safe once the orchestrator's
//! fence wait for frame f has returned; this type does no synchronization
//! of its own.

use ash::vk;
use tracing::debug;

use std::sync::Arc;

use ember_rhi::RhiResult;
use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_rhi::device::Device;
use ember_rhi::sync::MAX_FRAMES_IN_FLIGHT;
use ember_scene::{MAX_OBJECTS, ObjectId, ObjectRegistry};

use crate::ubo::ObjectUbo;

/// Ring of per-frame uniform buffers holding one [`ObjectUbo`] slot per
/// possible object id.
pub struct ObjectTransformBuffer {
    buffers: Vec<Buffer>,
}

impl ObjectTransformBuffer {
    /// Allocates the per-frame buffers with device-derived slot alignment.
    ///
    /// The slot stride is `ObjectUbo::SIZE` rounded up to the least common
    /// multiple of the device's minimum uniform-offset alignment and the
    /// non-coherent atom size, which makes each slot individually bindable
    /// *and* individually flushable.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer allocation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let limits = device.limits();
        let alignment = lcm(
            limits.min_uniform_buffer_offset_alignment,
            limits.non_coherent_atom_size,
        );

        let mut buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            buffers.push(Buffer::new_aligned(
                device.clone(),
                BufferUsage::Uniform,
                ObjectUbo::SIZE as vk::DeviceSize,
                MAX_OBJECTS as vk::DeviceSize,
                alignment,
            )?);
        }

        debug!(
            "Created object transform buffers: {} frames x {} slots, stride {}",
            MAX_FRAMES_IN_FLIGHT,
            MAX_OBJECTS,
            buffers[0].alignment_size()
        );

        Ok(Self { buffers })
    }

    /// Writes every live object's matrices into frame `frame_index`'s buffer
    /// and flushes exactly the written slots.
    ///
    /// # Panics
    ///
    /// Panics if `frame_index` is out of range.
    ///
    /// # Errors
    ///
    /// Returns an error if a slot write or flush fails.
    pub fn update(&self, frame_index: usize, registry: &ObjectRegistry) -> RhiResult<()> {
        let buffer = &self.buffers[frame_index];

        for object in registry.iter() {
            let slot = object.id() as vk::DeviceSize;
            let ubo = ObjectUbo::from_transform(&object.transform);
            buffer.write_to_index(slot, bytemuck::bytes_of(&ubo))?;
            buffer.flush_index(slot)?;
        }

        Ok(())
    }

    /// Returns the descriptor info for object `id`'s slot in frame
    /// `frame_index`: offset `id * stride`, range `ObjectUbo::SIZE`.
    pub fn descriptor_info(&self, frame_index: usize, id: ObjectId) -> vk::DescriptorBufferInfo {
        self.buffers[frame_index].descriptor_info_for_index(id as vk::DeviceSize)
    }

    /// Returns the slot stride in bytes.
    #[inline]
    pub fn stride(&self) -> vk::DeviceSize {
        self.buffers[0].alignment_size()
    }
}

/// Least common multiple; both inputs must be non-zero.
///
/// Device limits are powers of two in practice, where the lcm degenerates
/// to the max, but the general form costs nothing.
fn lcm(a: vk::DeviceSize, b: vk::DeviceSize) -> vk::DeviceSize {
    a / gcd(a, b) * b
}

fn gcd(mut a: vk::DeviceSize, mut b: vk::DeviceSize) -> vk::DeviceSize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcm_of_powers_of_two_is_the_max() {
        assert_eq!(lcm(64, 256), 256);
        assert_eq!(lcm(256, 64), 256);
        assert_eq!(lcm(256, 256), 256);
        assert_eq!(lcm(1, 64), 64);
    }

    #[test]
    fn lcm_general_case() {
        assert_eq!(lcm(6, 4), 12);
        assert_eq!(lcm(21, 6), 42);
    }

    #[test]
    fn slot_stride_for_representative_limits() {
        // 128-byte slots under a 64-byte uniform alignment and 256-byte
        // atom size round up to 256.
        let alignment = lcm(64, 256);
        assert_eq!(Buffer::alignment(ObjectUbo::SIZE as u64, alignment), 256);

        // Tight limits leave the slot at its natural size.
        let alignment = lcm(64, 64);
        assert_eq!(Buffer::alignment(ObjectUbo::SIZE as u64, alignment), 128);
    }

    #[test]
    fn slot_offsets_scale_with_stride() {
        let stride = Buffer::alignment(ObjectUbo::SIZE as u64, lcm(64, 256));
        for id in [0u64, 1, 2, 999] {
            assert_eq!(id * stride, id * 256);
        }
    }
}
