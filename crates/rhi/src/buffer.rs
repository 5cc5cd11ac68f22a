//! GPU buffer management.
//!
//! Wraps VkBuffer with gpu-allocator managed memory. Besides plain vertex,
//! index, uniform, and staging buffers, a buffer can be created in aligned
//! per-instance mode: a fixed number of equally sized slots whose stride
//! satisfies a caller-provided offset alignment, so one slot can be written
//! and flushed without touching its neighbors.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ember_rhi::device::Device;
//! use ember_rhi::buffer::{Buffer, BufferUsage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), ember_rhi::RhiError> {
//! let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
//! let vertex_buffer = Buffer::new_with_data(
//!     device,
//!     BufferUsage::Vertex,
//!     bytemuck::cast_slice(&vertices),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Buffer usage type, mapped to Vulkan usage flags and a memory location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform buffer, updated from the CPU every frame
    Uniform,
    /// Staging buffer for one-shot uploads
    Staging,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => {
                vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    pub fn memory_location(self) -> MemoryLocation {
        match self {
            // Host-visible so the engine can write without a transfer pass
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::CpuToGpu,
            BufferUsage::Uniform => MemoryLocation::CpuToGpu,
            BufferUsage::Staging => MemoryLocation::CpuToGpu,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
        }
    }
}

/// GPU buffer wrapper with managed memory.
///
/// Not internally synchronized; callers hand one frame's buffer to one
/// frame's recording only.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
    /// Size of one logical instance in bytes.
    instance_size: vk::DeviceSize,
    /// Number of instances (1 for plain buffers).
    instance_count: vk::DeviceSize,
    /// Stride between instances; equals `instance_size` rounded up to the
    /// offset alignment the buffer was created with.
    alignment_size: vk::DeviceSize,
}

impl Buffer {
    /// Creates a single-instance buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer or memory allocation fails.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        Self::create(device, usage, size, size, 1, size)
    }

    /// Creates a buffer of `instance_count` slots, each `instance_size`
    /// bytes, with slot stride rounded up to `min_offset_alignment`.
    ///
    /// Pass the least common multiple of the device's minimum uniform-offset
    /// alignment and non-coherent atom size to make every slot individually
    /// bindable and flushable.
    ///
    /// `min_offset_alignment` must be a power of two (Vulkan guarantees this
    /// for both limits involved).
    pub fn new_aligned(
        device: Arc<Device>,
        usage: BufferUsage,
        instance_size: vk::DeviceSize,
        instance_count: vk::DeviceSize,
        min_offset_alignment: vk::DeviceSize,
    ) -> RhiResult<Self> {
        if instance_count == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer instance count must be greater than 0".to_string(),
            ));
        }
        let alignment_size = Self::alignment(instance_size, min_offset_alignment);
        let size = alignment_size * instance_count;
        Self::create(
            device,
            usage,
            size,
            instance_size,
            instance_count,
            alignment_size,
        )
    }

    fn create(
        device: Arc<Device>,
        usage: BufferUsage,
        size: vk::DeviceSize,
        instance_size: vk::DeviceSize,
        instance_count: vk::DeviceSize,
        alignment_size: vk::DeviceSize,
    ) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: usage.memory_location(),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };

        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        debug!(
            "Created {} buffer: {} bytes ({} x {})",
            usage.name(),
            size,
            instance_count,
            alignment_size
        );

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
            instance_size,
            instance_count,
            alignment_size,
        })
    }

    /// Creates a buffer and uploads `data` into it.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or the write fails.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    /// Rounds `instance_size` up to `min_offset_alignment` (a power of two).
    /// With alignment 0 the size passes through unchanged.
    pub fn alignment(
        instance_size: vk::DeviceSize,
        min_offset_alignment: vk::DeviceSize,
    ) -> vk::DeviceSize {
        if min_offset_alignment > 0 {
            (instance_size + min_offset_alignment - 1) & !(min_offset_alignment - 1)
        } else {
            instance_size
        }
    }

    /// Writes `data` at a byte offset. The memory must be host-visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the write would exceed the buffer or the memory
    /// is not mapped.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(RhiError::InvalidHandle(format!(
                "Write exceeds buffer size: offset {} + data {} > buffer {}",
                offset,
                data.len(),
                self.size
            )));
        }

        let allocation = self.allocation()?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| RhiError::InvalidHandle("Buffer memory is not mapped".to_string()))?;

        unsafe {
            let dst = mapped_ptr.as_ptr().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst as *mut u8, data.len());
        }

        Ok(())
    }

    /// Writes `data` into slot `index` of an aligned buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range or `data` exceeds the
    /// instance size.
    pub fn write_to_index(&self, index: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if index >= self.instance_count {
            return Err(RhiError::InvalidHandle(format!(
                "Slot index {} out of range ({} slots)",
                index, self.instance_count
            )));
        }
        if data.len() as vk::DeviceSize > self.instance_size {
            return Err(RhiError::InvalidHandle(format!(
                "Slot write of {} bytes exceeds instance size {}",
                data.len(),
                self.instance_size
            )));
        }
        self.write_data(index * self.alignment_size, data)
    }

    /// Makes `size` bytes at `offset` visible to the GPU.
    ///
    /// The range is widened to non-coherent-atom-size boundaries; buffer
    /// memory requirements keep that widening inside the allocation.
    pub fn flush(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> RhiResult<()> {
        if offset + size > self.size {
            return Err(RhiError::InvalidHandle(format!(
                "Flush exceeds buffer size: offset {} + size {} > buffer {}",
                offset, size, self.size
            )));
        }

        let allocation = self.allocation()?;
        let atom = self.device.limits().non_coherent_atom_size.max(1);

        let start = allocation.offset() + offset;
        let aligned_start = start & !(atom - 1);
        let aligned_end = (start + size + atom - 1) & !(atom - 1);

        let range = vk::MappedMemoryRange::default()
            .memory(unsafe { allocation.memory() })
            .offset(aligned_start)
            .size(aligned_end - aligned_start);

        unsafe {
            self.device
                .handle()
                .flush_mapped_memory_ranges(std::slice::from_ref(&range))?;
        }

        Ok(())
    }

    /// Flushes exactly one slot of an aligned buffer.
    pub fn flush_index(&self, index: vk::DeviceSize) -> RhiResult<()> {
        if index >= self.instance_count {
            return Err(RhiError::InvalidHandle(format!(
                "Slot index {} out of range ({} slots)",
                index, self.instance_count
            )));
        }
        self.flush(index * self.alignment_size, self.alignment_size)
    }

    /// Descriptor info covering the whole buffer.
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }

    /// Descriptor info covering one slot of an aligned buffer.
    pub fn descriptor_info_for_index(&self, index: vk::DeviceSize) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer,
            offset: index * self.alignment_size,
            range: self.instance_size,
        }
    }

    fn allocation(&self) -> RhiResult<&Allocation> {
        self.allocation.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Buffer allocation is not available".to_string())
        })
    }

    /// Returns the Vulkan buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer size in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Returns the stride between slots.
    #[inline]
    pub fn alignment_size(&self) -> vk::DeviceSize {
        self.alignment_size
    }

    /// Returns the number of slots.
    #[inline]
    pub fn instance_count(&self) -> vk::DeviceSize {
        self.instance_count
    }

    /// Returns the buffer usage type.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // Free allocation first, then destroy the buffer
        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self.device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free buffer allocation: {:?}", e);
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_usage_to_vk_usage() {
        assert!(
            BufferUsage::Vertex
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::VERTEX_BUFFER)
        );
        assert!(
            BufferUsage::Index
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::INDEX_BUFFER)
        );
        assert!(
            BufferUsage::Uniform
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::UNIFORM_BUFFER)
        );
        assert!(
            BufferUsage::Staging
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::TRANSFER_SRC)
        );
    }

    #[test]
    fn buffer_usage_memory_location() {
        assert_eq!(
            BufferUsage::Vertex.memory_location(),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            BufferUsage::Uniform.memory_location(),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            BufferUsage::Staging.memory_location(),
            MemoryLocation::CpuToGpu
        );
    }

    #[test]
    fn alignment_rounds_up_to_power_of_two() {
        assert_eq!(Buffer::alignment(128, 64), 128);
        assert_eq!(Buffer::alignment(129, 64), 192);
        assert_eq!(Buffer::alignment(1, 256), 256);
        assert_eq!(Buffer::alignment(256, 256), 256);
        assert_eq!(Buffer::alignment(257, 256), 512);
    }

    #[test]
    fn alignment_zero_is_identity() {
        assert_eq!(Buffer::alignment(100, 0), 100);
    }

    #[test]
    fn slot_offsets_use_alignment_stride() {
        // 128-byte instances at 256-byte alignment stride to 256-byte slots
        let stride = Buffer::alignment(128, 256);
        assert_eq!(stride, 256);
        for index in 0..4u64 {
            assert_eq!(index * stride, index * 256);
        }
    }
}
