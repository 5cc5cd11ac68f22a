//! Descriptor set layouts, pools, and writers for shader resource binding.
//!
//! Binding follows a three-step protocol:
//! 1. [`DescriptorSetLayout`] declares binding slots and their types.
//! 2. [`DescriptorPool`] hands out sets, with all capacity declared up front.
//! 3. [`DescriptorWriter`] points an allocated set at concrete buffers and
//!    images, validated against the layout.
//!
//! Pools backing per-frame transient sets are reclaimed in bulk with
//! [`DescriptorPool::reset`] at the start of each frame instead of freeing
//! sets one by one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use ember_rhi::device::Device;
//! use ember_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, DescriptorWriter};
//!
//! # fn example(device: Arc<Device>, ubo_info: vk::DescriptorBufferInfo) -> Result<(), ember_rhi::RhiError> {
//! let layout = DescriptorSetLayout::builder()
//!     .binding(
//!         0,
//!         vk::DescriptorType::UNIFORM_BUFFER,
//!         vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
//!     )
//!     .build(device.clone())?;
//!
//! let pool = DescriptorPool::builder()
//!     .max_sets(2)
//!     .pool_size(vk::DescriptorType::UNIFORM_BUFFER, 2)
//!     .build(device)?;
//!
//! let set = DescriptorWriter::new(&layout)
//!     .write_buffer(0, ubo_info)
//!     .build(&pool)?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::slice;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Descriptor set layout that retains its binding table.
///
/// The bindings the layout was built from stay available so a
/// [`DescriptorWriter`] can check binding indices and resolve descriptor
/// types at write time.
///
/// # Thread Safety
///
/// Immutable after creation; share between threads via `Arc`.
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
    bindings: BTreeMap<u32, vk::DescriptorSetLayoutBinding<'static>>,
}

impl DescriptorSetLayout {
    /// Starts building a layout.
    #[inline]
    pub fn builder() -> DescriptorSetLayoutBuilder {
        DescriptorSetLayoutBuilder::default()
    }

    /// Returns the Vulkan descriptor set layout handle.
    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Returns the binding declared at `index`, if any.
    #[inline]
    pub fn binding(&self, index: u32) -> Option<&vk::DescriptorSetLayoutBinding<'static>> {
        self.bindings.get(&index)
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Destroyed descriptor set layout");
    }
}

/// Builder for [`DescriptorSetLayout`].
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: BTreeMap<u32, vk::DescriptorSetLayoutBinding<'static>>,
}

impl DescriptorSetLayoutBuilder {
    /// Declares a single-descriptor binding.
    ///
    /// # Panics
    ///
    /// Panics if `index` was already declared on this builder.
    pub fn binding(
        self,
        index: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.binding_array(index, descriptor_type, stage_flags, 1)
    }

    /// Declares a binding holding `count` descriptors.
    ///
    /// # Panics
    ///
    /// Panics if `index` was already declared on this builder.
    pub fn binding_array(
        mut self,
        index: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
        count: u32,
    ) -> Self {
        let binding = vk::DescriptorSetLayoutBinding::default()
            .binding(index)
            .descriptor_type(descriptor_type)
            .descriptor_count(count)
            .stage_flags(stage_flags);

        let previous = self.bindings.insert(index, binding);
        assert!(previous.is_none(), "binding {index} already in use");

        self
    }

    /// Creates the layout on `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if layout creation fails.
    pub fn build(self, device: Arc<Device>) -> RhiResult<DescriptorSetLayout> {
        let flat: Vec<vk::DescriptorSetLayoutBinding> = self.bindings.values().copied().collect();
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&flat);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            flat.len()
        );

        Ok(DescriptorSetLayout {
            device,
            layout,
            bindings: self.bindings,
        })
    }
}

/// Fixed-capacity descriptor pool.
///
/// All capacity is declared at build time through [`DescriptorPool::builder`].
/// Running out of sets surfaces as [`RhiError::DescriptorPoolExhausted`], a
/// recoverable error that leaves previously allocated sets intact.
///
/// # Thread Safety
///
/// Pool operations are not synchronized. Confine a pool to one thread or
/// synchronize externally.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    /// Starts building a pool.
    #[inline]
    pub fn builder() -> DescriptorPoolBuilder {
        DescriptorPoolBuilder::default()
    }

    /// Allocates one descriptor set with the given layout.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::DescriptorPoolExhausted`] when the pool has no
    /// room left for the set or its descriptors. Other allocation failures
    /// map to [`RhiError::VulkanError`].
    pub fn allocate(&self, layout: &DescriptorSetLayout) -> RhiResult<vk::DescriptorSet> {
        let layouts = [layout.handle()];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        match unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info) } {
            Ok(sets) => Ok(sets[0]),
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL) => {
                Err(RhiError::DescriptorPoolExhausted)
            }
            Err(err) => Err(RhiError::VulkanError(err)),
        }
    }

    /// Frees descriptor sets back to the pool.
    ///
    /// Requires the pool to have been built with
    /// `vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET`.
    ///
    /// # Errors
    ///
    /// Returns an error if freeing fails.
    ///
    /// # Safety
    ///
    /// The caller must ensure the sets are no longer in use by the GPU.
    pub fn free(&self, sets: &[vk::DescriptorSet]) -> RhiResult<()> {
        unsafe {
            self.device.handle().free_descriptor_sets(self.pool, sets)?;
        }
        Ok(())
    }

    /// Returns every set allocated from this pool in one call.
    ///
    /// Cheaper than freeing sets individually; used on per-frame pools at
    /// frame start, before any allocation for that frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    ///
    /// # Safety
    ///
    /// The caller must ensure no set from this pool is still in use by the
    /// GPU. Waiting on the frame slot's fence satisfies this for per-frame
    /// pools.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_descriptor_pool(self.pool, vk::DescriptorPoolResetFlags::empty())?;
        }
        Ok(())
    }

    /// Returns the Vulkan descriptor pool handle.
    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Returns the maximum number of sets this pool can hold.
    #[inline]
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

/// Builder for [`DescriptorPool`].
pub struct DescriptorPoolBuilder {
    pool_sizes: Vec<vk::DescriptorPoolSize>,
    max_sets: u32,
    flags: vk::DescriptorPoolCreateFlags,
}

impl Default for DescriptorPoolBuilder {
    fn default() -> Self {
        Self {
            pool_sizes: Vec::new(),
            max_sets: 1000,
            flags: vk::DescriptorPoolCreateFlags::empty(),
        }
    }
}

impl DescriptorPoolBuilder {
    /// Sets the maximum number of sets the pool can hold. Defaults to 1000.
    pub fn max_sets(mut self, count: u32) -> Self {
        self.max_sets = count;
        self
    }

    /// Adds capacity for `count` descriptors of the given type.
    pub fn pool_size(mut self, descriptor_type: vk::DescriptorType, count: u32) -> Self {
        self.pool_sizes.push(
            vk::DescriptorPoolSize::default()
                .ty(descriptor_type)
                .descriptor_count(count),
        );
        self
    }

    /// Sets pool creation flags. Defaults to none.
    pub fn flags(mut self, flags: vk::DescriptorPoolCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Creates the pool on `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation fails.
    pub fn build(self, device: Arc<Device>) -> RhiResult<DescriptorPool> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(self.max_sets)
            .pool_sizes(&self.pool_sizes)
            .flags(self.flags);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: max_sets={}, pool_sizes={}",
            self.max_sets,
            self.pool_sizes.len()
        );

        Ok(DescriptorPool {
            device,
            pool,
            max_sets: self.max_sets,
        })
    }
}

/// Accumulates resource writes for one descriptor set.
///
/// Each write is validated against the layout's binding table as it is
/// queued. [`build`](Self::build) allocates a fresh set from a pool and
/// applies the writes; [`overwrite`](Self::overwrite) re-points an existing
/// set.
pub struct DescriptorWriter<'a> {
    layout: &'a DescriptorSetLayout,
    buffer_infos: Vec<vk::DescriptorBufferInfo>,
    image_infos: Vec<vk::DescriptorImageInfo>,
    writes: Vec<PendingWrite>,
}

/// A queued write. Resolved to `vk::WriteDescriptorSet` only once every
/// info is in place, so the info references stay stable.
struct PendingWrite {
    binding: u32,
    descriptor_type: vk::DescriptorType,
    resource: Resource,
}

enum Resource {
    Buffer(usize),
    Image(usize),
}

impl<'a> DescriptorWriter<'a> {
    /// Creates a writer targeting sets with the given layout.
    pub fn new(layout: &'a DescriptorSetLayout) -> Self {
        Self {
            layout,
            buffer_infos: Vec::new(),
            image_infos: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Queues a buffer write for `binding`.
    ///
    /// # Panics
    ///
    /// Panics if the layout does not declare `binding` or declares it with
    /// more than one descriptor.
    pub fn write_buffer(mut self, binding: u32, info: vk::DescriptorBufferInfo) -> Self {
        let descriptor_type = single_descriptor_type(&self.layout.bindings, binding);
        self.buffer_infos.push(info);
        self.writes.push(PendingWrite {
            binding,
            descriptor_type,
            resource: Resource::Buffer(self.buffer_infos.len() - 1),
        });
        self
    }

    /// Queues an image write for `binding`.
    ///
    /// # Panics
    ///
    /// Panics if the layout does not declare `binding` or declares it with
    /// more than one descriptor.
    pub fn write_image(mut self, binding: u32, info: vk::DescriptorImageInfo) -> Self {
        let descriptor_type = single_descriptor_type(&self.layout.bindings, binding);
        self.image_infos.push(info);
        self.writes.push(PendingWrite {
            binding,
            descriptor_type,
            resource: Resource::Image(self.image_infos.len() - 1),
        });
        self
    }

    /// Allocates a set from `pool` and applies the queued writes to it.
    ///
    /// # Errors
    ///
    /// Propagates allocation failure, [`RhiError::DescriptorPoolExhausted`]
    /// when the pool is out of sets.
    pub fn build(self, pool: &DescriptorPool) -> RhiResult<vk::DescriptorSet> {
        let set = pool.allocate(self.layout)?;
        self.overwrite(set);
        Ok(set)
    }

    /// Applies the queued writes to an existing set.
    pub fn overwrite(&self, set: vk::DescriptorSet) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .writes
            .iter()
            .map(|pending| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(pending.binding)
                    .dst_array_element(0)
                    .descriptor_type(pending.descriptor_type);
                match pending.resource {
                    Resource::Buffer(index) => {
                        write.buffer_info(slice::from_ref(&self.buffer_infos[index]))
                    }
                    Resource::Image(index) => {
                        write.image_info(slice::from_ref(&self.image_infos[index]))
                    }
                }
            })
            .collect();

        unsafe {
            self.layout
                .device
                .handle()
                .update_descriptor_sets(&writes, &[]);
        }
    }
}

/// Looks up `binding` in a layout's binding table and returns its type.
///
/// Panics when the binding is missing or holds more than one descriptor;
/// both are caller bugs under the writer's single-info protocol.
fn single_descriptor_type(
    bindings: &BTreeMap<u32, vk::DescriptorSetLayoutBinding<'static>>,
    binding: u32,
) -> vk::DescriptorType {
    let Some(description) = bindings.get(&binding) else {
        panic!("layout does not contain binding {binding}");
    };
    assert!(
        description.descriptor_count == 1,
        "binding {binding} holds {} descriptors, expected a single one",
        description.descriptor_count
    );
    description.descriptor_type
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_builder_collects_bindings() {
        let builder = DescriptorSetLayout::builder()
            .binding(
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            )
            .binding(
                1,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                vk::ShaderStageFlags::FRAGMENT,
            );

        assert_eq!(builder.bindings.len(), 2);

        let ubo = &builder.bindings[&0];
        assert_eq!(ubo.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(ubo.descriptor_count, 1);
        assert!(ubo.stage_flags.contains(vk::ShaderStageFlags::VERTEX));
        assert!(ubo.stage_flags.contains(vk::ShaderStageFlags::FRAGMENT));

        let sampler = &builder.bindings[&1];
        assert_eq!(
            sampler.descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert_eq!(sampler.stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn layout_builder_array_binding_keeps_count() {
        let builder = DescriptorSetLayout::builder().binding_array(
            3,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            vk::ShaderStageFlags::FRAGMENT,
            4,
        );

        assert_eq!(builder.bindings[&3].descriptor_count, 4);
    }

    #[test]
    #[should_panic(expected = "binding 0 already in use")]
    fn layout_builder_rejects_duplicate_binding() {
        let _ = DescriptorSetLayout::builder()
            .binding(
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::ShaderStageFlags::VERTEX,
            )
            .binding(
                0,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                vk::ShaderStageFlags::FRAGMENT,
            );
    }

    #[test]
    fn pool_builder_accounts_requested_capacity() {
        let builder = DescriptorPool::builder()
            .max_sets(1000)
            .pool_size(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1000)
            .pool_size(vk::DescriptorType::UNIFORM_BUFFER, 1000)
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);

        assert_eq!(builder.max_sets, 1000);
        assert_eq!(builder.pool_sizes.len(), 2);
        assert_eq!(
            builder.pool_sizes[0].ty,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert_eq!(builder.pool_sizes[0].descriptor_count, 1000);
        assert_eq!(builder.pool_sizes[1].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(builder.pool_sizes[1].descriptor_count, 1000);
        assert_eq!(
            builder.flags,
            vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET
        );
    }

    #[test]
    fn pool_builder_defaults() {
        let builder = DescriptorPool::builder();
        assert_eq!(builder.max_sets, 1000);
        assert!(builder.pool_sizes.is_empty());
        assert_eq!(builder.flags, vk::DescriptorPoolCreateFlags::empty());
    }

    #[test]
    fn single_descriptor_type_resolves_declared_binding() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            5,
            vk::DescriptorSetLayoutBinding::default()
                .binding(5)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        );

        assert_eq!(
            single_descriptor_type(&bindings, 5),
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
    }

    #[test]
    #[should_panic(expected = "layout does not contain binding 7")]
    fn single_descriptor_type_rejects_unknown_binding() {
        let bindings = BTreeMap::new();
        let _ = single_descriptor_type(&bindings, 7);
    }

    #[test]
    #[should_panic(expected = "holds 4 descriptors")]
    fn single_descriptor_type_rejects_array_binding() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            2,
            vk::DescriptorSetLayoutBinding::default()
                .binding(2)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(4)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        );
        let _ = single_descriptor_type(&bindings, 2);
    }
}
