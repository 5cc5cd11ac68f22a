//! Renderer composition root.
//!
//! [`Renderer`] owns every GPU-side resource and wires the frame together:
//! swapchain and depth buffer, the global descriptor resources, the
//! per-object transform buffer, the asset store, and the mesh and point
//! light passes. The scene itself (registry, camera) stays with the caller
//! and is borrowed for the duration of [`render_frame`](Renderer::render_frame).
//!
//! # Resource Destruction Order
//!
//! Vulkan requires teardown in dependency order:
//! 1. Wait for all GPU work to complete
//! 2. Destroy everything created from the device (frames, passes, assets,
//!    buffers, descriptors, depth buffer)
//! 3. Destroy the swapchain
//! 4. Release the device
//! 5. Destroy the surface
//! 6. Destroy the instance
//!
//! ManuallyDrop enforces that order; the renderer holds the only lasting
//! device clone outside its own resources, so releasing it in step 4 tears
//! the device down before the instance goes away.

use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use ember_platform::{Surface, Window};
use ember_resources::Model;
use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, DescriptorWriter};
use ember_rhi::device::Device;
use ember_rhi::instance::Instance;
use ember_rhi::physical_device::select_physical_device;
use ember_rhi::swapchain::Swapchain;
use ember_rhi::sync::MAX_FRAMES_IN_FLIGHT;
use ember_rhi::texture::Texture;
use ember_rhi::{RhiError, RhiResult};
use ember_scene::{Camera, MaterialHandle, MeshHandle, ObjectRegistry};

use crate::assets::{AssetStore, Material};
use crate::depth_buffer::DepthBuffer;
use crate::frame::{FrameContext, FrameManager};
use crate::light_system::LightSystem;
use crate::mesh::Mesh;
use crate::mesh_system::MeshSystem;
use crate::object_buffer::ObjectTransformBuffer;
use crate::ubo::GlobalUbo;

/// Capacity of each per-frame transient descriptor pool.
///
/// Sized for the per-object sets the mesh pass allocates: six samplers and
/// one uniform buffer each. When a frame needs more, allocation fails with
/// [`RhiError::DescriptorPoolExhausted`] and the remaining draws are
/// dropped for that frame.
const FRAME_POOL_CAPACITY: u32 = 1000;

/// Owns the GPU resources and drives the per-frame lifecycle.
pub struct Renderer {
    /// Vulkan instance (destroyed last).
    instance: ManuallyDrop<Instance>,
    /// Window surface (destroyed after the device, before the instance).
    surface: ManuallyDrop<Surface>,
    /// Logical device. The renderer's clone is released after every GPU
    /// resource below and before the surface and instance.
    device: ManuallyDrop<Arc<Device>>,

    swapchain: ManuallyDrop<Swapchain>,
    depth_buffer: ManuallyDrop<DepthBuffer>,

    // Global descriptor resources: one UBO and one set per frame in flight,
    // written once and re-pointed never.
    global_layout: ManuallyDrop<DescriptorSetLayout>,
    global_pool: ManuallyDrop<DescriptorPool>,
    global_buffers: ManuallyDrop<Vec<Buffer>>,
    global_sets: Vec<vk::DescriptorSet>,

    /// Transient pools for per-object sets, one per frame slot, reset in
    /// bulk at the start of the slot's next frame.
    frame_pools: ManuallyDrop<Vec<DescriptorPool>>,

    object_buffer: ManuallyDrop<ObjectTransformBuffer>,
    assets: ManuallyDrop<AssetStore>,

    mesh_system: ManuallyDrop<MeshSystem>,
    light_system: ManuallyDrop<LightSystem>,

    frames: ManuallyDrop<FrameManager>,

    /// Window reported a resize; handled at the next frame boundary.
    framebuffer_resized: bool,
    width: u32,
    height: u32,
}

impl Renderer {
    /// Creates a renderer targeting the given window.
    ///
    /// Validation layers are enabled in debug builds.
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan resource creation fails.
    pub fn new(window: &Window) -> RhiResult<Self> {
        let width = window.width();
        let height = window.height();

        info!("Initializing renderer ({}x{})", width, height);

        let enable_validation = cfg!(debug_assertions);
        let instance = Instance::new(enable_validation)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device_info)?;

        let swapchain =
            Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;
        let depth_buffer = DepthBuffer::new(device.clone(), swapchain.extent())?;

        // Global set: one uniform buffer visible to all graphics stages.
        let global_layout = DescriptorSetLayout::builder()
            .binding(
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::ShaderStageFlags::ALL_GRAPHICS,
            )
            .build(device.clone())?;

        let global_pool = DescriptorPool::builder()
            .max_sets(MAX_FRAMES_IN_FLIGHT as u32)
            .pool_size(
                vk::DescriptorType::UNIFORM_BUFFER,
                MAX_FRAMES_IN_FLIGHT as u32,
            )
            .build(device.clone())?;

        let mut global_buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut global_sets = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let buffer = Buffer::new(
                device.clone(),
                BufferUsage::Uniform,
                GlobalUbo::SIZE as vk::DeviceSize,
            )?;
            let set = DescriptorWriter::new(&global_layout)
                .write_buffer(0, buffer.descriptor_info())
                .build(&global_pool)?;
            global_buffers.push(buffer);
            global_sets.push(set);
        }

        let mut frame_pools = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            frame_pools.push(
                DescriptorPool::builder()
                    .max_sets(FRAME_POOL_CAPACITY)
                    .pool_size(
                        vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                        FRAME_POOL_CAPACITY,
                    )
                    .pool_size(vk::DescriptorType::UNIFORM_BUFFER, FRAME_POOL_CAPACITY)
                    .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
                    .build(device.clone())?,
            );
        }

        let object_buffer = ObjectTransformBuffer::new(device.clone())?;
        let assets = AssetStore::new(device.clone())?;

        let mesh_system = MeshSystem::new(
            device.clone(),
            &global_layout,
            swapchain.format(),
            depth_buffer.format(),
        )?;
        let light_system = LightSystem::new(
            device.clone(),
            &global_layout,
            swapchain.format(),
            depth_buffer.format(),
        )?;

        let frames = FrameManager::new(device.clone())?;

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
            swapchain: ManuallyDrop::new(swapchain),
            depth_buffer: ManuallyDrop::new(depth_buffer),
            global_layout: ManuallyDrop::new(global_layout),
            global_pool: ManuallyDrop::new(global_pool),
            global_buffers: ManuallyDrop::new(global_buffers),
            global_sets,
            frame_pools: ManuallyDrop::new(frame_pools),
            object_buffer: ManuallyDrop::new(object_buffer),
            assets: ManuallyDrop::new(assets),
            mesh_system: ManuallyDrop::new(mesh_system),
            light_system: ManuallyDrop::new(light_system),
            frames: ManuallyDrop::new(frames),
            framebuffer_resized: false,
            width,
            height,
        })
    }

    /// Uploads a model's geometry and registers the mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation fails.
    pub fn load_mesh(&mut self, model: &Model) -> RhiResult<MeshHandle> {
        let mesh = Mesh::from_model(Arc::clone(&self.device), model)?;
        Ok(self.assets.add_mesh(mesh))
    }

    /// Loads an image file as a material texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the upload fails.
    pub fn load_texture(&mut self, path: &Path) -> RhiResult<Arc<Texture>> {
        let texture = Texture::from_file(
            Arc::clone(&self.device),
            path,
            vk::Format::R8G8B8A8_SRGB,
        )?;
        Ok(Arc::new(texture))
    }

    /// Registers a material and returns its handle.
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.assets.add_material(material)
    }

    /// Installs the texture bound to the mesh pass's shadow slot.
    ///
    /// Until a shadow pass provides one, every draw samples the default
    /// texture there.
    pub fn set_shadow_map(&mut self, texture: Option<Arc<Texture>>) {
        self.mesh_system.set_shadow_map(texture);
    }

    /// Returns the swapchain aspect ratio, width over height.
    pub fn aspect_ratio(&self) -> f32 {
        self.swapchain.aspect_ratio()
    }

    /// Notifies the renderer of a window resize.
    ///
    /// Swapchain recreation happens at the next frame boundary; zero-sized
    /// dimensions (minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!("Ignoring resize to zero dimensions");
            return;
        }

        if width != self.width || height != self.height {
            debug!(
                "Resize triggered: {}x{} -> {}x{}",
                self.width, self.height, width, height
            );
            self.width = width;
            self.height = height;
            self.framebuffer_resized = true;
        }
    }

    /// Blocks until the GPU has finished all submitted work.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }

    /// Runs one frame against the caller's scene.
    ///
    /// The frame proceeds in fixed order: acquire and begin, reset this
    /// slot's transient pool, aggregate lights and upload the global UBO,
    /// upload per-object transforms, then record the mesh pass followed by
    /// the light pass, submit, and present. A stale surface at any boundary
    /// recreates the swapchain; the tick is skipped when acquisition
    /// failed, otherwise the frame still presents.
    ///
    /// # Errors
    ///
    /// Returns an error on device loss or other non-recoverable Vulkan
    /// failures.
    pub fn render_frame(
        &mut self,
        camera: &Camera,
        registry: &ObjectRegistry,
        frame_time: f32,
    ) -> RhiResult<()> {
        if self.framebuffer_resized {
            debug!("Resize requested, recreating swapchain before acquire");
            self.recreate_swapchain()?;
        }

        match self.frames.begin_frame(&self.swapchain) {
            Ok(()) => {}
            Err(RhiError::SurfaceOutOfDate) => {
                debug!("Swapchain out of date at acquire, recreating");
                self.recreate_swapchain()?;
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        let frame_index = self.frames.frame_index();

        // The slot's fence wait in begin_frame makes last use of this pool
        // finished; reclaim every per-object set from it at once.
        self.frame_pools[frame_index].reset()?;

        // Update phase: everything the GPU reads this frame is uploaded
        // before recording starts.
        let mut ubo = GlobalUbo::default();
        ubo.set_camera(camera);
        LightSystem::update(registry, &mut ubo);
        self.global_buffers[frame_index].write_data(0, bytemuck::bytes_of(&ubo))?;
        self.global_buffers[frame_index].flush(0, GlobalUbo::SIZE as vk::DeviceSize)?;
        self.object_buffer.update(frame_index, registry)?;

        // Render phase: meshes first, then additively blended lights over
        // the finished depth buffer.
        self.frames
            .begin_render_pass(&self.swapchain, &self.depth_buffer);

        let frame = FrameContext {
            frame_index,
            frame_time,
            cmd: self.frames.current_command(),
            camera,
            global_set: self.global_sets[frame_index],
            frame_pool: &self.frame_pools[frame_index],
        };
        self.mesh_system
            .render(&frame, registry, &self.assets, &self.object_buffer)?;
        self.light_system.render(&frame, registry);

        self.frames.end_render_pass();

        let needs_recreate = self.frames.end_frame(&self.swapchain)?;
        if needs_recreate || self.framebuffer_resized {
            debug!("Swapchain stale after present, recreating");
            self.recreate_swapchain()?;
        }

        Ok(())
    }

    /// Recreates the swapchain and depth buffer for the current size.
    fn recreate_swapchain(&mut self) -> RhiResult<()> {
        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.width,
            self.height,
        )?;

        // Swapchain recreation waits for the device to go idle, so the old
        // depth buffer is no longer referenced here.
        let depth_buffer = DepthBuffer::new(Arc::clone(&self.device), self.swapchain.extent())?;
        unsafe {
            ManuallyDrop::drop(&mut self.depth_buffer);
        }
        self.depth_buffer = ManuallyDrop::new(depth_buffer);

        self.framebuffer_resized = false;
        info!(
            "Swapchain recreated ({}x{})",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        // Manually drop resources in dependency order. The device clone is
        // released after every resource that holds one and before the
        // surface and instance, so the Vulkan device is destroyed while the
        // instance is still alive.
        unsafe {
            ManuallyDrop::drop(&mut self.frames);
            ManuallyDrop::drop(&mut self.light_system);
            ManuallyDrop::drop(&mut self.mesh_system);
            ManuallyDrop::drop(&mut self.assets);
            ManuallyDrop::drop(&mut self.object_buffer);
            ManuallyDrop::drop(&mut self.frame_pools);
            ManuallyDrop::drop(&mut self.global_buffers);
            ManuallyDrop::drop(&mut self.global_pool);
            ManuallyDrop::drop(&mut self.global_layout);
            ManuallyDrop::drop(&mut self.depth_buffer);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
