//! GPU asset arenas: meshes, materials, and the engine default texture.
//!
//! Scene objects reference assets through plain index handles
//! ([`MeshHandle`], [`MaterialHandle`]) instead of owning GPU resources, so
//! the registry stays GPU-free and assets outlive any object that points at
//! them. Handles are only minted by the store's `add_*` methods; looking up
//! a handle that was never issued is a programming error and panics.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use ember_rhi::RhiResult;
use ember_rhi::device::Device;
use ember_rhi::texture::Texture;
use ember_scene::{MaterialHandle, MeshHandle};

use crate::mesh::Mesh;

/// Texture maps for the mesh pass, all optional.
///
/// Slots left `None` resolve to the engine default texture at bind time, so
/// a material with only a diffuse map still produces a complete descriptor
/// set.
#[derive(Clone, Default)]
pub struct Material {
    /// Base color.
    pub diffuse: Option<Arc<Texture>>,
    /// Tangent-space normal map.
    pub normal: Option<Arc<Texture>>,
    /// Ambient occlusion.
    pub ambient_occlusion: Option<Arc<Texture>>,
    /// Roughness.
    pub roughness: Option<Arc<Texture>>,
    /// Metallic.
    pub metallic: Option<Arc<Texture>>,
}

/// Owner of every uploaded mesh and material.
///
/// Arena slot 0 of the material table is the all-default material that
/// newly created objects reference ([`MaterialHandle::DEFAULT`]).
pub struct AssetStore {
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    default_texture: Arc<Texture>,
}

impl AssetStore {
    /// Creates the store with the default texture and default material.
    ///
    /// The default texture is a single opaque white texel; unset material
    /// slots sample it as a neutral value.
    ///
    /// # Errors
    ///
    /// Returns an error if the default texture upload fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let default_texture = Arc::new(Texture::from_pixels(
            device,
            vk::Format::R8G8B8A8_UNORM,
            1,
            1,
            &[255, 255, 255, 255],
        )?);

        debug!("Asset store initialized with default texture");

        Ok(Self {
            meshes: Vec::new(),
            // Slot 0: MaterialHandle::DEFAULT
            materials: vec![Material::default()],
            default_texture,
        })
    }

    /// Adds a mesh and returns its handle.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        let handle = MeshHandle::new(self.meshes.len() as u32);
        self.meshes.push(mesh);
        handle
    }

    /// Adds a material and returns its handle.
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        let handle = MaterialHandle::new(self.materials.len() as u32);
        self.materials.push(material);
        handle
    }

    /// Looks up a mesh. Panics on a handle this store never issued.
    #[inline]
    pub fn mesh(&self, handle: MeshHandle) -> &Mesh {
        &self.meshes[handle.index()]
    }

    /// Looks up a material. Panics on a handle this store never issued.
    #[inline]
    pub fn material(&self, handle: MaterialHandle) -> &Material {
        &self.materials[handle.index()]
    }

    /// Returns the engine default texture.
    #[inline]
    pub fn default_texture(&self) -> &Arc<Texture> {
        &self.default_texture
    }

    /// Returns the number of stored meshes.
    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
