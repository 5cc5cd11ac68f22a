//! Renderable scene objects and their optional attributes.

use glam::Vec3;

use crate::light::PointLight;
use crate::transform::Transform;

/// Identifier of a scene object.
///
/// Ids are assigned sequentially by [`ObjectRegistry`](crate::ObjectRegistry)
/// and never reused; the id doubles as the object's slot index in the
/// renderer's per-object uniform buffer.
pub type ObjectId = u32;

/// Index of a mesh in the renderer's mesh arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(u32);

impl MeshHandle {
    /// Create a handle for the given arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the arena index this handle refers to.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a material in the renderer's material arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(u32);

impl MaterialHandle {
    /// The fallback material every new object starts with.
    ///
    /// The renderer guarantees arena slot 0 holds a material whose maps all
    /// resolve to the default texture.
    pub const DEFAULT: MaterialHandle = MaterialHandle(0);

    /// Create a handle for the given arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the arena index this handle refers to.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An object in the scene: a transform plus optional attributes.
///
/// Whether an object participates in a render pass is decided by which
/// attributes it carries: the mesh pass draws objects with a mesh, the light
/// pass gathers objects with a point light. Objects with neither still occupy
/// an id (the demo's camera viewer object is one).
#[derive(Clone, Debug)]
pub struct SceneObject {
    id: ObjectId,
    /// World-space placement
    pub transform: Transform,
    /// Base color; for lights this is the emission color
    pub color: Vec3,
    /// Mesh to draw, if any
    pub mesh: Option<MeshHandle>,
    /// Material used by the mesh pass
    pub material: Option<MaterialHandle>,
    /// Point light attribute, if this object emits light
    pub point_light: Option<PointLight>,
}

impl SceneObject {
    pub(crate) fn new(id: ObjectId) -> Self {
        Self {
            id,
            transform: Transform::default(),
            color: Vec3::ZERO,
            mesh: None,
            material: Some(MaterialHandle::DEFAULT),
            point_light: None,
        }
    }

    /// Get this object's id.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_object_defaults() {
        let obj = SceneObject::new(7);
        assert_eq!(obj.id(), 7);
        assert_eq!(obj.transform, Transform::default());
        assert_eq!(obj.color, Vec3::ZERO);
        assert!(obj.mesh.is_none());
        assert_eq!(obj.material, Some(MaterialHandle::DEFAULT));
        assert!(obj.point_light.is_none());
    }

    #[test]
    fn test_handle_round_trip() {
        let mesh = MeshHandle::new(3);
        assert_eq!(mesh.index(), 3);

        let material = MaterialHandle::new(12);
        assert_eq!(material.index(), 12);
        assert_eq!(MaterialHandle::DEFAULT.index(), 0);
    }
}
