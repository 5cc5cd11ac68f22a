//! Object registry: id allocation and ordered object storage.

use std::collections::BTreeMap;

use glam::Vec3;

use crate::light::PointLight;
use crate::object::{ObjectId, SceneObject};

/// Hard capacity of the registry.
///
/// The per-object GPU uniform buffers are pre-sized to this many slots and an
/// object's id is its slot index, so exceeding it is a programming error
/// rather than a recoverable condition.
pub const MAX_OBJECTS: usize = 1000;

/// Owns every scene object and hands out sequential ids.
///
/// Objects are stored in a `BTreeMap` so iteration always visits them in
/// ascending id order, which keeps draw submission deterministic from frame
/// to frame. Ids come from a monotonic counter and are never reused, even
/// though objects cannot currently be removed.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: ObjectId,
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new object and return a mutable reference to it.
    ///
    /// The object starts with an identity transform, zero color, no mesh, no
    /// light, and the default material.
    ///
    /// # Panics
    /// Panics if [`MAX_OBJECTS`] objects have already been created.
    pub fn create_object(&mut self) -> &mut SceneObject {
        assert!(
            (self.next_id as usize) < MAX_OBJECTS,
            "object capacity ({}) exceeded",
            MAX_OBJECTS
        );
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, SceneObject::new(id));
        self.objects.get_mut(&id).unwrap()
    }

    /// Create an object carrying a point light attribute.
    ///
    /// Lights share the object id space; they are distinguished from mesh
    /// objects only by the presence of the light attribute. The billboard
    /// radius is stored in `transform.scale.x`.
    pub fn create_point_light(
        &mut self,
        intensity: f32,
        radius: f32,
        color: Vec3,
    ) -> &mut SceneObject {
        let object = self.create_object();
        object.color = color;
        object.transform.scale.x = radius;
        object.point_light = Some(PointLight::new(intensity));
        object
    }

    /// Look up an object by id.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Look up an object by id, mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    /// Iterate over all objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    /// Iterate over all objects in ascending id order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.values_mut()
    }

    /// Number of objects in the registry.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the registry holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::MaterialHandle;

    #[test]
    fn test_ids_are_sequential() {
        let mut registry = ObjectRegistry::new();
        let a = registry.create_object().id();
        let b = registry.create_object().id();
        let c = registry.create_object().id();
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_create_object_defaults() {
        let mut registry = ObjectRegistry::new();
        let obj = registry.create_object();
        assert_eq!(obj.material, Some(MaterialHandle::DEFAULT));
        assert!(obj.mesh.is_none());
        assert!(obj.point_light.is_none());
    }

    #[test]
    fn test_create_point_light() {
        let mut registry = ObjectRegistry::new();
        let light = registry.create_point_light(10.0, 0.1, Vec3::ONE);

        assert_eq!(light.point_light, Some(PointLight::new(10.0)));
        assert_eq!(light.transform.scale.x, 0.1);
        assert_eq!(light.color, Vec3::ONE);
        assert!(light.mesh.is_none());
    }

    #[test]
    fn test_iteration_in_id_order() {
        let mut registry = ObjectRegistry::new();
        for _ in 0..5 {
            registry.create_object();
        }
        let ids: Vec<_> = registry.iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_get_and_get_mut() {
        let mut registry = ObjectRegistry::new();
        let id = registry.create_object().id();

        registry.get_mut(id).unwrap().color = Vec3::new(0.5, 0.0, 0.0);
        assert_eq!(registry.get(id).unwrap().color, Vec3::new(0.5, 0.0, 0.0));
        assert!(registry.get(999).is_none());
    }

    #[test]
    fn test_capacity_boundary() {
        let mut registry = ObjectRegistry::new();
        for _ in 0..MAX_OBJECTS {
            registry.create_object();
        }
        assert_eq!(registry.len(), MAX_OBJECTS);
    }

    #[test]
    #[should_panic(expected = "object capacity")]
    fn test_capacity_exceeded_panics() {
        let mut registry = ObjectRegistry::new();
        for _ in 0..=MAX_OBJECTS {
            registry.create_object();
        }
    }
}
