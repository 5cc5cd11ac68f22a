//! Scene representation for the renderer.
//!
//! This crate provides the CPU-side scene model:
//! - Euler transform math (model and normal matrices)
//! - Camera with cached view/projection matrices
//! - Point light component
//! - Object registry with sequential id allocation
//!
//! Everything here is plain data with no GPU types, so the transform and
//! registry semantics are testable without a Vulkan device.

pub mod camera;
pub mod light;
pub mod object;
pub mod registry;
pub mod transform;

pub use camera::Camera;
pub use light::PointLight;
pub use object::{MaterialHandle, MeshHandle, ObjectId, SceneObject};
pub use registry::{ObjectRegistry, MAX_OBJECTS};
pub use transform::Transform;
