//! Frame orchestration and render passes.
//!
//! This crate drives the per-frame lifecycle and everything recorded inside
//! it:
//! - Frame begin/end state machine and synchronization
//! - Global and per-object uniform data
//! - Mesh and point light render passes
//! - GPU asset ownership (meshes, materials, textures)

pub mod assets;
pub mod depth_buffer;
pub mod frame;
pub mod light_system;
pub mod mesh;
pub mod mesh_system;
pub mod object_buffer;
pub mod renderer;
pub mod ubo;

pub use assets::{AssetStore, Material};
pub use frame::{FrameContext, FrameManager};
pub use light_system::LightSystem;
pub use mesh::Mesh;
pub use mesh_system::{MeshDraw, MeshSystem, mesh_draw_list};
pub use object_buffer::ObjectTransformBuffer;
pub use renderer::Renderer;
pub use ubo::{GlobalUbo, MAX_LIGHTS, ObjectUbo, PointLightUbo};

pub use ember_rhi::sync::MAX_FRAMES_IN_FLIGHT;
