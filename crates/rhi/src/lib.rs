//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Safe wrappers over `ash` covering what the engine's frame loop needs:
//! - Instance and device creation
//! - Swapchain management and presentation
//! - Buffers, including aligned per-instance uniform slots
//! - Sampled textures
//! - Descriptor layouts, pools, and set writers
//! - Graphics pipelines for dynamic rendering
//! - Command recording and per-frame synchronization

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod rendering;
pub mod sampler;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex;

pub use error::{RhiError, RhiResult};

// Re-export ash types that callers touch directly
pub use ash::vk;
