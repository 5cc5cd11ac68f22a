//! Asset loading for the renderer.
//!
//! This crate handles parsing of external assets into CPU-side data:
//! - Wavefront OBJ models with vertex deduplication and tangent generation
//!
//! GPU upload of the parsed data is the renderer's job; nothing here touches
//! a Vulkan device.

pub mod error;
pub mod model;

pub use error::{ResourceError, ResourceResult};
pub use model::Model;
