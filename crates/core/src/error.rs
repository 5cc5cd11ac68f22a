//! Cross-layer error type.
//!
//! Each crate keeps its own typed error (`ember_rhi::RhiError`,
//! `ember_resources::ResourceError`); this enum is the common currency at
//! the boundaries where layers meet, e.g. window/surface creation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// GPU API failures that escaped the RHI layer
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or surface management failures
    #[error("Window error: {0}")]
    Window(String),

    /// Asset import failures
    #[error("Resource error: {0}")]
    Resource(String),

    /// Shader module load failures
    #[error("Shader error: {0}")]
    Shader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything without a better home
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
