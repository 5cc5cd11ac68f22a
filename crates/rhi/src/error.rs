//! RHI error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RhiError {
    /// Raw Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load the Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// The presentation surface no longer matches the swapchain.
    /// Recoverable: recreate the swapchain and skip the frame.
    #[error("presentation surface out of date")]
    SurfaceOutOfDate,

    /// A descriptor pool ran out of sets or per-type capacity.
    /// Recoverable: the caller may skip the allocation and retry next frame.
    #[error("descriptor pool exhausted")]
    DescriptorPoolExhausted,

    /// Shader module load error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Invalid handle or argument
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Texture decode or upload error
    #[error("Texture error: {0}")]
    TextureError(String),
}

pub type RhiResult<T> = std::result::Result<T, RhiError>;
