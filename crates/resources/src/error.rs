//! Error types for resource loading.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Failed to parse an OBJ file.
    #[error("failed to load OBJ file '{path}': {source}")]
    ObjLoad {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Underlying parser error.
        source: tobj::LoadError,
    },

    /// Failed to parse OBJ data from an in-memory buffer.
    #[error("failed to parse OBJ data: {0}")]
    ObjParse(#[from] tobj::LoadError),

    /// The OBJ data contained no triangles.
    #[error("model '{0}' contains no triangles")]
    EmptyModel(PathBuf),

    /// File not found.
    #[error("model file not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
