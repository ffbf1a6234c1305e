use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds that callers of the pipeline need to tell apart.
///
/// Library functions return `anyhow::Result` and wrap these with context as
/// they travel up; use [`VolumeError::kind_of`] to recover the kind from a
/// wrapped error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VolumeError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to decode volume {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Index {index} out of range for source of length {len}")]
    Index { index: usize, len: usize },

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl VolumeError {
    /// Finds the first `VolumeError` in an error's cause chain.
    pub fn kind_of(err: &anyhow::Error) -> Option<&VolumeError> {
        err.chain().find_map(|cause| cause.downcast_ref::<VolumeError>())
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            VolumeError::FileNotFound { .. } => "FILE_NOT_FOUND",
            VolumeError::Decode { .. } => "DECODE_ERROR",
            VolumeError::Shape(_) => "SHAPE_ERROR",
            VolumeError::Index { .. } => "INDEX_ERROR",
            VolumeError::Worker(_) => "WORKER_ERROR",
            VolumeError::InvalidConfig(_) => "INVALID_CONFIG",
            VolumeError::InvalidValue(_) => "INVALID_VALUE",
        }
    }
}
