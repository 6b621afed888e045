//! Error types for horseshoe-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid surface '{name}': {reason}")]
    InvalidSurface { name: String, reason: String },

    #[error("duplicate surface: {0}")]
    DuplicateSurface(String),

    #[error("surface not found: {0}")]
    SurfaceNotFound(String),

    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
