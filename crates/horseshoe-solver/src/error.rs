//! Error types for horseshoe-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] horseshoe_core::Error),

    #[error("convergence failed after {iterations} iterations (relative residual {residual:e})")]
    ConvergenceFailed { iterations: usize, residual: f64 },

    #[error("zero diagonal entry at index {index}; Jacobi preconditioner is undefined")]
    SingularDiagonal { index: usize },

    #[error("invalid dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{operation} requires {required} evaluation points, operator uses {actual}")]
    UnsupportedEvalSet {
        operation: &'static str,
        required: &'static str,
        actual: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
