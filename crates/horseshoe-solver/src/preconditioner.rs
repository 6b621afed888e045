//! Preconditioners for the iterative circulation solve.

use crate::error::{Error, Result};
use crate::operator::Transposed;

/// A preconditioner `M⁻¹` applied as `y = M⁻¹ x`.
pub trait RealPreconditioner: Send + Sync {
    /// Dimension of the preconditioner.
    fn dim(&self) -> usize;

    /// Apply the preconditioner: `y = M⁻¹ x`.
    fn apply(&self, x: &[f64], y: &mut [f64]);

    /// Apply the transposed preconditioner. Symmetric preconditioners keep
    /// the default.
    fn apply_transpose(&self, x: &[f64], y: &mut [f64]) {
        self.apply(x, y);
    }
}

impl<P: RealPreconditioner + ?Sized> RealPreconditioner for Transposed<'_, P> {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        self.0.apply_transpose(x, y);
    }

    fn apply_transpose(&self, x: &[f64], y: &mut [f64]) {
        self.0.apply(x, y);
    }
}

/// Preconditioner type for iterative solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreconditionerType {
    /// No preconditioning (identity).
    None,
    /// Jacobi (diagonal) preconditioning from the exact self-induction terms.
    #[default]
    Jacobi,
}

impl PreconditionerType {
    /// Parse from a string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "none" | "identity" => Some(Self::None),
            "jacobi" | "diag" | "diagonal" => Some(Self::Jacobi),
            _ => None,
        }
    }
}

/// Diagonal preconditioner storing the reciprocal diagonal.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Build from the operator diagonal. Zero or non-finite entries are
    /// rejected rather than silently producing infinities.
    pub fn from_diagonal(diag: &[f64]) -> Result<Self> {
        let inv_diag = diag
            .iter()
            .enumerate()
            .map(|(index, &d)| {
                if d == 0.0 || !d.is_finite() {
                    Err(Error::SingularDiagonal { index })
                } else {
                    Ok(1.0 / d)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { inv_diag })
    }

    pub fn inverse_diagonal(&self) -> &[f64] {
        &self.inv_diag
    }
}

impl RealPreconditioner for JacobiPreconditioner {
    fn dim(&self) -> usize {
        self.inv_diag.len()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        for ((yi, xi), d) in y.iter_mut().zip(x).zip(&self.inv_diag) {
            *yi = xi * d;
        }
    }
}

/// Pass-through preconditioner.
#[derive(Debug, Clone, Copy)]
pub struct IdentityPreconditioner {
    dim: usize,
}

impl IdentityPreconditioner {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl RealPreconditioner for IdentityPreconditioner {
    fn dim(&self) -> usize {
        self.dim
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        y.copy_from_slice(x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preconditioner_type_from_name() {
        assert_eq!(PreconditionerType::from_name("Jacobi"), Some(PreconditionerType::Jacobi));
        assert_eq!(PreconditionerType::from_name("diag"), Some(PreconditionerType::Jacobi));
        assert_eq!(PreconditionerType::from_name("none"), Some(PreconditionerType::None));
        assert_eq!(PreconditionerType::from_name("ilu0"), None);
        assert_eq!(PreconditionerType::default(), PreconditionerType::Jacobi);
    }

    #[test]
    fn jacobi_applies_reciprocal() {
        let p = JacobiPreconditioner::from_diagonal(&[2.0, -4.0, 0.5]).unwrap();
        let mut y = vec![0.0; 3];
        p.apply(&[1.0, 1.0, 1.0], &mut y);
        assert_eq!(y, vec![0.5, -0.25, 2.0]);

        let mut yt = vec![0.0; 3];
        Transposed(&p).apply(&[1.0, 1.0, 1.0], &mut yt);
        assert_eq!(y, yt);
    }

    #[test]
    fn jacobi_rejects_zero_diagonal() {
        let r = JacobiPreconditioner::from_diagonal(&[1.0, 0.0, 3.0]);
        assert!(matches!(r, Err(Error::SingularDiagonal { index: 1 })));
        let r = JacobiPreconditioner::from_diagonal(&[f64::NAN]);
        assert!(matches!(r, Err(Error::SingularDiagonal { index: 0 })));
    }

    #[test]
    fn identity_copies() {
        let p = IdentityPreconditioner::new(2);
        let mut y = vec![0.0; 2];
        p.apply(&[3.0, -1.0], &mut y);
        assert_eq!(y, vec![3.0, -1.0]);
        assert_eq!(p.dim(), 2);
    }
}
