//! Matrix-free linear operator traits.
//!
//! The circulation system is never assembled as a matrix. Iterative solvers
//! only see a [`RealOperator`], which supplies the forward product and, for
//! adjoint solves, the transpose product.

use horseshoe_core::VectorsTensor;
use nalgebra::Vector3;

use crate::error::Result;
use crate::residual::ResidualFunction;

/// A square linear operator computing `y = A x` and `y = Aᵀ x` on f64 vectors.
pub trait RealOperator: Send + Sync {
    /// Dimension of the operator (N x N).
    fn dim(&self) -> usize;

    /// Apply the operator: `y = A x`.
    fn apply(&self, x: &[f64], y: &mut [f64]);

    /// Apply the transpose: `y = Aᵀ x`.
    fn apply_transpose(&self, x: &[f64], y: &mut [f64]);
}

/// Adapter that swaps the forward and transpose products of an operator.
#[derive(Debug, Clone, Copy)]
pub struct Transposed<'a, O: ?Sized>(pub &'a O);

impl<O: RealOperator + ?Sized> RealOperator for Transposed<'_, O> {
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

/// The flow-tangency residual, linear in circulation, at fixed geometry.
///
/// Borrowing the geometry keeps repeated products free of copies; shapes are
/// validated once in [`ResidualOperator::new`].
#[derive(Debug, Clone, Copy)]
pub struct ResidualOperator<'a> {
    residual: &'a ResidualFunction,
    alpha: f64,
    vectors: &'a [VectorsTensor],
    normals: &'a [Vec<Vector3<f64>>],
}

impl<'a> ResidualOperator<'a> {
    pub fn new(
        residual: &'a ResidualFunction,
        alpha: f64,
        vectors: &'a [VectorsTensor],
        normals: &'a [Vec<Vector3<f64>>],
    ) -> Result<Self> {
        residual.check_geometry(vectors, normals)?;
        Ok(Self {
            residual,
            alpha,
            vectors,
            normals,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn residual(&self) -> &'a ResidualFunction {
        self.residual
    }

    pub fn vectors(&self) -> &'a [VectorsTensor] {
        self.vectors
    }

    pub fn normals(&self) -> &'a [Vec<Vector3<f64>>] {
        self.normals
    }
}

impl RealOperator for ResidualOperator<'_> {
    fn dim(&self) -> usize {
        self.residual.system_size()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        let r = self
            .residual
            .residual_unchecked(self.alpha, self.vectors, self.normals, x);
        y.copy_from_slice(&r);
    }

    fn apply_transpose(&self, x: &[f64], y: &mut [f64]) {
        let seed = self.residual.unproject(x, self.normals);
        let r = self
            .residual
            .aic()
            .transpose_unchecked(self.alpha, self.vectors, &seed);
        y.copy_from_slice(&r);
    }
}
