//! Reverse-mode derivatives of the induced-velocity and residual maps.
//!
//! Given a seed on the outputs, these return the vector-Jacobian products
//! with respect to every input: angle of attack, every vectors tensor,
//! circulations and (for the residual) normals. Gradients with respect to
//! circulation go through the same transpose product the adjoint linear solve
//! uses, so both are consistent by construction.

use horseshoe_core::{PointBlock, PointBlockMut, VectorsTensor};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::aic::{AicOperator, panel_coefficient_vjp};
use crate::error::{Error, Result};
use crate::kernel::{wake_direction, wake_direction_derivative};
use crate::residual::ResidualFunction;

/// Gradient of `⟨seed, v⟩` for the induced-velocity map.
#[derive(Debug, Clone)]
pub struct VelocityGradient {
    /// With respect to angle of attack, per degree.
    pub alpha: f64,
    /// One tensor per surface, same shapes as the inputs.
    pub vectors: Vec<VectorsTensor>,
    pub circulations: Vec<f64>,
}

/// Gradient of `⟨seed, residual⟩` for the tangency residual.
#[derive(Debug, Clone)]
pub struct ResidualGradient {
    /// With respect to angle of attack, per degree.
    pub alpha: f64,
    pub vectors: Vec<VectorsTensor>,
    pub normals: Vec<Vec<Vector3<f64>>>,
    pub circulations: Vec<f64>,
}

impl AicOperator {
    /// Vector-Jacobian product of [`AicOperator::compute_velocity`] in full mode.
    pub fn velocity_vjp(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        circulations: &[f64],
        seed: &[Vector3<f64>],
    ) -> Result<VelocityGradient> {
        self.check_vectors(vectors)?;
        self.layout()
            .check_system_vector("circulations", circulations.len())?;
        if seed.len() != self.num_eval_points() {
            return Err(Error::DimensionMismatch {
                expected: self.num_eval_points(),
                actual: seed.len(),
            });
        }

        let (d_alpha, d_vectors) = self.geometry_vjp_unchecked(alpha, vectors, circulations, seed);
        Ok(VelocityGradient {
            alpha: d_alpha,
            vectors: d_vectors,
            circulations: self.transpose_unchecked(alpha, vectors, seed),
        })
    }

    /// Gradients with respect to `alpha` and the vectors tensors.
    ///
    /// Every evaluation point owns a disjoint block of each gradient tensor,
    /// so the blocks are filled in parallel without synchronisation. The
    /// per-point `alpha` contributions are reduced sequentially to keep the
    /// result independent of thread scheduling.
    pub(crate) fn geometry_vjp_unchecked(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        circulations: &[f64],
        seed: &[Vector3<f64>],
    ) -> (f64, Vec<VectorsTensor>) {
        let u = wake_direction(alpha);
        let du_dalpha = wake_direction_derivative(alpha);
        let mut d_alpha = 0.0;
        let mut d_vectors = Vec::with_capacity(vectors.len());

        for ((slot, tensor), exp) in self
            .layout()
            .slots()
            .iter()
            .zip(vectors)
            .zip(self.expansions())
        {
            let gamma = &circulations[slot.range()];
            let cols = exp.panel_cols();
            let ny = tensor.ny();
            let mut grad = tensor.zeros_like();

            let per_point: Vec<f64> = grad
                .as_mut_slice()
                .par_chunks_mut(tensor.block_len())
                .enumerate()
                .map(|(i, chunk)| {
                    let block = PointBlock::new(tensor, i);
                    let mut grad_block = PointBlockMut::new(ny, chunk);
                    let mut d_u = Vector3::zeros();
                    for j in 0..exp.panel_rows() {
                        for m in 0..cols {
                            let circ = gamma[j * cols + m];
                            if circ == 0.0 {
                                continue;
                            }
                            d_u += panel_coefficient_vjp(
                                &block,
                                &mut grad_block,
                                exp,
                                j,
                                m,
                                &u,
                                &(seed[i] * circ),
                            );
                        }
                    }
                    d_u.dot(&du_dalpha)
                })
                .collect();

            d_alpha += per_point.iter().sum::<f64>();
            d_vectors.push(grad);
        }
        (d_alpha, d_vectors)
    }
}

impl ResidualFunction {
    /// Vector-Jacobian product of [`ResidualFunction::compute_residual`].
    pub fn residual_vjp(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
        circulations: &[f64],
        seed: &[f64],
    ) -> Result<ResidualGradient> {
        self.check_geometry(vectors, normals)?;
        self.aic()
            .layout()
            .check_system_vector("circulations", circulations.len())?;
        self.check_seed(seed.len())?;

        // residual[i] = v[i]·n[i]  =>  ∂/∂n[i] = seed[i] v[i],  ∂/∂v[i] = seed[i] n[i]
        let velocities = self.aic().velocity_unchecked(alpha, vectors, circulations);
        let d_normals = self
            .aic()
            .layout()
            .slots()
            .iter()
            .map(|slot| {
                velocities[slot.range()]
                    .iter()
                    .zip(&seed[slot.range()])
                    .map(|(v, s)| v * *s)
                    .collect()
            })
            .collect();

        let d_velocity = self.unproject(seed, normals);
        let (d_alpha, d_vectors) =
            self.aic()
                .geometry_vjp_unchecked(alpha, vectors, circulations, &d_velocity);
        let d_circulations = self.aic().transpose_unchecked(alpha, vectors, &d_velocity);

        Ok(ResidualGradient {
            alpha: d_alpha,
            vectors: d_vectors,
            normals: d_normals,
            circulations: d_circulations,
        })
    }

    /// Transpose of the residual operator applied to `seed`: `∂⟨seed, residual⟩/∂Γ`.
    pub fn residual_transpose(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
        seed: &[f64],
    ) -> Result<Vec<f64>> {
        self.check_geometry(vectors, normals)?;
        self.check_seed(seed.len())?;
        let d_velocity = self.unproject(seed, normals);
        Ok(self.aic().transpose_unchecked(alpha, vectors, &d_velocity))
    }
}
