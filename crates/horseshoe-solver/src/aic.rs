//! Implicit aerodynamic influence coefficient (AIC) operator.
//!
//! Maps panel circulations to induced velocities at one set of evaluation
//! points without ever materialising the dense `num_eval × system_size`
//! matrix. Every entry of that matrix is produced on demand by
//! [`panel_coefficient`], the single routine shared by the full product, the
//! Jacobi diagonal, the transpose product and the adjoint, so all of them see
//! identical coefficients.
//!
//! # Vortex ring layout
//!
//! ```text
//!   A ----- B      front:  A → B
//!   |       |      right:  B → C
//!   |       |      rear:   C → D
//!   D ----- C      left:   D → A
//! ```
//!
//! A = (row, col+1), B = (row, col), C = (row+1, col), D = (row+1, col+1)
//! in the image grid. On the last chordwise row the rear filament is removed
//! and two semi-infinite trailing filaments leave C and D along the
//! free-stream direction, turning the ring into a horseshoe.

use horseshoe_core::{EvalPointSet, PointBlock, PointBlockMut, SurfaceLayout, VectorsTensor};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::images::ImageExpansion;
use crate::kernel::{
    finite_segment_velocity, finite_segment_vjp, semi_infinite_velocity, semi_infinite_vjp,
    wake_direction,
};

/// Which part of the operator to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VelocityMode {
    /// Full product over every (evaluation point, panel) pair.
    #[default]
    Full,
    /// Only the self-induction entries: evaluation point `i` against its own
    /// panel's circulation.
    JacobiOnly,
}

/// AIC operator for one evaluation-point set.
#[derive(Debug, Clone)]
pub struct AicOperator {
    layout: SurfaceLayout,
    eval: EvalPointSet,
    num_eval_points: usize,
    expansions: Vec<ImageExpansion>,
}

impl AicOperator {
    /// Create an operator for `num_eval_points` points of set `eval`.
    ///
    /// Collocation points are one per panel, so their count must equal the
    /// system size.
    pub fn new(layout: SurfaceLayout, eval: EvalPointSet, num_eval_points: usize) -> Result<Self> {
        if eval == EvalPointSet::Collocation && num_eval_points != layout.system_size() {
            return Err(Error::DimensionMismatch {
                expected: layout.system_size(),
                actual: num_eval_points,
            });
        }
        Ok(Self::build(layout, eval, num_eval_points))
    }

    /// Operator at the collocation points of `layout`.
    pub fn collocation(layout: SurfaceLayout) -> Self {
        let n = layout.system_size();
        Self::build(layout, EvalPointSet::Collocation, n)
    }

    fn build(layout: SurfaceLayout, eval: EvalPointSet, num_eval_points: usize) -> Self {
        let expansions = layout
            .slots()
            .iter()
            .map(|slot| ImageExpansion::new(&slot.spec))
            .collect();
        Self {
            layout,
            eval,
            num_eval_points,
            expansions,
        }
    }

    pub fn layout(&self) -> &SurfaceLayout {
        &self.layout
    }

    pub fn eval(&self) -> EvalPointSet {
        self.eval
    }

    pub fn num_eval_points(&self) -> usize {
        self.num_eval_points
    }

    pub fn system_size(&self) -> usize {
        self.layout.system_size()
    }

    pub(crate) fn expansions(&self) -> &[ImageExpansion] {
        &self.expansions
    }

    /// Check one vectors tensor per surface against the declared image extents.
    pub fn check_vectors(&self, vectors: &[VectorsTensor]) -> Result<()> {
        if vectors.len() != self.layout.len() {
            return Err(horseshoe_core::Error::LengthMismatch {
                what: format!("{} vectors surfaces", self.eval),
                expected: self.layout.len(),
                actual: vectors.len(),
            }
            .into());
        }
        for (slot, tensor) in self.layout.slots().iter().zip(vectors) {
            tensor.check_for(slot, self.num_eval_points, &slot.vectors_key(self.eval))?;
        }
        Ok(())
    }

    /// Induced velocity at every evaluation point.
    ///
    /// `alpha` is in degrees; `vectors` holds one tensor per surface in
    /// declaration order; `circulations` has one entry per panel.
    pub fn compute_velocity(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        circulations: &[f64],
        mode: VelocityMode,
    ) -> Result<Vec<Vector3<f64>>> {
        self.check_vectors(vectors)?;
        self.layout
            .check_system_vector("circulations", circulations.len())?;

        match mode {
            VelocityMode::Full => Ok(self.velocity_unchecked(alpha, vectors, circulations)),
            VelocityMode::JacobiOnly => {
                self.require_collocation("Jacobi-only evaluation")?;
                Ok(self.jacobi_unchecked(alpha, vectors, circulations))
            }
        }
    }

    /// Free-stream plus induced velocity at every evaluation point.
    pub fn total_velocities(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        circulations: &[f64],
        freestream: &[Vector3<f64>],
    ) -> Result<Vec<Vector3<f64>>> {
        if freestream.len() != self.num_eval_points {
            return Err(Error::DimensionMismatch {
                expected: self.num_eval_points,
                actual: freestream.len(),
            });
        }
        let mut velocities = self.compute_velocity(alpha, vectors, circulations, VelocityMode::Full)?;
        for (v, f) in velocities.iter_mut().zip(freestream) {
            *v += f;
        }
        Ok(velocities)
    }

    pub(crate) fn require_collocation(&self, operation: &'static str) -> Result<()> {
        if self.eval != EvalPointSet::Collocation {
            return Err(Error::UnsupportedEvalSet {
                operation,
                required: EvalPointSet::Collocation.name(),
                actual: self.eval.name(),
            });
        }
        Ok(())
    }

    pub(crate) fn velocity_unchecked(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        circulations: &[f64],
    ) -> Vec<Vector3<f64>> {
        let u = wake_direction(alpha);
        let mut velocities = vec![Vector3::zeros(); self.num_eval_points];

        for ((slot, tensor), exp) in self
            .layout
            .slots()
            .iter()
            .zip(vectors)
            .zip(&self.expansions)
        {
            let gamma = &circulations[slot.range()];
            let cols = exp.panel_cols();
            velocities.par_iter_mut().enumerate().for_each(|(i, v)| {
                let block = PointBlock::new(tensor, i);
                for j in 0..exp.panel_rows() {
                    for m in 0..cols {
                        *v += panel_coefficient(&block, exp, j, m, &u) * gamma[j * cols + m];
                    }
                }
            });
        }
        velocities
    }

    pub(crate) fn jacobi_unchecked(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        circulations: &[f64],
    ) -> Vec<Vector3<f64>> {
        let u = wake_direction(alpha);
        let mut velocities = vec![Vector3::zeros(); self.num_eval_points];

        for ((slot, tensor), exp) in self
            .layout
            .slots()
            .iter()
            .zip(vectors)
            .zip(&self.expansions)
        {
            let cols = exp.panel_cols();
            let offset = slot.offset;
            velocities[slot.range()]
                .par_iter_mut()
                .enumerate()
                .for_each(|(q, v)| {
                    let block = PointBlock::new(tensor, offset + q);
                    let coef = panel_coefficient(&block, exp, q / cols, q % cols, &u);
                    *v = coef * circulations[offset + q];
                });
        }
        velocities
    }

    /// `∂(⟨seed, v⟩)/∂Γ`: the transpose product with a velocity seed.
    ///
    /// Parallel over panels; each panel sums over evaluation points in a
    /// fixed order.
    pub(crate) fn transpose_unchecked(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        seed: &[Vector3<f64>],
    ) -> Vec<f64> {
        let u = wake_direction(alpha);
        let mut out = vec![0.0; self.layout.system_size()];

        for ((slot, tensor), exp) in self
            .layout
            .slots()
            .iter()
            .zip(vectors)
            .zip(&self.expansions)
        {
            let cols = exp.panel_cols();
            out[slot.range()]
                .par_iter_mut()
                .enumerate()
                .for_each(|(q, g)| {
                    let (j, m) = (q / cols, q % cols);
                    *g = seed
                        .iter()
                        .enumerate()
                        .map(|(i, s)| {
                            let block = PointBlock::new(tensor, i);
                            panel_coefficient(&block, exp, j, m, &u).dot(s)
                        })
                        .sum();
                });
        }
        out
    }
}

/// Velocity induced at one evaluation point by unit circulation on physical
/// panel `(j, m)`, summed over every image of that panel.
#[inline]
pub(crate) fn panel_coefficient(
    block: &PointBlock<'_>,
    exp: &ImageExpansion,
    j: usize,
    m: usize,
    u: &Vector3<f64>,
) -> Vector3<f64> {
    let trailing = exp.is_trailing_row(j);
    let mut coef = Vector3::zeros();

    for copy in exp.copies() {
        let r = copy.row_offset + j;
        for &k in exp.image_cols_of(m).as_slice() {
            let a = block.get(r, k + 1);
            let b = block.get(r, k);
            let c = block.get(r + 1, k);
            let d = block.get(r + 1, k + 1);

            let mut ring = finite_segment_velocity(&a, &b)
                + finite_segment_velocity(&b, &c)
                + finite_segment_velocity(&c, &d)
                + finite_segment_velocity(&d, &a);

            if trailing {
                ring += finite_segment_velocity(&d, &c) - semi_infinite_velocity(u, &d)
                    + semi_infinite_velocity(u, &c);
            }
            coef += ring * copy.multiplier;
        }
    }
    coef
}

/// Reverse-mode derivative of [`panel_coefficient`].
///
/// Accumulates `∂⟨g, coef⟩/∂r` into `grad` and returns `∂⟨g, coef⟩/∂u`.
#[inline]
pub(crate) fn panel_coefficient_vjp(
    block: &PointBlock<'_>,
    grad: &mut PointBlockMut<'_>,
    exp: &ImageExpansion,
    j: usize,
    m: usize,
    u: &Vector3<f64>,
    g: &Vector3<f64>,
) -> Vector3<f64> {
    let trailing = exp.is_trailing_row(j);
    let mut d_u = Vector3::zeros();

    for copy in exp.copies() {
        let r = copy.row_offset + j;
        let gm = g * copy.multiplier;
        for &k in exp.image_cols_of(m).as_slice() {
            let corners = [(r, k + 1), (r, k), (r + 1, k), (r + 1, k + 1)];
            let pts = corners.map(|(row, col)| block.get(row, col));
            let [_, _, c, d] = pts;
            let mut d_corner = [Vector3::zeros(); 4];

            for (from, to) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
                let (d_from, d_to) = finite_segment_vjp(&pts[from], &pts[to], &gm);
                d_corner[from] += d_from;
                d_corner[to] += d_to;
            }

            if trailing {
                let (d_d, d_c) = finite_segment_vjp(&d, &c, &gm);
                d_corner[3] += d_d;
                d_corner[2] += d_c;

                let (du_d, d_d) = semi_infinite_vjp(u, &d, &(-gm));
                d_u += du_d;
                d_corner[3] += d_d;

                let (du_c, d_c) = semi_infinite_vjp(u, &c, &gm);
                d_u += du_c;
                d_corner[2] += d_c;
            }

            for ((row, col), dv) in corners.iter().zip(d_corner.iter()) {
                grad.add(*row, *col, dv);
            }
        }
    }
    d_u
}
