//! Flow-tangency residual at the collocation points.
//!
//! The residual of panel `i` is the induced velocity at its collocation point
//! projected onto its unit normal. The caller folds in the free-stream part
//! as `residual - rhs` with `rhs = -V∞·n`.

use horseshoe_core::{SurfaceLayout, VectorsTensor};
use nalgebra::Vector3;

use crate::aic::{AicOperator, VelocityMode};
use crate::error::{Error, Result};
use crate::preconditioner::JacobiPreconditioner;

/// Boundary-condition residual built on a collocation-point [`AicOperator`].
#[derive(Debug, Clone)]
pub struct ResidualFunction {
    aic: AicOperator,
}

impl ResidualFunction {
    pub fn new(aic: AicOperator) -> Result<Self> {
        aic.require_collocation("residual evaluation")?;
        Ok(Self { aic })
    }

    /// Residual at the collocation points of `layout`.
    pub fn collocation(layout: SurfaceLayout) -> Self {
        Self {
            aic: AicOperator::collocation(layout),
        }
    }

    pub fn aic(&self) -> &AicOperator {
        &self.aic
    }

    pub fn system_size(&self) -> usize {
        self.aic.system_size()
    }

    /// Validate geometry inputs once; the `*_unchecked` paths rely on it.
    pub fn check_geometry(&self, vectors: &[VectorsTensor], normals: &[Vec<Vector3<f64>>]) -> Result<()> {
        self.aic.check_vectors(vectors)?;
        self.aic.layout().check_normals(normals)?;
        Ok(())
    }

    /// `residual[i] = v_induced(i) · n(i)`.
    pub fn compute_residual(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
        circulations: &[f64],
    ) -> Result<Vec<f64>> {
        self.check_geometry(vectors, normals)?;
        self.aic
            .layout()
            .check_system_vector("circulations", circulations.len())?;
        Ok(self.residual_unchecked(alpha, vectors, normals, circulations))
    }

    /// Self-induction diagonal of the residual operator.
    ///
    /// Computed through [`VelocityMode::JacobiOnly`] with unit circulations,
    /// so each entry equals the matching diagonal entry of the full operator.
    pub fn diagonal(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
    ) -> Result<Vec<f64>> {
        self.check_geometry(vectors, normals)?;
        Ok(self.diagonal_unchecked(alpha, vectors, normals))
    }

    /// Reciprocal diagonal as a Jacobi preconditioner.
    pub fn get_diagonal(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
    ) -> Result<JacobiPreconditioner> {
        let diag = self.diagonal(alpha, vectors, normals)?;
        JacobiPreconditioner::from_diagonal(&diag)
    }

    pub(crate) fn residual_unchecked(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
        circulations: &[f64],
    ) -> Vec<f64> {
        let velocities = self.aic.velocity_unchecked(alpha, vectors, circulations);
        self.project(&velocities, normals)
    }

    pub(crate) fn diagonal_unchecked(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
    ) -> Vec<f64> {
        let ones = vec![1.0; self.system_size()];
        let velocities = self.aic.jacobi_unchecked(alpha, vectors, &ones);
        self.project(&velocities, normals)
    }

    /// Per-panel dot product of velocity with the panel normal.
    pub(crate) fn project(&self, velocities: &[Vector3<f64>], normals: &[Vec<Vector3<f64>>]) -> Vec<f64> {
        let mut res = vec![0.0; self.system_size()];
        for (slot, surface_normals) in self.aic.layout().slots().iter().zip(normals) {
            for ((r, v), n) in res[slot.range()]
                .iter_mut()
                .zip(&velocities[slot.range()])
                .zip(surface_normals)
            {
                *r = v.dot(n);
            }
        }
        res
    }

    /// Spread a residual-space seed back onto collocation velocities.
    pub(crate) fn unproject(&self, seed: &[f64], normals: &[Vec<Vector3<f64>>]) -> Vec<Vector3<f64>> {
        let mut out = vec![Vector3::zeros(); self.system_size()];
        for (slot, surface_normals) in self.aic.layout().slots().iter().zip(normals) {
            for ((o, s), n) in out[slot.range()]
                .iter_mut()
                .zip(&seed[slot.range()])
                .zip(surface_normals)
            {
                *o = n * *s;
            }
        }
        out
    }

    pub(crate) fn check_seed(&self, len: usize) -> Result<()> {
        if len != self.system_size() {
            return Err(Error::DimensionMismatch {
                expected: self.system_size(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Induced velocities at the collocation points.
    pub fn collocation_velocities(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        circulations: &[f64],
    ) -> Result<Vec<Vector3<f64>>> {
        self.aic
            .compute_velocity(alpha, vectors, circulations, VelocityMode::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horseshoe_core::geometry::{
        build_vectors, collocation_points, image_mesh, panel_normals, vortex_mesh,
    };
    use horseshoe_core::{EvalPointSet, Mesh, SurfaceSpec};

    fn two_surface_case() -> (ResidualFunction, Vec<VectorsTensor>, Vec<Vec<Vector3<f64>>>) {
        let wing = Mesh::rectangular(8.0, 1.0, 3, 5, true);
        let tail = Mesh::rectangular(3.0, 0.6, 2, 3, false).translated(Vector3::new(4.0, 0.0, 0.5));
        let specs = vec![
            SurfaceSpec::new("wing", 3, 5).with_symmetry(true),
            SurfaceSpec::new("tail", 2, 3),
        ];
        let meshes = [wing, tail];

        let points: Vec<_> = meshes.iter().flat_map(collocation_points).collect();
        let vectors = specs
            .iter()
            .zip(&meshes)
            .map(|(spec, mesh)| build_vectors(&points, &image_mesh(&vortex_mesh(mesh), spec, 0.0).unwrap()))
            .collect();
        let normals = meshes.iter().map(panel_normals).collect();

        let layout = SurfaceLayout::new(specs).unwrap();
        let residual = ResidualFunction::collocation(layout);
        (residual, vectors, normals)
    }

    #[test]
    fn test_residual_is_normal_projection() {
        let (res, vectors, normals) = two_surface_case();
        let n = res.system_size();
        let gamma: Vec<f64> = (0..n).map(|k| 1.0 + 0.2 * k as f64).collect();

        let r = res.compute_residual(3.0, &vectors, &normals, &gamma).unwrap();
        let v = res.collocation_velocities(3.0, &vectors, &gamma).unwrap();

        let flat_normals: Vec<_> = normals.iter().flatten().collect();
        for i in 0..n {
            assert!((r[i] - v[i].dot(flat_normals[i])).abs() < 1e-14);
        }
    }

    #[test]
    fn test_diagonal_matches_probed_operator() {
        let (res, vectors, normals) = two_surface_case();
        let n = res.system_size();
        let diag = res.diagonal(2.5, &vectors, &normals).unwrap();

        for p in 0..n {
            let mut e = vec![0.0; n];
            e[p] = 1.0;
            let col = res.compute_residual(2.5, &vectors, &normals, &e).unwrap();
            assert!(
                (col[p] - diag[p]).abs() <= 1e-14 * col[p].abs().max(1.0),
                "panel {}: probed {} diagonal {}",
                p,
                col[p],
                diag[p]
            );
        }
    }

    #[test]
    fn test_get_diagonal_is_reciprocal() {
        let (res, vectors, normals) = two_surface_case();
        let diag = res.diagonal(0.0, &vectors, &normals).unwrap();
        let precond = res.get_diagonal(0.0, &vectors, &normals).unwrap();
        for (d, inv) in diag.iter().zip(precond.inverse_diagonal()) {
            assert!((d * inv - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_normals_checked() {
        let (res, vectors, mut normals) = two_surface_case();
        normals[1].pop();
        let r = res.compute_residual(0.0, &vectors, &normals, &vec![0.0; res.system_size()]);
        assert!(matches!(
            r,
            Err(Error::Core(horseshoe_core::Error::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_requires_collocation_operator() {
        let layout = SurfaceLayout::new(vec![SurfaceSpec::new("wing", 2, 3)]).unwrap();
        let aic = AicOperator::new(layout, EvalPointSet::Force, 2).unwrap();
        assert!(matches!(
            ResidualFunction::new(aic),
            Err(Error::UnsupportedEvalSet { .. })
        ));
    }
}
