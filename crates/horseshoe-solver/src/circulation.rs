//! Circulation solve and its adjoint.
//!
//! [`CirculationSolver::assemble`] fixes the geometry and builds the implicit
//! residual operator together with its Jacobi preconditioner. The resulting
//! [`AssembledSystem`] solves the forward system, the transposed (adjoint)
//! system with the same operator and preconditioner, and the total
//! sensitivities of a scalar objective through the converged solve.

use horseshoe_core::{SurfaceLayout, VectorsTensor};
use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::gmres::{GmresConfig, solve_gmres};
use crate::operator::{RealOperator, ResidualOperator, Transposed};
use crate::preconditioner::{
    IdentityPreconditioner, JacobiPreconditioner, PreconditionerType, RealPreconditioner,
};
use crate::residual::ResidualFunction;

/// Configuration for [`CirculationSolver`].
#[derive(Debug, Clone, Default)]
pub struct CirculationSolverConfig {
    /// Krylov iteration settings.
    pub gmres: GmresConfig,
    /// Preconditioner for both forward and adjoint solves.
    pub preconditioner: PreconditionerType,
}

impl CirculationSolverConfig {
    pub fn with_gmres(mut self, gmres: GmresConfig) -> Self {
        self.gmres = gmres;
        self
    }

    pub fn with_preconditioner(mut self, preconditioner: PreconditionerType) -> Self {
        self.preconditioner = preconditioner;
        self
    }
}

/// Converged solution of a forward or adjoint solve.
#[derive(Debug, Clone)]
pub struct CirculationSolution {
    /// Panel circulations (or adjoint variables), one per panel.
    pub circulations: Vec<f64>,
    /// GMRES iterations used.
    pub iterations: usize,
    /// Achieved relative residual.
    pub residual: f64,
}

/// Total derivatives of a scalar objective `J(Γ)` through the circulation
/// solve, with respect to every input of the residual system.
#[derive(Debug, Clone)]
pub struct SolveGradient {
    /// `dJ/dα`, per degree, through the wake direction only.
    pub alpha: f64,
    pub vectors: Vec<VectorsTensor>,
    pub normals: Vec<Vec<Vector3<f64>>>,
    /// `dJ/d rhs`, equal to the adjoint solution.
    pub rhs: Vec<f64>,
    /// The adjoint solve that produced these gradients.
    pub adjoint: CirculationSolution,
}

/// Circulation solver for one surface layout.
#[derive(Debug, Clone)]
pub struct CirculationSolver {
    residual: ResidualFunction,
    config: CirculationSolverConfig,
}

impl CirculationSolver {
    pub fn new(layout: SurfaceLayout, config: CirculationSolverConfig) -> Self {
        Self {
            residual: ResidualFunction::collocation(layout),
            config,
        }
    }

    pub fn residual(&self) -> &ResidualFunction {
        &self.residual
    }

    pub fn layout(&self) -> &SurfaceLayout {
        self.residual.aic().layout()
    }

    pub fn config(&self) -> &CirculationSolverConfig {
        &self.config
    }

    /// Fix the geometry and build the operator and preconditioner.
    pub fn assemble<'a>(
        &'a self,
        alpha: f64,
        vectors: &'a [VectorsTensor],
        normals: &'a [Vec<Vector3<f64>>],
    ) -> Result<AssembledSystem<'a>> {
        let op = ResidualOperator::new(&self.residual, alpha, vectors, normals)?;
        let precond: Box<dyn RealPreconditioner> = match self.config.preconditioner {
            PreconditionerType::None => Box::new(IdentityPreconditioner::new(op.dim())),
            PreconditionerType::Jacobi => {
                let diag = self.residual.diagonal_unchecked(alpha, vectors, normals);
                Box::new(JacobiPreconditioner::from_diagonal(&diag)?)
            }
        };
        log::debug!(
            "assembled circulation system: {} surfaces, n={}, alpha={} deg, preconditioner={:?}",
            self.layout().len(),
            op.dim(),
            alpha,
            self.config.preconditioner
        );
        Ok(AssembledSystem {
            op,
            precond,
            config: &self.config,
        })
    }

    /// Assemble and solve in one call.
    pub fn solve(
        &self,
        alpha: f64,
        vectors: &[VectorsTensor],
        normals: &[Vec<Vector3<f64>>],
        rhs: &[f64],
        x0: Option<&[f64]>,
    ) -> Result<CirculationSolution> {
        self.assemble(alpha, vectors, normals)?.solve(rhs, x0)
    }
}

/// Residual operator and preconditioner at fixed geometry.
pub struct AssembledSystem<'a> {
    op: ResidualOperator<'a>,
    precond: Box<dyn RealPreconditioner>,
    config: &'a CirculationSolverConfig,
}

impl<'a> AssembledSystem<'a> {
    pub fn operator(&self) -> &ResidualOperator<'a> {
        &self.op
    }

    pub fn preconditioner(&self) -> &dyn RealPreconditioner {
        self.precond.as_ref()
    }

    /// Solve `residual(Γ) = rhs` for the circulations.
    pub fn solve(&self, rhs: &[f64], x0: Option<&[f64]>) -> Result<CirculationSolution> {
        let solution = self.run(&self.op, self.precond.as_ref(), rhs, x0, "forward")?;
        log::info!(
            "circulation solve converged: n={} iterations={} residual={:.3e}",
            solution.circulations.len(),
            solution.iterations,
            solution.residual
        );
        Ok(solution)
    }

    /// Solve the transposed system `Aᵀ ψ = seed` with the transposed
    /// preconditioner.
    pub fn solve_adjoint(&self, seed: &[f64], x0: Option<&[f64]>) -> Result<CirculationSolution> {
        let solution = self.run(
            &Transposed(&self.op),
            &Transposed(self.precond.as_ref()),
            seed,
            x0,
            "adjoint",
        )?;
        log::debug!(
            "adjoint solve converged: iterations={} residual={:.3e}",
            solution.iterations,
            solution.residual
        );
        Ok(solution)
    }

    /// Total derivatives of `J` through the solve, given `∂J/∂Γ` and the
    /// converged circulations.
    ///
    /// With `R(Γ; α, X, n) = rhs`, the adjoint `ψ` solves `Aᵀψ = ∂J/∂Γ`; then
    /// `dJ/d rhs = ψ` and `dJ/dθ = -ψᵀ ∂R/∂θ` for every other input `θ`.
    pub fn sensitivities(
        &self,
        d_objective: &[f64],
        circulations: &[f64],
        x0: Option<&[f64]>,
    ) -> Result<SolveGradient> {
        let adjoint = self.solve_adjoint(d_objective, x0)?;
        let grad = self.op.residual().residual_vjp(
            self.op.alpha(),
            self.op.vectors(),
            self.op.normals(),
            circulations,
            &adjoint.circulations,
        )?;

        let mut vectors = grad.vectors;
        for t in &mut vectors {
            for x in t.as_mut_slice() {
                *x = -*x;
            }
        }
        let normals = grad
            .normals
            .into_iter()
            .map(|surface| surface.into_iter().map(|n| -n).collect())
            .collect();

        Ok(SolveGradient {
            alpha: -grad.alpha,
            vectors,
            normals,
            rhs: adjoint.circulations.clone(),
            adjoint,
        })
    }

    fn run(
        &self,
        op: &dyn RealOperator,
        precond: &dyn RealPreconditioner,
        b: &[f64],
        x0: Option<&[f64]>,
        label: &str,
    ) -> Result<CirculationSolution> {
        let result = solve_gmres(op, precond, b, x0, &self.config.gmres)?;
        if !result.converged {
            log::warn!(
                "{} circulation solve did not converge: iterations={} residual={:.3e} tol={:.1e}",
                label,
                result.iterations,
                result.residual,
                self.config.gmres.tol
            );
            return Err(Error::ConvergenceFailed {
                iterations: result.iterations,
                residual: result.residual,
            });
        }
        Ok(CirculationSolution {
            circulations: result.x,
            iterations: result.iterations,
            residual: result.residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horseshoe_core::geometry::{
        boundary_rhs, build_vectors, collocation_points, freestream_velocities, image_mesh,
        panel_normals, vortex_mesh,
    };
    use horseshoe_core::{Mesh, SurfaceSpec};

    struct Wing {
        solver: CirculationSolver,
        vectors: Vec<VectorsTensor>,
        normals: Vec<Vec<Vector3<f64>>>,
        rhs: Vec<f64>,
    }

    fn wing(config: CirculationSolverConfig) -> Wing {
        let mesh = Mesh::rectangular(10.0, 1.0, 3, 6, true);
        let spec = SurfaceSpec::new("wing", 3, 6).with_symmetry(true);
        let image = image_mesh(&vortex_mesh(&mesh), &spec, 0.0).unwrap();
        let pts = collocation_points(&mesh);
        let normals = panel_normals(&mesh);
        let rhs = boundary_rhs(&freestream_velocities(10.0, 5.0, 0.0, pts.len()), &normals).unwrap();
        Wing {
            solver: CirculationSolver::new(SurfaceLayout::new(vec![spec]).unwrap(), config),
            vectors: vec![build_vectors(&pts, &image)],
            normals: vec![normals],
            rhs,
        }
    }

    #[test]
    fn test_solve_satisfies_residual() {
        let w = wing(CirculationSolverConfig::default());
        let sol = w.solver.solve(5.0, &w.vectors, &w.normals, &w.rhs, None).unwrap();

        let r = w
            .solver
            .residual()
            .compute_residual(5.0, &w.vectors, &w.normals, &sol.circulations)
            .unwrap();
        let err: f64 = r.iter().zip(&w.rhs).map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt();
        let norm: f64 = w.rhs.iter().map(|b| b * b).sum::<f64>().sqrt();
        assert!(err / norm < 1e-10, "relative residual {}", err / norm);
        assert!(sol.residual < 1e-10);
    }

    #[test]
    fn test_preconditioners_agree() {
        let jac = wing(CirculationSolverConfig::default());
        let none = wing(CirculationSolverConfig::default().with_preconditioner(PreconditionerType::None));

        let a = jac.solver.solve(5.0, &jac.vectors, &jac.normals, &jac.rhs, None).unwrap();
        let b = none.solver.solve(5.0, &none.vectors, &none.normals, &none.rhs, None).unwrap();
        for (x, y) in a.circulations.iter().zip(&b.circulations) {
            assert!((x - y).abs() < 1e-8 * (1.0 + x.abs()));
        }
    }

    #[test]
    fn test_iteration_limit_is_reported() {
        let config = CirculationSolverConfig::default()
            .with_gmres(GmresConfig::default().with_max_iter(1).with_restart(1))
            .with_preconditioner(PreconditionerType::None);
        let w = wing(config);
        let r = w.solver.solve(5.0, &w.vectors, &w.normals, &w.rhs, None);
        assert!(matches!(r, Err(Error::ConvergenceFailed { iterations: 1, .. })));
    }

    #[test]
    fn test_adjoint_solution_is_transpose_solve() {
        let w = wing(CirculationSolverConfig::default());
        let system = w.solver.assemble(5.0, &w.vectors, &w.normals).unwrap();
        let n = system.operator().dim();
        let seed: Vec<f64> = (0..n).map(|k| 1.0 + (k as f64).sin()).collect();
        let psi = system.solve_adjoint(&seed, None).unwrap();

        let mut at_psi = vec![0.0; n];
        system.operator().apply_transpose(&psi.circulations, &mut at_psi);
        for (a, s) in at_psi.iter().zip(&seed) {
            assert!((a - s).abs() < 1e-8 * (1.0 + s.abs()));
        }
    }

    #[test]
    fn test_rhs_sensitivity_matches_finite_difference() {
        let w = wing(CirculationSolverConfig::default());
        let system = w.solver.assemble(5.0, &w.vectors, &w.normals).unwrap();
        let sol = system.solve(&w.rhs, None).unwrap();
        let n = sol.circulations.len();

        // J = sum of circulations
        let seed = vec![1.0; n];
        let sens = system.sensitivities(&seed, &sol.circulations, None).unwrap();

        // the solve is linear in rhs, so a unit step is exact
        let h = 1.0;
        let k = 2;
        let mut rhs = w.rhs.clone();
        rhs[k] += h;
        let perturbed = system.solve(&rhs, Some(&sol.circulations)).unwrap();
        let fd = (perturbed.circulations.iter().sum::<f64>() - sol.circulations.iter().sum::<f64>()) / h;
        assert!(
            (fd - sens.rhs[k]).abs() < 1e-7 * (1.0 + fd.abs()),
            "fd {} vs adjoint {}",
            fd,
            sens.rhs[k]
        );
    }
}
