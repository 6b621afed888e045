//! Restarted, right-preconditioned GMRES for real linear systems.
//!
//! Solves `A x = b` where `A` is a matrix-free [`RealOperator`]. With right
//! preconditioning the Krylov space is built for `A M⁻¹`, so the residual the
//! iteration monitors is the true residual of the unpreconditioned system.

use crate::error::{Error, Result};
use crate::operator::RealOperator;
use crate::preconditioner::RealPreconditioner;

/// GMRES solver configuration.
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Maximum number of iterations (Arnoldi steps across all restarts).
    pub max_iter: usize,
    /// Convergence tolerance on `‖b - A x‖ / ‖b‖`.
    pub tol: f64,
    /// Restart parameter (Krylov subspace dimension before restart).
    pub restart: usize,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-10,
            restart: 50,
        }
    }
}

impl GmresConfig {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }
}

/// Result of a GMRES solve.
#[derive(Debug, Clone)]
pub struct GmresResult {
    /// Solution vector.
    pub x: Vec<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final relative residual, recomputed from `b - A x`.
    pub residual: f64,
    /// Whether the solver converged.
    pub converged: bool,
}

/// Solve `A x = b` using restarted GMRES with right preconditioner `M⁻¹`.
///
/// `x0` is an optional initial guess. Convergence is always confirmed on the
/// explicitly recomputed residual, never on the Arnoldi estimate alone.
pub fn solve_gmres(
    op: &dyn RealOperator,
    precond: &dyn RealPreconditioner,
    b: &[f64],
    x0: Option<&[f64]>,
    config: &GmresConfig,
) -> Result<GmresResult> {
    let n = op.dim();
    check_dim(n, b.len())?;
    check_dim(n, precond.dim())?;
    if let Some(x0) = x0 {
        check_dim(n, x0.len())?;
    }

    let b_norm = vec_norm(b);
    if b_norm < 1e-30 {
        return Ok(GmresResult {
            x: vec![0.0; n],
            iterations: 0,
            residual: 0.0,
            converged: true,
        });
    }

    let mut x = x0.map_or_else(|| vec![0.0; n], <[f64]>::to_vec);
    let mut total_iter = 0;
    let m = config.restart.clamp(1, n);

    let result = loop {
        // True residual r = b - A*x
        let mut r = vec![0.0; n];
        op.apply(&x, &mut r);
        for (ri, bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        let r_norm = vec_norm(&r);
        let rel = r_norm / b_norm;

        if rel < config.tol || total_iter >= config.max_iter {
            break GmresResult {
                x,
                iterations: total_iter,
                residual: rel,
                converged: rel < config.tol,
            };
        }

        // Arnoldi process with modified Gram-Schmidt on A M⁻¹
        let mut v: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        let mut h = vec![vec![0.0; m + 1]; m];

        let inv_r_norm = 1.0 / r_norm;
        for ri in r.iter_mut() {
            *ri *= inv_r_norm;
        }
        v.push(r);

        // g = ||r|| * e_1
        let mut g = vec![0.0; m + 1];
        g[0] = r_norm;

        // Givens rotation storage
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];

        let mut z = vec![0.0; n];
        let mut k = 0;
        while k < m && total_iter < config.max_iter {
            total_iter += 1;

            // w = A * M⁻¹ * v[k]
            precond.apply(&v[k], &mut z);
            let mut w = vec![0.0; n];
            op.apply(&z, &mut w);

            for j in 0..=k {
                let hjk = dot(&v[j], &w);
                h[k][j] = hjk;
                for (wi, vi) in w.iter_mut().zip(&v[j]) {
                    *wi -= hjk * vi;
                }
            }

            let w_norm = vec_norm(&w);
            h[k][k + 1] = w_norm;
            let breakdown = w_norm < 1e-30;
            if !breakdown {
                let inv_w = 1.0 / w_norm;
                v.push(w.iter().map(|wi| wi * inv_w).collect());
            }

            // Apply previous Givens rotations to column k
            for j in 0..k {
                let temp = cs[j] * h[k][j] + sn[j] * h[k][j + 1];
                h[k][j + 1] = -sn[j] * h[k][j] + cs[j] * h[k][j + 1];
                h[k][j] = temp;
            }

            let (c, s) = givens_rotation(h[k][k], h[k][k + 1]);
            cs[k] = c;
            sn[k] = s;
            h[k][k] = c * h[k][k] + s * h[k][k + 1];
            h[k][k + 1] = 0.0;

            g[k + 1] = -s * g[k];
            g[k] *= c;

            k += 1;
            if breakdown || g[k].abs() / b_norm < config.tol {
                break;
            }
        }

        // Back-substitution for H*y = g
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for j in (i + 1)..k {
                sum -= h[j][i] * y[j];
            }
            if h[i][i].abs() > 1e-30 {
                y[i] = sum / h[i][i];
            }
        }

        // x = x + M⁻¹ (V * y)
        let mut t = vec![0.0; n];
        for (vi, yi) in v.iter().zip(&y) {
            for (tj, vij) in t.iter_mut().zip(vi) {
                *tj += vij * yi;
            }
        }
        precond.apply(&t, &mut z);
        for (xj, zj) in x.iter_mut().zip(&z) {
            *xj += zj;
        }
    };

    log::debug!(
        "GMRES: n={} iterations={} relative residual={:.3e} converged={}",
        n,
        result.iterations,
        result.residual,
        result.converged
    );
    Ok(result)
}

fn check_dim(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// 2-norm of a real vector.
fn vec_norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Compute Givens rotation coefficients.
fn givens_rotation(a: f64, b: f64) -> (f64, f64) {
    if b.abs() < 1e-30 {
        return (1.0, 0.0);
    }
    let r = a.hypot(b);
    (a / r, b / r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioner::{IdentityPreconditioner, JacobiPreconditioner};

    /// Simple diagonal operator for testing.
    struct DiagOp {
        diag: Vec<f64>,
    }

    impl RealOperator for DiagOp {
        fn dim(&self) -> usize {
            self.diag.len()
        }

        fn apply(&self, x: &[f64], y: &mut [f64]) {
            for i in 0..self.diag.len() {
                y[i] = self.diag[i] * x[i];
            }
        }

        fn apply_transpose(&self, x: &[f64], y: &mut [f64]) {
            self.apply(x, y);
        }
    }

    /// Dense matrix operator for testing.
    struct DenseOp {
        matrix: Vec<Vec<f64>>,
        n: usize,
    }

    impl DenseOp {
        fn new(matrix: Vec<Vec<f64>>) -> Self {
            let n = matrix.len();
            Self { matrix, n }
        }
    }

    impl RealOperator for DenseOp {
        fn dim(&self) -> usize {
            self.n
        }

        #[allow(clippy::needless_range_loop)]
        fn apply(&self, x: &[f64], y: &mut [f64]) {
            for i in 0..self.n {
                y[i] = 0.0;
                for j in 0..self.n {
                    y[i] += self.matrix[i][j] * x[j];
                }
            }
        }

        #[allow(clippy::needless_range_loop)]
        fn apply_transpose(&self, x: &[f64], y: &mut [f64]) {
            for i in 0..self.n {
                y[i] = 0.0;
                for j in 0..self.n {
                    y[i] += self.matrix[j][i] * x[j];
                }
            }
        }
    }

    fn identity(n: usize) -> IdentityPreconditioner {
        IdentityPreconditioner::new(n)
    }

    #[test]
    fn gmres_diagonal_system() {
        let n = 10;
        let diag: Vec<f64> = (1..=n).map(|i| i as f64).collect();
        let op = DiagOp { diag: diag.clone() };
        let b: Vec<f64> = diag.iter().map(|d| d * 2.0).collect();

        let result = solve_gmres(&op, &identity(n), &b, None, &GmresConfig::default()).unwrap();

        assert!(result.converged, "GMRES did not converge");
        assert!(result.residual < 1e-10);
        for xi in &result.x {
            assert!((xi - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn gmres_zero_rhs() {
        let n = 5;
        let op = DiagOp {
            diag: (1..=n).map(|i| i as f64).collect(),
        };
        let b = vec![0.0; n];
        let x0 = vec![1.0; n];
        let result = solve_gmres(&op, &identity(n), &b, Some(&x0), &GmresConfig::default()).unwrap();

        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        for xi in &result.x {
            assert!(xi.abs() < 1e-15);
        }
    }

    #[test]
    fn gmres_identity_operator() {
        let n = 5;
        let op = DiagOp { diag: vec![1.0; n] };
        let b: Vec<f64> = (1..=n).map(|i| -0.5 * i as f64).collect();
        let result = solve_gmres(&op, &identity(n), &b, None, &GmresConfig::default()).unwrap();

        assert!(result.converged);
        for (xi, bi) in result.x.iter().zip(b.iter()) {
            assert!((xi - bi).abs() < 1e-10);
        }
    }

    #[test]
    fn gmres_real_symmetric_positive_definite() {
        let op = DenseOp::new(vec![vec![4.0, 1.0], vec![1.0, 3.0]]);
        let b = vec![5.0, 4.0];
        let result = solve_gmres(&op, &identity(2), &b, None, &GmresConfig::default()).unwrap();

        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-8);
        assert!((result.x[1] - 1.0).abs() < 1e-8);
    }

    #[test]
    fn gmres_nonsymmetric() {
        let op = DenseOp::new(vec![
            vec![3.0, -1.0, 0.5],
            vec![2.0, 4.0, -1.0],
            vec![0.0, 1.5, 2.0],
        ]);
        let expected = [1.0, -2.0, 0.5];
        let mut b = vec![0.0; 3];
        op.apply(&expected, &mut b);

        let result = solve_gmres(&op, &identity(3), &b, None, &GmresConfig::default()).unwrap();
        assert!(result.converged);
        for (xi, ei) in result.x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < 1e-9);
        }
    }

    #[test]
    fn gmres_restart_behavior() {
        let n = 50;
        let diag: Vec<f64> = (0..n).map(|i| 1.0 + 0.05 * i as f64).collect();
        let op = DiagOp { diag: diag.clone() };
        let b = vec![1.0; n];

        let config = GmresConfig::default().with_max_iter(400).with_restart(5);
        let result = solve_gmres(&op, &identity(n), &b, None, &config).unwrap();

        assert!(result.converged);
        assert!(result.residual < 1e-10);
        assert!(result.iterations > 5, "restart should have been needed");
    }

    #[test]
    fn gmres_jacobi_preconditioner_solves_diagonal_in_one_step() {
        let n = 20;
        let diag: Vec<f64> = (0..n).map(|i| 10f64.powi(i as i32 % 6)).collect();
        let op = DiagOp { diag: diag.clone() };
        let b = vec![1.0; n];
        let precond = JacobiPreconditioner::from_diagonal(&diag).unwrap();

        let result = solve_gmres(&op, &precond, &b, None, &GmresConfig::default()).unwrap();
        assert!(result.converged);
        assert!(result.iterations <= 2, "took {} iterations", result.iterations);
        for (xi, di) in result.x.iter().zip(&diag) {
            assert!((xi * di - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn gmres_exact_initial_guess_needs_no_iterations() {
        let op = DenseOp::new(vec![vec![2.0, 1.0], vec![0.0, 3.0]]);
        let b = vec![3.0, 3.0];
        let result = solve_gmres(&op, &identity(2), &b, Some(&[1.0, 1.0]), &GmresConfig::default())
            .unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn gmres_reports_non_convergence() {
        let n = 30;
        let op = DiagOp {
            diag: (1..=n).map(|i| i as f64).collect(),
        };
        let b = vec![1.0; n];
        let config = GmresConfig::default().with_max_iter(3).with_restart(3);
        let result = solve_gmres(&op, &identity(n), &b, None, &config).unwrap();

        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        assert!(result.residual > config.tol);
    }

    #[test]
    fn gmres_dimension_mismatch() {
        let op = DiagOp { diag: vec![1.0; 3] };
        let r = solve_gmres(&op, &identity(3), &[1.0; 2], None, &GmresConfig::default());
        assert!(matches!(r, Err(Error::DimensionMismatch { expected: 3, actual: 2 })));

        let r = solve_gmres(&op, &identity(4), &[1.0; 3], None, &GmresConfig::default());
        assert!(matches!(r, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn gmres_config_default() {
        let config = GmresConfig::default();
        assert_eq!(config.max_iter, 1000);
        assert!((config.tol - 1e-10).abs() < 1e-20);
        assert_eq!(config.restart, 50);
    }

    #[test]
    fn gmres_single_element() {
        let op = DiagOp { diag: vec![-4.0] };
        let result = solve_gmres(&op, &identity(1), &[6.0], None, &GmresConfig::default()).unwrap();

        assert!(result.converged);
        assert!((result.x[0] + 1.5).abs() < 1e-12);
    }

    #[test]
    fn vec_norm_test() {
        assert!((vec_norm(&[3.0, 4.0]) - 5.0).abs() < 1e-15);
    }

    #[test]
    fn givens_rotation_test() {
        let (c, s) = givens_rotation(3.0, 4.0);
        let new_b = -s * 3.0 + c * 4.0;
        assert!(new_b.abs() < 1e-12);
        assert!((c * c + s * s - 1.0).abs() < 1e-15);
    }
}
