//! Panel loads from converged circulations.

use nalgebra::Vector3;

use crate::error::{Error, Result};

/// Kutta–Joukowski force `F = ρ Γ (V × l)` on every panel's bound vortex.
///
/// `velocities` are total (free-stream plus induced) velocities at the force
/// points and `bound_vectors` the front-filament vectors, both in panel order.
pub fn panel_forces(
    velocities: &[Vector3<f64>],
    circulations: &[f64],
    bound_vectors: &[Vector3<f64>],
    rho: f64,
) -> Result<Vec<Vector3<f64>>> {
    let n = circulations.len();
    for len in [velocities.len(), bound_vectors.len()] {
        if len != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: len,
            });
        }
    }
    Ok(velocities
        .iter()
        .zip(circulations)
        .zip(bound_vectors)
        .map(|((v, g), l)| v.cross(l) * (rho * g))
        .collect())
}

/// Unit lift direction, normal to the free stream in the x-z plane.
pub fn lift_direction(alpha: f64) -> Vector3<f64> {
    let (sa, ca) = alpha.to_radians().sin_cos();
    Vector3::new(-sa, 0.0, ca)
}

/// Unit drag direction, aligned with the free stream.
pub fn drag_direction(alpha: f64, beta: f64) -> Vector3<f64> {
    let (sa, ca) = alpha.to_radians().sin_cos();
    let (sb, cb) = beta.to_radians().sin_cos();
    Vector3::new(ca * cb, -sb, sa * cb)
}

/// Total lift and drag of a set of panel forces.
pub fn lift_and_drag(forces: &[Vector3<f64>], alpha: f64, beta: f64) -> (f64, f64) {
    let total: Vector3<f64> = forces.iter().sum();
    (
        total.dot(&lift_direction(alpha)),
        total.dot(&drag_direction(alpha, beta)),
    )
}

/// Whole-aircraft loads and coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroCoefficients {
    pub lift: f64,
    pub drag: f64,
    pub cl: f64,
    pub cdi: f64,
}

/// Nondimensionalise loads on the modelled geometry.
///
/// A symmetric model carries only one half-wing, so its loads and reference
/// area are doubled before forming coefficients.
pub fn coefficients(
    lift: f64,
    drag: f64,
    s_ref: f64,
    speed: f64,
    rho: f64,
    symmetric: bool,
) -> AeroCoefficients {
    let factor = if symmetric { 2.0 } else { 1.0 };
    let q_s = 0.5 * rho * speed * speed * s_ref * factor;
    AeroCoefficients {
        lift: lift * factor,
        drag: drag * factor,
        cl: lift * factor / q_s,
        cdi: drag * factor / q_s,
    }
}

/// `∂L/∂Γ` for lift evaluated with the free-stream velocity only.
///
/// This is the linearised Kutta–Joukowski lift `L = Σ ρ Γ (V∞ × l)·ê_L`,
/// used as an objective seed for adjoint sensitivities.
pub fn freestream_lift_seed(
    freestream: &Vector3<f64>,
    bound_vectors: &[Vector3<f64>],
    alpha: f64,
    rho: f64,
) -> Vec<f64> {
    let e_lift = lift_direction(alpha);
    bound_vectors
        .iter()
        .map(|l| rho * freestream.cross(l).dot(&e_lift))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_circulation_lifts_flat_wing() {
        // Bound vector runs towards -y, as on the vortex mesh.
        let v = vec![Vector3::new(10.0, 0.0, 0.0)];
        let l = vec![Vector3::new(0.0, -2.0, 0.0)];
        let f = panel_forces(&v, &[-1.5], &l, 1.2).unwrap();
        assert!((f[0] - Vector3::new(0.0, 0.0, 1.2 * 1.5 * 20.0)).norm() < 1e-12);

        let (lift, drag) = lift_and_drag(&f, 0.0, 0.0);
        assert!((lift - 36.0).abs() < 1e-12);
        assert!(drag.abs() < 1e-12);
    }

    #[test]
    fn force_is_normal_to_velocity_and_filament() {
        let v = vec![Vector3::new(9.0, 0.5, 1.0)];
        let l = vec![Vector3::new(0.1, -1.0, 0.05)];
        let f = panel_forces(&v, &[0.7], &l, 1.0).unwrap();
        assert!(f[0].dot(&v[0]).abs() < 1e-12);
        assert!(f[0].dot(&l[0]).abs() < 1e-12);
    }

    #[test]
    fn lift_and_drag_rotate_with_alpha() {
        let f = vec![Vector3::new(0.0, 0.0, 1.0)];
        let (lift, drag) = lift_and_drag(&f, 90.0, 0.0);
        assert!(lift.abs() < 1e-12);
        assert!((drag - 1.0).abs() < 1e-12);
    }

    #[test]
    fn symmetric_loads_are_doubled() {
        let half = coefficients(10.0, 1.0, 2.0, 10.0, 1.0, true);
        let full = coefficients(20.0, 2.0, 4.0, 10.0, 1.0, false);
        assert!((half.lift - 20.0).abs() < 1e-12);
        assert!((half.cl - full.cl).abs() < 1e-12);
        assert!((half.cdi - full.cdi).abs() < 1e-12);
        assert!((full.cl - 20.0 / (50.0 * 4.0)).abs() < 1e-12);
    }

    #[test]
    fn lift_seed_matches_freestream_forces() {
        let alpha = 6.0;
        let fs = drag_direction(alpha, 0.0) * 15.0;
        let l = vec![Vector3::new(0.0, -1.0, 0.0), Vector3::new(0.2, -0.8, 0.1)];
        let gamma = [-0.4, -0.9];

        let seed = freestream_lift_seed(&fs, &l, alpha, 1.1);
        let f = panel_forces(&[fs, fs], &gamma, &l, 1.1).unwrap();
        let (lift, _) = lift_and_drag(&f, alpha, 0.0);
        let via_seed: f64 = seed.iter().zip(&gamma).map(|(s, g)| s * g).sum();
        assert!((lift - via_seed).abs() < 1e-12);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let r = panel_forces(&[Vector3::zeros()], &[1.0, 2.0], &[Vector3::zeros(); 2], 1.0);
        assert!(matches!(r, Err(Error::DimensionMismatch { expected: 2, actual: 1 })));
    }
}
