//! Induced-velocity laws for straight vortex filaments.
//!
//! Both laws take vectors `r = P - X` from the filament endpoint(s) to the
//! evaluation point and return the velocity induced per unit circulation.
//! Each forward law has a matching `*_vjp` that returns the exact
//! vector-Jacobian product with respect to its vector inputs.

use std::f64::consts::PI;

use nalgebra::Vector3;

/// Denominator magnitude below which a finite segment induces nothing.
pub const SEGMENT_TOL: f64 = 1e-10;

const FOUR_PI: f64 = 4.0 * PI;

/// Velocity induced by a finite filament running from `X1` to `X2`.
///
/// ```text
/// v = (1/|r1| + 1/|r2|) (r1 × r2) / (4π (|r1||r2| + r1·r2))
/// ```
///
/// Points on the filament itself (denominator below [`SEGMENT_TOL`]) get an
/// exactly zero contribution.
#[inline]
pub fn finite_segment_velocity(r1: &Vector3<f64>, r2: &Vector3<f64>) -> Vector3<f64> {
    let n1 = r1.norm();
    let n2 = r2.norm();
    let den = n1 * n2 + r1.dot(r2);
    if den.abs() <= SEGMENT_TOL {
        return Vector3::zeros();
    }
    r1.cross(r2) * ((1.0 / n1 + 1.0 / n2) / (FOUR_PI * den))
}

/// Reverse-mode derivative of [`finite_segment_velocity`].
///
/// Returns `(∂L/∂r1, ∂L/∂r2)` for an output seed `g = ∂L/∂v`. Inside the
/// regularised region both are zero, matching the constant forward value.
#[inline]
pub fn finite_segment_vjp(
    r1: &Vector3<f64>,
    r2: &Vector3<f64>,
    g: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let n1 = r1.norm();
    let n2 = r2.norm();
    let den = n1 * n2 + r1.dot(r2);
    if den.abs() <= SEGMENT_TOL {
        return (Vector3::zeros(), Vector3::zeros());
    }
    let cross = r1.cross(r2);
    let s = 1.0 / n1 + 1.0 / n2;
    let k = s / (FOUR_PI * den);

    let g_k = g.dot(&cross);
    let g_s = g_k / (FOUR_PI * den);
    let g_den = -g_k * s / (FOUR_PI * den * den);
    let g_cross = g * k;

    let d_r1 = r2.cross(&g_cross) - r1 * (g_s / (n1 * n1 * n1)) + (r1 * (n2 / n1) + r2) * g_den;
    let d_r2 = g_cross.cross(r1) - r2 * (g_s / (n2 * n2 * n2)) + (r2 * (n1 / n2) + r1) * g_den;
    (d_r1, d_r2)
}

/// Velocity induced by a semi-infinite filament leaving its endpoint along
/// the unit direction `u`.
///
/// ```text
/// v = (u × r) / (4π |r| (|r| - u·r))
/// ```
///
/// No regularisation is applied; `r` must not be parallel to `u`.
#[inline]
pub fn semi_infinite_velocity(u: &Vector3<f64>, r: &Vector3<f64>) -> Vector3<f64> {
    let n = r.norm();
    let den = n * (n - u.dot(r));
    u.cross(r) / (FOUR_PI * den)
}

/// Reverse-mode derivative of [`semi_infinite_velocity`].
///
/// Returns `(∂L/∂u, ∂L/∂r)` for an output seed `g`.
#[inline]
pub fn semi_infinite_vjp(
    u: &Vector3<f64>,
    r: &Vector3<f64>,
    g: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let n = r.norm();
    let e = u.dot(r);
    let den = n * (n - e);
    let w = u.cross(r);

    let g_w = g / (FOUR_PI * den);
    let g_den = -g.dot(&w) / (FOUR_PI * den * den);

    let d_u = r.cross(&g_w) - r * (g_den * n);
    let d_r = g_w.cross(u) + r * (g_den * (2.0 * n - e) / n) - u * (g_den * n);
    (d_u, d_r)
}

/// Free-stream direction `[cos α, 0, sin α]` for `alpha` in degrees.
#[inline]
pub fn wake_direction(alpha: f64) -> Vector3<f64> {
    let (sa, ca) = alpha.to_radians().sin_cos();
    Vector3::new(ca, 0.0, sa)
}

/// Derivative of [`wake_direction`] with respect to `alpha` in degrees.
#[inline]
pub fn wake_direction_derivative(alpha: f64) -> Vector3<f64> {
    let (sa, ca) = alpha.to_radians().sin_cos();
    Vector3::new(-sa, 0.0, ca) * (PI / 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fd_check<F>(f: F, x: &Vector3<f64>, g: &Vector3<f64>, analytic: &Vector3<f64>)
    where
        F: Fn(&Vector3<f64>) -> Vector3<f64>,
    {
        let h = 1e-6;
        for k in 0..3 {
            let mut xp = *x;
            let mut xm = *x;
            xp[k] += h;
            xm[k] -= h;
            let fd = g.dot(&(f(&xp) - f(&xm))) / (2.0 * h);
            assert!(
                (fd - analytic[k]).abs() < 1e-7 * (1.0 + fd.abs()),
                "component {}: fd {} vs analytic {}",
                k,
                fd,
                analytic[k]
            );
        }
    }

    #[test]
    fn test_segment_matches_biot_savart() {
        // Unit-circulation filament from (0,-1,0) to (0,1,0), observed at (d,0,0):
        // |v| = (cos θ1 - cos θ2) / (4π d) = 2 / (4π d sqrt(1 + d²)).
        for d in [0.1, 0.5, 1.0, 3.0] {
            let p = Vector3::new(d, 0.0, 0.0);
            let r1 = p - Vector3::new(0.0, -1.0, 0.0);
            let r2 = p - Vector3::new(0.0, 1.0, 0.0);
            let v = finite_segment_velocity(&r1, &r2);

            let expected = 2.0 / (FOUR_PI * d * (1.0 + d * d).sqrt());
            assert!(v.x.abs() < 1e-15 && v.y.abs() < 1e-15);
            assert!(
                (v.z + expected).abs() < 1e-14 * expected.max(1.0),
                "d = {}: got {} expected {}",
                d,
                v.z,
                -expected
            );
        }
    }

    #[test]
    fn test_segment_zero_on_filament() {
        let a = Vector3::new(0.0, -1.0, 0.0);
        let b = Vector3::new(0.0, 1.0, 0.0);
        for p in [
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(1e-12, 0.0, 0.0),
            Vector3::new(0.0, -0.3, 1e-11),
        ] {
            let v = finite_segment_velocity(&(p - a), &(p - b));
            assert_eq!(v, Vector3::zeros(), "point {:?}", p);
            let (d1, d2) = finite_segment_vjp(&(p - a), &(p - b), &Vector3::new(1.0, 1.0, 1.0));
            assert_eq!(d1, Vector3::zeros());
            assert_eq!(d2, Vector3::zeros());
        }
    }

    #[test]
    fn test_semi_infinite_foot() {
        // Semi-infinite filament along +x from the origin, observed at (0,d,0):
        // |v| = 1 / (4π d), directed along +z.
        let u = Vector3::x();
        for d in [0.2, 1.0, 5.0] {
            let v = semi_infinite_velocity(&u, &Vector3::new(0.0, d, 0.0));
            assert!((v.z - 1.0 / (FOUR_PI * d)).abs() < 1e-15);
            assert!(v.x.abs() < 1e-15 && v.y.abs() < 1e-15);
        }
    }

    #[test]
    fn test_segment_vjp_matches_finite_differences() {
        let r1 = Vector3::new(0.3, -0.7, 0.2);
        let r2 = Vector3::new(0.4, 0.9, -0.1);
        let g = Vector3::new(0.5, -1.2, 0.8);
        let (d1, d2) = finite_segment_vjp(&r1, &r2, &g);

        fd_check(|x| finite_segment_velocity(x, &r2), &r1, &g, &d1);
        fd_check(|x| finite_segment_velocity(&r1, x), &r2, &g, &d2);
    }

    #[test]
    fn test_semi_infinite_vjp_matches_finite_differences() {
        let u = wake_direction(5.0);
        let r = Vector3::new(-0.4, 0.6, 0.3);
        let g = Vector3::new(-0.3, 0.7, 1.1);
        let (du, dr) = semi_infinite_vjp(&u, &r, &g);

        fd_check(|x| semi_infinite_velocity(&u, x), &r, &g, &dr);
        fd_check(|x| semi_infinite_velocity(x, &r), &u, &g, &du);
    }

    #[test]
    fn test_wake_direction_derivative() {
        let h = 1e-6;
        let alpha = 7.0;
        let fd = (wake_direction(alpha + h) - wake_direction(alpha - h)) / (2.0 * h);
        assert!((fd - wake_direction_derivative(alpha)).norm() < 1e-9);
    }
}
