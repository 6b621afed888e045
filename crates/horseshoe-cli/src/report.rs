//! Solve a rectangular-wing case and summarise its loads.

use anyhow::{Context, Result};
use horseshoe_core::geometry::{
    bound_vectors, boundary_rhs, build_vectors, collocation_points, force_points,
    freestream_alpha_derivative, freestream_velocities, image_mesh, panel_normals, vortex_mesh,
};
use horseshoe_core::{EvalPointSet, Mesh, SurfaceLayout, SurfaceSpec};
use horseshoe_solver::forces::{freestream_lift_seed, lift_direction};
use horseshoe_solver::{
    AeroCoefficients, AicOperator, AssembledSystem, CirculationSolver, coefficients,
    lift_and_drag, panel_forces,
};
use nalgebra::Vector3;

use crate::case::Case;

pub struct Report {
    pub panels: usize,
    pub iterations: usize,
    pub residual: f64,
    pub loads: AeroCoefficients,
    pub aspect_ratio: f64,
    /// Lift-curve slope per radian from the adjoint, when requested.
    pub cl_alpha: Option<f64>,
}

impl Report {
    /// Span efficiency `CL² / (π AR CDi)`.
    pub fn span_efficiency(&self) -> Option<f64> {
        (self.loads.cdi > 0.0).then(|| {
            self.loads.cl * self.loads.cl
                / (std::f64::consts::PI * self.aspect_ratio * self.loads.cdi)
        })
    }

    pub fn print(&self, case: &Case) {
        println!("Vortex Lattice Analysis");
        println!("=======================");
        println!();
        println!(
            "Wing: span {} chord {} ({} x {} mesh{}{})",
            case.wing.span,
            case.wing.chord,
            case.wing.nx,
            case.wing.ny,
            if case.wing.symmetry { ", symmetric" } else { "" },
            match case.wing.ground_height {
                Some(h) => format!(", ground at z = {}", h),
                None => String::new(),
            }
        );
        println!(
            "Flight: V = {} alpha = {} deg beta = {} deg rho = {}",
            case.flight.speed, case.flight.alpha, case.flight.beta, case.flight.density
        );
        println!();
        println!(
            "Converged in {} GMRES iterations ({} panels, residual {:.3e}).",
            self.iterations, self.panels, self.residual
        );
        println!();
        println!("  {:>12}  {:>14.6}", "Lift", self.loads.lift);
        println!("  {:>12}  {:>14.6}", "Drag", self.loads.drag);
        println!("  {:>12}  {:>14.6}", "CL", self.loads.cl);
        println!("  {:>12}  {:>14.6}", "CDi", self.loads.cdi);
        if let Some(e) = self.span_efficiency() {
            println!("  {:>12}  {:>14.6}", "e", e);
        }
        if let Some(slope) = self.cl_alpha {
            println!("  {:>12}  {:>14.6}", "dCL/dalpha", slope);
        }
        println!();
    }
}

/// Mesh, solve and post-process one case.
pub fn run_case(case: &Case, with_sensitivities: bool) -> Result<Report> {
    let wing = &case.wing;
    let flight = &case.flight;

    let mesh = Mesh::rectangular(wing.span, wing.chord, wing.nx, wing.ny, wing.symmetry);
    let spec = SurfaceSpec::from_mesh("wing", &mesh, wing.symmetry)
        .with_groundplane(wing.ground_height.is_some());
    let vmesh = vortex_mesh(&mesh);
    let image = image_mesh(&vmesh, &spec, wing.ground_height.unwrap_or(0.0))
        .context("failed to build image grid")?;
    let layout = SurfaceLayout::new(vec![spec]).context("invalid surface layout")?;
    log::debug!(
        "meshed {} panels, image grid {} x {}",
        layout.system_size(),
        image.nx(),
        image.ny()
    );

    let points = collocation_points(&mesh);
    let normals = vec![panel_normals(&mesh)];
    let freestream = freestream_velocities(flight.speed, flight.alpha, flight.beta, points.len());
    let rhs = boundary_rhs(&freestream, &normals[0])?;
    let vectors = vec![build_vectors(&points, &image)];

    let solver = CirculationSolver::new(layout.clone(), case.solver_config()?);
    let system = solver
        .assemble(flight.alpha, &vectors, &normals)
        .context("failed to assemble circulation system")?;
    let solution = system.solve(&rhs, None).context("circulation solve failed")?;
    let gamma = &solution.circulations;

    let fpts = force_points(&vmesh);
    let force_vectors = vec![build_vectors(&fpts, &image)];
    let aic = AicOperator::new(layout, EvalPointSet::Force, fpts.len())?;
    let fs = freestream_velocities(flight.speed, flight.alpha, flight.beta, fpts.len());
    let velocities = aic.total_velocities(flight.alpha, &force_vectors, gamma, &fs)?;
    let bound = bound_vectors(&vmesh);
    let forces = panel_forces(&velocities, gamma, &bound, flight.density)?;
    let (lift, drag) = lift_and_drag(&forces, flight.alpha, flight.beta);
    let loads = coefficients(
        lift,
        drag,
        case.reference_area(),
        flight.speed,
        flight.density,
        wing.symmetry,
    );

    let cl_alpha = if with_sensitivities {
        Some(lift_slope(case, &system, gamma, &bound, &normals[0])?)
    } else {
        None
    };

    Ok(Report {
        panels: gamma.len(),
        iterations: solution.iterations,
        residual: solution.residual,
        loads,
        aspect_ratio: wing.span / wing.chord,
        cl_alpha,
    })
}

/// `dCL/dα` per radian of the free-stream Kutta–Joukowski lift, through the
/// converged solve.
///
/// The objective `L = Σ ρ Γ (V∞ × l)·ê_L` depends on α explicitly through
/// `V∞` and `ê_L`, and implicitly through `Γ`; the implicit part comes from
/// one adjoint solve.
fn lift_slope(
    case: &Case,
    system: &AssembledSystem<'_>,
    gamma: &[f64],
    bound: &[Vector3<f64>],
    normals: &[Vector3<f64>],
) -> Result<f64> {
    let flight = &case.flight;
    let alpha = flight.alpha;
    let rho = flight.density;

    let fs = freestream_velocities(flight.speed, alpha, flight.beta, 1)[0];
    let weights = freestream_lift_seed(&fs, bound, alpha, rho);
    let sens = system
        .sensitivities(&weights, gamma, None)
        .context("adjoint solve failed")?;

    // rhs = -V∞·n
    let dv = freestream_alpha_derivative(flight.speed, alpha, flight.beta);
    let through_rhs: f64 = sens
        .rhs
        .iter()
        .zip(normals)
        .map(|(psi, n)| -psi * dv.dot(n))
        .sum();

    let e_lift = lift_direction(alpha);
    let (sa, ca) = alpha.to_radians().sin_cos();
    let d_lift_dir = Vector3::new(-ca, 0.0, -sa) * std::f64::consts::PI / 180.0;
    let explicit: f64 = gamma
        .iter()
        .zip(bound)
        .map(|(g, l)| rho * g * (dv.cross(l).dot(&e_lift) + fs.cross(l).dot(&d_lift_dir)))
        .sum();

    let d_lift = sens.alpha + through_rhs + explicit;
    log::debug!(
        "dL/dalpha per degree: wake {:.6e} rhs {:.6e} explicit {:.6e} ({} adjoint iterations)",
        sens.alpha,
        through_rhs,
        explicit,
        sens.adjoint.iterations
    );

    let per_degree = coefficients(
        d_lift,
        0.0,
        case.reference_area(),
        flight.speed,
        rho,
        case.wing.symmetry,
    )
    .cl;
    Ok(per_degree * 180.0 / std::f64::consts::PI)
}
