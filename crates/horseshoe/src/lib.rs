//! # Horseshoe
//!
//! A vortex-lattice aerodynamic solver with exact adjoint derivatives.
//!
//! Horseshoe provides:
//! - An ordered multi-surface layout with symmetry and ground-effect images
//! - A matrix-free aerodynamic influence operator
//! - GMRES circulation solves with Jacobi preconditioning
//! - Reverse-mode gradients through the converged solve
//!
//! ## Quick Start
//!
//! ```rust
//! use horseshoe::prelude::*;
//! use horseshoe::geometry::{
//!     boundary_rhs, build_vectors, collocation_points, freestream_velocities, image_mesh,
//!     panel_normals, vortex_mesh,
//! };
//!
//! let mesh = Mesh::rectangular(10.0, 1.0, 2, 9, true);
//! let spec = SurfaceSpec::from_mesh("wing", &mesh, true);
//! let image = image_mesh(&vortex_mesh(&mesh), &spec, 0.0).unwrap();
//!
//! let points = collocation_points(&mesh);
//! let normals = panel_normals(&mesh);
//! let rhs = boundary_rhs(&freestream_velocities(10.0, 5.0, 0.0, points.len()), &normals).unwrap();
//!
//! let layout = SurfaceLayout::new(vec![spec]).unwrap();
//! let solver = CirculationSolver::new(layout, CirculationSolverConfig::default());
//! let vectors = vec![build_vectors(&points, &image)];
//! let solution = solver.solve(5.0, &vectors, &[normals], &rhs, None).unwrap();
//! assert!(solution.residual < 1e-10);
//! ```

pub use horseshoe_core as core;
pub use horseshoe_solver as solver;

pub use horseshoe_core::geometry;

// ============================================================================
// Convenient re-exports from horseshoe_core
// ============================================================================

pub use horseshoe_core::{
    Error as CoreError,
    EvalPointSet,
    Mesh,
    SurfaceLayout,
    SurfaceSlot,
    SurfaceSpec,
    VectorsTensor,
};

// ============================================================================
// Convenient re-exports from horseshoe_solver
// ============================================================================

pub use horseshoe_solver::{
    AeroCoefficients,
    AicOperator,
    AssembledSystem,
    CirculationSolution,
    CirculationSolver,
    CirculationSolverConfig,
    Error as SolverError,
    GmresConfig,
    PreconditionerType,
    RealOperator,
    ResidualFunction,
    SolveGradient,
    VelocityMode,
    coefficients,
    lift_and_drag,
    panel_forces,
    solve_gmres,
};

/// Re-export of nalgebra's 3-vector type.
pub use nalgebra::Vector3;

/// Items needed to set up and solve a lifting-surface system.
pub mod prelude {
    pub use crate::{
        AicOperator, CirculationSolver, CirculationSolverConfig, EvalPointSet, GmresConfig, Mesh,
        PreconditionerType, ResidualFunction, SurfaceLayout, SurfaceSpec, Vector3, VectorsTensor,
        VelocityMode,
    };
}
