//! Vortex-lattice solver for Horseshoe.
//!
//! This crate provides:
//! - Biot–Savart kernels for finite and semi-infinite vortex filaments
//! - Symmetry and ground-effect image bookkeeping
//! - The implicit AIC operator and the flow-tangency residual
//! - Restarted, right-preconditioned GMRES with a Jacobi preconditioner
//! - The circulation solve, its adjoint, and exact reverse-mode gradients
//! - Kutta–Joukowski panel loads

pub mod adjoint;
pub mod aic;
pub mod circulation;
pub mod error;
pub mod forces;
pub mod gmres;
pub mod images;
pub mod kernel;
pub mod operator;
pub mod preconditioner;
pub mod residual;

pub use adjoint::{ResidualGradient, VelocityGradient};
pub use aic::{AicOperator, VelocityMode};
pub use circulation::{
    AssembledSystem, CirculationSolution, CirculationSolver, CirculationSolverConfig, SolveGradient,
};
pub use error::{Error, Result};
pub use forces::{AeroCoefficients, coefficients, lift_and_drag, panel_forces};
pub use gmres::{GmresConfig, GmresResult, solve_gmres};
pub use images::{ImageCopy, ImageExpansion};
pub use kernel::{finite_segment_velocity, semi_infinite_velocity};
pub use operator::{RealOperator, ResidualOperator, Transposed};
pub use preconditioner::{
    IdentityPreconditioner, JacobiPreconditioner, PreconditionerType, RealPreconditioner,
};
pub use residual::ResidualFunction;
