//! Core lifting-surface data model for Horseshoe.
//!
//! This crate provides the fundamental data structures shared by the
//! vortex-lattice solver, including the ordered surface layout that fixes
//! circulation offsets, the geometric vectors tensor consumed by the AIC
//! operator, and pure mesh helpers that produce those inputs.

pub mod error;
pub mod geometry;
pub mod surface;
pub mod tensor;

pub use error::{Error, Result};
pub use geometry::{Mesh, image_mesh};
pub use surface::{EvalPointSet, SurfaceLayout, SurfaceSlot, SurfaceSpec};
pub use tensor::{PointBlock, PointBlockMut, VectorsTensor};
