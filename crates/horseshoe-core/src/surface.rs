//! Lifting-surface descriptors and the ordered layout of the circulation vector.
//!
//! Every solver component indexes circulations, collocation points and
//! normals through a [`SurfaceLayout`]. Surfaces keep the order in which they
//! were declared, and each slot carries its precomputed offset into the
//! global system, so reordering surfaces is never silent.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Mesh;

/// Static description of one lifting surface.
///
/// `nx` and `ny` count mesh corner points (chordwise × spanwise); the surface
/// has `(nx - 1) * (ny - 1)` panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
    /// Surface identity (e.g., "wing", "tail").
    pub name: String,
    /// Number of chordwise corner points.
    pub nx: usize,
    /// Number of spanwise corner points.
    pub ny: usize,
    /// Reflect across the y = 0 plane to represent the other half.
    #[serde(default)]
    pub symmetry: bool,
    /// Mirror the vortex system across a ground plane.
    #[serde(default)]
    pub groundplane: bool,
    /// Symmetric half-wing meshed from the root outboard to +y.
    #[serde(default)]
    pub right_wing: bool,
}

impl SurfaceSpec {
    /// Create a plain (non-symmetric, free-air) surface.
    pub fn new(name: impl Into<String>, nx: usize, ny: usize) -> Self {
        Self {
            name: name.into(),
            nx,
            ny,
            symmetry: false,
            groundplane: false,
            right_wing: false,
        }
    }

    /// Create a surface sized from a mesh, detecting right-wing orientation.
    pub fn from_mesh(name: impl Into<String>, mesh: &Mesh, symmetry: bool) -> Self {
        Self {
            name: name.into(),
            nx: mesh.nx(),
            ny: mesh.ny(),
            symmetry,
            groundplane: false,
            right_wing: symmetry && Self::detect_right_wing(mesh),
        }
    }

    /// Enable or disable the symmetry image.
    pub fn with_symmetry(mut self, symmetry: bool) -> Self {
        self.symmetry = symmetry;
        self
    }

    /// Enable or disable the ground-effect image.
    pub fn with_groundplane(mut self, groundplane: bool) -> Self {
        self.groundplane = groundplane;
        self
    }

    /// Mark the half-wing as running from the root towards +y.
    pub fn with_right_wing(mut self, right_wing: bool) -> Self {
        self.right_wing = right_wing;
        self
    }

    /// A mesh is a right wing when its leading-edge root lies at the first
    /// spanwise station.
    pub fn detect_right_wing(mesh: &Mesh) -> bool {
        let first = mesh.point(0, 0).y.abs();
        let last = mesh.point(0, mesh.ny() - 1).y.abs();
        first < last
    }

    /// Number of panels owned by this surface.
    pub fn num_panels(&self) -> usize {
        (self.nx - 1) * (self.ny - 1)
    }

    /// Chordwise extent of the image grid (doubled by ground effect).
    pub fn nx_img(&self) -> usize {
        if self.groundplane { 2 * self.nx } else { self.nx }
    }

    /// Spanwise extent of the image grid (mirrored by symmetry).
    pub fn ny_img(&self) -> usize {
        if self.symmetry {
            2 * self.ny - 1
        } else {
            self.ny
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidSurface {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("surface name must not be empty"));
        }
        if self.nx < 2 {
            return Err(invalid("nx must be at least 2"));
        }
        if self.ny < 2 {
            return Err(invalid("ny must be at least 2"));
        }
        if self.right_wing && !self.symmetry {
            return Err(invalid("right_wing requires symmetry"));
        }
        Ok(())
    }
}

/// Named set of evaluation points at which induced velocity is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalPointSet {
    /// Three-quarter-chord panel midpoints where flow tangency is enforced.
    Collocation,
    /// Bound-vortex midpoints where panel forces are evaluated.
    Force,
}

impl EvalPointSet {
    /// Name used in vectors keys.
    pub fn name(self) -> &'static str {
        match self {
            EvalPointSet::Collocation => "coll_pts",
            EvalPointSet::Force => "force_pts",
        }
    }
}

impl fmt::Display for EvalPointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A surface together with its fixed position in the global system.
#[derive(Debug, Clone)]
pub struct SurfaceSlot {
    /// Declaration index.
    pub index: usize,
    /// Surface description.
    pub spec: SurfaceSpec,
    /// First circulation index owned by this surface.
    pub offset: usize,
    /// Number of panels (and circulations) owned by this surface.
    pub num_panels: usize,
}

impl SurfaceSlot {
    /// Range of global circulation indices owned by this surface.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.num_panels
    }

    /// Key under which the collaborator supplies this surface's vectors.
    pub fn vectors_key(&self, eval: EvalPointSet) -> String {
        format!("{}_{}_vectors", self.spec.name, eval.name())
    }

    /// Key under which the collaborator supplies this surface's normals.
    pub fn normals_key(&self) -> String {
        format!("{}_normals", self.spec.name)
    }
}

/// Ordered list of surfaces making up one aerodynamic system.
#[derive(Debug, Clone)]
pub struct SurfaceLayout {
    slots: Vec<SurfaceSlot>,
    system_size: usize,
}

impl SurfaceLayout {
    /// Validate the surfaces and fix their offsets in declaration order.
    pub fn new(specs: Vec<SurfaceSpec>) -> Result<Self> {
        let mut slots: Vec<SurfaceSlot> = Vec::with_capacity(specs.len());
        let mut offset = 0;

        for (index, spec) in specs.into_iter().enumerate() {
            spec.validate()?;
            if slots.iter().any(|s| s.spec.name == spec.name) {
                return Err(Error::DuplicateSurface(spec.name));
            }
            let num_panels = spec.num_panels();
            slots.push(SurfaceSlot {
                index,
                spec,
                offset,
                num_panels,
            });
            offset += num_panels;
        }

        log::debug!(
            "surface layout: {} surfaces, system size {}",
            slots.len(),
            offset
        );

        Ok(Self {
            slots,
            system_size: offset,
        })
    }

    /// Total number of panels across all surfaces.
    pub fn system_size(&self) -> usize {
        self.system_size
    }

    /// Number of surfaces.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the layout has no surfaces.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Surfaces in declaration order.
    pub fn slots(&self) -> &[SurfaceSlot] {
        &self.slots
    }

    /// Surface at a declaration index.
    pub fn slot(&self, index: usize) -> Option<&SurfaceSlot> {
        self.slots.get(index)
    }

    /// Look a surface up by name.
    pub fn slot_by_name(&self, name: &str) -> Result<&SurfaceSlot> {
        self.slots
            .iter()
            .find(|s| s.spec.name == name)
            .ok_or_else(|| Error::SurfaceNotFound(name.to_string()))
    }

    /// Check that a circulation (or residual) vector matches the system size.
    pub fn check_system_vector(&self, what: &str, len: usize) -> Result<()> {
        if len != self.system_size {
            return Err(Error::LengthMismatch {
                what: what.to_string(),
                expected: self.system_size,
                actual: len,
            });
        }
        Ok(())
    }

    /// Check per-surface normals: one vector per physical panel.
    pub fn check_normals<T>(&self, normals: &[Vec<T>]) -> Result<()> {
        if normals.len() != self.slots.len() {
            return Err(Error::LengthMismatch {
                what: "normals surfaces".to_string(),
                expected: self.slots.len(),
                actual: normals.len(),
            });
        }
        for (slot, n) in self.slots.iter().zip(normals) {
            if n.len() != slot.num_panels {
                return Err(Error::LengthMismatch {
                    what: slot.normals_key(),
                    expected: slot.num_panels,
                    actual: n.len(),
                });
            }
        }
        Ok(())
    }
}
