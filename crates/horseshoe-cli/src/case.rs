//! TOML case files describing a rectangular-wing run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use horseshoe_solver::{CirculationSolverConfig, GmresConfig, PreconditionerType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Case {
    pub wing: Wing,
    pub flight: Flight,
    pub solver: Solver,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Wing {
    pub span: f64,
    pub chord: f64,
    /// Chordwise mesh points.
    pub nx: usize,
    /// Spanwise mesh points.
    pub ny: usize,
    /// Model only the left half-wing.
    pub symmetry: bool,
    /// Height of the ground plane; the wing lies at z = 0.
    pub ground_height: Option<f64>,
}

impl Default for Wing {
    fn default() -> Self {
        Self {
            span: 10.0,
            chord: 1.0,
            nx: 2,
            ny: 21,
            symmetry: false,
            ground_height: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Flight {
    pub speed: f64,
    /// Degrees.
    pub alpha: f64,
    /// Degrees.
    pub beta: f64,
    pub density: f64,
}

impl Default for Flight {
    fn default() -> Self {
        Self {
            speed: 10.0,
            alpha: 5.0,
            beta: 0.0,
            density: 1.225,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Solver {
    pub tol: f64,
    pub max_iter: usize,
    pub restart: usize,
    /// `"jacobi"` or `"none"`.
    pub preconditioner: String,
}

impl Default for Solver {
    fn default() -> Self {
        let gmres = GmresConfig::default();
        Self {
            tol: gmres.tol,
            max_iter: gmres.max_iter,
            restart: gmres.restart,
            preconditioner: "jacobi".to_string(),
        }
    }
}

impl Case {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read case: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse case: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.wing.nx < 2 || self.wing.ny < 2 {
            bail!(
                "wing needs at least 2 x 2 mesh points, got {} x {}",
                self.wing.nx,
                self.wing.ny
            );
        }
        if self.wing.span <= 0.0 || self.wing.chord <= 0.0 {
            bail!("span and chord must be positive");
        }
        if let Some(h) = self.wing.ground_height {
            if h >= 0.0 {
                bail!("ground plane must lie below the wing (z = 0), got {}", h);
            }
        }
        if self.flight.speed <= 0.0 || self.flight.density <= 0.0 {
            bail!("speed and density must be positive");
        }
        if self.solver.tol <= 0.0 || self.solver.max_iter == 0 || self.solver.restart == 0 {
            bail!("solver tol, max_iter and restart must be positive");
        }
        self.preconditioner()?;
        Ok(())
    }

    fn preconditioner(&self) -> Result<PreconditionerType> {
        match PreconditionerType::from_name(&self.solver.preconditioner) {
            Some(p) => Ok(p),
            None => bail!("unknown preconditioner: {}", self.solver.preconditioner),
        }
    }

    pub fn solver_config(&self) -> Result<CirculationSolverConfig> {
        let gmres = GmresConfig::default()
            .with_tol(self.solver.tol)
            .with_max_iter(self.solver.max_iter)
            .with_restart(self.solver.restart);
        Ok(CirculationSolverConfig::default()
            .with_gmres(gmres)
            .with_preconditioner(self.preconditioner()?))
    }

    /// Planform area of the modelled geometry.
    pub fn reference_area(&self) -> f64 {
        let area = self.wing.span * self.wing.chord;
        if self.wing.symmetry { 0.5 * area } else { area }
    }
}
