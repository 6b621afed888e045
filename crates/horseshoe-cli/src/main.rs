//! Horseshoe command-line interface.

mod case;
mod report;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::case::Case;

#[derive(Parser)]
#[command(name = "horseshoe")]
#[command(about = "Vortex-lattice analysis of a rectangular wing", long_about = None)]
#[command(version)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// TOML case file; flags below override its values
    #[arg(value_name = "CASE")]
    input: Option<PathBuf>,

    /// Angle of attack in degrees
    #[arg(long)]
    alpha: Option<f64>,

    /// Full wing span
    #[arg(long)]
    span: Option<f64>,

    /// Wing chord
    #[arg(long)]
    chord: Option<f64>,

    /// Chordwise mesh points
    #[arg(long)]
    nx: Option<usize>,

    /// Spanwise mesh points
    #[arg(long)]
    ny: Option<usize>,

    /// Model the left half-wing with a symmetry image
    #[arg(long)]
    symmetry: bool,

    /// Add a ground plane at this height (below the wing at z = 0)
    #[arg(long)]
    ground_height: Option<f64>,

    /// Report dCL/dalpha from the adjoint solve
    #[arg(long)]
    sensitivities: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, case: &mut Case) {
        if let Some(alpha) = self.alpha {
            case.flight.alpha = alpha;
        }
        if let Some(span) = self.span {
            case.wing.span = span;
        }
        if let Some(chord) = self.chord {
            case.wing.chord = chord;
        }
        if let Some(nx) = self.nx {
            case.wing.nx = nx;
        }
        if let Some(ny) = self.ny {
            case.wing.ny = ny;
        }
        if self.symmetry {
            case.wing.symmetry = true;
        }
        if self.ground_height.is_some() {
            case.wing.ground_height = self.ground_height;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let mut case = match &cli.input {
        Some(path) => Case::load(path)?,
        None => Case::default(),
    };
    cli.apply(&mut case);
    case.validate()?;

    let report = report::run_case(&case, cli.sensitivities)?;
    report.print(&case);

    Ok(())
}
