//! Symmetry and ground-effect image bookkeeping.
//!
//! The collaborator hands the solver a vectors tensor over the *image* grid
//! (`nx_img × ny_img` corners). This module decides, for each surface, which
//! rows of that grid form which geometric copy, what vortex multiplier each
//! copy carries, and which physical circulation every image panel column
//! reads. It never evaluates a kernel and never creates evaluation points.

use horseshoe_core::SurfaceSpec;

/// One geometric copy of a surface inside the image grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageCopy {
    /// First corner row of this copy in the image grid.
    pub row_offset: usize,
    /// Vortex multiplier: `+1` for the physical copy, `-1` for the ground image.
    pub multiplier: f64,
}

/// Index and sign mapping from image panels back to physical panels.
#[derive(Debug, Clone)]
pub struct ImageExpansion {
    nx: usize,
    ny: usize,
    symmetry: bool,
    right_wing: bool,
    copies: Vec<ImageCopy>,
}

impl ImageExpansion {
    pub fn new(spec: &SurfaceSpec) -> Self {
        let mut copies = vec![ImageCopy {
            row_offset: 0,
            multiplier: 1.0,
        }];
        if spec.groundplane {
            copies.push(ImageCopy {
                row_offset: spec.nx,
                multiplier: -1.0,
            });
        }
        let expansion = Self {
            nx: spec.nx,
            ny: spec.ny,
            symmetry: spec.symmetry,
            right_wing: spec.right_wing,
            copies,
        };
        debug_assert!(expansion.is_consistent());
        expansion
    }

    /// Every image column lies in the grid and reads back the physical
    /// column that lists it.
    pub fn is_consistent(&self) -> bool {
        let image_cols = self.image_cols();
        (0..self.panel_cols()).all(|m| {
            self.image_cols_of(m)
                .as_slice()
                .iter()
                .all(|&k| k < image_cols && self.physical_col(k) == m)
        })
    }

    /// Physical and (if present) ground-image copies.
    pub fn copies(&self) -> &[ImageCopy] {
        &self.copies
    }

    /// Physical chordwise panel rows.
    pub fn panel_rows(&self) -> usize {
        self.nx - 1
    }

    /// Physical spanwise panel columns.
    pub fn panel_cols(&self) -> usize {
        self.ny - 1
    }

    /// Spanwise panel columns in the image grid.
    pub fn image_cols(&self) -> usize {
        if self.symmetry {
            2 * (self.ny - 1)
        } else {
            self.ny - 1
        }
    }

    /// Whether `row` is the last chordwise row, closed by a horseshoe.
    #[inline]
    pub fn is_trailing_row(&self, row: usize) -> bool {
        row + 1 == self.nx - 1
    }

    /// Physical panel column read by image panel column `k`.
    ///
    /// The mirrored half reads the physical columns in reverse order; a right
    /// wing additionally reverses the whole physical reading.
    #[inline]
    pub fn physical_col(&self, k: usize) -> usize {
        if !self.symmetry {
            return k;
        }
        let half = self.ny - 1;
        let base = if k < half { k } else { 2 * half - 1 - k };
        if self.right_wing { half - 1 - base } else { base }
    }

    /// Image panel columns that read physical column `m`: one without
    /// symmetry, two (own side and mirrored side) with it.
    #[inline]
    pub fn image_cols_of(&self, m: usize) -> ImageCols {
        if !self.symmetry {
            return ImageCols {
                cols: [m, 0],
                len: 1,
            };
        }
        let half = self.ny - 1;
        let base = if self.right_wing { half - 1 - m } else { m };
        ImageCols {
            cols: [base, 2 * half - 1 - base],
            len: 2,
        }
    }
}

/// Small fixed-capacity list of image columns.
#[derive(Debug, Clone, Copy)]
pub struct ImageCols {
    cols: [usize; 2],
    len: usize,
}

impl ImageCols {
    pub fn as_slice(&self) -> &[usize] {
        &self.cols[..self.len]
    }
}
