//! Dense geometric vectors tensor: panel-corner → evaluation-point vectors.

use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::surface::SurfaceSlot;

/// `[num_eval, nx_img, ny_img]` array of 3-vectors `r = P - X` from every
/// image-grid corner `X` to every evaluation point `P`.
///
/// Storage is row-major with the evaluation point outermost, so the block
/// belonging to one evaluation point is contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorsTensor {
    num_eval: usize,
    nx: usize,
    ny: usize,
    data: Vec<Vector3<f64>>,
}

impl VectorsTensor {
    /// Wrap existing data, checking its length against the shape.
    pub fn new(num_eval: usize, nx: usize, ny: usize, data: Vec<Vector3<f64>>) -> Result<Self> {
        let expected = num_eval * nx * ny;
        if data.len() != expected {
            return Err(Error::LengthMismatch {
                what: "vectors tensor data".to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            num_eval,
            nx,
            ny,
            data,
        })
    }

    pub(crate) fn from_parts(num_eval: usize, nx: usize, ny: usize, data: Vec<Vector3<f64>>) -> Self {
        debug_assert_eq!(data.len(), num_eval * nx * ny);
        Self {
            num_eval,
            nx,
            ny,
            data,
        }
    }

    /// Zero-filled tensor, used as a gradient accumulator.
    pub fn zeros(num_eval: usize, nx: usize, ny: usize) -> Self {
        Self {
            num_eval,
            nx,
            ny,
            data: vec![Vector3::zeros(); num_eval * nx * ny],
        }
    }

    /// Zero tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.num_eval, self.nx, self.ny)
    }

    /// Shape as `[num_eval, nx_img, ny_img]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.num_eval, self.nx, self.ny]
    }

    pub fn num_eval(&self) -> usize {
        self.num_eval
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Number of vectors per evaluation point.
    pub fn block_len(&self) -> usize {
        self.nx * self.ny
    }

    #[inline]
    fn index(&self, i: usize, row: usize, col: usize) -> usize {
        (i * self.nx + row) * self.ny + col
    }

    /// Vector from corner `(row, col)` to evaluation point `i`.
    #[inline]
    pub fn get(&self, i: usize, row: usize, col: usize) -> &Vector3<f64> {
        &self.data[self.index(i, row, col)]
    }

    /// Mutable access to one entry.
    #[inline]
    pub fn get_mut(&mut self, i: usize, row: usize, col: usize) -> &mut Vector3<f64> {
        let idx = self.index(i, row, col);
        &mut self.data[idx]
    }

    /// All corner vectors for evaluation point `i`.
    pub fn point_block(&self, i: usize) -> &[Vector3<f64>] {
        let len = self.block_len();
        &self.data[i * len..(i + 1) * len]
    }

    pub fn as_slice(&self) -> &[Vector3<f64>] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Vector3<f64>] {
        &mut self.data
    }

    /// Frobenius inner product with a tensor of the same shape.
    pub fn dot(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a.dot(b))
            .sum()
    }

    /// `self += scale * other`.
    pub fn axpy(&mut self, scale: f64, other: &Self) {
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b * scale;
        }
    }

    /// Check that this tensor has the image extents declared for `slot`.
    pub fn check_for(&self, slot: &SurfaceSlot, num_eval: usize, key: &str) -> Result<()> {
        let expected = [num_eval, slot.spec.nx_img(), slot.spec.ny_img()];
        let actual = self.shape();
        if expected != actual {
            return Err(Error::ShapeMismatch {
                what: key.to_string(),
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }
}

/// Read-only view of a single evaluation point's corner block.
#[derive(Debug, Clone, Copy)]
pub struct PointBlock<'a> {
    ny: usize,
    data: &'a [Vector3<f64>],
}

impl<'a> PointBlock<'a> {
    pub fn new(tensor: &'a VectorsTensor, i: usize) -> Self {
        Self {
            ny: tensor.ny,
            data: tensor.point_block(i),
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Vector3<f64> {
        self.data[row * self.ny + col]
    }
}

/// Mutable view of a single evaluation point's corner block.
#[derive(Debug)]
pub struct PointBlockMut<'a> {
    ny: usize,
    data: &'a mut [Vector3<f64>],
}

impl<'a> PointBlockMut<'a> {
    /// Wrap a slice of length `nx_img * ny`.
    pub fn new(ny: usize, data: &'a mut [Vector3<f64>]) -> Self {
        Self { ny, data }
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: &Vector3<f64>) {
        self.data[row * self.ny + col] += value;
    }
}
