//! Mesh-derived geometry consumed by the solver.
//!
//! These helpers stand in for the geometry collaborator: they never deform a
//! mesh, they only derive the vortex grid, evaluation points, normals, image
//! grids and the vectors tensor from a fixed corner mesh.

use nalgebra::{Point3, Vector3};

use crate::error::{Error, Result};
use crate::surface::SurfaceSpec;
use crate::tensor::VectorsTensor;

/// Structured `nx × ny` grid of corner points; rows run chordwise from the
/// leading edge, columns run spanwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    nx: usize,
    ny: usize,
    points: Vec<Point3<f64>>,
}

impl Mesh {
    /// Build a mesh from row-major points.
    ///
    /// Both extents must be at least 2 so the mesh holds one panel.
    pub fn new(nx: usize, ny: usize, points: Vec<Point3<f64>>) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(Error::InvalidSurface {
                name: "mesh".to_string(),
                reason: format!("needs at least 2 x 2 points, got {} x {}", nx, ny),
            });
        }
        if points.len() != nx * ny {
            return Err(Error::LengthMismatch {
                what: "mesh points".to_string(),
                expected: nx * ny,
                actual: points.len(),
            });
        }
        Ok(Self { nx, ny, points })
    }

    /// Flat, untwisted, unswept rectangular planform in the z = 0 plane.
    ///
    /// Symmetric meshes cover the left half `y ∈ [-span/2, 0]`; otherwise the
    /// full span `y ∈ [-span/2, span/2]` is meshed.
    pub fn rectangular(span: f64, chord: f64, nx: usize, ny: usize, symmetry: bool) -> Self {
        debug_assert!(nx >= 2 && ny >= 2, "rectangular mesh needs 2 x 2 points");
        let (y0, y1) = if symmetry {
            (-0.5 * span, 0.0)
        } else {
            (-0.5 * span, 0.5 * span)
        };
        let mut points = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            let x = chord * i as f64 / (nx - 1) as f64;
            for j in 0..ny {
                let y = y0 + (y1 - y0) * j as f64 / (ny - 1) as f64;
                points.push(Point3::new(x, y, 0.0));
            }
        }
        Self { nx, ny, points }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn point(&self, row: usize, col: usize) -> &Point3<f64> {
        &self.points[row * self.ny + col]
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Translate every point by `offset`.
    pub fn translated(&self, offset: Vector3<f64>) -> Self {
        Self {
            nx: self.nx,
            ny: self.ny,
            points: self.points.iter().map(|p| p + offset).collect(),
        }
    }

    /// Reflect across y = 0, reversing column order so y still increases
    /// with the column index.
    pub fn mirrored_y(&self) -> Self {
        let mut points = Vec::with_capacity(self.points.len());
        for i in 0..self.nx {
            for j in (0..self.ny).rev() {
                let p = self.point(i, j);
                points.push(Point3::new(p.x, -p.y, p.z));
            }
        }
        Self {
            nx: self.nx,
            ny: self.ny,
            points,
        }
    }

    /// Reflect across the horizontal plane `z = height`.
    pub fn mirrored_z(&self, height: f64) -> Self {
        Self {
            nx: self.nx,
            ny: self.ny,
            points: self
                .points
                .iter()
                .map(|p| Point3::new(p.x, p.y, 2.0 * height - p.z))
                .collect(),
        }
    }

    fn check_spec(&self, spec: &SurfaceSpec) -> Result<()> {
        if self.nx != spec.nx || self.ny != spec.ny {
            return Err(Error::ShapeMismatch {
                what: format!("{} mesh", spec.name),
                expected: vec![spec.nx, spec.ny],
                actual: vec![self.nx, self.ny],
            });
        }
        Ok(())
    }
}

/// Shift bound vortices to the panel quarter-chord; the last row stays on
/// the trailing edge where the wake leaves.
pub fn vortex_mesh(mesh: &Mesh) -> Mesh {
    let (nx, ny) = (mesh.nx, mesh.ny);
    let mut points = Vec::with_capacity(nx * ny);
    for i in 0..nx - 1 {
        for j in 0..ny {
            let a = mesh.point(i, j).coords;
            let b = mesh.point(i + 1, j).coords;
            points.push(Point3::from(a * 0.75 + b * 0.25));
        }
    }
    for j in 0..ny {
        points.push(*mesh.point(nx - 1, j));
    }
    Mesh { nx, ny, points }
}

/// Three-quarter-chord panel midpoints, row-major `(nx-1) × (ny-1)`.
pub fn collocation_points(mesh: &Mesh) -> Vec<Point3<f64>> {
    let mut pts = Vec::with_capacity((mesh.nx - 1) * (mesh.ny - 1));
    for i in 0..mesh.nx - 1 {
        for j in 0..mesh.ny - 1 {
            let left = mesh.point(i, j).coords * 0.25 + mesh.point(i + 1, j).coords * 0.75;
            let right = mesh.point(i, j + 1).coords * 0.25 + mesh.point(i + 1, j + 1).coords * 0.75;
            pts.push(Point3::from((left + right) * 0.5));
        }
    }
    pts
}

/// Midpoints of each panel's bound (front) vortex on the vortex mesh.
pub fn force_points(vortex_mesh: &Mesh) -> Vec<Point3<f64>> {
    let mut pts = Vec::with_capacity((vortex_mesh.nx - 1) * (vortex_mesh.ny - 1));
    for i in 0..vortex_mesh.nx - 1 {
        for j in 0..vortex_mesh.ny - 1 {
            let a = vortex_mesh.point(i, j).coords;
            let b = vortex_mesh.point(i, j + 1).coords;
            pts.push(Point3::from((a + b) * 0.5));
        }
    }
    pts
}

/// Bound-vortex vectors, directed like the ring's front filament (A → B).
pub fn bound_vectors(vortex_mesh: &Mesh) -> Vec<Vector3<f64>> {
    let mut vecs = Vec::with_capacity((vortex_mesh.nx - 1) * (vortex_mesh.ny - 1));
    for i in 0..vortex_mesh.nx - 1 {
        for j in 0..vortex_mesh.ny - 1 {
            vecs.push(vortex_mesh.point(i, j) - vortex_mesh.point(i, j + 1));
        }
    }
    vecs
}

/// Unit panel normals from the cross product of the panel diagonals.
pub fn panel_normals(mesh: &Mesh) -> Vec<Vector3<f64>> {
    let mut normals = Vec::with_capacity((mesh.nx - 1) * (mesh.ny - 1));
    for i in 0..mesh.nx - 1 {
        for j in 0..mesh.ny - 1 {
            let a = mesh.point(i, j + 1) - mesh.point(i + 1, j);
            let b = mesh.point(i, j) - mesh.point(i + 1, j + 1);
            normals.push(a.cross(&b).normalize());
        }
    }
    normals
}

/// Expand a vortex mesh into the `nx_img × ny_img` image grid.
///
/// With symmetry the spanwise mirror is appended after a left wing and
/// prepended before a right wing, so the grid always runs from -y to +y and
/// shares the root column. With ground effect the whole grid is reflected
/// across `z = ground_height` and stacked below as extra chordwise rows.
pub fn image_mesh(vortex_mesh: &Mesh, spec: &SurfaceSpec, ground_height: f64) -> Result<Mesh> {
    vortex_mesh.check_spec(spec)?;

    let spanwise = if spec.symmetry {
        let mirror = vortex_mesh.mirrored_y();
        let (left, right) = if spec.right_wing {
            (&mirror, vortex_mesh)
        } else {
            (vortex_mesh, &mirror)
        };
        let ny = vortex_mesh.ny;
        let ny_img = 2 * ny - 1;
        let mut points = Vec::with_capacity(vortex_mesh.nx * ny_img);
        for i in 0..vortex_mesh.nx {
            for j in 0..ny {
                points.push(*left.point(i, j));
            }
            for j in 1..ny {
                points.push(*right.point(i, j));
            }
        }
        Mesh {
            nx: vortex_mesh.nx,
            ny: ny_img,
            points,
        }
    } else {
        vortex_mesh.clone()
    };

    if !spec.groundplane {
        return Ok(spanwise);
    }

    let image = spanwise.mirrored_z(ground_height);
    let mut points = spanwise.points;
    points.extend(image.points);
    Ok(Mesh {
        nx: 2 * spanwise.nx,
        ny: spanwise.ny,
        points,
    })
}

/// Vectors `r = P - X` from every image-grid corner to every evaluation point.
pub fn build_vectors(points: &[Point3<f64>], image: &Mesh) -> VectorsTensor {
    let mut data = Vec::with_capacity(points.len() * image.points.len());
    for p in points {
        data.extend(image.points.iter().map(|x| p - x));
    }
    VectorsTensor::from_parts(points.len(), image.nx, image.ny, data)
}

/// Free-stream velocity at every evaluation point (`alpha`, `beta` in degrees).
pub fn freestream_velocities(speed: f64, alpha: f64, beta: f64, n: usize) -> Vec<Vector3<f64>> {
    let (sa, ca) = alpha.to_radians().sin_cos();
    let (sb, cb) = beta.to_radians().sin_cos();
    let v = Vector3::new(ca * cb, -sb, sa * cb) * speed;
    vec![v; n]
}

/// Derivative of the free-stream velocity with respect to `alpha` in degrees.
pub fn freestream_alpha_derivative(speed: f64, alpha: f64, beta: f64) -> Vector3<f64> {
    let (sa, ca) = alpha.to_radians().sin_cos();
    let cb = beta.to_radians().cos();
    Vector3::new(-sa * cb, 0.0, ca * cb) * (speed * std::f64::consts::PI / 180.0)
}

/// Flow-tangency right-hand side `-V∞·n` per panel.
pub fn boundary_rhs(freestream: &[Vector3<f64>], normals: &[Vector3<f64>]) -> Result<Vec<f64>> {
    if freestream.len() != normals.len() {
        return Err(Error::LengthMismatch {
            what: "freestream velocities".to_string(),
            expected: normals.len(),
            actual: freestream.len(),
        });
    }
    Ok(freestream
        .iter()
        .zip(normals)
        .map(|(v, n)| -v.dot(n))
        .collect())
}
