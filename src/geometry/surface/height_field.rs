use crate::error::{GeometryError, Result};
use crate::geometry::curve::Polyline;
use crate::math::{Point3, Vector3};

/// Regular grid of heights sampled over the XY plane.
///
/// `heights` is row-major: index `j * nx + i` holds the height at
/// `(origin_x + i * dx, origin_y + j * dy)`. Queries outside the grid are
/// clamped to its border.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    origin_x: f64,
    origin_y: f64,
    dx: f64,
    dy: f64,
    nx: usize,
    ny: usize,
    heights: Vec<f64>,
}

impl HeightGrid {
    /// Creates a height grid.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidGeometryInput`] if the spacing is not
    /// positive, either dimension is below 2, or `heights` has the wrong size.
    pub fn new(origin: (f64, f64), spacing: (f64, f64), size: (usize, usize), heights: Vec<f64>) -> Result<Self> {
        let (nx, ny) = size;
        if spacing.0 <= 0.0 || spacing.1 <= 0.0 {
            return Err(GeometryError::InvalidGeometryInput("grid spacing must be positive".into()).into());
        }
        if nx < 2 || ny < 2 || heights.len() != nx * ny {
            return Err(GeometryError::InvalidGeometryInput(format!(
                "grid of {nx}x{ny} needs {} heights, got {}",
                nx * ny,
                heights.len()
            ))
            .into());
        }
        Ok(Self {
            origin_x: origin.0,
            origin_y: origin.1,
            dx: spacing.0,
            dy: spacing.1,
            nx,
            ny,
            heights,
        })
    }

    /// Cell index and fraction along one axis, clamped to the grid.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn cell(coord: f64, origin: f64, spacing: f64, n: usize) -> (usize, f64, bool) {
        let u = (coord - origin) / spacing;
        let max = (n - 1) as f64;
        let inside = (0.0..=max).contains(&u);
        let u = u.clamp(0.0, max);
        let i = (u.floor() as usize).min(n - 2);
        (i, u - i as f64, inside)
    }

    fn at(&self, i: usize, j: usize) -> f64 {
        self.heights[j * self.nx + i]
    }

    fn height(&self, x: f64, y: f64) -> f64 {
        let (i, s, _) = Self::cell(x, self.origin_x, self.dx, self.nx);
        let (j, t, _) = Self::cell(y, self.origin_y, self.dy, self.ny);
        let z00 = self.at(i, j);
        let z10 = self.at(i + 1, j);
        let z01 = self.at(i, j + 1);
        let z11 = self.at(i + 1, j + 1);
        z00 * (1.0 - s) * (1.0 - t) + z10 * s * (1.0 - t) + z01 * (1.0 - s) * t + z11 * s * t
    }

    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let (i, s, in_x) = Self::cell(x, self.origin_x, self.dx, self.nx);
        let (j, t, in_y) = Self::cell(y, self.origin_y, self.dy, self.ny);
        let z00 = self.at(i, j);
        let z10 = self.at(i + 1, j);
        let z01 = self.at(i, j + 1);
        let z11 = self.at(i + 1, j + 1);
        let gx = if in_x {
            ((z10 - z00) * (1.0 - t) + (z11 - z01) * t) / self.dx
        } else {
            0.0
        };
        let gy = if in_y {
            ((z01 - z00) * (1.0 - s) + (z11 - z10) * s) / self.dy
        } else {
            0.0
        };
        (gx, gy)
    }
}

/// A surface given as a height over the XY plane.
///
/// The spray direction is `-Z`, so every projection onto the surface is a
/// vertical one. A height field has no trims: it doubles as the extended
/// surface of any [`super::TrimmedSurface`] built on it.
#[derive(Debug, Clone, PartialEq)]
pub enum HeightField {
    /// `z = z0 + slope_x * x + slope_y * y`.
    Plane { z0: f64, slope_x: f64, slope_y: f64 },
    /// Bilinear interpolation over a regular grid.
    Grid(HeightGrid),
}

impl HeightField {
    /// Horizontal plane at height `z`.
    #[must_use]
    pub fn flat(z: f64) -> Self {
        Self::Plane {
            z0: z,
            slope_x: 0.0,
            slope_y: 0.0,
        }
    }

    /// Height at `(x, y)`.
    #[must_use]
    pub fn height(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Plane { z0, slope_x, slope_y } => z0 + slope_x * x + slope_y * y,
            Self::Grid(grid) => grid.height(x, y),
        }
    }

    /// Partial derivatives `(dz/dx, dz/dy)` at `(x, y)`.
    #[must_use]
    pub fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Plane { slope_x, slope_y, .. } => (*slope_x, *slope_y),
            Self::Grid(grid) => grid.gradient(x, y),
        }
    }

    /// Upward unit normal at `(x, y)`.
    #[must_use]
    pub fn normal_at(&self, x: f64, y: f64) -> Vector3 {
        let (gx, gy) = self.gradient(x, y);
        Vector3::new(-gx, -gy, 1.0).normalize()
    }

    /// Projects `p` vertically onto the surface.
    #[must_use]
    pub fn lift(&self, p: &Point3) -> Point3 {
        Point3::new(p.x, p.y, self.height(p.x, p.y))
    }

    /// Projects a curve vertically onto the surface, densifying first so no
    /// segment exceeds `max_segment` in length.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the projection collapses.
    pub fn lift_curve(&self, curve: &Polyline, max_segment: f64) -> Result<Polyline> {
        let dense = match self {
            Self::Plane { .. } => curve.clone(),
            Self::Grid(_) => curve.densified(max_segment),
        };
        dense.map_points(|p| self.lift(p))
    }

    /// Signed vertical distance from `p` up to the surface.
    #[must_use]
    pub fn height_above(&self, p: &Point3) -> f64 {
        self.height(p.x, p.y) - p.z
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        match self {
            Self::Plane { z0, slope_x, slope_y } => Self::Plane {
                z0: z0 - slope_x * offset.x - slope_y * offset.y + offset.z,
                slope_x: *slope_x,
                slope_y: *slope_y,
            },
            Self::Grid(grid) => Self::Grid(HeightGrid {
                origin_x: grid.origin_x + offset.x,
                origin_y: grid.origin_y + offset.y,
                heights: grid.heights.iter().map(|h| h + offset.z).collect(),
                ..grid.clone()
            }),
        }
    }
}
