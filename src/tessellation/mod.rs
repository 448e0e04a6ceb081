mod tessellate_region;

pub use tessellate_region::TessellateRegion;

use crate::math::{Point3, Vector3};

/// A planar patch of a surface approximation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle(pub [Point3; 3]);

impl Triangle {
    /// Unnormalized normal; its length is twice the area.
    #[must_use]
    pub fn scaled_normal(&self) -> Vector3 {
        let [a, b, c] = self.0;
        (b - a).cross(&(c - a))
    }

    /// Area of the triangle.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.scaled_normal().norm() * 0.5
    }

    /// Centroid of the triangle.
    #[must_use]
    pub fn centroid(&self) -> Point3 {
        let [a, b, c] = self.0;
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        let [a, b, c] = self.0;
        Self([a + offset, b + offset, c + offset])
    }
}
