pub mod distance;
pub mod frame;
pub mod intersect_2d;
pub mod polygon_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3D rotation.
pub type Rotation3 = nalgebra::Rotation3<f64>;

/// Numerical guard for degenerate arithmetic (zero-length vectors, parallel
/// lines). Model-space comparisons use [`crate::config::Tolerance`] instead.
pub const TOLERANCE: f64 = 1e-10;

/// Drops the Z coordinate.
#[must_use]
pub fn flatten(p: &Point3) -> Point3 {
    Point3::new(p.x, p.y, 0.0)
}

/// Squared distance between two points in the XY plane.
#[must_use]
pub fn distance_xy_sq(a: &Point3, b: &Point3) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dx * dx + dy * dy
}
