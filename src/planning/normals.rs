use nalgebra::Unit;

use crate::config::Tolerance;
use crate::geometry::surface::TrimmedSurface;
use crate::math::distance::closest_on_segment;
use crate::math::polygon_2d::Containment;
use crate::math::{Point3, Rotation3, Vector3};

/// Tool direction used away from any surface.
#[must_use]
pub fn unsafe_normal() -> Vector3 {
    -Vector3::z()
}

/// Computes tool orientations over a trimmed surface.
///
/// Orientations point into the surface, against the upward surface normal.
/// Near an edge the orientation is tilted by `edge_angle` about the edge
/// tangent so the spray leans towards the edge.
pub struct AlignNormal<'a> {
    surface: &'a TrimmedSurface,
    edge_angle: f64,
    tolerance: Tolerance,
}

impl<'a> AlignNormal<'a> {
    /// Creates a new `AlignNormal` operation.
    #[must_use]
    pub fn new(surface: &'a TrimmedSurface, edge_angle: f64) -> Self {
        Self {
            surface,
            edge_angle,
            tolerance: Tolerance::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Orientation at `point`, treating it as an edge point when `on_edge`.
    #[must_use]
    pub fn execute(&self, point: &Point3, on_edge: bool) -> Vector3 {
        if on_edge {
            self.edge_normal(point)
        } else {
            self.interior_normal(point)
        }
    }

    fn interior_normal(&self, point: &Point3) -> Vector3 {
        if self.surface.containment(point, self.tolerance.distance) == Containment::Outside {
            return unsafe_normal();
        }
        -self.surface.normal_at(point)
    }

    fn edge_normal(&self, point: &Point3) -> Vector3 {
        let tol = self.tolerance.distance;
        let base = -self.surface.normal_at(point);
        let outer = self.surface.region().outer();
        let n = outer.len();

        let edge_distance = (0..n)
            .map(|i| segment_distance(point, &outer[i], &outer[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min);
        let step_out = (edge_distance * 2.0).max(tol * 10.0);

        let mut sum = Vector3::zeros();
        let mut count = 0_usize;
        for i in 0..n {
            let (a, b) = (outer[i], outer[(i + 1) % n]);
            if segment_distance(point, &a, &b) > edge_distance + tol {
                continue;
            }
            let mut tangent = b - a;
            // The tangent must keep the interior on its left.
            let side = (-base).cross(&tangent);
            let Some(side) = side.try_normalize(crate::math::TOLERANCE) else {
                continue;
            };
            let beside = point + side * step_out;
            if self.surface.containment(&beside, tol) == Containment::Outside {
                tangent = -tangent;
            }
            let Some(axis) = Unit::try_new(tangent, crate::math::TOLERANCE) else {
                continue;
            };
            sum += Rotation3::from_axis_angle(&axis, -self.edge_angle) * base;
            count += 1;
        }
        if count == 0 {
            return base;
        }
        sum.try_normalize(crate::math::TOLERANCE).unwrap_or(base)
    }
}

fn segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let (q, _) = closest_on_segment(p, a, b);
    (q - p).norm()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::Polyline;
    use crate::geometry::surface::HeightField;
    use approx::assert_relative_eq;

    fn square(height: HeightField) -> TrimmedSurface {
        let outline = Polyline::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ])
        .unwrap();
        TrimmedSurface::new(height, &outline, &[]).unwrap()
    }

    #[test]
    fn interior_points_face_into_surface() {
        let surf = square(HeightField::Plane {
            z0: 0.0,
            slope_x: 1.0,
            slope_y: 0.0,
        });
        let n = AlignNormal::new(&surf, 0.3).execute(&Point3::new(5.0, 5.0, 5.0), false);
        assert!(n.z < 0.0);
        assert_relative_eq!(n.x, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn outside_points_get_unsafe_normal() {
        let surf = square(HeightField::flat(0.0));
        let n = AlignNormal::new(&surf, 0.3).execute(&Point3::new(15.0, 5.0, 0.0), false);
        assert_eq!(n, unsafe_normal());
    }

    #[test]
    fn edge_points_lean_outward() {
        let surf = square(HeightField::flat(0.0));
        let angle = 0.2_f64;
        let n = AlignNormal::new(&surf, angle).execute(&Point3::new(5.0, 0.5, 0.0), true);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(n.z, -angle.cos(), epsilon = 1e-12);
        assert_relative_eq!(n.x, 0.0, epsilon = 1e-12);
        // Bottom edge: the tool leans towards -Y, out over the edge.
        assert_relative_eq!(n.y, -angle.sin(), epsilon = 1e-12);
    }

    #[test]
    fn corner_points_average_both_edges() {
        let surf = square(HeightField::flat(0.0));
        let n = AlignNormal::new(&surf, 0.2).execute(&Point3::new(0.5, 0.5, 0.0), true);
        assert_relative_eq!(n.x.abs(), n.y.abs(), epsilon = 1e-12);
        assert!(n.z < 0.0);
    }
}
