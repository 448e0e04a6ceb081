use serde::{Deserialize, Serialize};

use crate::config::Tolerance;
use crate::geometry::surface::TrimmedSurface;
use crate::math::{Point3, Vector3};
use crate::path::SprayPath;

use super::normals::{unsafe_normal, AlignNormal};

/// One robot target: where the tool centre point goes, how it is oriented
/// and how fast it travels there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub position: Point3,
    pub normal: Vector3,
    pub speed: f64,
}

/// Discretises a spray path into robot targets.
///
/// Targets are the path vertices, with the first vertex of every curve after
/// the first dropped since it repeats the previous end. A target takes its
/// orientation from the first surface it lies over, as an edge point when its
/// curve runs along an edge or it lies within `edge_distance` of the
/// surface boundary. Targets over no surface get the unsafe orientation and
/// `safe_speed`.
pub struct ExtractTargets<'a> {
    surfaces: &'a [TrimmedSurface],
    edge_distance: f64,
    safe_speed: f64,
    tolerance: Tolerance,
}

impl<'a> ExtractTargets<'a> {
    /// Creates a new `ExtractTargets` operation.
    #[must_use]
    pub fn new(surfaces: &'a [TrimmedSurface], edge_distance: f64, safe_speed: f64) -> Self {
        Self {
            surfaces,
            edge_distance,
            safe_speed,
            tolerance: Tolerance::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the extraction.
    #[must_use]
    pub fn execute(&self, path: &SprayPath) -> Vec<Target> {
        let tol = self.tolerance.distance;
        let mut targets = Vec::new();
        for (i, curve) in path.curves().iter().enumerate() {
            let skip = usize::from(i != 0);
            for &position in curve.curve.points().iter().skip(skip) {
                let over = self
                    .surfaces
                    .iter()
                    .find(|s| s.containment(&position, tol).is_inside_or_boundary());
                let target = match over {
                    Some(surface) => {
                        let on_edge = curve.is_edge
                            || surface.region().distance_to_boundary(&position) <= self.edge_distance + tol;
                        Target {
                            position,
                            normal: AlignNormal::new(surface, curve.edge_angle)
                                .with_tolerance(self.tolerance)
                                .execute(&position, on_edge),
                            speed: curve.speed.unwrap_or(self.safe_speed),
                        }
                    }
                    None => Target {
                        position,
                        normal: unsafe_normal(),
                        speed: self.safe_speed,
                    },
                };
                targets.push(target);
            }
        }
        targets
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::Polyline;
    use crate::geometry::surface::HeightField;
    use crate::path::SprayCurve;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn square() -> TrimmedSurface {
        let outline = Polyline::new(vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(0.0, 0.0)]).unwrap();
        TrimmedSurface::new(HeightField::flat(0.0), &outline, &[]).unwrap()
    }

    #[test]
    fn drops_repeated_vertices_and_flags_outside() {
        let surfaces = [square()];
        let path = SprayPath::new(vec![
            SprayCurve::new(Polyline::new(vec![p(2.0, 5.0), p(5.0, 5.0), p(8.0, 5.0)]).unwrap()).with_speed(100.0),
            SprayCurve::connector(Polyline::line(p(8.0, 5.0), p(14.0, 5.0)).unwrap()).with_speed(300.0),
        ]);
        let targets = ExtractTargets::new(&surfaces, 1.0, 50.0).execute(&path);
        assert_eq!(targets.len(), 4);
        assert_relative_eq!(targets[0].speed, 100.0);
        assert_eq!(targets[1].normal, -Vector3::z());
        let outside = targets[3];
        assert_relative_eq!(outside.position.x, 14.0);
        assert_eq!(outside.normal, unsafe_normal());
        assert_relative_eq!(outside.speed, 50.0);
    }

    #[test]
    fn points_near_boundary_are_tilted() {
        let surfaces = [square()];
        let mut curve = SprayCurve::new(Polyline::line(p(5.0, 0.5), p(5.0, 5.0)).unwrap()).with_speed(80.0);
        curve.edge_angle = 0.3;
        let targets = ExtractTargets::new(&surfaces, 1.0, 50.0).execute(&SprayPath::new(vec![curve]));
        assert!(targets[0].normal.y.abs() > 0.1);
        assert_relative_eq!(targets[1].normal.y, 0.0, epsilon = 1e-12);
    }
}
