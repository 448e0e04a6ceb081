use crate::geometry::curve::Polyline;
use crate::math::distance::segment_segment_closest;
use crate::math::Point3;

/// Result of a closest points query between two curves.
#[derive(Debug, Clone, Copy)]
pub struct ClosestPointsResult {
    /// Parameter on the first curve.
    pub t_a: f64,
    /// Parameter on the second curve.
    pub t_b: f64,
    /// Closest point on the first curve.
    pub point_a: Point3,
    /// Closest point on the second curve.
    pub point_b: Point3,
    /// Distance between the two points.
    pub distance: f64,
}

/// Finds the pair of closest points between two curves.
pub struct ClosestPoints<'a> {
    a: &'a Polyline,
    b: &'a Polyline,
}

impl<'a> ClosestPoints<'a> {
    /// Creates a new `ClosestPoints` query.
    #[must_use]
    pub fn new(a: &'a Polyline, b: &'a Polyline) -> Self {
        Self { a, b }
    }

    /// Executes the query. Ties keep the pair found first along `a`.
    #[must_use]
    pub fn execute(&self) -> ClosestPointsResult {
        let pa = self.a.vertex_params();
        let pb = self.b.vertex_params();
        let mut best = ClosestPointsResult {
            t_a: 0.0,
            t_b: 0.0,
            point_a: self.a.start(),
            point_b: self.b.start(),
            distance: f64::INFINITY,
        };
        for (i, (a0, a1)) in self.a.segments().enumerate() {
            for (j, (b0, b1)) in self.b.segments().enumerate() {
                let (s, t, d) = segment_segment_closest(&a0, &a1, &b0, &b1);
                if d < best.distance {
                    best = ClosestPointsResult {
                        t_a: pa[i] + s * (pa[i + 1] - pa[i]),
                        t_b: pb[j] + t * (pb[j + 1] - pb[j]),
                        point_a: a0 + (a1 - a0) * s,
                        point_b: b0 + (b1 - b0) * t,
                        distance: d,
                    };
                }
            }
        }
        best
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parallel_lines() {
        let a = Polyline::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)).unwrap();
        let b = Polyline::new(vec![
            Point3::new(20.0, 3.0, 0.0),
            Point3::new(12.0, 3.0, 0.0),
            Point3::new(12.0, 10.0, 0.0),
        ])
        .unwrap();
        let r = ClosestPoints::new(&a, &b).execute();
        assert_relative_eq!(r.distance, 13.0_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(r.t_a, 10.0, epsilon = 1e-9);
        assert_relative_eq!(r.t_b, 8.0, epsilon = 1e-9);
    }

    #[test]
    fn crossing_curves_touch() {
        let a = Polyline::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)).unwrap();
        let b = Polyline::line(Point3::new(4.0, -5.0, 0.0), Point3::new(4.0, 5.0, 0.0)).unwrap();
        let r = ClosestPoints::new(&a, &b).execute();
        assert_relative_eq!(r.distance, 0.0, epsilon = 1e-12);
        assert_relative_eq!(r.point_a.x, 4.0, epsilon = 1e-12);
        assert_relative_eq!(r.t_b, 5.0, epsilon = 1e-12);
    }
}
