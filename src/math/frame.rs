use std::f64::consts::FRAC_PI_4;

use super::{Point3, Vector3};

/// Planar rectangle aligned with a direction in the XY plane.
///
/// `along` is the unit direction at `angle`, `across` its left normal. The
/// ranges are coordinates of the rectangle along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub along: Vector3,
    pub across: Vector3,
    pub along_range: (f64, f64),
    pub across_range: (f64, f64),
}

impl Rectangle {
    /// Axis-aligned bounds of `points` in the frame rotated by `angle` about Z.
    #[must_use]
    pub fn bounding(points: &[Point3], angle: f64) -> Self {
        let along = Vector3::new(angle.cos(), angle.sin(), 0.0);
        let across = Vector3::new(-angle.sin(), angle.cos(), 0.0);
        let mut along_range = (f64::INFINITY, f64::NEG_INFINITY);
        let mut across_range = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            let a = p.x * along.x + p.y * along.y;
            let c = p.x * across.x + p.y * across.y;
            along_range = (along_range.0.min(a), along_range.1.max(a));
            across_range = (across_range.0.min(c), across_range.1.max(c));
        }
        Self {
            along,
            across,
            along_range,
            across_range,
        }
    }

    /// Enlarged rectangle found by alternately re-boxing the corners in the
    /// frame at `angle` and in the frame turned 45 degrees, `boxes` times in
    /// total. The last box is always in the frame at `angle`.
    #[must_use]
    pub fn nested(points: &[Point3], angle: f64, boxes: usize) -> Self {
        let mut rect = Self::bounding(points, angle);
        let mut rotated = false;
        for _ in 1..boxes {
            rotated = !rotated;
            let next_angle = if rotated { angle + FRAC_PI_4 } else { angle };
            rect = Self::bounding(&rect.corners(), next_angle);
        }
        if rotated {
            rect = Self::bounding(&rect.corners(), angle);
        }
        rect
    }

    /// World point at frame coordinates `(a, c)`, on the XY plane.
    #[must_use]
    pub fn point(&self, a: f64, c: f64) -> Point3 {
        Point3::from(self.along * a + self.across * c)
    }

    /// Corners in counter-clockwise order starting at the minimum corner.
    #[must_use]
    pub fn corners(&self) -> [Point3; 4] {
        let (a0, a1) = self.along_range;
        let (c0, c1) = self.across_range;
        [
            self.point(a0, c0),
            self.point(a1, c0),
            self.point(a1, c1),
            self.point(a0, c1),
        ]
    }

    /// The two sides running along `along`, at the minimum and maximum
    /// `across` coordinate, both directed the same way.
    #[must_use]
    pub fn rails(&self) -> [(Point3, Point3); 2] {
        let (a0, a1) = self.along_range;
        let (c0, c1) = self.across_range;
        [
            (self.point(a0, c0), self.point(a1, c0)),
            (self.point(a0, c1), self.point(a1, c1)),
        ]
    }

    /// Length of the diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        let a = self.along_range.1 - self.along_range.0;
        let c = self.across_range.1 - self.across_range.0;
        a.hypot(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square(size: f64) -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ]
    }

    #[test]
    fn bounding_axis_aligned() {
        let rect = Rectangle::bounding(&unit_square(10.0), 0.0);
        assert!((rect.along_range.0).abs() < 1e-12);
        assert!((rect.along_range.1 - 10.0).abs() < 1e-12);
        assert!((rect.across_range.1 - 10.0).abs() < 1e-12);
    }

    #[test]
    fn five_nested_boxes_quadruple_square() {
        let rect = Rectangle::nested(&unit_square(1000.0), 0.0, 5);
        assert!((rect.along_range.0 + 1500.0).abs() < 1e-6);
        assert!((rect.along_range.1 - 2500.0).abs() < 1e-6);
        assert!((rect.across_range.0 + 1500.0).abs() < 1e-6);
        assert!((rect.across_range.1 - 2500.0).abs() < 1e-6);
    }

    #[test]
    fn rails_are_parallel_to_direction() {
        let rect = Rectangle::nested(&unit_square(10.0), std::f64::consts::FRAC_PI_2, 1);
        for (s, e) in rect.rails() {
            assert!((s.x - e.x).abs() < 1e-9);
            assert!(e.y > s.y);
        }
    }
}
