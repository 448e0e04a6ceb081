use super::distance::point_segment_distance_2d;
use super::{Point3, Vector3, TOLERANCE};

/// Position of a point relative to a closed planar region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Outside,
    /// Within tolerance of a boundary loop.
    Boundary,
}

impl Containment {
    /// Inside or on the boundary.
    #[must_use]
    pub fn is_inside_or_boundary(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// Computes the signed area of a polygon in the XY plane (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point3]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Area of a planar 3D polygon using Newell's method.
#[must_use]
pub fn polygon_area_3d(points: &[Point3]) -> f64 {
    newell_normal(points).norm() * 0.5
}

/// Unnormalized Newell normal of a polygon; its length is twice the area.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Vertex average of a polygon.
#[must_use]
pub fn centroid(points: &[Point3]) -> Point3 {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    Point3::from(sum / n)
}

/// Winding number of `point` with respect to a closed loop in the XY plane.
///
/// Counter-clockwise loops contribute `+1` for interior points, clockwise
/// loops `-1`.
#[must_use]
pub fn winding_number_2d(point: &Point3, verts: &[Point3]) -> i32 {
    let n = verts.len();
    let (px, py) = (point.x, point.y);
    let mut winding = 0i32;
    for i in 0..n {
        let (x0, y0) = (verts[i].x, verts[i].y);
        let (x1, y1) = (verts[(i + 1) % n].x, verts[(i + 1) % n].y);

        if y0 <= py {
            if y1 > py && cross_2d(x1 - x0, y1 - y0, px - x0, py - y0) > 0.0 {
                winding += 1;
            }
        } else if y1 <= py && cross_2d(x1 - x0, y1 - y0, px - x0, py - y0) < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Classifies a point against a set of consistently oriented loops
/// (outer counter-clockwise, holes clockwise).
#[must_use]
pub fn classify_point(point: &Point3, loops: &[Vec<Point3>], tolerance: f64) -> Containment {
    let on_boundary = loops.iter().any(|lp| {
        let n = lp.len();
        (0..n).any(|i| point_segment_distance_2d(point, &lp[i], &lp[(i + 1) % n]) <= tolerance)
    });
    if on_boundary {
        return Containment::Boundary;
    }
    let winding: i32 = loops.iter().map(|lp| winding_number_2d(point, lp)).sum();
    if winding == 0 {
        Containment::Outside
    } else {
        Containment::Inside
    }
}

/// Removes a trailing vertex that repeats the first one.
#[must_use]
pub fn open_loop(points: &[Point3], tolerance: f64) -> Vec<Point3> {
    let mut pts = points.to_vec();
    while pts.len() > 1 {
        let (first, last) = (pts[0], pts[pts.len() - 1]);
        if (first - last).norm() <= tolerance {
            pts.pop();
        } else {
            break;
        }
    }
    pts
}

/// Returns the loop oriented counter-clockwise (`ccw == true`) or clockwise.
#[must_use]
pub fn oriented(points: Vec<Point3>, ccw: bool) -> Vec<Point3> {
    let area = signed_area_2d(&points);
    if (area > 0.0) == ccw || area.abs() < TOLERANCE {
        points
    } else {
        points.into_iter().rev().collect()
    }
}

/// 2D cross product: `(ax * by - ay * bx)`.
#[inline]
fn cross_2d(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ]
    }

    #[test]
    fn signed_area_ccw_square() {
        let area = signed_area_2d(&square(1.0));
        assert!((area - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let pts: Vec<_> = square(1.0).into_iter().rev().collect();
        assert!((signed_area_2d(&pts) + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_degenerate() {
        assert!((signed_area_2d(&[Point3::new(0.0, 0.0, 0.0)])).abs() < TOLERANCE);
        assert!((signed_area_2d(&[])).abs() < TOLERANCE);
    }

    #[test]
    fn newell_area_of_tilted_square() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        assert!((polygon_area_3d(&pts) - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn classify_with_hole() {
        let outer = square(10.0);
        let hole = oriented(
            vec![
                Point3::new(4.0, 4.0, 0.0),
                Point3::new(6.0, 4.0, 0.0),
                Point3::new(6.0, 6.0, 0.0),
                Point3::new(4.0, 6.0, 0.0),
            ],
            false,
        );
        let loops = vec![outer, hole];
        let tol = 1e-9;
        assert_eq!(classify_point(&Point3::new(1.0, 1.0, 5.0), &loops, tol), Containment::Inside);
        assert_eq!(classify_point(&Point3::new(5.0, 5.0, 0.0), &loops, tol), Containment::Outside);
        assert_eq!(classify_point(&Point3::new(10.0, 3.0, 0.0), &loops, tol), Containment::Boundary);
        assert_eq!(classify_point(&Point3::new(12.0, 3.0, 0.0), &loops, tol), Containment::Outside);
    }

    #[test]
    fn open_loop_drops_closing_vertex() {
        let mut pts = square(1.0);
        pts.push(pts[0]);
        assert_eq!(open_loop(&pts, 1e-9).len(), 4);
    }

    #[test]
    fn centroid_of_square() {
        let c = centroid(&square(2.0));
        assert!((c.x - 1.0).abs() < TOLERANCE);
        assert!((c.y - 1.0).abs() < TOLERANCE);
    }
}
