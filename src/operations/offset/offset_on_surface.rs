use crate::error::{OperationError, Result};
use crate::geometry::curve::Polyline;
use crate::geometry::surface::HeightField;
use crate::math::intersect_2d::{line_line_intersect_2d, segment_segment_intersect_2d};
use crate::math::polygon_2d::{open_loop, signed_area_2d};
use crate::math::{Point3, Vector3, TOLERANCE};

/// Maximum miter distance as a multiple of `|distance|`. When the miter
/// extends further than this, a bevel (two points) is used instead.
const MITER_LIMIT: f64 = 4.0;

/// Offsets a closed curve sideways on a height field.
///
/// The loop is offset in the XY plane with mitred corners, self-intersection
/// loops are trimmed away, and the result is lifted back onto the surface and
/// force-closed.
///
/// # Sign Convention
///
/// - Positive distance: left offset (relative to walking direction)
/// - Negative distance: right offset
#[derive(Debug)]
pub struct OffsetOnSurface<'a> {
    curve: &'a Polyline,
    surface: &'a HeightField,
    distance: f64,
    tolerance: f64,
}

impl<'a> OffsetOnSurface<'a> {
    /// Creates a new `OffsetOnSurface` operation.
    #[must_use]
    pub fn new(curve: &'a Polyline, surface: &'a HeightField, distance: f64) -> Self {
        Self {
            curve,
            surface,
            distance,
            tolerance: 1e-6,
        }
    }

    /// Sets the tolerance used to close the result.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the offset.
    ///
    /// # Errors
    ///
    /// - `OperationError::InvalidInput` if the curve is open or has fewer than
    ///   three distinct vertices
    /// - `OperationError::Failed` if the offset collapses
    pub fn execute(&self) -> Result<Polyline> {
        if !self.curve.is_closed() {
            return Err(OperationError::InvalidInput("offset on surface needs a closed curve".into()).into());
        }
        if self.distance.abs() < TOLERANCE {
            return Ok(self.curve.clone());
        }
        let points = open_loop(self.curve.points(), TOLERANCE);
        if points.len() < 3 {
            return Err(OperationError::InvalidInput("closed curve needs three vertices".into()).into());
        }

        let raw = build_closed_offset(&points, self.distance)?;
        let winding_sign = signed_area_2d(&points).signum();
        let trimmed = trim_closed_loops(&raw, winding_sign);
        if trimmed.len() < 3 {
            return Err(OperationError::Failed("offset collapsed to fewer than 3 points".to_owned()).into());
        }

        let (min, max) = self.curve.bbox();
        let max_segment = (max - min).norm() / 64.0;
        let mut lifted = Polyline::new(trimmed)?;
        lifted = self.surface.lift_curve(&lifted.closed(self.tolerance)?, max_segment)?;
        lifted.closed(self.tolerance)
    }
}

/// Offsets each edge of a closed loop and joins consecutive offset lines at
/// their mitre point.
fn build_closed_offset(points: &[Point3], distance: f64) -> Result<Vec<Point3>> {
    let n = points.len();
    let mut offset_segments: Vec<(Point3, Point3)> = Vec::with_capacity(n);
    let mut directions: Vec<Vector3> = Vec::with_capacity(n);

    for i in 0..n {
        let j = (i + 1) % n;
        let dir = segment_direction(&points[i], &points[j])?;
        let offset = left_normal(dir) * distance;
        offset_segments.push((
            Point3::new(points[i].x + offset.x, points[i].y + offset.y, points[i].z),
            Point3::new(points[j].x + offset.x, points[j].y + offset.y, points[j].z),
        ));
        directions.push(dir);
    }

    let mut raw = Vec::with_capacity(n * 2);
    for i in 0..n {
        let prev = if i == 0 { n - 1 } else { i - 1 };
        push_corner(&mut raw, &offset_segments[prev], &offset_segments[i], &directions[prev], &points[i], distance);
    }
    Ok(raw)
}

/// Pushes the mitre point between two offset segments, or a bevel when the
/// mitre runs past [`MITER_LIMIT`].
fn push_corner(
    raw: &mut Vec<Point3>,
    seg_prev: &(Point3, Point3),
    seg_next: &(Point3, Point3),
    dir_prev: &Vector3,
    original_corner: &Point3,
    distance: f64,
) {
    let d_prev = seg_prev.1 - seg_prev.0;
    let d_next = seg_next.1 - seg_next.0;
    let corner = match line_line_intersect_2d(&seg_prev.1, &d_prev, &seg_next.0, &d_next) {
        Some((t, _)) => Point3::new(
            seg_prev.1.x + d_prev.x * t,
            seg_prev.1.y + d_prev.y * t,
            original_corner.z,
        ),
        None => {
            let normal = left_normal(*dir_prev);
            Point3::new(
                original_corner.x + normal.x * distance,
                original_corner.y + normal.y * distance,
                original_corner.z,
            )
        }
    };
    let limit = MITER_LIMIT * distance.abs();
    let dx = corner.x - original_corner.x;
    let dy = corner.y - original_corner.y;
    if dx * dx + dy * dy > limit * limit {
        raw.push(seg_prev.1);
        raw.push(seg_next.0);
    } else {
        raw.push(corner);
    }
}

fn segment_direction(a: &Point3, b: &Point3) -> Result<Vector3> {
    let d = b - a;
    let len = (d.x * d.x + d.y * d.y).sqrt();
    if len < TOLERANCE {
        return Err(OperationError::InvalidInput(format!(
            "zero-length segment between ({}, {}) and ({}, {})",
            a.x, a.y, b.x, b.y
        ))
        .into());
    }
    Ok(Vector3::new(d.x / len, d.y / len, 0.0))
}

fn left_normal(dir: Vector3) -> Vector3 {
    Vector3::new(-dir.y, dir.x, 0.0)
}

/// Finds the first crossing between non-adjacent edges of a closed polygon,
/// ignoring endpoint-to-endpoint touches.
fn find_first_self_intersection(points: &[Point3]) -> Option<(usize, usize, Point3)> {
    let n = points.len();
    if n < 4 {
        return None;
    }
    let eps = TOLERANCE * 100.0;
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if let Some((pt, t, u)) =
                segment_segment_intersect_2d(&points[i], &points[(i + 1) % n], &points[j], &points[(j + 1) % n])
            {
                let t_at_end = t < eps || t > 1.0 - eps;
                let u_at_end = u < eps || u > 1.0 - eps;
                if t_at_end && u_at_end {
                    continue;
                }
                return Some((i, j, pt));
            }
        }
    }
    None
}

/// Splits a closed polygon at the crossing of edges `i < j` into two loops.
fn split_at_intersection(points: &[Point3], seg_i: usize, seg_j: usize, intersection: Point3) -> (Vec<Point3>, Vec<Point3>) {
    let n = points.len();
    let mut a = vec![intersection];
    a.extend_from_slice(&points[(seg_i + 1)..=seg_j]);

    let mut b = vec![intersection];
    let mut idx = (seg_j + 1) % n;
    loop {
        b.push(points[idx]);
        if idx == seg_i {
            break;
        }
        idx = (idx + 1) % n;
    }
    (a, b)
}

/// Removes consecutive duplicates and collinear vertices from a closed polygon.
fn clean_polygon(points: &[Point3]) -> Vec<Point3> {
    let deduped = open_loop(
        &points.iter().fold(Vec::with_capacity(points.len()), |mut acc: Vec<Point3>, &pt| {
            let dup = acc
                .last()
                .is_some_and(|last| (pt.x - last.x).powi(2) + (pt.y - last.y).powi(2) < TOLERANCE * TOLERANCE);
            if !dup {
                acc.push(pt);
            }
            acc
        }),
        TOLERANCE,
    );
    if deduped.len() < 3 {
        return deduped;
    }
    let n = deduped.len();
    let cleaned: Vec<Point3> = (0..n)
        .filter(|&i| {
            let prev = deduped[(i + n - 1) % n];
            let next = deduped[(i + 1) % n];
            let cur = deduped[i];
            let cross = (cur.x - prev.x) * (next.y - cur.y) - (cur.y - prev.y) * (next.x - cur.x);
            cross.abs() >= TOLERANCE
        })
        .map(|i| deduped[i])
        .collect();
    if cleaned.len() < 3 {
        deduped
    } else {
        cleaned
    }
}

/// Recursively removes self-intersection loops, keeping at every split the
/// loop whose winding matches the original polygon.
fn trim_closed_loops(points: &[Point3], winding_sign: f64) -> Vec<Point3> {
    let pts = clean_polygon(points);
    if pts.len() < 4 {
        return pts;
    }
    match find_first_self_intersection(&pts) {
        None => pts,
        Some((i, j, pt)) => {
            let (a, b) = split_at_intersection(&pts, i, j, pt);
            let trimmed_a = trim_closed_loops(&a, winding_sign);
            let trimmed_b = trim_closed_loops(&b, winding_sign);
            let area_a = signed_area_2d(&trimmed_a);
            let area_b = signed_area_2d(&trimmed_b);
            match (area_a * winding_sign > 0.0, area_b * winding_sign > 0.0) {
                (true, false) => trimmed_a,
                (false, true) => trimmed_b,
                _ => {
                    if area_a.abs() >= area_b.abs() {
                        trimmed_a
                    } else {
                        trimmed_b
                    }
                }
            }
        }
    }
}
