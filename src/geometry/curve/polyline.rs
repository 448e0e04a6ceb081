use crate::error::{GeometryError, Result};
use crate::math::distance::closest_on_segment;
use crate::math::{flatten, Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// A piecewise-linear curve parameterized by arclength.
///
/// The domain is `[0, length]`. Consecutive duplicate vertices are removed on
/// construction, so every segment has non-zero length. A polyline is closed
/// when its last vertex repeats its first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<Point3>,
    /// Arclength at each vertex.
    lengths: Vec<f64>,
}

impl Polyline {
    /// Creates a polyline through `points`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if fewer than two distinct points
    /// remain after removing consecutive duplicates.
    pub fn new(points: Vec<Point3>) -> Result<Self> {
        let mut pts: Vec<Point3> = Vec::with_capacity(points.len());
        for p in points {
            let keep = match pts.last() {
                Some(q) => (p - q).norm() > TOLERANCE,
                None => true,
            };
            if keep {
                pts.push(p);
            }
        }
        if pts.len() < 2 {
            return Err(GeometryError::Degenerate("polyline needs two distinct points".into()).into());
        }
        let mut lengths = Vec::with_capacity(pts.len());
        let mut acc = 0.0;
        lengths.push(acc);
        for w in pts.windows(2) {
            acc += (w[1] - w[0]).norm();
            lengths.push(acc);
        }
        Ok(Self {
            points: pts,
            lengths,
        })
    }

    /// Creates a straight line from `a` to `b`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the points coincide.
    pub fn line(a: Point3, b: Point3) -> Result<Self> {
        Self::new(vec![a, b])
    }

    /// Returns a closed copy, snapping the last vertex onto the first when it
    /// lies within `tolerance`, appending the first vertex otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the loop has fewer than three
    /// distinct vertices.
    pub fn closed(&self, tolerance: f64) -> Result<Self> {
        let mut pts = self.points.clone();
        let first = pts[0];
        if let Some(last) = pts.last_mut() {
            if (*last - first).norm() <= tolerance {
                *last = first;
            } else {
                pts.push(first);
            }
        }
        if pts.len() < 4 {
            return Err(GeometryError::Degenerate("closed polyline needs three distinct vertices".into()).into());
        }
        Self::new(pts)
    }

    /// Returns the vertices.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Returns the arclength parameter of every vertex.
    #[must_use]
    pub fn vertex_params(&self) -> &[f64] {
        &self.lengths
    }

    /// Iterates over the straight segments.
    pub fn segments(&self) -> impl Iterator<Item = (Point3, Point3)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    /// Total arclength.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.lengths[self.lengths.len() - 1]
    }

    /// First vertex.
    #[must_use]
    pub fn start(&self) -> Point3 {
        self.points[0]
    }

    /// Last vertex.
    #[must_use]
    pub fn end(&self) -> Point3 {
        self.points[self.points.len() - 1]
    }

    /// Whether the last vertex repeats the first.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.points.len() > 3 && (self.end() - self.start()).norm() <= TOLERANCE
    }

    /// Segment index and fraction along it for parameter `t` (clamped).
    fn locate(&self, t: f64) -> (usize, f64) {
        let t = t.clamp(0.0, self.length());
        let idx = self.lengths.partition_point(|&l| l <= t);
        let seg = idx.saturating_sub(1).min(self.points.len() - 2);
        let seg_len = self.lengths[seg + 1] - self.lengths[seg];
        let s = ((t - self.lengths[seg]) / seg_len).clamp(0.0, 1.0);
        (seg, s)
    }

    /// Point at arclength `t`, clamped to the domain.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3 {
        let (seg, s) = self.locate(t);
        let a = self.points[seg];
        a + (self.points[seg + 1] - a) * s
    }

    /// Point at the normalized arclength `s` in `[0, 1]`.
    #[must_use]
    pub fn point_at_normalized(&self, s: f64) -> Point3 {
        self.point_at(self.length() * s)
    }

    /// Unit tangent at arclength `t`.
    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector3 {
        let (seg, _) = self.locate(t);
        (self.points[seg + 1] - self.points[seg]).normalize()
    }

    /// Closest point to `p`, returned as `(t, point, distance)`.
    #[must_use]
    pub fn closest_point(&self, p: &Point3) -> (f64, Point3, f64) {
        self.closest_impl(p, false)
    }

    /// Closest point to `p` measured in the XY plane. The returned point lies
    /// on the curve; the distance ignores Z.
    #[must_use]
    pub fn closest_point_xy(&self, p: &Point3) -> (f64, Point3, f64) {
        self.closest_impl(p, true)
    }

    fn closest_impl(&self, p: &Point3, planar: bool) -> (f64, Point3, f64) {
        let target = if planar { flatten(p) } else { *p };
        let mut best = (0.0, self.points[0], f64::INFINITY);
        for (i, w) in self.points.windows(2).enumerate() {
            let (a, b) = if planar {
                (flatten(&w[0]), flatten(&w[1]))
            } else {
                (w[0], w[1])
            };
            let (q, s) = closest_on_segment(&target, &a, &b);
            let d = (q - target).norm();
            if d < best.2 {
                let t = self.lengths[i] + s * (self.lengths[i + 1] - self.lengths[i]);
                best = (t, w[0] + (w[1] - w[0]) * s, d);
            }
        }
        best
    }

    /// Portion between `t0 < t1`, or `None` if the interval is degenerate.
    #[must_use]
    pub fn trim(&self, t0: f64, t1: f64) -> Option<Self> {
        let t0 = t0.clamp(0.0, self.length());
        let t1 = t1.clamp(0.0, self.length());
        if t1 - t0 <= TOLERANCE {
            return None;
        }
        let mut pts = vec![self.point_at(t0)];
        for (p, &l) in self.points.iter().zip(&self.lengths) {
            if l > t0 && l < t1 {
                pts.push(*p);
            }
        }
        pts.push(self.point_at(t1));
        Self::new(pts).ok()
    }

    /// Portion from `t0` to `t1` following the curve direction, wrapping past
    /// the seam of a closed curve when `t0 > t1`.
    #[must_use]
    pub fn sub_curve(&self, t0: f64, t1: f64) -> Option<Self> {
        if t0 < t1 || !self.is_closed() {
            return self.trim(t0.min(t1), t0.max(t1));
        }
        match (self.trim(t0, self.length()), self.trim(0.0, t1)) {
            (Some(a), Some(b)) => a.try_append(&b, TOLERANCE),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }

    /// Copy traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let total = self.length();
        Self {
            points: self.points.iter().rev().copied().collect(),
            lengths: self.lengths.iter().rev().map(|l| total - l).collect(),
        }
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        Self {
            points: self.points.iter().map(|p| p + offset).collect(),
            lengths: self.lengths.clone(),
        }
    }

    /// Copy with every vertex mapped through `f`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the mapped vertices collapse.
    pub fn map_points(&self, f: impl Fn(&Point3) -> Point3) -> Result<Self> {
        Self::new(self.points.iter().map(f).collect())
    }

    /// Appends `other` if one of its ends meets one of ours within
    /// `tolerance`, reversing `other` as needed. The result keeps our
    /// direction.
    #[must_use]
    pub fn try_append(&self, other: &Self, tolerance: f64) -> Option<Self> {
        let close = |a: Point3, b: Point3| (a - b).norm() <= tolerance;
        let concat = |head: &Self, tail: &Self| {
            let mut pts = head.points.clone();
            pts.extend_from_slice(&tail.points[1..]);
            Self::new(pts).ok()
        };
        if close(self.end(), other.start()) {
            concat(self, other)
        } else if close(self.end(), other.end()) {
            concat(self, &other.reversed())
        } else if close(self.start(), other.end()) {
            concat(other, self)
        } else if close(self.start(), other.start()) {
            concat(&other.reversed(), self)
        } else {
            None
        }
    }

    /// Joins curves whose ends meet within `tolerance` into maximal chains.
    #[must_use]
    pub fn join(curves: Vec<Self>, tolerance: f64) -> Vec<Self> {
        let mut pool: Vec<Option<Self>> = curves.into_iter().map(Some).collect();
        let mut joined = Vec::new();
        for i in 0..pool.len() {
            let Some(mut chain) = pool[i].take() else {
                continue;
            };
            let mut grew = true;
            while grew && !chain.is_closed() {
                grew = false;
                for slot in &mut pool {
                    let Some(candidate) = slot.as_ref() else {
                        continue;
                    };
                    if let Some(merged) = chain.try_append(candidate, tolerance) {
                        chain = merged;
                        *slot = None;
                        grew = true;
                        break;
                    }
                }
            }
            joined.push(chain);
        }
        joined
    }

    /// Parameters spaced `step` apart from the start, the start included.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn divide_by_length(&self, step: f64) -> Vec<f64> {
        if step <= TOLERANCE {
            return vec![0.0];
        }
        let total = self.length();
        let count = (total / step + 1e-9).floor() as usize;
        (0..=count).map(|k| (k as f64 * step).min(total)).collect()
    }

    /// Parameters splitting the curve into `segments` equal-length pieces,
    /// both ends included.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn divide_by_count(&self, segments: usize) -> Vec<f64> {
        let n = segments.max(1);
        let total = self.length();
        (0..=n).map(|i| total * i as f64 / n as f64).collect()
    }

    /// Open curve extended linearly by `distance` at both ends. Closed
    /// curves are returned unchanged.
    #[must_use]
    pub fn extended(&self, distance: f64) -> Self {
        if self.is_closed() || distance <= 0.0 {
            return self.clone();
        }
        let mut pts = self.points.clone();
        let head = self.start() - self.tangent_at(0.0) * distance;
        let tail = self.end() + self.tangent_at(self.length()) * distance;
        pts[0] = head;
        let last = pts.len() - 1;
        pts[last] = tail;
        Self::new(pts).unwrap_or_else(|_| self.clone())
    }

    /// Closed curve restarted at parameter `t`. Open curves are returned
    /// unchanged.
    #[must_use]
    pub fn with_seam_at(&self, t: f64) -> Self {
        if !self.is_closed() || t <= TOLERANCE || t >= self.length() - TOLERANCE {
            return self.clone();
        }
        let seam = self.point_at(t);
        let n = self.points.len();
        let mut pts = vec![seam];
        pts.extend((1..n).filter(|&i| self.lengths[i] > t).map(|i| self.points[i]));
        pts.extend((1..n - 1).filter(|&i| self.lengths[i] < t).map(|i| self.points[i]));
        pts.push(seam);
        Self::new(pts).unwrap_or_else(|_| self.clone())
    }

    /// Copy with extra vertices so no segment exceeds `max_segment`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn densified(&self, max_segment: f64) -> Self {
        if max_segment <= TOLERANCE {
            return self.clone();
        }
        let mut pts = vec![self.start()];
        for (a, b) in self.segments() {
            let pieces = ((b - a).norm() / max_segment).ceil().max(1.0) as usize;
            for k in 1..=pieces {
                pts.push(a + (b - a) * (k as f64 / pieces as f64));
            }
        }
        Self::new(pts).unwrap_or_else(|_| self.clone())
    }

    /// Axis-aligned bounding box as `(min, max)`.
    #[must_use]
    pub fn bbox(&self) -> (Point3, Point3) {
        bounding_box(&self.points)
    }
}

/// Axis-aligned bounding box of a point set as `(min, max)`.
#[must_use]
pub fn bounding_box(points: &[Point3]) -> (Point3, Point3) {
    let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    (min, max)
}

impl Curve for Polyline {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.point_at(t))
    }

    fn tangent(&self, t: f64) -> Result<Vector3> {
        Ok(self.tangent_at(t))
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, self.length())
    }

    fn is_closed(&self) -> bool {
        Polyline::is_closed(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn square(size: f64) -> Polyline {
        Polyline::new(vec![
            p(0.0, 0.0, 0.0),
            p(size, 0.0, 0.0),
            p(size, size, 0.0),
            p(0.0, size, 0.0),
            p(0.0, 0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn new_removes_duplicates() {
        let pl = Polyline::new(vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.0), p(3.0, 4.0, 0.0)]).unwrap();
        assert_eq!(pl.points().len(), 2);
        assert_relative_eq!(pl.length(), 5.0);
    }

    #[test]
    fn new_rejects_single_point() {
        assert!(Polyline::new(vec![p(1.0, 1.0, 1.0), p(1.0, 1.0, 1.0)]).is_err());
    }

    #[test]
    fn point_and_tangent_at() {
        let sq = square(10.0);
        assert!(sq.is_closed());
        assert_relative_eq!(sq.length(), 40.0);
        let q = sq.point_at(15.0);
        assert_relative_eq!(q.x, 10.0);
        assert_relative_eq!(q.y, 5.0);
        let t = sq.tangent_at(15.0);
        assert_relative_eq!(t.y, 1.0);
    }

    #[test]
    fn closest_point_on_square() {
        let sq = square(10.0);
        let (t, q, d) = sq.closest_point(&p(5.0, -3.0, 0.0));
        assert_relative_eq!(t, 5.0);
        assert_relative_eq!(q.x, 5.0);
        assert_relative_eq!(d, 3.0);
    }

    #[test]
    fn closest_point_xy_ignores_height() {
        let line = Polyline::line(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)).unwrap();
        let (_, _, d) = line.closest_point_xy(&p(4.0, 2.0, 50.0));
        assert_relative_eq!(d, 2.0);
    }

    #[test]
    fn trim_keeps_interior_vertices() {
        let sq = square(10.0);
        let piece = sq.trim(5.0, 25.0).unwrap();
        assert_relative_eq!(piece.length(), 20.0);
        assert_eq!(piece.points().len(), 4);
        assert!(sq.trim(3.0, 3.0).is_none());
    }

    #[test]
    fn sub_curve_wraps_seam() {
        let sq = square(10.0);
        let piece = sq.sub_curve(35.0, 5.0).unwrap();
        assert_relative_eq!(piece.length(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(piece.start().y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(piece.end().x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn reversed_swaps_ends() {
        let line = Polyline::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 2.0, 0.0)]).unwrap();
        let rev = line.reversed();
        assert_eq!(rev.start(), line.end());
        assert_relative_eq!(rev.length(), line.length());
        assert_relative_eq!(rev.point_at(1.0).y, 1.0);
    }

    #[test]
    fn join_chains_in_any_direction() {
        let a = Polyline::line(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)).unwrap();
        let b = Polyline::line(p(2.0, 0.0, 0.0), p(1.0, 0.0, 0.0)).unwrap();
        let c = Polyline::line(p(5.0, 0.0, 0.0), p(6.0, 0.0, 0.0)).unwrap();
        let joined = Polyline::join(vec![a, b, c], 1e-9);
        assert_eq!(joined.len(), 2);
        assert_relative_eq!(joined[0].length(), 2.0);
        assert_relative_eq!(joined[0].end().x, 2.0);
    }

    #[test]
    fn divide_by_length_and_count() {
        let line = Polyline::line(p(0.0, 0.0, 0.0), p(250.0, 0.0, 0.0)).unwrap();
        assert_eq!(line.divide_by_length(100.0), vec![0.0, 100.0, 200.0]);
        assert_eq!(line.divide_by_count(5).len(), 6);
    }

    #[test]
    fn extended_grows_both_ends() {
        let line = Polyline::line(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)).unwrap();
        let ext = line.extended(5.0);
        assert_relative_eq!(ext.start().x, -5.0);
        assert_relative_eq!(ext.end().x, 15.0);
    }

    #[test]
    fn seam_moves_start() {
        let sq = square(10.0);
        let moved = sq.with_seam_at(15.0);
        assert!(moved.is_closed());
        assert_relative_eq!(moved.length(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(moved.start().x, 10.0);
        assert_relative_eq!(moved.start().y, 5.0);
    }

    #[test]
    fn densified_limits_segment_length() {
        let line = Polyline::line(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)).unwrap();
        let dense = line.densified(3.0);
        assert_eq!(dense.points().len(), 5);
        assert!(dense.segments().all(|(a, b)| (b - a).norm() <= 3.0 + 1e-12));
    }

    #[test]
    fn sample_through_curve_trait() {
        let line = Polyline::line(p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0)).unwrap();
        let pts = line.sample(4).unwrap();
        assert_eq!(pts.len(), 5);
        assert_relative_eq!(pts[3].x, 3.0);
    }
}
