use crate::error::{GeometryError, Result};
use crate::geometry::curve::Polyline;
use crate::math::distance::point_segment_distance_2d;
use crate::math::intersect_2d::segment_loop_crossings;
use crate::math::polygon_2d::{classify_point, open_loop, oriented, signed_area_2d, Containment};
use crate::math::{Point3, Vector3, TOLERANCE};

/// A planar region of the XY plane bounded by closed loops.
///
/// The first loop is the outer boundary (stored counter-clockwise), the
/// remaining loops are holes (stored clockwise). Loop vertices keep their Z
/// so boundaries can be handed back as 3D curves; containment ignores Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    loops: Vec<Vec<Point3>>,
}

impl Region {
    /// Creates a region from an outer loop and hole loops, given as vertex
    /// lists with or without a repeated closing vertex.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if a loop has fewer than three
    /// vertices or encloses no area.
    pub fn new(outer: &[Point3], holes: &[Vec<Point3>]) -> Result<Self> {
        let mut loops = Vec::with_capacity(holes.len() + 1);
        loops.push(oriented(checked_loop(outer)?, true));
        for hole in holes {
            loops.push(oriented(checked_loop(hole)?, false));
        }
        Ok(Self { loops })
    }

    /// Creates a region bounded by closed curves.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if a loop is degenerate.
    pub fn from_curves(outer: &Polyline, holes: &[Polyline]) -> Result<Self> {
        let hole_points: Vec<Vec<Point3>> = holes.iter().map(|h| h.points().to_vec()).collect();
        Self::new(outer.points(), &hole_points)
    }

    /// Outer loop vertices (counter-clockwise, not repeated).
    #[must_use]
    pub fn outer(&self) -> &[Point3] {
        &self.loops[0]
    }

    /// Hole loops (clockwise, not repeated).
    #[must_use]
    pub fn holes(&self) -> &[Vec<Point3>] {
        &self.loops[1..]
    }

    /// All loops, outer first.
    #[must_use]
    pub fn loops(&self) -> &[Vec<Point3>] {
        &self.loops
    }

    /// Outer loop as a closed curve.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the loop collapses.
    pub fn outer_curve(&self) -> Result<Polyline> {
        loop_curve(&self.loops[0])
    }

    /// Hole loops as closed curves.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if a loop collapses.
    pub fn hole_curves(&self) -> Result<Vec<Polyline>> {
        self.loops[1..].iter().map(|lp| loop_curve(lp)).collect()
    }

    /// Classifies `p` by its XY position.
    #[must_use]
    pub fn containment(&self, p: &Point3, tolerance: f64) -> Containment {
        classify_point(p, &self.loops, tolerance)
    }

    /// XY distance from `p` to the nearest boundary loop.
    #[must_use]
    pub fn distance_to_boundary(&self, p: &Point3) -> f64 {
        self.loops
            .iter()
            .flat_map(|lp| {
                let n = lp.len();
                (0..n).map(move |i| point_segment_distance_2d(p, &lp[i], &lp[(i + 1) % n]))
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Parameters along `curve` where it crosses a boundary loop in XY,
    /// sorted and deduplicated.
    #[must_use]
    pub fn crossings(&self, curve: &Polyline) -> Vec<f64> {
        let params = curve.vertex_params();
        let mut hits = Vec::new();
        for (i, (a, b)) in curve.segments().enumerate() {
            let seg_len = params[i + 1] - params[i];
            for lp in &self.loops {
                for s in segment_loop_crossings(&a, &b, lp) {
                    hits.push(params[i] + s * seg_len);
                }
            }
        }
        hits.sort_by(f64::total_cmp);
        hits.dedup_by(|a, b| (*a - *b).abs() < TOLERANCE);
        hits
    }

    /// Enclosed XY area: outer area minus hole areas.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.loops.iter().map(|lp| signed_area_2d(lp)).sum()
    }

    /// Axis-aligned bounds of the outer loop as `(min, max)`.
    #[must_use]
    pub fn bbox(&self) -> (Point3, Point3) {
        crate::geometry::curve::bounding_box(&self.loops[0])
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        Self {
            loops: self
                .loops
                .iter()
                .map(|lp| lp.iter().map(|p| p + offset).collect())
                .collect(),
        }
    }
}

fn checked_loop(points: &[Point3]) -> Result<Vec<Point3>> {
    let pts = open_loop(points, TOLERANCE);
    if pts.len() < 3 {
        return Err(GeometryError::Degenerate("region loop needs three vertices".into()).into());
    }
    if signed_area_2d(&pts).abs() < TOLERANCE {
        return Err(GeometryError::Degenerate("region loop encloses no area".into()).into());
    }
    Ok(pts)
}

fn loop_curve(points: &[Point3]) -> Result<Polyline> {
    let mut pts = points.to_vec();
    pts.push(points[0]);
    Polyline::new(pts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn framed() -> Region {
        let outer = vec![p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)];
        let hole = vec![p(4.0, 4.0), p(6.0, 4.0), p(6.0, 6.0), p(4.0, 6.0)];
        Region::new(&outer, &[hole]).unwrap()
    }

    #[test]
    fn loops_are_reoriented() {
        let region = framed();
        assert!(signed_area_2d(region.outer()) > 0.0);
        assert!(signed_area_2d(&region.holes()[0]) < 0.0);
        assert_relative_eq!(region.area(), 96.0);
    }

    #[test]
    fn containment_respects_hole() {
        let region = framed();
        assert_eq!(region.containment(&p(1.0, 1.0), 1e-9), Containment::Inside);
        assert_eq!(region.containment(&p(5.0, 5.0), 1e-9), Containment::Outside);
        assert_eq!(region.containment(&p(4.0, 5.0), 1e-9), Containment::Boundary);
    }

    #[test]
    fn crossings_through_hole() {
        let region = framed();
        let line = Polyline::line(p(-5.0, 5.0), p(15.0, 5.0)).unwrap();
        let hits = region.crossings(&line);
        assert_eq!(hits.len(), 4);
        assert_relative_eq!(hits[0], 5.0);
        assert_relative_eq!(hits[1], 9.0);
        assert_relative_eq!(hits[2], 11.0);
        assert_relative_eq!(hits[3], 15.0);
    }

    #[test]
    fn distance_to_boundary_uses_holes() {
        let region = framed();
        assert_relative_eq!(region.distance_to_boundary(&p(3.0, 5.0)), 1.0);
    }

    #[test]
    fn rejects_flat_loop() {
        let line = vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)];
        assert!(Region::new(&line, &[]).is_err());
    }
}
