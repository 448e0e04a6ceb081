use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::geometry::curve::{bounding_box, Polyline};
use crate::geometry::region::Region;
use crate::math::polygon_2d::{signed_area_2d, Containment};
use crate::math::{Point3, Vector3};
use crate::tessellation::{TessellateRegion, Triangle};

use super::HeightField;

/// Tolerance multipliers tried in turn when joining loose boundary edges.
const JOIN_ESCALATION: [f64; 3] = [1.0, 10.0, 100.0];

/// A height field trimmed to a region with one outer loop and any number of
/// holes, together with a planar-patch approximation of the trimmed area.
#[derive(Debug, Clone)]
pub struct TrimmedSurface {
    height: HeightField,
    region: Region,
    patches: Vec<Triangle>,
}

impl TrimmedSurface {
    /// Trims `height` to the XY region bounded by `outer` and `holes`.
    /// Loop vertices are lifted onto the height field.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] for degenerate loops and
    /// propagates tessellation failures.
    pub fn new(height: HeightField, outer: &Polyline, holes: &[Polyline]) -> Result<Self> {
        let lift = |pts: &[Point3]| -> Vec<Point3> { pts.iter().map(|p| height.lift(p)).collect() };
        let hole_pts: Vec<Vec<Point3>> = holes.iter().map(|h| lift(h.points())).collect();
        let region = Region::new(&lift(outer.points()), &hole_pts)?;
        let patches = TessellateRegion::new(&region).execute(&height)?;
        Ok(Self {
            height,
            region,
            patches,
        })
    }

    /// Builds a trimmed surface from loose boundary edges, joining them into
    /// closed loops. The join tolerance escalates to 10 and then 100 times
    /// `tolerance` while open chains remain. The loop enclosing the largest
    /// area becomes the outer boundary.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidGeometryInput`] if the edges cannot be
    /// joined into closed loops at any tolerance.
    pub fn from_edges(height: HeightField, edges: Vec<Polyline>, tolerance: f64) -> Result<Self> {
        let mut loops = None;
        for factor in JOIN_ESCALATION {
            let tol = tolerance * factor;
            let joined = Polyline::join(edges.clone(), tol);
            if joined.iter().all(|c| (c.end() - c.start()).norm() <= tol) {
                debug!(tolerance = tol, loops = joined.len(), "joined boundary edges");
                loops = Some(joined.into_iter().map(|c| c.closed(tol)).collect::<Result<Vec<_>>>()?);
                break;
            }
        }
        let Some(mut loops) = loops else {
            return Err(GeometryError::InvalidGeometryInput(
                "boundary edges do not form closed loops".into(),
            )
            .into());
        };
        if loops.is_empty() {
            return Err(GeometryError::InvalidGeometryInput("no boundary edges".into()).into());
        }
        loops.sort_by(|a, b| signed_area_2d(b.points()).abs().total_cmp(&signed_area_2d(a.points()).abs()));
        let outer = loops.remove(0);
        Self::new(height, &outer, &loops)
    }

    /// Assembles a surface from an existing region and patches.
    pub(crate) fn from_parts(height: HeightField, region: Region, patches: Vec<Triangle>) -> Self {
        Self {
            height,
            region,
            patches,
        }
    }

    /// The untrimmed height field, used as the extended surface.
    #[must_use]
    pub fn height_field(&self) -> &HeightField {
        &self.height
    }

    /// The trimming region.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The planar patches approximating the trimmed surface.
    #[must_use]
    pub fn patches(&self) -> &[Triangle] {
        &self.patches
    }

    /// Outer boundary as a closed curve on the surface.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the loop collapses.
    pub fn boundary(&self) -> Result<Polyline> {
        self.region.outer_curve()
    }

    /// Hole boundaries as closed curves on the surface.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if a loop collapses.
    pub fn holes(&self) -> Result<Vec<Polyline>> {
        self.region.hole_curves()
    }

    /// Surface area of the patches.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.patches.iter().map(Triangle::area).sum()
    }

    /// Classifies the XY position of `p` against the trimming region.
    #[must_use]
    pub fn containment(&self, p: &Point3, tolerance: f64) -> Containment {
        self.region.containment(p, tolerance)
    }

    /// Upward unit normal of the height field below `p`.
    #[must_use]
    pub fn normal_at(&self, p: &Point3) -> Vector3 {
        self.height.normal_at(p.x, p.y)
    }

    /// Point of the surface nearest to `p` along the spray direction: the
    /// vertical projection when `p` lies over the surface, the nearest
    /// boundary point otherwise.
    #[must_use]
    pub fn closest_point(&self, p: &Point3) -> Point3 {
        if self.region.containment(p, 0.0).is_inside_or_boundary() {
            return self.height.lift(p);
        }
        let mut best = (f64::INFINITY, *p);
        for lp in self.region.loops() {
            let n = lp.len();
            for i in 0..n {
                let (q, _) = crate::math::distance::closest_on_segment(p, &lp[i], &lp[(i + 1) % n]);
                let d = (q - p).norm();
                if d < best.0 {
                    best = (d, q);
                }
            }
        }
        best.1
    }

    /// Distance from `p` to [`Self::closest_point`].
    #[must_use]
    pub fn distance_to(&self, p: &Point3) -> f64 {
        (self.closest_point(p) - p).norm()
    }

    /// Pulls a curve onto the surface along the spray direction, pushing it up
    /// where it lies below.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the projection collapses.
    pub fn pull_curve(&self, curve: &Polyline, max_segment: f64) -> Result<Polyline> {
        self.height.lift_curve(curve, max_segment)
    }

    /// Sample points covering the surface: patch vertices and centroids.
    #[must_use]
    pub fn sample_points(&self) -> Vec<Point3> {
        let mut pts = Vec::with_capacity(self.patches.len() * 4);
        for tri in &self.patches {
            pts.extend_from_slice(&tri.0);
            pts.push(tri.centroid());
        }
        pts
    }

    /// Axis-aligned bounds of the patches as `(min, max)`.
    #[must_use]
    pub fn bbox(&self) -> (Point3, Point3) {
        let pts: Vec<Point3> = self.patches.iter().flat_map(|t| t.0).collect();
        if pts.is_empty() {
            return self.region.bbox();
        }
        bounding_box(&pts)
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        Self {
            height: self.height.translated(offset),
            region: self.region.translated(offset),
            patches: self.patches.iter().map(|t| t.translated(offset)).collect(),
        }
    }
}
