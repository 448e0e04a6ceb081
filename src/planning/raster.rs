use std::f64::consts::TAU;

use tracing::{debug, info, warn};

use crate::config::{PlannerConfig, Tolerance};
use crate::error::Result;
use crate::geometry::curve::Polyline;
use crate::geometry::surface::{HeightField, TrimmedSurface};
use crate::math::Point3;
use crate::operations::query::{ClosestPoints, CurveSurfaceDistance};
use crate::path::{SpeedRange, SprayCurve, SprayPath};

use super::boundary_offset::OffsetBoundary;
use super::connect::{ConnectThroughBoundary, Fragment};
use super::geodesic_field::Geodesics;
use super::isolines::OrthoGeodesics;
use super::speed::{AssignSpeeds, SpeedRegion};
use super::trim::{TrimCurve, TrimRegion};

/// A maximal straight run of a polygonal boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryEdge {
    /// Position of the edge along the boundary.
    pub index: usize,
    pub curve: Polyline,
    /// Direction of the edge in the XY plane, in `[0, 2π)`.
    pub angle: f64,
}

/// Splits a closed boundary into maximal edges whose consecutive segments
/// keep the same XY direction within the angle tolerance.
#[must_use]
pub fn boundary_edges(boundary: &Polyline, tolerance: &Tolerance) -> Vec<BoundaryEdge> {
    let points = boundary.points();
    let heading = |a: &Point3, b: &Point3| (b.y - a.y).atan2(b.x - a.x).rem_euclid(TAU);
    let same_heading = |h0: f64, h1: f64| {
        let d = (h1 - h0).rem_euclid(TAU);
        d.min(TAU - d) <= tolerance.angle
    };

    let mut runs: Vec<Vec<Point3>> = Vec::new();
    let mut current_heading = None;
    for w in points.windows(2) {
        let h = heading(&w[0], &w[1]);
        match (runs.last_mut(), current_heading) {
            (Some(run), Some(prev)) if same_heading(prev, h) => run.push(w[1]),
            _ => runs.push(vec![w[0], w[1]]),
        }
        current_heading = Some(h);
    }
    // The boundary may start halfway along a straight run.
    if runs.len() > 1 && boundary.is_closed() {
        let first_heading = heading(&runs[0][0], &runs[0][1]);
        if current_heading.is_some_and(|h| same_heading(h, first_heading)) {
            let first = runs.remove(0);
            if let Some(last) = runs.last_mut() {
                last.extend_from_slice(&first[1..]);
            }
        }
    }

    runs.into_iter()
        .filter_map(|run| Polyline::new(run).ok())
        .enumerate()
        .map(|(index, curve)| {
            let angle = heading(&curve.start(), &curve.end());
            BoundaryEdge { index, curve, angle }
        })
        .collect()
}

/// Keeps the curves whose closest approach to a surface is within
/// `max_distance`.
pub struct FilterCurvesByDistance<'a> {
    curves: &'a [Polyline],
    surface: &'a TrimmedSurface,
    max_distance: f64,
    samples: usize,
}

impl<'a> FilterCurvesByDistance<'a> {
    /// Creates a new `FilterCurvesByDistance` operation.
    #[must_use]
    pub fn new(curves: &'a [Polyline], surface: &'a TrimmedSurface, max_distance: f64) -> Self {
        Self {
            curves,
            surface,
            max_distance,
            samples: 256,
        }
    }

    /// Sets the number of samples taken along each curve.
    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Executes the filter.
    ///
    /// # Errors
    ///
    /// Propagates curve evaluation failures.
    pub fn execute(&self) -> Result<Vec<Polyline>> {
        let mut kept = Vec::with_capacity(self.curves.len());
        for curve in self.curves {
            let d = CurveSurfaceDistance::new(curve, self.surface)
                .with_samples(self.samples)
                .execute()?;
            if d <= self.max_distance {
                kept.push(curve.clone());
            }
        }
        Ok(kept)
    }
}

/// One raster family: isolines along a boundary edge, connected into a path.
#[derive(Debug, Clone)]
pub struct RasterPass {
    /// The boundary edge the isolines run along.
    pub edge: BoundaryEdge,
    /// The (offset) boundary the path travels along between isolines.
    pub boundary: Polyline,
    /// The connected path, starting at the edge.
    pub path: SprayPath,
    /// The path sprayed on repeats, in the opposite direction.
    pub repeat_path: SprayPath,
}

/// Raster passes of a surface together with their speed range.
#[derive(Debug, Clone, Default)]
pub struct RasterPlan {
    pub passes: Vec<RasterPass>,
    pub speed_range: Option<SpeedRange>,
}

/// Builds one raster pass per edge of the offset surface boundary.
///
/// For each edge: geodesics across the edge direction, isolines anchored to
/// the edge at the raster pitch, isolines too far from the surface dropped,
/// the rest pulled onto the surface and trimmed to the boundary.
/// Isolines closer than half a pitch to the edge are replaced by the edge
/// itself, directions alternate, and the lines are connected through the
/// boundary and tagged with speeds.
pub struct RasterPlanner<'a> {
    surface: &'a TrimmedSurface,
    extended: &'a HeightField,
    config: &'a PlannerConfig,
    speed_regions: &'a [SpeedRegion],
}

impl<'a> RasterPlanner<'a> {
    /// Creates a new `RasterPlanner`.
    #[must_use]
    pub fn new(surface: &'a TrimmedSurface, extended: &'a HeightField, config: &'a PlannerConfig) -> Self {
        Self {
            surface,
            extended,
            config,
            speed_regions: &[],
        }
    }

    /// Sets the speed regions. Without regions the whole surface is sprayed
    /// at the configured spray speed.
    #[must_use]
    pub fn with_speed_regions(mut self, regions: &'a [SpeedRegion]) -> Self {
        self.speed_regions = regions;
        self
    }

    /// Executes the planner.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors, a boundary that cannot be offset and
    /// degenerate geodesic fields.
    pub fn execute(&self) -> Result<RasterPlan> {
        self.config.validate()?;
        let raster = &self.config.raster;
        let tolerance = self.config.tolerance;
        let boundary = OffsetBoundary::new(self.surface, self.extended, raster.expand_distance)
            .with_tolerance(tolerance)
            .execute()?;
        let edges = boundary_edges(&boundary, &tolerance);

        let default_region;
        let regions = if self.speed_regions.is_empty() {
            default_region = [SpeedRegion::new(self.surface.clone(), self.config.spray.spray_speed)];
            &default_region[..]
        } else {
            self.speed_regions
        };
        let speeds = AssignSpeeds::new(regions, self.config.spray.connector_speed).with_tolerance(tolerance);

        let mut plan = RasterPlan::default();
        for edge in edges {
            if let Some(selected) = &raster.source_edges {
                if !selected.contains(&edge.index) {
                    continue;
                }
            }
            let index = edge.index;
            match self.build_pass(edge, &boundary, &speeds)? {
                Some(pass) => {
                    plan.speed_range = SpeedRange::merge(plan.speed_range, pass.path.speed_range());
                    plan.passes.push(pass);
                }
                None => warn!(edge = index, "no raster lines inside the boundary"),
            }
        }
        info!(passes = plan.passes.len(), "planned raster passes");
        Ok(plan)
    }

    fn build_pass(&self, edge: BoundaryEdge, boundary: &Polyline, speeds: &AssignSpeeds<'_>) -> Result<Option<RasterPass>> {
        let raster = &self.config.raster;
        let tolerance = self.config.tolerance;
        let pitch = raster.pitch;

        let geodesics = Geodesics::new(self.surface, self.extended, edge.angle, raster.geodesic_count).execute()?;
        let isolines = OrthoGeodesics::new(&geodesics, pitch).with_guide(&edge.curve).execute()?;
        let isolines =
            FilterCurvesByDistance::new(&isolines, self.surface, pitch / 2.0 + raster.expand_distance.abs()).execute()?;

        let mut lines = Vec::new();
        for isoline in &isolines {
            let pulled = self.surface.pull_curve(isoline, pitch / 4.0)?;
            let trimmed = TrimCurve::new(&pulled, TrimRegion::Curve(boundary))
                .with_tolerance(tolerance)
                .execute()?;
            lines.extend(trimmed.inside());
        }
        if lines.is_empty() {
            return Ok(None);
        }

        let distance_to_edge = |c: &Polyline| ClosestPoints::new(&edge.curve, c).execute().distance;
        if lines
            .last()
            .zip(lines.first())
            .is_some_and(|(last, first)| distance_to_edge(last) < distance_to_edge(first))
        {
            lines.reverse();
        }
        let before = lines.len();
        lines.retain(|c| distance_to_edge(c) >= pitch / 2.0);
        debug!(edge = edge.index, replaced = before - lines.len(), lines = lines.len() + 1, "raster lines");

        let mut curves = vec![SprayCurve::new(edge.curve.clone()).with_edge(self.config.spray.edge_angle)];
        curves.extend(lines.into_iter().map(SprayCurve::new));
        if let Some(next) = curves.get(1).map(|c| (c.start(), c.end())) {
            let start = curves[0].start();
            if (start - next.0).norm_squared() > (start - next.1).norm_squared() {
                curves[0] = curves[0].reversed();
            }
        }
        let fragments: Vec<Fragment> = curves
            .into_iter()
            .enumerate()
            .map(|(j, c)| Fragment::Curve(if j % 2 == 0 { c.reversed() } else { c }))
            .collect();

        let connected = ConnectThroughBoundary::new(&fragments, boundary)
            .with_tolerance(tolerance)
            .execute()?;
        let path = speeds.execute(&connected);
        let repeat_path = path.reversed();
        debug!(edge = edge.index, length = path.length(), "raster pass connected");
        Ok(Some(RasterPass {
            edge,
            boundary: boundary.clone(),
            path,
            repeat_path,
        }))
    }
}

/// Builds the path along the surface edge, started at the boundary point
/// closest to a given point.
pub struct EdgePath<'a> {
    surface: &'a TrimmedSurface,
    extended: &'a HeightField,
    start: Point3,
    offset: f64,
    edge_angle: f64,
    speed: Option<f64>,
    tolerance: Tolerance,
}

impl<'a> EdgePath<'a> {
    /// Creates a new `EdgePath` operation.
    #[must_use]
    pub fn new(surface: &'a TrimmedSurface, extended: &'a HeightField, start: Point3) -> Self {
        Self {
            surface,
            extended,
            start,
            offset: 0.0,
            edge_angle: 0.0,
            speed: None,
            tolerance: Tolerance::default(),
        }
    }

    /// Offsets the boundary before following it.
    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_edge_angle(mut self, edge_angle: f64) -> Self {
        self.edge_angle = edge_angle;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Propagates boundary offset failures.
    pub fn execute(&self) -> Result<SprayPath> {
        let boundary = OffsetBoundary::new(self.surface, self.extended, self.offset)
            .with_tolerance(self.tolerance)
            .execute()?;
        let (t, _, _) = boundary.closest_point(&self.start);
        let mut curve = SprayCurve::new(boundary.with_seam_at(t)).with_edge(self.edge_angle);
        curve.speed = self.speed;
        Ok(SprayPath::new(vec![curve]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn square_outline(size: f64) -> Polyline {
        Polyline::new(vec![p(0.0, 0.0), p(size, 0.0), p(size, size), p(0.0, size), p(0.0, 0.0)]).unwrap()
    }

    fn square_surface(size: f64) -> TrimmedSurface {
        TrimmedSurface::new(HeightField::flat(0.0), &square_outline(size), &[]).unwrap()
    }

    #[test]
    fn square_boundary_has_four_edges() {
        // Extra collinear vertex and a seam mid-edge.
        let boundary = Polyline::new(vec![
            p(5.0, 0.0),
            p(10.0, 0.0),
            p(10.0, 10.0),
            p(0.0, 10.0),
            p(0.0, 5.0),
            p(0.0, 0.0),
            p(5.0, 0.0),
        ])
        .unwrap();
        let edges = boundary_edges(&boundary, &Tolerance::default());
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| (e.curve.length() - 10.0).abs() < 1e-9));
        assert_relative_eq!(edges[0].angle, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(edges[3].angle, 0.0);
    }

    #[test]
    fn filter_drops_far_curves() {
        let surf = square_surface(10.0);
        let curves = vec![
            Polyline::line(p(-5.0, 5.0), p(15.0, 5.0)).unwrap(),
            Polyline::line(p(-5.0, 13.0), p(15.0, 13.0)).unwrap(),
            Polyline::line(p(-5.0, 11.0), p(15.0, 11.0)).unwrap(),
        ];
        let kept = FilterCurvesByDistance::new(&curves, &surf, 2.0).execute().unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn flat_square_gets_one_pass_per_edge() {
        let surf = square_surface(1000.0);
        let mut config = PlannerConfig::default();
        config.raster.pitch = 100.0;
        config.raster.geodesic_count = 10;
        let plan = RasterPlanner::new(&surf, surf.height_field(), &config).execute().unwrap();
        assert_eq!(plan.passes.len(), 4);
        for pass in &plan.passes {
            assert!(pass.path.length() >= 900.0);
            assert!(pass.path.is_continuous(1e-6));
            let first = &pass.path.curves()[0];
            assert!(first.is_edge);
            assert_relative_eq!(pass.repeat_path.length(), pass.path.length(), epsilon = 1e-6);
            let coverage = pass.path.curves().iter().filter(|c| !c.is_connector).count();
            assert!(coverage >= 10, "only {coverage} coverage curves");
        }
        assert_eq!(plan.speed_range, Some(SpeedRange { min: 200.0, max: 300.0 }));
    }

    #[test]
    fn source_edges_limit_passes() {
        let surf = square_surface(1000.0);
        let mut config = PlannerConfig::default();
        config.raster.source_edges = Some(vec![1]);
        let plan = RasterPlanner::new(&surf, surf.height_field(), &config).execute().unwrap();
        assert_eq!(plan.passes.len(), 1);
        assert_eq!(plan.passes[0].edge.index, 1);
    }

    #[test]
    fn edge_path_starts_near_point() {
        let surf = square_surface(10.0);
        let path = EdgePath::new(&surf, surf.height_field(), p(12.0, 4.0))
            .with_edge_angle(0.2)
            .with_speed(150.0)
            .execute()
            .unwrap();
        assert_eq!(path.len(), 1);
        let curve = &path.curves()[0];
        assert!(curve.is_edge);
        assert_relative_eq!((curve.start() - p(10.0, 4.0)).norm(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(curve.length(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(path.duration(), 40.0 / 150.0, epsilon = 1e-12);
    }
}
