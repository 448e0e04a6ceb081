use tracing::trace;

use crate::config::Tolerance;
use crate::geometry::curve::Polyline;
use crate::geometry::surface::TrimmedSurface;
use crate::path::{SprayCurve, SprayPath};

/// A part of the surface sprayed at its own speed.
#[derive(Debug, Clone)]
pub struct SpeedRegion {
    pub surface: TrimmedSurface,
    pub speed: f64,
}

impl SpeedRegion {
    #[must_use]
    pub fn new(surface: TrimmedSurface, speed: f64) -> Self {
        Self { surface, speed }
    }
}

/// Tags every curve of a path with a speed.
///
/// Connectors get the connector speed. Coverage curves are split where they
/// cross a speed region boundary and each piece takes the speed of the
/// region nearest its midpoint, the first region winning ties; adjacent
/// pieces that end up with the same speed are joined back together. With no
/// regions, coverage curves keep whatever speed they had.
pub struct AssignSpeeds<'a> {
    regions: &'a [SpeedRegion],
    connector_speed: f64,
    tolerance: Tolerance,
}

impl<'a> AssignSpeeds<'a> {
    /// Creates a new `AssignSpeeds` operation.
    #[must_use]
    pub fn new(regions: &'a [SpeedRegion], connector_speed: f64) -> Self {
        Self {
            regions,
            connector_speed,
            tolerance: Tolerance::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the tagging on `path`.
    #[must_use]
    pub fn execute(&self, path: &SprayPath) -> SprayPath {
        let mut result = SprayPath::default();
        for curve in path {
            if curve.is_connector {
                result.push(curve.clone().with_speed(self.connector_speed));
            } else if self.regions.is_empty() {
                result.push(curve.clone());
            } else {
                result.extend(self.split_by_regions(curve));
            }
        }
        result
    }

    /// Speed of the region nearest to the midpoint of `curve`.
    #[must_use]
    pub fn speed_for(&self, curve: &Polyline) -> Option<f64> {
        let mid = curve.point_at_normalized(0.5);
        let tol_sq = self.tolerance.distance_sq();
        let mut best: Option<(f64, f64)> = None;
        for region in self.regions {
            let d = (region.surface.closest_point(&mid) - mid).norm_squared();
            let better = match best {
                Some((best_d, _)) => d < best_d - tol_sq,
                None => true,
            };
            if better {
                best = Some((d, region.speed));
            }
        }
        best.map(|(_, speed)| speed)
    }

    fn split_by_regions(&self, curve: &SprayCurve) -> Vec<SprayCurve> {
        let mut breaks: Vec<f64> = self
            .regions
            .iter()
            .flat_map(|r| r.surface.region().crossings(&curve.curve))
            .collect();
        breaks.push(0.0);
        breaks.push(curve.length());
        breaks.sort_by(f64::total_cmp);
        breaks.dedup_by(|a, b| (*a - *b).abs() <= self.tolerance.distance);

        let mut pieces: Vec<SprayCurve> = Vec::with_capacity(breaks.len());
        for w in breaks.windows(2) {
            let Some(sub) = curve.curve.trim(w[0], w[1]) else {
                continue;
            };
            let speed = self.speed_for(&sub);
            if let Some(last) = pieces.last_mut() {
                if last.speed == speed {
                    if let Some(joined) = last.curve.try_append(&sub, self.tolerance.distance) {
                        last.curve = joined;
                        continue;
                    }
                }
            }
            pieces.push(SprayCurve {
                speed,
                ..curve.with_curve(sub)
            });
        }
        trace!(pieces = pieces.len(), "assigned region speeds");
        pieces
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::HeightField;
    use crate::math::Point3;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> TrimmedSurface {
        let outline = Polyline::new(vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1), p(x0, y0)]).unwrap();
        TrimmedSurface::new(HeightField::flat(0.0), &outline, &[]).unwrap()
    }

    fn halves() -> Vec<SpeedRegion> {
        vec![
            SpeedRegion::new(rect(0.0, 500.0, 0.0, 1000.0), 100.0),
            SpeedRegion::new(rect(500.0, 1000.0, 0.0, 1000.0), 200.0),
        ]
    }

    #[test]
    fn one_speed_change_at_shared_edge() {
        let regions = halves();
        let path = SprayPath::new(vec![
            SprayCurve::connector(Polyline::line(p(-50.0, 300.0), p(0.0, 300.0)).unwrap()),
            SprayCurve::new(Polyline::line(p(0.0, 300.0), p(1000.0, 300.0)).unwrap()),
            SprayCurve::connector(Polyline::line(p(1000.0, 300.0), p(1000.0, 400.0)).unwrap()),
        ]);
        let tagged = AssignSpeeds::new(&regions, 300.0).execute(&path);
        assert!(tagged.is_continuous(1e-9));
        let coverage: Vec<_> = tagged.curves().iter().filter(|c| !c.is_connector).collect();
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage[0].speed, Some(100.0));
        assert_eq!(coverage[1].speed, Some(200.0));
        assert_relative_eq!(coverage[0].end().x, 500.0, epsilon = 1e-6);
        assert!(tagged
            .curves()
            .iter()
            .filter(|c| c.is_connector)
            .all(|c| c.speed == Some(300.0)));
    }

    #[test]
    fn curve_within_one_region_is_not_split() {
        let regions = halves();
        let path = SprayPath::new(vec![SprayCurve::new(
            Polyline::new(vec![p(100.0, 100.0), p(400.0, 100.0), p(400.0, 900.0)]).unwrap(),
        )]);
        let tagged = AssignSpeeds::new(&regions, 300.0).execute(&path);
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged.curves()[0].speed, Some(100.0));
        assert_relative_eq!(tagged.length(), path.length(), epsilon = 1e-9);
    }

    #[test]
    fn ties_go_to_first_region() {
        let regions = halves();
        let speeds = AssignSpeeds::new(&regions, 300.0);
        let on_edge = Polyline::line(p(500.0, 100.0), p(500.0, 200.0)).unwrap();
        assert_eq!(speeds.speed_for(&on_edge), Some(100.0));
    }
}
