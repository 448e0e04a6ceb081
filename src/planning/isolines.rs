use tracing::debug;

use crate::error::{OperationError, Result};
use crate::geometry::curve::{bounding_box, Polyline};
use crate::operations::query::ClosestPoints;

/// Builds isolines across a set of geodesics.
///
/// Every geodesic is divided by arclength at `pitch`; the `k`-th isoline joins
/// the `k`-th division point of every geodesic, so the shortest geodesic bounds
/// the number of isolines. With a guide curve the divisions start where each
/// geodesic meets the guide and run outward in both directions, which anchors
/// the isolines to the guide.
pub struct OrthoGeodesics<'a> {
    geodesics: &'a [Polyline],
    pitch: f64,
    guide: Option<&'a Polyline>,
}

impl<'a> OrthoGeodesics<'a> {
    /// Creates a new `OrthoGeodesics` operation.
    #[must_use]
    pub fn new(geodesics: &'a [Polyline], pitch: f64) -> Self {
        Self {
            geodesics,
            pitch,
            guide: None,
        }
    }

    /// Anchors the isolines to `guide`.
    #[must_use]
    pub fn with_guide(mut self, guide: &'a Polyline) -> Self {
        self.guide = Some(guide);
        self
    }

    /// Executes the operation. Isolines are ordered along the geodesics.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if `pitch` is not positive.
    pub fn execute(&self) -> Result<Vec<Polyline>> {
        if self.pitch <= 0.0 {
            return Err(OperationError::InvalidInput("isoline pitch must be positive".into()).into());
        }
        let isolines = match self.guide {
            None => isolines(self.geodesics, self.pitch),
            Some(guide) => self.guided(guide),
        };
        debug!(count = isolines.len(), guided = self.guide.is_some(), "built isolines");
        Ok(isolines)
    }

    fn guided(&self, guide: &Polyline) -> Vec<Polyline> {
        let points: Vec<_> = self.geodesics.iter().flat_map(|g| g.points().iter().copied()).collect();
        let (min, max) = bounding_box(&points);
        let guide = guide.extended((max - min).norm());

        let mut lower = Vec::with_capacity(self.geodesics.len());
        let mut upper = Vec::with_capacity(self.geodesics.len());
        for g in self.geodesics {
            let t = ClosestPoints::new(g, &guide).execute().t_a;
            lower.push(g.trim(0.0, t).map(|c| c.reversed()));
            upper.push(g.trim(t, g.length()));
        }
        let lower: Option<Vec<_>> = lower.into_iter().collect();
        let upper: Option<Vec<_>> = upper.into_iter().collect();

        let mut result: Vec<Polyline> = lower.map(|l| isolines(&l, self.pitch)).unwrap_or_default();
        result.reverse();
        let upper = upper.map(|u| isolines(&u, self.pitch)).unwrap_or_default();
        // Both halves start with the isoline on the guide.
        let skip = usize::from(!result.is_empty());
        result.extend(upper.into_iter().skip(skip));
        result
    }
}

fn isolines(geodesics: &[Polyline], pitch: f64) -> Vec<Polyline> {
    let divisions: Vec<Vec<f64>> = geodesics.iter().map(|g| g.divide_by_length(pitch)).collect();
    let count = divisions.iter().map(Vec::len).min().unwrap_or(0);
    (0..count)
        .filter_map(|k| {
            let points = geodesics
                .iter()
                .zip(&divisions)
                .map(|(g, params)| g.point_at(params[k]))
                .collect();
            Polyline::new(points).ok()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use approx::assert_relative_eq;

    fn vertical(x: f64, y0: f64, y1: f64) -> Polyline {
        Polyline::line(Point3::new(x, y0, 0.0), Point3::new(x, y1, 0.0)).unwrap()
    }

    #[test]
    fn shortest_geodesic_bounds_count() {
        let geos = vec![vertical(0.0, 0.0, 100.0), vertical(10.0, 0.0, 45.0), vertical(20.0, 0.0, 100.0)];
        let lines = OrthoGeodesics::new(&geos, 10.0).execute().unwrap();
        assert_eq!(lines.len(), 5);
        assert_relative_eq!(lines[4].start().y, 40.0);
        assert_eq!(lines[0].points().len(), 3);
    }

    #[test]
    fn guide_anchors_isolines() {
        let geos: Vec<_> = (0..4).map(|i| vertical(f64::from(i) * 10.0, -3.0, 97.0)).collect();
        let guide = Polyline::line(Point3::new(5.0, 25.0, 0.0), Point3::new(15.0, 25.0, 0.0)).unwrap();
        let lines = OrthoGeodesics::new(&geos, 10.0).with_guide(&guide).execute().unwrap();
        let ys: Vec<f64> = lines.iter().map(|l| l.start().y).collect();
        assert!(ys.iter().any(|y| (y - 25.0).abs() < 1e-9));
        assert!(ys.iter().all(|y| ((y - 25.0) / 10.0 - ((y - 25.0) / 10.0).round()).abs() < 1e-9));
        assert!(ys.windows(2).all(|w| w[1] > w[0]));
        // 25 down to 5 and 25 up to 95, the shared line counted once.
        assert_eq!(lines.len(), 3 + 8 - 1);
    }

    #[test]
    fn rejects_zero_pitch() {
        let geos = vec![vertical(0.0, 0.0, 1.0), vertical(1.0, 0.0, 1.0)];
        assert!(OrthoGeodesics::new(&geos, 0.0).execute().is_err());
    }
}
