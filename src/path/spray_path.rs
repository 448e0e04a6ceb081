use crate::error::{GeometryError, Result};
use crate::geometry::curve::Polyline;
use crate::math::{Point3, Vector3};

use super::{SprayCurve, SpeedRange};

/// An ordered sequence of spray curves.
///
/// After connection every curve ends where the next one starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SprayPath {
    curves: Vec<SprayCurve>,
}

impl SprayPath {
    #[must_use]
    pub fn new(curves: Vec<SprayCurve>) -> Self {
        Self { curves }
    }

    #[must_use]
    pub fn curves(&self) -> &[SprayCurve] {
        &self.curves
    }

    #[must_use]
    pub fn into_curves(self) -> Vec<SprayCurve> {
        self.curves
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn push(&mut self, curve: SprayCurve) {
        self.curves.push(curve);
    }

    pub fn extend(&mut self, curves: impl IntoIterator<Item = SprayCurve>) {
        self.curves.extend(curves);
    }

    /// Start of the first curve.
    #[must_use]
    pub fn start(&self) -> Option<Point3> {
        self.curves.first().map(SprayCurve::start)
    }

    /// End of the last curve.
    #[must_use]
    pub fn end(&self) -> Option<Point3> {
        self.curves.last().map(SprayCurve::end)
    }

    /// Total arclength.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.curves.iter().map(SprayCurve::length).sum()
    }

    /// Total travel time: the sum of `length / speed` over curves with a
    /// speed.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.curves.iter().map(SprayCurve::duration).sum()
    }

    /// Copy traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            curves: self.curves.iter().rev().map(SprayCurve::reversed).collect(),
        }
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        Self {
            curves: self.curves.iter().map(|c| c.translated(offset)).collect(),
        }
    }

    /// Drops connector curves from both ends.
    pub fn trim_connectors(&mut self) {
        while self.curves.last().is_some_and(|c| c.is_connector) {
            self.curves.pop();
        }
        let lead = self.curves.iter().take_while(|c| c.is_connector).count();
        self.curves.drain(..lead);
    }

    /// The underlying curves in order.
    #[must_use]
    pub fn segments(&self) -> Vec<Polyline> {
        self.curves.iter().map(|c| c.curve.clone()).collect()
    }

    /// Connector flag of each curve in order.
    #[must_use]
    pub fn connector_flags(&self) -> Vec<bool> {
        self.curves.iter().map(|c| c.is_connector).collect()
    }

    /// Whether each curve ends within `tolerance` of where the next starts.
    #[must_use]
    pub fn is_continuous(&self, tolerance: f64) -> bool {
        self.curves
            .windows(2)
            .all(|w| (w[1].start() - w[0].end()).norm() <= tolerance)
    }

    /// Joins every curve into a single polyline.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the path is empty or not
    /// continuous within `tolerance`.
    pub fn to_polyline(&self, tolerance: f64) -> Result<Polyline> {
        let mut iter = self.curves.iter();
        let Some(first) = iter.next() else {
            return Err(GeometryError::Degenerate("empty spray path".into()).into());
        };
        let mut points = first.curve.points().to_vec();
        for c in iter {
            let Some(last) = points.last() else {
                break;
            };
            if (c.start() - last).norm() > tolerance {
                return Err(GeometryError::Degenerate("spray path is not continuous".into()).into());
            }
            points.extend_from_slice(&c.curve.points()[1..]);
        }
        Polyline::new(points)
    }

    /// Range of assigned speeds, or `None` if no curve has a speed.
    #[must_use]
    pub fn speed_range(&self) -> Option<SpeedRange> {
        SpeedRange::from_speeds(self.curves.iter().filter_map(|c| c.speed))
    }
}

impl IntoIterator for SprayPath {
    type Item = SprayCurve;
    type IntoIter = std::vec::IntoIter<SprayCurve>;

    fn into_iter(self) -> Self::IntoIter {
        self.curves.into_iter()
    }
}

impl<'a> IntoIterator for &'a SprayPath {
    type Item = &'a SprayCurve;
    type IntoIter = std::slice::Iter<'a, SprayCurve>;

    fn into_iter(self) -> Self::IntoIter {
        self.curves.iter()
    }
}
