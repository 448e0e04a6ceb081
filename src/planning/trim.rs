use crate::config::Tolerance;
use crate::error::{OperationError, Result};
use crate::geometry::curve::Polyline;
use crate::geometry::region::Region;
use crate::geometry::surface::TrimmedSurface;
use crate::math::{Point3, Vector3};

/// The closed region a curve is trimmed against.
#[derive(Debug, Clone, Copy)]
pub enum TrimRegion<'a> {
    /// A closed boundary curve, taken by its XY projection.
    Curve(&'a Polyline),
    /// The trimmed area of a surface, holes included.
    Surface(&'a TrimmedSurface),
}

/// A maximal piece of a trimmed curve and its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimPiece {
    pub curve: Polyline,
    pub inside: bool,
}

/// Pieces of a trimmed curve in curve order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrimResult {
    pub pieces: Vec<TrimPiece>,
}

impl TrimResult {
    /// Pieces inside the region.
    #[must_use]
    pub fn inside(&self) -> Vec<Polyline> {
        self.collect(true)
    }

    /// Pieces outside the region.
    #[must_use]
    pub fn outside(&self) -> Vec<Polyline> {
        self.collect(false)
    }

    /// Whether the curve has pieces on both sides of the region boundary.
    #[must_use]
    pub fn crosses(&self) -> bool {
        self.pieces.iter().any(|p| p.inside) && self.pieces.iter().any(|p| !p.inside)
    }

    fn collect(&self, inside: bool) -> Vec<Polyline> {
        self.pieces
            .iter()
            .filter(|p| p.inside == inside)
            .map(|p| p.curve.clone())
            .collect()
    }
}

/// Splits a curve into pieces inside and outside a closed region.
///
/// The region acts as a vertical wall: the curve is broken where it crosses
/// the region boundary in XY and every stretch is classified by its midpoint.
/// A non-zero `margin` moves the ends of each inside stretch by `margin` of
/// arclength at every crossing, so a positive margin grows the inside pieces
/// and a negative one shrinks them. An inside stretch no longer than
/// `2 * |margin|` vanishes under a negative margin. Adjacent pieces of the
/// same class are joined again.
pub struct TrimCurve<'a> {
    curve: &'a Polyline,
    region: TrimRegion<'a>,
    margin: f64,
    tolerance: Tolerance,
}

impl<'a> TrimCurve<'a> {
    /// Creates a new `TrimCurve` operation.
    #[must_use]
    pub fn new(curve: &'a Polyline, region: TrimRegion<'a>) -> Self {
        Self {
            curve,
            region,
            margin: 0.0,
            tolerance: Tolerance::default(),
        }
    }

    /// Sets the signed arclength margin applied at every break point.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the trim.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if a boundary curve is not
    /// closed, and propagates degenerate boundary loops.
    pub fn execute(&self) -> Result<TrimResult> {
        let owned;
        let region = match self.region {
            TrimRegion::Curve(boundary) => {
                if !boundary.is_closed() {
                    return Err(OperationError::InvalidInput("trim boundary must be closed".into()).into());
                }
                owned = Region::from_curves(boundary, &[])?;
                &owned
            }
            TrimRegion::Surface(surface) => surface.region(),
        };

        let tol = self.tolerance.distance;
        let classifier = Classifier::new(region, self.curve, tol);
        let length = self.curve.length();

        let mut cuts = vec![0.0];
        cuts.extend(region.crossings(self.curve));
        cuts.push(length);
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|a, b| (*a - *b).abs() <= tol);

        let mut stretches: Vec<Stretch> = Vec::with_capacity(cuts.len());
        for w in cuts.windows(2) {
            if w[1] - w[0] <= tol {
                continue;
            }
            let inside = classifier.inside(&self.curve.point_at(0.5 * (w[0] + w[1])));
            match stretches.last_mut() {
                Some(last) if last.inside == inside => last.end = w[1],
                _ => stretches.push(Stretch {
                    start: w[0],
                    end: w[1],
                    inside,
                }),
            }
        }

        let mut pieces: Vec<TrimPiece> = Vec::with_capacity(stretches.len());
        let mut cursor = 0.0;
        for (a, b) in self.inside_spans(&stretches, length) {
            if a > cursor + tol {
                self.push_piece(&mut pieces, cursor, a, false);
            }
            self.push_piece(&mut pieces, a, b, true);
            cursor = b;
        }
        if cursor < length - tol {
            self.push_piece(&mut pieces, cursor, length, false);
        }

        if self.curve.is_closed() && pieces.len() > 2 {
            let first_inside = pieces[0].inside;
            if pieces.last().is_some_and(|p| p.inside == first_inside) {
                let first = pieces.remove(0);
                if let Some(last) = pieces.last_mut() {
                    if let Some(joined) = last.curve.try_append(&first.curve, tol) {
                        last.curve = joined;
                    }
                }
            }
        }
        Ok(TrimResult { pieces })
    }

    /// Inside stretches with the margin applied at every boundary crossing.
    /// Stretches that shrink to nothing are dropped and grown stretches that
    /// meet are merged.
    fn inside_spans(&self, stretches: &[Stretch], length: f64) -> Vec<(f64, f64)> {
        let tol = self.tolerance.distance;
        let mut spans: Vec<(f64, f64)> = Vec::new();
        for stretch in stretches.iter().filter(|s| s.inside) {
            let a = if stretch.start > tol {
                (stretch.start - self.margin).clamp(0.0, length)
            } else {
                stretch.start
            };
            let b = if stretch.end < length - tol {
                (stretch.end + self.margin).clamp(0.0, length)
            } else {
                stretch.end
            };
            if b - a <= tol {
                continue;
            }
            match spans.last_mut() {
                Some(last) if a <= last.1 + tol => last.1 = last.1.max(b),
                _ => spans.push((a, b)),
            }
        }
        spans
    }

    fn push_piece(&self, pieces: &mut Vec<TrimPiece>, t0: f64, t1: f64, inside: bool) {
        if let Some(curve) = self.curve.trim(t0, t1) {
            push_joined(pieces, TrimPiece { curve, inside }, self.tolerance.distance);
        }
    }
}

/// A run of the curve between boundary crossings on one side of the region.
struct Stretch {
    start: f64,
    end: f64,
    inside: bool,
}

/// Point-in-wall test, with the sense of the wall checked against a point
/// known to lie outside.
struct Classifier<'a> {
    region: &'a Region,
    tolerance: f64,
    flipped: bool,
}

impl<'a> Classifier<'a> {
    fn new(region: &'a Region, curve: &Polyline, tolerance: f64) -> Self {
        let (min, _) = curve.bbox();
        let (region_min, _) = region.bbox();
        let reach = tolerance * 1e6 + (min - region_min).norm();
        let reference = Point3::new(region_min.x, region_min.y, min.z) - Vector3::new(reach, reach, 0.0);
        let mut classifier = Self {
            region,
            tolerance,
            flipped: false,
        };
        classifier.flipped = classifier.inside(&reference);
        classifier
    }

    fn inside(&self, p: &Point3) -> bool {
        self.region.containment(p, self.tolerance).is_inside_or_boundary() != self.flipped
    }
}

fn push_joined(pieces: &mut Vec<TrimPiece>, piece: TrimPiece, tolerance: f64) {
    if let Some(last) = pieces.last_mut() {
        if last.inside == piece.inside {
            if let Some(joined) = last.curve.try_append(&piece.curve, tolerance) {
                last.curve = joined;
                return;
            }
        }
    }
    pieces.push(piece);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::HeightField;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn square(x0: f64, x1: f64) -> Polyline {
        Polyline::new(vec![p(x0, x0), p(x1, x0), p(x1, x1), p(x0, x1), p(x0, x0)]).unwrap()
    }

    fn line() -> Polyline {
        Polyline::line(p(-5.0, 5.0), p(15.0, 5.0)).unwrap()
    }

    #[test]
    fn partitions_crossing_line() {
        let boundary = square(0.0, 10.0);
        let curve = line();
        let result = TrimCurve::new(&curve, TrimRegion::Curve(&boundary)).execute().unwrap();
        assert_eq!(result.pieces.len(), 3);
        assert_eq!(result.inside().len(), 1);
        assert_eq!(result.outside().len(), 2);
        assert_relative_eq!(result.inside()[0].length(), 10.0, epsilon = 1e-9);
        let total: f64 = result.pieces.iter().map(|p| p.curve.length()).sum();
        assert_relative_eq!(total, curve.length(), epsilon = 1e-9);
        assert!(result.crosses());
    }

    #[test]
    fn margin_grows_and_shrinks_inside() {
        let boundary = square(0.0, 10.0);
        let curve = line();
        let grown = TrimCurve::new(&curve, TrimRegion::Curve(&boundary))
            .with_margin(2.0)
            .execute()
            .unwrap();
        assert_relative_eq!(grown.inside()[0].length(), 14.0, epsilon = 1e-9);
        let shrunk = TrimCurve::new(&curve, TrimRegion::Curve(&boundary))
            .with_margin(-2.0)
            .execute()
            .unwrap();
        assert_relative_eq!(shrunk.inside()[0].length(), 6.0, epsilon = 1e-9);
        let total: f64 = shrunk.pieces.iter().map(|p| p.curve.length()).sum();
        assert_relative_eq!(total, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn narrow_region_vanishes_under_negative_margin() {
        let boundary = Polyline::new(vec![p(0.0, 0.0), p(3.0, 0.0), p(3.0, 10.0), p(0.0, 10.0), p(0.0, 0.0)]).unwrap();
        let curve = line();
        let result = TrimCurve::new(&curve, TrimRegion::Curve(&boundary))
            .with_margin(-2.0)
            .execute()
            .unwrap();
        assert!(result.inside().is_empty());
        assert_eq!(result.pieces.len(), 1);
        assert_relative_eq!(result.outside()[0].length(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn grown_stretches_merge_across_gap() {
        // Two inside stretches x in [0, 4] and [6, 10], separated by a 2 wide hole.
        let surf = TrimmedSurface::new(
            HeightField::flat(0.0),
            &square(0.0, 10.0),
            &[Polyline::new(vec![p(4.0, 1.0), p(6.0, 1.0), p(6.0, 9.0), p(4.0, 9.0), p(4.0, 1.0)]).unwrap()],
        )
        .unwrap();
        let curve = line();
        let result = TrimCurve::new(&curve, TrimRegion::Surface(&surf))
            .with_margin(1.5)
            .execute()
            .unwrap();
        let inside = result.inside();
        assert_eq!(inside.len(), 1);
        assert_relative_eq!(inside[0].length(), 13.0, epsilon = 1e-9);
        assert_eq!(result.pieces.len(), 3);
    }

    #[test]
    fn surface_holes_split_inside() {
        let surf = TrimmedSurface::new(HeightField::flat(0.0), &square(0.0, 10.0), &[square(4.0, 6.0)]).unwrap();
        let curve = line();
        let result = TrimCurve::new(&curve, TrimRegion::Surface(&surf)).execute().unwrap();
        let inside = result.inside();
        assert_eq!(inside.len(), 2);
        assert_relative_eq!(inside.iter().map(Polyline::length).sum::<f64>(), 8.0, epsilon = 1e-9);
        assert_eq!(result.pieces.len(), 5);
    }

    #[test]
    fn curve_fully_inside_is_one_piece() {
        let boundary = square(0.0, 10.0);
        let curve = Polyline::line(p(2.0, 2.0), p(8.0, 3.0)).unwrap();
        let result = TrimCurve::new(&curve, TrimRegion::Curve(&boundary)).execute().unwrap();
        assert_eq!(result.pieces.len(), 1);
        assert!(result.pieces[0].inside);
    }

    #[test]
    fn closed_curve_rejoins_across_seam() {
        let boundary = square(0.0, 10.0);
        // Seam outside the boundary, crossing it twice.
        let ring = Polyline::new(vec![p(-2.0, 4.0), p(5.0, 4.0), p(5.0, 6.0), p(-2.0, 6.0), p(-2.0, 4.0)]).unwrap();
        let result = TrimCurve::new(&ring, TrimRegion::Curve(&boundary)).execute().unwrap();
        assert_eq!(result.pieces.len(), 2);
        assert_relative_eq!(result.outside()[0].length(), 2.0 + 2.0 + 2.0, epsilon = 1e-9);
    }

    #[test]
    fn open_boundary_is_rejected() {
        let open = Polyline::new(vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)]).unwrap();
        assert!(TrimCurve::new(&line(), TrimRegion::Curve(&open)).execute().is_err());
    }
}
