use tracing::debug;

use crate::config::Tolerance;
use crate::error::{OperationError, Result};
use crate::geometry::curve::Polyline;
use crate::geometry::surface::{HeightField, TrimmedSurface};
use crate::math::polygon_2d::signed_area_2d;
use crate::operations::offset::OffsetOnSurface;

/// Offsets the outer boundary of a trimmed surface on its extended surface.
///
/// Both sides of the boundary are offset and the candidate is picked by its
/// projected area: the larger one for a positive (expanding) distance, the
/// smaller one for a negative (contracting) distance.
pub struct OffsetBoundary<'a> {
    surface: &'a TrimmedSurface,
    extended: &'a HeightField,
    distance: f64,
    tolerance: Tolerance,
}

impl<'a> OffsetBoundary<'a> {
    /// Creates a new `OffsetBoundary` operation.
    #[must_use]
    pub fn new(surface: &'a TrimmedSurface, extended: &'a HeightField, distance: f64) -> Self {
        Self {
            surface,
            extended,
            distance,
            tolerance: Tolerance::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the offset.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if neither side can be offset.
    pub fn execute(&self) -> Result<Polyline> {
        let boundary = self.surface.boundary()?;
        if self.distance.abs() < self.tolerance.distance {
            return Ok(boundary);
        }
        let pick_larger = self.distance > 0.0;
        offset_both_sides(&boundary, self.extended, self.distance, self.tolerance.distance, pick_larger)
            .ok_or_else(|| OperationError::Failed("boundary offset collapsed on both sides".into()).into())
    }
}

/// Offsets every hole of a trimmed surface on its extended surface.
///
/// The area rule is mirrored: a positive distance grows the coated area, so
/// the smaller hole candidate is kept. Holes that vanish are dropped.
pub struct OffsetHoles<'a> {
    surface: &'a TrimmedSurface,
    extended: &'a HeightField,
    distance: f64,
    tolerance: Tolerance,
}

impl<'a> OffsetHoles<'a> {
    /// Creates a new `OffsetHoles` operation.
    #[must_use]
    pub fn new(surface: &'a TrimmedSurface, extended: &'a HeightField, distance: f64) -> Self {
        Self {
            surface,
            extended,
            distance,
            tolerance: Tolerance::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the offset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GeometryError::Degenerate`] if a hole loop of
    /// the surface is degenerate.
    pub fn execute(&self) -> Result<Vec<Polyline>> {
        let holes = self.surface.holes()?;
        if self.distance.abs() < self.tolerance.distance {
            return Ok(holes);
        }
        let pick_larger = self.distance < 0.0;
        let mut result = Vec::with_capacity(holes.len());
        for (index, hole) in holes.iter().enumerate() {
            match offset_both_sides(hole, self.extended, self.distance, self.tolerance.distance, pick_larger) {
                Some(curve) => result.push(curve),
                None => debug!(index, distance = self.distance, "hole vanished under offset"),
            }
        }
        Ok(result)
    }
}

fn offset_both_sides(
    curve: &Polyline,
    extended: &HeightField,
    distance: f64,
    tolerance: f64,
    pick_larger: bool,
) -> Option<Polyline> {
    let area = |c: &Polyline| signed_area_2d(c.points()).abs();
    [distance, -distance]
        .into_iter()
        .filter_map(|d| {
            OffsetOnSurface::new(curve, extended, d)
                .with_tolerance(tolerance)
                .execute()
                .ok()
        })
        .reduce(|a, b| {
            let b_wins = if pick_larger { area(&b) > area(&a) } else { area(&b) < area(&a) };
            if b_wins {
                b
            } else {
                a
            }
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use approx::assert_relative_eq;

    fn square(x0: f64, x1: f64) -> Polyline {
        Polyline::new(vec![
            Point3::new(x0, x0, 0.0),
            Point3::new(x1, x0, 0.0),
            Point3::new(x1, x1, 0.0),
            Point3::new(x0, x1, 0.0),
            Point3::new(x0, x0, 0.0),
        ])
        .unwrap()
    }

    fn holed_surface() -> TrimmedSurface {
        TrimmedSurface::new(HeightField::flat(0.0), &square(0.0, 100.0), &[square(40.0, 60.0)]).unwrap()
    }

    #[test]
    fn zero_distance_returns_boundary() {
        let surf = holed_surface();
        let b = OffsetBoundary::new(&surf, surf.height_field(), 0.0).execute().unwrap();
        assert_relative_eq!(b.length(), 400.0);
    }

    #[test]
    fn expanding_picks_larger_loop() {
        let surf = holed_surface();
        let b = OffsetBoundary::new(&surf, surf.height_field(), 10.0).execute().unwrap();
        assert!(b.is_closed());
        assert_relative_eq!(signed_area_2d(b.points()).abs(), 120.0 * 120.0, epsilon = 1e-6);
    }

    #[test]
    fn contracting_picks_smaller_loop() {
        let surf = holed_surface();
        let b = OffsetBoundary::new(&surf, surf.height_field(), -10.0).execute().unwrap();
        assert_relative_eq!(signed_area_2d(b.points()).abs(), 80.0 * 80.0, epsilon = 1e-6);
    }

    #[test]
    fn holes_use_mirrored_rule() {
        let surf = holed_surface();
        let grown = OffsetHoles::new(&surf, surf.height_field(), 5.0).execute().unwrap();
        assert_eq!(grown.len(), 1);
        assert_relative_eq!(signed_area_2d(grown[0].points()).abs(), 10.0 * 10.0, epsilon = 1e-6);

        let shrunk = OffsetHoles::new(&surf, surf.height_field(), -5.0).execute().unwrap();
        assert_relative_eq!(signed_area_2d(shrunk[0].points()).abs(), 30.0 * 30.0, epsilon = 1e-6);
    }
}
