use tracing::debug;

use crate::error::{OperationError, Result};
use crate::geometry::curve::Polyline;
use crate::geometry::surface::{HeightField, TrimmedSurface};
use crate::math::frame::Rectangle;
use crate::operations::creation::ShortestPath;

/// Number of alternating bounding boxes used to enlarge the rail rectangle.
pub const RAIL_BOXES: usize = 5;

/// Builds geodesics spanning a trimmed surface across a raster direction.
///
/// A rectangle enclosing the surface is aligned with the direction at
/// `angle`. Its two sides running along that direction are lifted onto the
/// extended surface as rails; each rail is divided into `count` points and
/// the `i`-th points of both rails are joined by a shortest path.
pub struct Geodesics<'a> {
    surface: &'a TrimmedSurface,
    extended: &'a HeightField,
    angle: f64,
    count: usize,
}

impl<'a> Geodesics<'a> {
    /// Creates a new `Geodesics` operation.
    #[must_use]
    pub fn new(surface: &'a TrimmedSurface, extended: &'a HeightField, angle: f64, count: usize) -> Self {
        Self {
            surface,
            extended,
            angle,
            count,
        }
    }

    /// Executes the operation, returning `count` geodesics ordered along the
    /// raster direction.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if `count < 2`, and propagates
    /// degenerate rail geometry.
    pub fn execute(&self) -> Result<Vec<Polyline>> {
        if self.count < 2 {
            return Err(OperationError::InvalidInput(format!("need at least 2 geodesics, got {}", self.count)).into());
        }
        let rect = Rectangle::nested(self.surface.region().outer(), self.angle, RAIL_BOXES);
        let max_segment = rect.diagonal() / 64.0;
        let [(a0, a1), (b0, b1)] = rect.rails();

        // The far rail is walked the way the rectangle outline runs, so its
        // division is read back to front.
        let rail0 = self.extended.lift_curve(&Polyline::line(a0, a1)?, max_segment)?;
        let rail1 = self.extended.lift_curve(&Polyline::line(b1, b0)?, max_segment)?;
        let params0 = rail0.divide_by_count(self.count - 1);
        let mut params1 = rail1.divide_by_count(self.count - 1);
        params1.reverse();

        let geodesics = params0
            .iter()
            .zip(&params1)
            .map(|(&t0, &t1)| ShortestPath::new(self.extended, rail0.point_at(t0), rail1.point_at(t1)).execute())
            .collect::<Result<Vec<_>>>()?;
        debug!(count = geodesics.len(), angle = self.angle, "built geodesic field");
        Ok(geodesics)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use approx::assert_relative_eq;

    fn square_surface() -> TrimmedSurface {
        let outline = Polyline::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1000.0, 0.0, 0.0),
            Point3::new(1000.0, 1000.0, 0.0),
            Point3::new(0.0, 1000.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ])
        .unwrap();
        TrimmedSurface::new(HeightField::flat(0.0), &outline, &[]).unwrap()
    }

    #[test]
    fn geodesics_cross_the_raster_direction() {
        let surf = square_surface();
        let geos = Geodesics::new(&surf, surf.height_field(), 0.0, 10).execute().unwrap();
        assert_eq!(geos.len(), 10);
        for g in &geos {
            // Rails run along X, geodesics run along +Y across the enlarged box.
            assert_relative_eq!(g.start().x, g.end().x, epsilon = 1e-9);
            assert!(g.end().y > g.start().y);
            assert!(g.start().y < 0.0 && g.end().y > 1000.0);
        }
        assert!(geos.windows(2).all(|w| w[1].start().x > w[0].start().x));
        assert_relative_eq!(geos[0].start().x, -1500.0, epsilon = 1e-6);
        assert_relative_eq!(geos[9].start().x, 2500.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_single_geodesic() {
        let surf = square_surface();
        assert!(Geodesics::new(&surf, surf.height_field(), 0.0, 1).execute().is_err());
    }
}
