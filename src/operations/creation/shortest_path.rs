use crate::error::{GeometryError, Result};
use crate::geometry::curve::Polyline;
use crate::geometry::surface::HeightField;
use crate::math::{distance_xy_sq, Point3};

/// Number of segments a shortest path is densified into on curved fields.
const DEFAULT_SEGMENTS: usize = 32;

/// Builds the surface path between two points on a height field.
///
/// The path is the vertical projection of the XY chord, densified so it
/// follows curved height fields. On planes this is the exact geodesic; on
/// gently curved fields it is the standard approximation used for raster
/// passes.
pub struct ShortestPath<'a> {
    surface: &'a HeightField,
    start: Point3,
    end: Point3,
    segments: usize,
}

impl<'a> ShortestPath<'a> {
    /// Creates a new `ShortestPath` operation.
    #[must_use]
    pub fn new(surface: &'a HeightField, start: Point3, end: Point3) -> Self {
        Self {
            surface,
            start,
            end,
            segments: DEFAULT_SEGMENTS,
        }
    }

    /// Sets how many segments the path is densified into.
    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(1);
        self
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the endpoints coincide in XY.
    pub fn execute(&self) -> Result<Polyline> {
        if distance_xy_sq(&self.start, &self.end) <= crate::math::TOLERANCE * crate::math::TOLERANCE {
            return Err(GeometryError::Degenerate("shortest path endpoints coincide".into()).into());
        }
        let chord = Polyline::line(self.start, self.end)?;
        #[allow(clippy::cast_precision_loss)]
        let max_segment = chord.length() / self.segments as f64;
        self.surface.lift_curve(&chord, max_segment)
    }
}
