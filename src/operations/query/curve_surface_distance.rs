use crate::error::Result;
use crate::geometry::curve::Curve;
use crate::geometry::surface::TrimmedSurface;

/// Samples taken along the curve when none are given.
const DEFAULT_SAMPLES: usize = 64;

/// Approximates the minimum distance between a curve and a trimmed surface
/// by sampling the curve.
pub struct CurveSurfaceDistance<'a, C: Curve> {
    curve: &'a C,
    surface: &'a TrimmedSurface,
    samples: usize,
}

impl<'a, C: Curve> CurveSurfaceDistance<'a, C> {
    /// Creates a new `CurveSurfaceDistance` query.
    #[must_use]
    pub fn new(curve: &'a C, surface: &'a TrimmedSurface) -> Self {
        Self {
            curve,
            surface,
            samples: DEFAULT_SAMPLES,
        }
    }

    /// Sets the number of sample intervals along the curve.
    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Propagates curve evaluation failures.
    pub fn execute(&self) -> Result<f64> {
        let points = self.curve.sample(self.samples)?;
        Ok(points
            .iter()
            .map(|p| self.surface.distance_to(p))
            .fold(f64::INFINITY, f64::min))
    }
}
