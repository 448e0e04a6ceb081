mod polyline;

pub use polyline::{bounding_box, Polyline};

use crate::error::Result;
use crate::math::{Point3, Vector3};

/// Parameter domain for a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDomain {
    /// Start of the parameter range.
    pub t_min: f64,
    /// End of the parameter range.
    pub t_max: f64,
}

impl CurveDomain {
    /// Creates a new curve domain.
    #[must_use]
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self { t_min, t_max }
    }

    /// Width of the domain.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.t_max - self.t_min
    }

    /// Clamps `t` into the domain.
    #[must_use]
    pub fn clamp(&self, t: f64) -> f64 {
        t.clamp(self.t_min, self.t_max)
    }

    /// Parameter at the normalized position `s` in `[0, 1]`.
    #[must_use]
    pub fn at_normalized(&self, s: f64) -> f64 {
        self.t_min + self.span() * s
    }
}

/// Trait for parametric curves in 3D space.
pub trait Curve {
    /// Evaluates the curve at parameter `t`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or evaluation fails.
    fn evaluate(&self, t: f64) -> Result<Point3>;

    /// Computes the tangent vector at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or the tangent is degenerate.
    fn tangent(&self, t: f64) -> Result<Vector3>;

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> CurveDomain;

    /// Returns whether the curve is closed.
    fn is_closed(&self) -> bool;

    /// Evaluates `count + 1` points evenly spaced in parameter, ends included.
    ///
    /// # Errors
    ///
    /// Propagates evaluation errors.
    fn sample(&self, count: usize) -> Result<Vec<Point3>> {
        let domain = self.domain();
        let count = count.max(1);
        (0..=count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let s = i as f64 / count as f64;
                self.evaluate(domain.at_normalized(s))
            })
            .collect()
    }
}
