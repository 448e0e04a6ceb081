use crate::geometry::curve::Polyline;
use crate::math::{Point3, Vector3};

/// One piece of a spray path: a curve tagged with its process parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SprayCurve {
    /// The tool-centre-point trajectory.
    pub curve: Polyline,
    /// Travel speed along the curve; `None` until a speed is assigned.
    pub speed: Option<f64>,
    /// Whether the curve only joins two coverage curves.
    pub is_connector: bool,
    /// Whether the curve runs along a surface edge.
    pub is_edge: bool,
    /// Tool tilt (radians) applied when the curve runs along an edge.
    pub edge_angle: f64,
}

impl SprayCurve {
    /// Creates a coverage curve without a speed.
    #[must_use]
    pub fn new(curve: Polyline) -> Self {
        Self {
            curve,
            speed: None,
            is_connector: false,
            is_edge: false,
            edge_angle: 0.0,
        }
    }

    /// Creates a connector curve without a speed.
    #[must_use]
    pub fn connector(curve: Polyline) -> Self {
        Self {
            is_connector: true,
            ..Self::new(curve)
        }
    }

    /// Sets the speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Marks the curve as running along an edge with the given tool tilt.
    #[must_use]
    pub fn with_edge(mut self, edge_angle: f64) -> Self {
        self.is_edge = true;
        self.edge_angle = edge_angle;
        self
    }

    /// Copy of the tags carrying a different curve.
    #[must_use]
    pub fn with_curve(&self, curve: Polyline) -> Self {
        Self { curve, ..self.clone() }
    }

    /// Arclength of the curve.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.curve.length()
    }

    /// Time needed to travel the curve. Curves without a positive speed take
    /// no time.
    #[must_use]
    pub fn duration(&self) -> f64 {
        match self.speed {
            Some(speed) if speed > 0.0 => self.length() / speed,
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn start(&self) -> Point3 {
        self.curve.start()
    }

    #[must_use]
    pub fn end(&self) -> Point3 {
        self.curve.end()
    }

    /// Copy traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        self.with_curve(self.curve.reversed())
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        self.with_curve(self.curve.translated(offset))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn segment() -> Polyline {
        Polyline::line(Point3::new(0.0, 0.0, 0.0), Point3::new(30.0, 40.0, 0.0)).unwrap()
    }

    #[test]
    fn duration_uses_speed() {
        let c = SprayCurve::new(segment()).with_speed(10.0);
        assert_relative_eq!(c.duration(), 5.0);
        assert_relative_eq!(SprayCurve::new(segment()).duration(), 0.0);
        assert_relative_eq!(SprayCurve::new(segment()).with_speed(0.0).duration(), 0.0);
    }

    #[test]
    fn reversal_keeps_tags() {
        let c = SprayCurve::connector(segment()).with_speed(3.0).with_edge(0.2);
        let r = c.reversed();
        assert!(r.is_connector && r.is_edge);
        assert_eq!(r.speed, Some(3.0));
        assert_relative_eq!(r.start().x, 30.0);
        assert_relative_eq!(c.start().x, 0.0);
    }
}
