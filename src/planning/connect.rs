use slotmap::{DefaultKey, SlotMap};
use tracing::{debug, trace};

use crate::config::Tolerance;
use crate::error::{OperationError, Result};
use crate::geometry::curve::Polyline;
use crate::math::{distance_xy_sq, Point3};
use crate::path::{SprayCurve, SprayPath};

use super::trim::{TrimCurve, TrimRegion};

/// A piece of geometry to be threaded into a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A curve sprayed along its direction.
    Curve(SprayCurve),
    /// A point the path has to pass through.
    Point(Point3),
}

impl Fragment {
    #[must_use]
    pub fn start(&self) -> Point3 {
        match self {
            Self::Curve(c) => c.start(),
            Self::Point(p) => *p,
        }
    }

    #[must_use]
    pub fn end(&self) -> Point3 {
        match self {
            Self::Curve(c) => c.end(),
            Self::Point(p) => *p,
        }
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::Curve(c) => Self::Curve(c.reversed()),
            Self::Point(p) => Self::Point(*p),
        }
    }

    fn push_into(self, path: &mut SprayPath) {
        if let Self::Curve(c) = self {
            path.push(c);
        }
    }
}

impl From<SprayCurve> for Fragment {
    fn from(curve: SprayCurve) -> Self {
        Self::Curve(curve)
    }
}

/// Portion of a closed boundary between two parameters, taking whichever of
/// the two complementary arcs is shorter. The result runs from `t0` to `t1`.
///
/// Returns a straight line when the two points coincide or one arc collapses,
/// and `None` when even that line is degenerate.
#[must_use]
pub fn shortest_arc(boundary: &Polyline, t0: f64, t1: f64, tolerance: f64) -> Option<Polyline> {
    let p0 = boundary.point_at(t0);
    let p1 = boundary.point_at(t1);
    if (p1 - p0).norm() < tolerance {
        return Polyline::line(p0, p1).ok();
    }
    match (boundary.sub_curve(t0, t1), boundary.sub_curve(t1, t0).map(|c| c.reversed())) {
        (Some(a), Some(b)) => Some(if a.length() < b.length() { a } else { b }),
        _ => Polyline::line(p0, p1).ok(),
    }
}

/// Splices fragments into one path, travelling along a boundary between them.
///
/// Between consecutive fragments the path leaves the exit point straight
/// onto the boundary, follows the shorter boundary arc, and comes straight
/// back to the entry point. All inserted curves are connectors. Fragments
/// stacked vertically on top of each other are joined directly. Unless the
/// direction is maintained, each fragment is reversed when that brings its
/// start closer to the previous exit.
pub struct ConnectThroughBoundary<'a> {
    fragments: &'a [Fragment],
    boundary: &'a Polyline,
    maintain_direction: bool,
    tolerance: Tolerance,
}

impl<'a> ConnectThroughBoundary<'a> {
    /// Creates a new `ConnectThroughBoundary` operation.
    #[must_use]
    pub fn new(fragments: &'a [Fragment], boundary: &'a Polyline) -> Self {
        Self {
            fragments,
            boundary,
            maintain_direction: false,
            tolerance: Tolerance::default(),
        }
    }

    /// Keeps every fragment in its given direction.
    #[must_use]
    pub fn with_maintain_direction(mut self, maintain: bool) -> Self {
        self.maintain_direction = maintain;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if the boundary is not
    /// closed.
    pub fn execute(&self) -> Result<SprayPath> {
        if !self.boundary.is_closed() {
            return Err(OperationError::InvalidInput("connection boundary must be closed".into()).into());
        }
        let mut path = SprayPath::default();
        let mut iter = self.fragments.iter();
        let Some(first) = iter.next() else {
            return Ok(path);
        };
        let mut exit = first.end();
        first.clone().push_into(&mut path);

        for fragment in iter {
            let fragment = if !self.maintain_direction
                && (fragment.end() - exit).norm() < (fragment.start() - exit).norm()
            {
                fragment.reversed()
            } else {
                fragment.clone()
            };
            let entry = fragment.start();
            path.extend(self.connectors(exit, entry).into_iter().map(SprayCurve::connector));
            exit = fragment.end();
            fragment.push_into(&mut path);
        }
        Ok(path)
    }

    fn connectors(&self, exit: Point3, entry: Point3) -> Vec<Polyline> {
        let tol = self.tolerance.distance;
        if (entry - exit).norm() <= tol {
            return Vec::new();
        }
        if distance_xy_sq(&exit, &entry) <= self.tolerance.distance_sq() {
            trace!("vertical layer transition");
            return Polyline::line(exit, entry).into_iter().collect();
        }

        let (t0, p0, _) = self.boundary.closest_point(&exit);
        let (t1, p1, _) = self.boundary.closest_point(&entry);
        let mut pieces = Vec::with_capacity(3);
        if (p0 - exit).norm() > tol {
            pieces.extend(Polyline::line(exit, p0).ok());
        }
        match shortest_arc(self.boundary, t0, t1, tol) {
            Some(arc) if arc.length() > tol => pieces.push(arc),
            _ => debug!("skipped degenerate boundary connector"),
        }
        if (entry - p1).norm() > tol {
            pieces.extend(Polyline::line(p1, entry).ok());
        }
        pieces
    }
}

/// Orders fragments greedily into a path, always moving to the nearest
/// free fragment end and joining with a straight connector.
pub struct ConnectNearestNeighbor<'a> {
    fragments: &'a [Fragment],
    maintain_direction: bool,
    tolerance: Tolerance,
}

impl<'a> ConnectNearestNeighbor<'a> {
    /// Creates a new `ConnectNearestNeighbor` operation.
    #[must_use]
    pub fn new(fragments: &'a [Fragment]) -> Self {
        Self {
            fragments,
            maintain_direction: false,
            tolerance: Tolerance::default(),
        }
    }

    /// Only enters fragments at their start.
    #[must_use]
    pub fn with_maintain_direction(mut self, maintain: bool) -> Self {
        self.maintain_direction = maintain;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the connection, starting with the first fragment.
    #[must_use]
    pub fn execute(&self) -> SprayPath {
        let mut path = SprayPath::default();
        let mut pool: SlotMap<DefaultKey, Fragment> = SlotMap::with_capacity(self.fragments.len());
        let mut order = Vec::with_capacity(self.fragments.len());
        for fragment in self.fragments {
            order.push(pool.insert(fragment.clone()));
        }
        let Some(first) = order.first().and_then(|&k| pool.remove(k)) else {
            return path;
        };
        let mut exit = first.end();
        first.push_into(&mut path);

        loop {
            let mut best: Option<(DefaultKey, bool, f64)> = None;
            for &key in &order {
                let Some(fragment) = pool.get(key) else {
                    continue;
                };
                let mut candidates = vec![(false, (fragment.start() - exit).norm())];
                if !self.maintain_direction {
                    candidates.push((true, (fragment.end() - exit).norm()));
                }
                for (reverse, d) in candidates {
                    let better = match best {
                        Some((_, _, best_d)) => d < best_d,
                        None => true,
                    };
                    if better {
                        best = Some((key, reverse, d));
                    }
                }
            }
            let Some((key, reverse, d)) = best else {
                break;
            };
            let Some(fragment) = pool.remove(key) else {
                break;
            };
            let fragment = if reverse { fragment.reversed() } else { fragment };
            if d > self.tolerance.distance {
                if let Ok(line) = Polyline::line(exit, fragment.start()) {
                    path.push(SprayCurve::connector(line));
                }
            }
            exit = fragment.end();
            fragment.push_into(&mut path);
        }
        path
    }
}

/// Reroutes connectors that cross a hole along the hole boundary.
///
/// Only the first hole a connector crosses is considered.
pub struct AvoidHoles<'a> {
    holes: &'a [Polyline],
    tolerance: Tolerance,
}

impl<'a> AvoidHoles<'a> {
    /// Creates a new `AvoidHoles` operation.
    #[must_use]
    pub fn new(holes: &'a [Polyline]) -> Self {
        Self {
            holes,
            tolerance: Tolerance::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the rerouting on `path`.
    ///
    /// # Errors
    ///
    /// Propagates failures from trimming against a hole.
    pub fn execute(&self, path: &SprayPath) -> Result<SprayPath> {
        let mut result = SprayPath::default();
        for curve in path {
            if !curve.is_connector {
                result.push(curve.clone());
                continue;
            }
            match self.reroute(curve)? {
                Some(detour) => result.extend(detour.into_iter().map(|c| SprayCurve {
                    speed: curve.speed,
                    ..c
                })),
                None => result.push(curve.clone()),
            }
        }
        Ok(result)
    }

    fn reroute(&self, connector: &SprayCurve) -> Result<Option<SprayPath>> {
        for (index, hole) in self.holes.iter().enumerate() {
            let trimmed = TrimCurve::new(&connector.curve, TrimRegion::Curve(hole))
                .with_tolerance(self.tolerance)
                .execute()?;
            if trimmed.crosses() {
                debug!(hole = index, "rerouting connector around hole");
                let ends = [Fragment::Point(connector.start()), Fragment::Point(connector.end())];
                let detour = ConnectThroughBoundary::new(&ends, hole)
                    .with_tolerance(self.tolerance)
                    .execute()?;
                return Ok(Some(detour));
            }
        }
        Ok(None)
    }
}
