use serde::{Deserialize, Serialize};

/// Minimum and maximum speed over a batch of paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min: f64,
    pub max: f64,
}

impl SpeedRange {
    /// Range covering a single speed.
    #[must_use]
    pub fn single(speed: f64) -> Self {
        Self { min: speed, max: speed }
    }

    /// Range covering every speed yielded, or `None` when there are none.
    #[must_use]
    pub fn from_speeds(speeds: impl IntoIterator<Item = f64>) -> Option<Self> {
        speeds.into_iter().fold(None, |acc: Option<Self>, s| {
            Some(acc.map_or(Self::single(s), |r| r.including(s)))
        })
    }

    /// Range widened to include `speed`.
    #[must_use]
    pub fn including(self, speed: f64) -> Self {
        Self {
            min: self.min.min(speed),
            max: self.max.max(speed),
        }
    }

    /// Smallest range covering both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Merges optional ranges.
    #[must_use]
    pub fn merge(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_extremes() {
        let r = SpeedRange::from_speeds([200.0, 50.0, 300.0]).unwrap_or(SpeedRange::single(0.0));
        assert_eq!(r, SpeedRange { min: 50.0, max: 300.0 });
        assert!(SpeedRange::from_speeds(std::iter::empty()).is_none());
    }

    #[test]
    fn merge_handles_missing_sides() {
        let a = Some(SpeedRange::single(5.0));
        let b = Some(SpeedRange { min: 1.0, max: 3.0 });
        assert_eq!(SpeedRange::merge(a, b), Some(SpeedRange { min: 1.0, max: 5.0 }));
        assert_eq!(SpeedRange::merge(None, b), b);
        assert_eq!(SpeedRange::merge(None, None), None);
    }
}
