use super::{Point3, TOLERANCE};

/// Returns the minimum XY distance from `p` to the segment `a`-`b`.
#[must_use]
pub fn point_segment_distance_2d(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq < TOLERANCE * TOLERANCE {
        // Degenerate segment (zero length).
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);

    let closest_x = a.x + t * dx;
    let closest_y = a.y + t * dy;

    ((p.x - closest_x).powi(2) + (p.y - closest_y).powi(2)).sqrt()
}

/// Closest point on the 3D segment `a`-`b` to `p`, with its fraction in `[0, 1]`.
#[must_use]
pub fn closest_on_segment(p: &Point3, a: &Point3, b: &Point3) -> (Point3, f64) {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq < TOLERANCE * TOLERANCE {
        return (*a, 0.0);
    }
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    (a + d * t, t)
}

/// Closest points between segments `p0`-`p1` and `q0`-`q1`.
///
/// Returns `(s, t, distance)` where `s` and `t` are fractions along each
/// segment.
#[must_use]
pub fn segment_segment_closest(p0: &Point3, p1: &Point3, q0: &Point3, q1: &Point3) -> (f64, f64, f64) {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a < TOLERANCE && e < TOLERANCE {
        (0.0, 0.0)
    } else if a < TOLERANCE {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e < TOLERANCE {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > TOLERANCE {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let cp = p0 + d1 * s;
    let cq = q0 + d2 * t;
    (s, t, (cp - cq).norm())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn point_segment_perpendicular() {
        let d = point_segment_distance_2d(&p(5.0, 3.0, 7.0), &p(0.0, 0.0, 0.0), &p(10.0, 0.0, 0.0));
        assert!((d - 3.0).abs() < 1e-12);
    }

    #[test]
    fn point_segment_clamps_to_end() {
        let d = point_segment_distance_2d(&p(13.0, 4.0, 0.0), &p(0.0, 0.0, 0.0), &p(10.0, 0.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn closest_on_segment_fraction() {
        let (pt, t) = closest_on_segment(&p(2.5, 1.0, 1.0), &p(0.0, 0.0, 0.0), &p(10.0, 0.0, 0.0));
        assert!((t - 0.25).abs() < 1e-12);
        assert!((pt.x - 2.5).abs() < 1e-12);
    }

    #[test]
    fn crossing_segments_touch() {
        let (s, t, d) = segment_segment_closest(
            &p(0.0, 0.0, 0.0),
            &p(2.0, 0.0, 0.0),
            &p(1.0, -1.0, 0.0),
            &p(1.0, 1.0, 0.0),
        );
        assert!(d < 1e-12);
        assert!((s - 0.5).abs() < 1e-12);
        assert!((t - 0.5).abs() < 1e-12);
    }

    #[test]
    fn skew_segments_distance() {
        let (_, _, d) = segment_segment_closest(
            &p(0.0, 0.0, 0.0),
            &p(2.0, 0.0, 0.0),
            &p(1.0, -1.0, 3.0),
            &p(1.0, 1.0, 3.0),
        );
        assert!((d - 3.0).abs() < 1e-12);
    }
}
