use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::geometry::region::Region;
use crate::geometry::surface::{HeightField, TrimmedSurface};
use crate::math::polygon_2d::signed_area_2d;
use crate::math::{Point3, TOLERANCE};
use crate::tessellation::Triangle;

/// Splits a trimmed surface along its intersection with a cutter height
/// field.
///
/// Every patch is clipped along the zero set of `cutter - surface`; clipped
/// fragments on the same side that share an edge are grouped into connected
/// pieces, and each piece's free edges are chained into its boundary loops.
/// When the cutter does not cross the surface the result is the whole
/// surface as a single piece.
pub struct SplitByCutter<'a> {
    surface: &'a TrimmedSurface,
    cutter: &'a HeightField,
}

/// One side of the split.
#[derive(Debug, Clone)]
pub struct SplitPiece {
    /// The piece as a trimmed surface on the original height field.
    pub surface: TrimmedSurface,
    /// Whether the cutter lies above this piece.
    pub below_cutter: bool,
}

impl<'a> SplitByCutter<'a> {
    /// Creates a new `SplitByCutter` operation.
    #[must_use]
    pub fn new(surface: &'a TrimmedSurface, cutter: &'a HeightField) -> Self {
        Self { surface, cutter }
    }

    /// Executes the split.
    ///
    /// # Errors
    ///
    /// Currently infallible; pieces whose boundary cannot form a region are
    /// dropped with a warning.
    pub fn execute(&self) -> Result<Vec<SplitPiece>> {
        let gap = |p: &Point3| self.cutter.height_above(p);
        let patches = self.surface.patches();

        let mut positive = false;
        let mut negative = false;
        for tri in patches {
            for v in &tri.0 {
                if gap(v) > 0.0 {
                    positive = true;
                } else {
                    negative = true;
                }
            }
        }
        if !(positive && negative) {
            return Ok(vec![SplitPiece {
                surface: self.surface.clone(),
                below_cutter: positive,
            }]);
        }

        let mut vertices = VertexPool::default();
        let mut fragments: Vec<Fragment> = Vec::new();
        for tri in patches {
            let (above, below) = clip_triangle(tri, &gap, &mut vertices);
            for (verts, side) in [(above, true), (below, false)] {
                if verts.len() >= 3 {
                    fragments.push(Fragment { verts, below_cutter: side });
                }
            }
        }

        let components = group_fragments(&fragments);
        debug!(fragments = fragments.len(), pieces = components.len(), "split surface by cutter");

        let mut pieces = Vec::with_capacity(components.len());
        for component in components {
            let below_cutter = fragments[component[0]].below_cutter;
            match self.assemble_piece(&fragments, &component, &vertices) {
                Some(surface) => pieces.push(SplitPiece { surface, below_cutter }),
                None => warn!(fragments = component.len(), "dropping split piece without a valid boundary"),
            }
        }
        Ok(pieces)
    }

    fn assemble_piece(&self, fragments: &[Fragment], component: &[usize], pool: &VertexPool) -> Option<TrimmedSurface> {
        let mut directed: HashMap<(usize, usize), usize> = HashMap::new();
        for &f in component {
            let verts = &fragments[f].verts;
            let n = verts.len();
            for i in 0..n {
                *directed.entry((verts[i], verts[(i + 1) % n])).or_insert(0) += 1;
            }
        }
        let mut boundary: Vec<(usize, usize)> = directed
            .keys()
            .filter(|(u, v)| !directed.contains_key(&(*v, *u)))
            .copied()
            .collect();
        boundary.sort_unstable();

        let mut loops: Vec<Vec<Point3>> = chain_loops(&boundary)
            .into_iter()
            .map(|ids| simplify_loop(ids.iter().map(|&i| pool.points[i]).collect()))
            .filter(|lp| lp.len() >= 3 && signed_area_2d(lp).abs() > TOLERANCE)
            .collect();
        if loops.is_empty() {
            return None;
        }
        loops.sort_by(|a, b| signed_area_2d(b).abs().total_cmp(&signed_area_2d(a).abs()));
        let outer = loops.remove(0);
        let region = Region::new(&outer, &loops).ok()?;

        let patches = component
            .iter()
            .flat_map(|&f| {
                let verts = &fragments[f].verts;
                (1..verts.len() - 1).map(move |i| {
                    Triangle([pool.points[verts[0]], pool.points[verts[i]], pool.points[verts[i + 1]]])
                })
            })
            .collect();
        Some(TrimmedSurface::from_parts(self.surface.height_field().clone(), region, patches))
    }
}

/// A clipped convex polygon, as indices into the vertex pool.
struct Fragment {
    verts: Vec<usize>,
    below_cutter: bool,
}

/// Interns points by their exact coordinates so that fragments produced
/// from neighbouring patches share vertex indices.
#[derive(Default)]
struct VertexPool {
    points: Vec<Point3>,
    index: HashMap<[u64; 3], usize>,
}

impl VertexPool {
    fn intern(&mut self, p: Point3) -> usize {
        *self.index.entry(point_key(&p)).or_insert_with(|| {
            self.points.push(p);
            self.points.len() - 1
        })
    }
}

// Adding 0.0 folds -0.0 into 0.0.
fn point_key(p: &Point3) -> [u64; 3] {
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

/// Zero crossing of `gap` on the edge `a`-`b`, computed from the endpoint
/// with the smaller key so both patches sharing the edge get the same point.
fn edge_crossing(a: Point3, b: Point3, gap: &impl Fn(&Point3) -> f64) -> Point3 {
    let (lo, hi) = if point_key(&a) <= point_key(&b) { (a, b) } else { (b, a) };
    let (g_lo, g_hi) = (gap(&lo), gap(&hi));
    let t = g_lo / (g_lo - g_hi);
    if t <= 0.0 {
        lo
    } else if t >= 1.0 {
        hi
    } else {
        lo + (hi - lo) * t
    }
}

/// Clips a triangle into the part where `gap > 0` and the rest.
fn clip_triangle(tri: &Triangle, gap: &impl Fn(&Point3) -> f64, pool: &mut VertexPool) -> (Vec<usize>, Vec<usize>) {
    let mut above = Vec::with_capacity(4);
    let mut below = Vec::with_capacity(4);
    for i in 0..3 {
        let p = tri.0[i];
        let q = tri.0[(i + 1) % 3];
        let p_above = gap(&p) > 0.0;
        let q_above = gap(&q) > 0.0;
        let pi = pool.intern(p);
        if p_above {
            above.push(pi);
        } else {
            below.push(pi);
        }
        if p_above != q_above {
            let x = pool.intern(edge_crossing(p, q, gap));
            above.push(x);
            below.push(x);
        }
    }
    (dedup_cyclic(above), dedup_cyclic(below))
}

fn dedup_cyclic(mut verts: Vec<usize>) -> Vec<usize> {
    verts.dedup();
    while verts.len() > 1 && verts.first() == verts.last() {
        verts.pop();
    }
    verts
}

/// Groups fragments on the same side that share an edge, using union-find.
fn group_fragments(fragments: &[Fragment]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..fragments.len()).collect();
    let mut edge_owner: HashMap<(usize, usize), usize> = HashMap::new();
    for (f, frag) in fragments.iter().enumerate() {
        let n = frag.verts.len();
        for i in 0..n {
            let (u, v) = (frag.verts[i], frag.verts[(i + 1) % n]);
            let key = (u.min(v), u.max(v));
            match edge_owner.get(&key) {
                Some(&other) if fragments[other].below_cutter == frag.below_cutter => {
                    let (ra, rb) = (find(&mut parent, f), find(&mut parent, other));
                    if ra != rb {
                        parent[ra] = rb;
                    }
                }
                Some(_) => {}
                None => {
                    edge_owner.insert(key, f);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for f in 0..fragments.len() {
        let root = find(&mut parent, f);
        groups.entry(root).or_default().push(f);
    }
    let mut components: Vec<Vec<usize>> = groups.into_values().collect();
    components.sort_by_key(|c| c[0]);
    components
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Chains directed boundary edges into closed vertex loops.
fn chain_loops(edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(u, v) in edges {
        outgoing.entry(u).or_default().push(v);
    }
    let mut loops = Vec::new();
    for &(start, _) in edges {
        let mut lp = Vec::new();
        let mut current = start;
        loop {
            let Some(next) = outgoing.get_mut(&current).and_then(Vec::pop) else {
                break;
            };
            lp.push(current);
            current = next;
            if current == start {
                break;
            }
        }
        if current == start && lp.len() >= 3 {
            loops.push(lp);
        }
    }
    loops
}

/// Drops vertices lying on the straight line through their neighbours.
fn simplify_loop(points: Vec<Point3>) -> Vec<Point3> {
    let n = points.len();
    if n < 4 {
        return points;
    }
    let kept: Vec<Point3> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            let a = points[i] - prev;
            let b = next - points[i];
            let scale = a.norm() * b.norm();
            a.cross(&b).norm() > 1e-9 * scale
        })
        .map(|i| points[i])
        .collect();
    if kept.len() < 3 {
        points
    } else {
        kept
    }
}
