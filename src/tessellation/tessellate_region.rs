use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::FixedFaceHandle;
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::{OperationError, Result};
use crate::geometry::region::Region;
use crate::geometry::surface::HeightField;
use crate::math::polygon_2d::Containment;
use crate::math::Point3;

use super::Triangle;

/// Number of grid cells across the longer side of the region when no
/// spacing is given.
const DEFAULT_DIVISIONS: f64 = 16.0;

/// Tessellates a region into planar patches lying on a height field.
///
/// The boundary loops become constraint edges of a constrained Delaunay
/// triangulation; a grid of interior Steiner points lets the patches follow
/// curved height fields and resolve later splits.
pub struct TessellateRegion<'a> {
    region: &'a Region,
    spacing: Option<f64>,
}

impl<'a> TessellateRegion<'a> {
    /// Creates a new `TessellateRegion` operation.
    #[must_use]
    pub fn new(region: &'a Region) -> Self {
        Self { region, spacing: None }
    }

    /// Sets the Steiner grid spacing.
    #[must_use]
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = Some(spacing);
        self
    }

    /// Executes the tessellation, returning counter-clockwise triangles.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] if the triangulation rejects a
    /// vertex or a loop has fewer than three points.
    pub fn execute(&self, height: &HeightField) -> Result<Vec<Triangle>> {
        let (min, max) = self.region.bbox();
        let extent = (max.x - min.x).max(max.y - min.y);
        let spacing = self.spacing.unwrap_or(extent / DEFAULT_DIVISIONS);

        let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
        if spacing > 0.0 {
            insert_steiner_grid(&mut cdt, self.region, min, max, spacing)?;
        }
        for lp in self.region.loops() {
            let pts: Vec<_> = lp.iter().map(|p| SpadePoint2::new(p.x, p.y)).collect();
            insert_constraint_loop(&mut cdt, &pts)?;
        }

        let interior_faces = classify_interior_faces(&cdt);

        let mut lifted: HashMap<usize, Point3> = HashMap::new();
        let mut triangles = Vec::with_capacity(interior_faces.len());
        for face_handle in cdt.inner_faces() {
            if !interior_faces.contains(&face_handle.fix().index()) {
                continue;
            }
            let verts = face_handle.vertices().map(|vh| {
                *lifted.entry(vh.fix().index()).or_insert_with(|| {
                    let pos = vh.position();
                    Point3::new(pos.x, pos.y, height.height(pos.x, pos.y))
                })
            });
            triangles.push(Triangle(verts));
        }
        Ok(triangles)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn insert_steiner_grid(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    region: &Region,
    min: Point3,
    max: Point3,
    spacing: f64,
) -> Result<()> {
    let nx = ((max.x - min.x) / spacing).ceil() as usize;
    let ny = ((max.y - min.y) / spacing).ceil() as usize;
    let clearance = spacing * 0.25;
    for j in 1..ny {
        for i in 1..nx {
            let p = Point3::new(min.x + i as f64 * spacing, min.y + j as f64 * spacing, 0.0);
            if region.containment(&p, clearance) == Containment::Inside {
                cdt.insert(SpadePoint2::new(p.x, p.y))
                    .map_err(|e: InsertionError| OperationError::Failed(format!("CDT insert: {e}")))?;
            }
        }
    }
    Ok(())
}

fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    points: &[SpadePoint2<f64>],
) -> Result<()> {
    if points.len() < 3 {
        return Err(OperationError::Failed("constraint loop needs at least 3 points".into()).into());
    }

    let mut handles = Vec::with_capacity(points.len());
    for &pt in points {
        let h = cdt
            .insert(pt)
            .map_err(|e: InsertionError| OperationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to && cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        }
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the loops using
/// flood-fill: crossing a constraint edge flips the parity.
fn classify_interior_faces(cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<spade::handles::InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            if let Some(inner) = edge.rev().face().as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            if let Some(inner_neighbor) = edge.rev().face().as_inner() {
                let n_idx = inner_neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let new_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                    depth + 1
                } else {
                    depth
                };
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((inner_neighbor.fix(), new_depth));
            }
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    #[test]
    fn square_area_is_preserved() {
        let region = Region::new(&[p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)], &[]).unwrap();
        let tris = TessellateRegion::new(&region).execute(&HeightField::flat(2.0)).unwrap();
        let area: f64 = tris.iter().map(Triangle::area).sum();
        assert_relative_eq!(area, 100.0, epsilon = 1e-9);
        assert!(tris.iter().all(|t| t.0.iter().all(|v| (v.z - 2.0).abs() < 1e-12)));
        assert!(tris.len() > 2, "steiner points should refine the mesh");
    }

    #[test]
    fn hole_is_excluded() {
        let outer = [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)];
        let hole = vec![p(3.0, 3.0), p(7.0, 3.0), p(7.0, 7.0), p(3.0, 7.0)];
        let region = Region::new(&outer, &[hole]).unwrap();
        let tris = TessellateRegion::new(&region)
            .with_spacing(1.0)
            .execute(&HeightField::flat(0.0))
            .unwrap();
        let area: f64 = tris.iter().map(Triangle::area).sum();
        assert_relative_eq!(area, 84.0, epsilon = 1e-9);
        assert!(tris.iter().all(|t| region.containment(&t.centroid(), 1e-9) == Containment::Inside));
    }
}
