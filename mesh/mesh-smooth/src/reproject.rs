//! Closest-point queries against a snapshot of the original surface.

use std::cmp::Ordering;

use mesh_types::{MeshView, Point3, Triangle, VertexId};
use spatial_index::{Aabb, AabbBound, AabbTree, Octree, OctreeParams};
use tracing::debug;

use crate::error::SmoothResult;
use crate::params::Reprojection;

type BoxExtractor = fn(&Aabb<3>, AabbBound, usize) -> f64;
type BoxComparator = fn(&Aabb<3>, &Aabb<3>) -> Ordering;
type TriangleTree = AabbTree<Aabb<3>, Triangle, BoxExtractor, BoxComparator, 3>;

fn box_bound(key: &Aabb<3>, bound: AabbBound, axis: usize) -> f64 {
    match bound {
        AabbBound::Min => key.min[axis],
        AabbBound::Max => key.max[axis],
    }
}

fn box_cmp(a: &Aabb<3>, b: &Aabb<3>) -> Ordering {
    a.min
        .iter()
        .chain(&a.max)
        .zip(b.min.iter().chain(&b.max))
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Fan triangulation of every live face: `(v0, vi, vi+1)`.
pub(crate) fn fan_triangles<M: MeshView>(mesh: &M) -> Vec<[VertexId; 3]> {
    let n = mesh.next_vertex_id();
    let mut out = Vec::new();
    for f in mesh.face_ids() {
        let cycle = mesh.face_vertices(f);
        if cycle.iter().any(|&v| v >= n) {
            continue;
        }
        for i in 1..cycle.len().saturating_sub(1) {
            out.push([cycle[0], cycle[i], cycle[i + 1]]);
        }
    }
    out
}

fn triangle_at(positions: &[Point3<f64>], [a, b, c]: [VertexId; 3]) -> Triangle {
    Triangle::new(
        positions[a as usize],
        positions[b as usize],
        positions[c as usize],
    )
}

/// Snapshot of the original surface used to pull smoothed vertices back.
pub(crate) enum SurfaceProjector {
    Tree(TriangleTree),
    Octree {
        octree: Octree<VertexId>,
        triangles: Vec<Triangle>,
        vertex_triangles: Vec<Vec<usize>>,
    },
}

impl SurfaceProjector {
    /// Build the projector, or `None` when reprojection is off or the mesh
    /// has no faces.
    pub(crate) fn build<M: MeshView>(
        mesh: &M,
        mode: Reprojection,
        octree_max_box_elements: usize,
    ) -> SmoothResult<Option<Self>> {
        if mode == Reprojection::None {
            return Ok(None);
        }
        let corners = fan_triangles(mesh);
        if corners.is_empty() {
            debug!("No faces to reproject onto");
            return Ok(None);
        }
        let positions: Vec<Point3<f64>> = (0..mesh.next_vertex_id())
            .map(|v| mesh.vertex_position(v))
            .collect();
        let triangles: Vec<Triangle> = corners.iter().map(|&c| triangle_at(&positions, c)).collect();

        let projector = match mode {
            Reprojection::None => return Ok(None),
            Reprojection::AabbTree => {
                let entries = triangles.into_iter().map(|t| {
                    let (min, max) = t.bounds();
                    (Aabb::new(min, max), t)
                });
                let tree = TriangleTree::from_entries(
                    entries,
                    box_bound as BoxExtractor,
                    box_cmp as BoxComparator,
                );
                debug!("Built reprojection tree over {} triangles", tree.len());
                Self::Tree(tree)
            }
            Reprojection::Octree => {
                let mut vertex_triangles = vec![Vec::new(); positions.len()];
                for (t, corner) in corners.iter().enumerate() {
                    for &v in corner {
                        vertex_triangles[v as usize].push(t);
                    }
                }
                let surface = mesh_types::Aabb::from_points(
                    corners.iter().flatten().map(|&v| &positions[v as usize]),
                );
                let params = OctreeParams::enclosing(surface.min, surface.max)
                    .with_max_box_elements(octree_max_box_elements);
                let entries = vertex_triangles
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| !t.is_empty())
                    .map(|(v, _)| (positions[v], v as VertexId));
                let octree = Octree::from_entries(params, entries)?;
                debug!(
                    "Built reprojection octree: {} vertices in {} nodes",
                    octree.len(),
                    octree.node_count()
                );
                Self::Octree {
                    octree,
                    triangles,
                    vertex_triangles,
                }
            }
        };
        Ok(Some(projector))
    }

    /// Closest point on the snapshot surface, or `None` if `p` cannot be placed.
    pub(crate) fn project(&self, p: &Point3<f64>) -> Option<Point3<f64>> {
        match self {
            Self::Tree(tree) => {
                let (id, _) = tree.nearest_by(&[p.x, p.y, p.z], |_, t| (t.closest_point(p) - p).norm())?;
                tree.get(id).map(|(_, t)| t.closest_point(p))
            }
            Self::Octree {
                octree,
                triangles,
                vertex_triangles,
            } => {
                if !octree.root_contains(p) {
                    return None;
                }
                let vertex = nearest_vertex(octree, p)?;
                vertex_triangles[vertex as usize]
                    .iter()
                    .map(|&t| triangles[t].closest_point(p))
                    .min_by(|a, b| (a - p).norm_squared().total_cmp(&(b - p).norm_squared()))
            }
        }
    }
}

/// Nearest stored vertex among the leaf containing `p` and its neighbours,
/// falling back to an exact search when those are all empty.
fn nearest_vertex(octree: &Octree<VertexId>, p: &Point3<f64>) -> Option<VertexId> {
    let leaf = octree.find_leaf(p)?;
    let mut cells = octree.neighbors(leaf);
    cells.push(leaf);

    let local = cells
        .iter()
        .filter_map(|&id| octree.node(id))
        .flat_map(|node| node.entries())
        .min_by(|(a, _), (b, _)| (a - p).norm_squared().total_cmp(&(b - p).norm_squared()))
        .map(|(_, v)| *v);

    local.or_else(|| octree.nearest(p).map(|(_, v, _)| *v))
}
