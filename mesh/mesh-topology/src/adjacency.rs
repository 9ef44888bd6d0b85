//! Vertex-vertex, vertex-face, face-face and polyline adjacency maps.
//!
//! Every map is a plain vector indexed by entity ID, sized by the mesh's
//! `next_*_id()`. Deleted entities get empty lists (or `None`-filled slots),
//! so IDs can be used directly as indices without any renumbering.

use hashbrown::HashMap;
use mesh_types::{FaceId, MeshView, PolylineId, VertexId};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Which elements contribute edges to [`vertex_vertex_adjacencies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyOptions {
    /// Include face edges (consecutive cycle vertices, wrapping).
    ///
    /// Default: `true`
    pub faces: bool,

    /// Include polyline segments (consecutive vertices, not wrapping).
    ///
    /// Default: `true`
    pub polylines: bool,
}

impl Default for AdjacencyOptions {
    fn default() -> Self {
        Self {
            faces: true,
            polylines: true,
        }
    }
}

impl AdjacencyOptions {
    /// Faces and polylines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Face edges only.
    #[must_use]
    pub const fn faces_only() -> Self {
        Self {
            faces: true,
            polylines: false,
        }
    }

    /// Polyline segments only.
    #[must_use]
    pub const fn polylines_only() -> Self {
        Self {
            faces: false,
            polylines: true,
        }
    }

    /// Set whether face edges are included.
    #[must_use]
    pub const fn with_faces(mut self, faces: bool) -> Self {
        self.faces = faces;
        self
    }

    /// Set whether polyline segments are included.
    #[must_use]
    pub const fn with_polylines(mut self, polylines: bool) -> Self {
        self.polylines = polylines;
        self
    }
}

/// Per-vertex sorted, duplicate-free neighbour lists.
pub type VertexVertexAdjacency = Vec<Vec<VertexId>>;

/// Per-face neighbour slots, parallel to each face's vertex cycle.
///
/// Slot `i` of face `f` holds the face that traverses the edge
/// `vertex(i) → vertex(i + 1)` in the opposite direction, or `None`.
pub type FaceFaceAdjacency = Vec<Vec<Option<FaceId>>>;

/// Per-vertex incident polylines.
pub type VertexPolylineAdjacency = Vec<Vec<PolylineId>>;

/// Faces incident to each vertex, with the vertex's position in each face.
///
/// `faces[v][k]` is the `k`-th incident face of `v` and `positions[v][k]` is
/// where `v` sits in that face's cycle. A face that repeats a vertex is listed
/// once per occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexFaceAdjacency {
    /// Incident faces per vertex, in face iteration order.
    pub faces: Vec<Vec<FaceId>>,
    /// Position of the vertex in each incident face's cycle.
    pub positions: Vec<Vec<usize>>,
}

impl VertexFaceAdjacency {
    /// Number of vertex slots (the mesh's `next_vertex_id()`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Whether there are no vertex slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Faces incident to `vertex`.
    #[must_use]
    pub fn faces_of(&self, vertex: VertexId) -> &[FaceId] {
        self.faces.get(vertex as usize).map_or(&[], Vec::as_slice)
    }

    /// `(face, position)` pairs for `vertex`.
    pub fn incidences(&self, vertex: VertexId) -> impl Iterator<Item = (FaceId, usize)> + '_ {
        let positions = self.positions.get(vertex as usize).map_or(&[][..], Vec::as_slice);
        self.faces_of(vertex).iter().copied().zip(positions.iter().copied())
    }
}

/// Vertex-vertex adjacency from face edges and/or polyline segments.
///
/// The result has one entry per vertex ID below `next_vertex_id()`. Each
/// list is sorted and duplicate-free, and the relation is symmetric.
/// Repeated consecutive vertices do not make a vertex its own neighbour.
///
/// # Example
///
/// ```
/// use mesh_types::PolyMesh;
/// use mesh_topology::{AdjacencyOptions, vertex_vertex_adjacencies};
///
/// let mesh = PolyMesh::from_raw(
///     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
///     &[vec![0, 1, 2], vec![0, 2, 3]],
/// )?;
///
/// let vv = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::default());
/// assert_eq!(vv[0], vec![1, 2, 3]);
/// assert_eq!(vv[1], vec![0, 2]);
/// # Ok::<(), mesh_types::MeshError>(())
/// ```
pub fn vertex_vertex_adjacencies<M: MeshView>(
    mesh: &M,
    options: AdjacencyOptions,
) -> VertexVertexAdjacency {
    let mut vv: VertexVertexAdjacency = vec![Vec::new(); mesh.next_vertex_id() as usize];
    let n = vv.len();
    let mut link = |a: VertexId, b: VertexId| {
        if a != b && (a as usize) < n && (b as usize) < n {
            vv[a as usize].push(b);
            vv[b as usize].push(a);
        }
    };

    if options.faces {
        for f in mesh.face_ids() {
            let cycle = mesh.face_vertices(f);
            debug_assert!(cycle.len() >= 3, "face {f} has fewer than 3 vertices");
            for (i, &v) in cycle.iter().enumerate() {
                link(v, cycle[(i + 1) % cycle.len()]);
            }
        }
    }
    if options.polylines {
        for p in mesh.polyline_ids() {
            let seq = mesh.polyline_vertices(p);
            debug_assert!(seq.len() >= 2, "polyline {p} has fewer than 2 vertices");
            for pair in seq.windows(2) {
                link(pair[0], pair[1]);
            }
        }
    }

    for list in &mut vv {
        list.sort_unstable();
        list.dedup();
    }
    debug!("Built vertex-vertex adjacency for {} vertex slots", vv.len());
    vv
}

/// Vertex-face adjacency with in-face positions.
///
/// Built in one pass over the non-deleted faces; each vertex lists its
/// faces in face iteration order.
pub fn vertex_face_adjacencies<M: MeshView>(mesh: &M) -> VertexFaceAdjacency {
    let n = mesh.next_vertex_id() as usize;
    let mut vf = VertexFaceAdjacency {
        faces: vec![Vec::new(); n],
        positions: vec![Vec::new(); n],
    };
    for f in mesh.face_ids() {
        for (pos, &v) in mesh.face_vertices(f).iter().enumerate() {
            if let (Some(faces), Some(positions)) = (
                vf.faces.get_mut(v as usize),
                vf.positions.get_mut(v as usize),
            ) {
                faces.push(f);
                positions.push(pos);
            }
        }
    }
    debug!("Built vertex-face adjacency for {} vertex slots", n);
    vf
}

/// Polylines incident to each vertex, in polyline iteration order.
///
/// A polyline that revisits a vertex is listed once for it.
pub fn vertex_polyline_adjacencies<M: MeshView>(mesh: &M) -> VertexPolylineAdjacency {
    let mut vp: VertexPolylineAdjacency = vec![Vec::new(); mesh.next_vertex_id() as usize];
    for p in mesh.polyline_ids() {
        for &v in mesh.polyline_vertices(p) {
            if let Some(list) = vp.get_mut(v as usize) {
                if list.last() != Some(&p) {
                    list.push(p);
                }
            }
        }
    }
    vp
}

/// Face-face adjacency.
///
/// For slot `i` of face `f`, the faces incident to `v = vertex(i)` are
/// scanned for one whose cycle contains the reversed edge
/// `vertex(i + 1) → v`; the first match in vertex-face order is recorded.
/// Consistently oriented manifold edges therefore link both ways; edges
/// traversed in the same direction by both faces stay `None`. On an edge
/// shared by more than two faces the pick depends on face order (see
/// [`non_manifold_edges`] to detect such edges).
///
/// Deleted faces get `None`-filled slots. Faces are processed in parallel.
///
/// # Arguments
///
/// * `mesh` - The mesh to analyse
/// * `vf` - Precomputed vertex-face adjacency, or `None` to compute it here
pub fn face_face_adjacencies<M: MeshView + Sync>(
    mesh: &M,
    vf: Option<&VertexFaceAdjacency>,
) -> FaceFaceAdjacency {
    let owned;
    let vf = if let Some(vf) = vf {
        vf
    } else {
        owned = vertex_face_adjacencies(mesh);
        &owned
    };

    let ff: FaceFaceAdjacency = (0..mesh.next_face_id())
        .into_par_iter()
        .map(|f| {
            let cycle = mesh.face_vertices(f);
            if mesh.is_face_deleted(f) {
                return vec![None; cycle.len()];
            }
            let n = cycle.len();
            (0..n)
                .map(|i| opposite_face(mesh, vf, f, cycle[i], cycle[(i + 1) % n]))
                .collect()
        })
        .collect();

    debug!("Built face-face adjacency for {} face slots", ff.len());
    ff
}

/// First face (other than `face`) whose cycle contains `next → v`.
fn opposite_face<M: MeshView>(
    mesh: &M,
    vf: &VertexFaceAdjacency,
    face: FaceId,
    v: VertexId,
    next: VertexId,
) -> Option<FaceId> {
    vf.incidences(v)
        .find(|&(g, pos)| {
            g != face && !mesh.is_face_deleted(g) && mesh.face_prev_vertex_id(g, pos) == next
        })
        .map(|(g, _)| g)
}

/// Polylines touching the endpoints of each polyline.
///
/// Polyline `q` is listed for `p` when `q` passes through the first or last
/// vertex of `p`. The relation is only symmetric for endpoint-to-endpoint
/// contacts. Lists are sorted, duplicate-free and never contain the
/// polyline itself. Deleted polylines get empty lists.
pub fn polyline_polyline_adjacencies<M: MeshView>(
    mesh: &M,
    vp: Option<&VertexPolylineAdjacency>,
) -> Vec<Vec<PolylineId>> {
    let owned;
    let vp = if let Some(vp) = vp {
        vp
    } else {
        owned = vertex_polyline_adjacencies(mesh);
        &owned
    };

    let mut pp = vec![Vec::new(); mesh.next_polyline_id() as usize];
    for p in mesh.polyline_ids() {
        let seq = mesh.polyline_vertices(p);
        let (Some(&first), Some(&last)) = (seq.first(), seq.last()) else {
            continue;
        };
        let mut list: Vec<PolylineId> = [first, last]
            .iter()
            .filter_map(|&v| vp.get(v as usize))
            .flatten()
            .copied()
            .filter(|&q| q != p)
            .collect();
        list.sort_unstable();
        list.dedup();
        pp[p as usize] = list;
    }
    pp
}

/// Why an edge is not a clean manifold edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonManifoldKind {
    /// More than two faces use the edge.
    Overshared,
    /// Exactly two faces use the edge, in the same direction.
    InconsistentOrientation,
}

/// An undirected edge whose face-face slots are ambiguous or missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonManifoldEdge {
    /// Edge endpoints, smaller ID first.
    pub vertices: (VertexId, VertexId),
    /// Faces using the edge, in face order.
    pub faces: Vec<FaceId>,
    /// The problem with the edge.
    pub kind: NonManifoldKind,
}

/// Diagnose edges that [`face_face_adjacencies`] cannot resolve cleanly.
///
/// This is a separate opt-in pass; it does not change how face-face
/// adjacency is computed. Results are sorted by edge.
pub fn non_manifold_edges<M: MeshView>(mesh: &M) -> Vec<NonManifoldEdge> {
    // (min, max) -> [(face, traversed min -> max)]
    let mut uses: HashMap<(VertexId, VertexId), Vec<(FaceId, bool)>> = HashMap::new();
    for f in mesh.face_ids() {
        let cycle = mesh.face_vertices(f);
        for (i, &a) in cycle.iter().enumerate() {
            let b = cycle[(i + 1) % cycle.len()];
            if a == b {
                continue;
            }
            uses.entry((a.min(b), a.max(b))).or_default().push((f, a < b));
        }
    }

    let mut out: Vec<NonManifoldEdge> = uses
        .into_iter()
        .filter_map(|(vertices, faces)| {
            let kind = match faces.as_slice() {
                [(_, d0), (_, d1)] if d0 == d1 => NonManifoldKind::InconsistentOrientation,
                f if f.len() > 2 => NonManifoldKind::Overshared,
                _ => return None,
            };
            Some(NonManifoldEdge {
                vertices,
                faces: faces.into_iter().map(|(f, _)| f).collect(),
                kind,
            })
        })
        .collect();
    out.sort_unstable_by_key(|e| e.vertices);

    if !out.is_empty() {
        warn!("Found {} non-manifold edges", out.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{MeshBuild, PolyMesh};

    fn unit_square() -> PolyMesh {
        PolyMesh::from_raw(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            &[vec![0, 1, 2], vec![0, 2, 3]],
        )
        .unwrap()
    }

    fn fan(n: u32) -> PolyMesh {
        // n vertices plus a hub; faces (hub, i, i + 1)
        let mut mesh = PolyMesh::new();
        for i in 0..=n {
            mesh.add_vertex(mesh_types::Point3::new(f64::from(i), 0.0, 0.0));
        }
        for i in 1..n {
            mesh.add_face(&[0, i, i + 1]).unwrap();
        }
        mesh
    }

    #[test]
    fn unit_square_vertex_vertex() {
        let vv = vertex_vertex_adjacencies(&unit_square(), AdjacencyOptions::default());
        assert_eq!(vv, vec![vec![1, 2, 3], vec![0, 2], vec![0, 1, 3], vec![0, 2]]);
    }

    #[test]
    fn unit_square_face_face() {
        let ff = face_face_adjacencies(&unit_square(), None);
        // Shared edge: 2 -> 0 on face 0 against 0 -> 2 on face 1
        assert_eq!(ff, vec![vec![None, None, Some(1)], vec![Some(0), None, None]]);
    }

    #[test]
    fn vertex_face_positions() {
        let vf = vertex_face_adjacencies(&unit_square());
        assert_eq!(vf.faces_of(2), &[0, 1]);
        assert_eq!(vf.incidences(2).collect::<Vec<_>>(), vec![(0, 2), (1, 1)]);
        assert_eq!(vf.faces_of(3), &[1]);
        assert!(vf.faces_of(99).is_empty());
    }

    #[test]
    fn polylines_contribute_unwrapped_segments() {
        let mut mesh = unit_square();
        let a = mesh.add_vertex(mesh_types::Point3::new(2.0, 0.0, 0.0));
        let b = mesh.add_vertex(mesh_types::Point3::new(3.0, 0.0, 0.0));
        mesh.add_polyline(&[1, a, b]).unwrap();

        let all = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::default());
        assert_eq!(all[1], vec![0, 2, a]);
        assert_eq!(all[b as usize], vec![a]);

        let faces = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::faces_only());
        assert!(faces[b as usize].is_empty());

        let lines = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::polylines_only());
        assert_eq!(lines[1], vec![a]);
        assert!(lines[0].is_empty());
    }

    #[test]
    fn deleted_faces_are_skipped() {
        let mut mesh = unit_square();
        mesh.delete_face(1);
        let vv = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::default());
        assert!(vv[3].is_empty());

        let ff = face_face_adjacencies(&mesh, None);
        assert_eq!(ff[0], vec![None, None, None]);
        assert!(ff[1].iter().all(Option::is_none));
    }

    #[test]
    fn fan_interior_edges_link() {
        let mesh = fan(5);
        let vf = vertex_face_adjacencies(&mesh);
        let ff = face_face_adjacencies(&mesh, Some(&vf));
        // Face k = (0, k+1, k+2); its slot 2 (k+2 -> 0) meets slot 0 of face k+1
        for k in 0..3 {
            assert_eq!(ff[k][2], Some(k as u32 + 1));
            assert_eq!(ff[k + 1][0], Some(k as u32));
        }
    }

    #[test]
    fn flipped_face_does_not_link() {
        let mesh = PolyMesh::from_raw(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            &[vec![0, 1, 2], vec![2, 0, 3]],
        )
        .unwrap();
        // Both faces traverse 2 -> 0
        let ff = face_face_adjacencies(&mesh, None);
        assert!(ff.iter().flatten().all(Option::is_none));

        let diag = non_manifold_edges(&mesh);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag[0].vertices, (0, 2));
        assert_eq!(diag[0].kind, NonManifoldKind::InconsistentOrientation);
    }

    #[test]
    fn overshared_edge_takes_first_match() {
        // Three faces on edge 0-1: one forward, two backward
        let mesh = PolyMesh::from_raw(
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 1.0, 0.0, 0.5, -1.0, 0.0, 0.5, 0.0, 1.0,
            ],
            &[vec![0, 1, 2], vec![1, 0, 3], vec![1, 0, 4]],
        )
        .unwrap();
        let ff = face_face_adjacencies(&mesh, None);
        assert_eq!(ff[0][0], Some(1));
        assert_eq!(ff[1][0], Some(0));
        assert_eq!(ff[2][0], Some(0));

        let diag = non_manifold_edges(&mesh);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag[0].kind, NonManifoldKind::Overshared);
        assert_eq!(diag[0].faces, vec![0, 1, 2]);
    }

    #[test]
    fn polyline_endpoint_adjacency() {
        let mut mesh = PolyMesh::new();
        for i in 0..5 {
            mesh.add_vertex(mesh_types::Point3::new(f64::from(i), 0.0, 0.0));
        }
        let p0 = mesh.add_polyline(&[0, 1, 2]).unwrap();
        let p1 = mesh.add_polyline(&[2, 3]).unwrap();
        let p2 = mesh.add_polyline(&[1, 4]).unwrap();

        let vp = vertex_polyline_adjacencies(&mesh);
        assert_eq!(vp[1], vec![p0, p2]);

        let pp = polyline_polyline_adjacencies(&mesh, Some(&vp));
        // Vertex 1 is interior to p0, so only p2 sees the contact
        assert_eq!(pp[p0 as usize], vec![p1]);
        assert_eq!(pp[p1 as usize], vec![p0]);
        assert_eq!(pp[p2 as usize], vec![p0]);
    }
}
