//! Border classification and border loop reconstruction.
//!
//! A face edge is a border edge when its face-face slot is empty. The
//! `subset_*` variants additionally treat a neighbour outside the selection
//! as absent, so the cut around a face selection is reported as border.
//! Faces outside the selection are never reported.
//!
//! # Example
//!
//! ```
//! use mesh_types::PolyMesh;
//! use mesh_topology::{border_vertex_chains, border_vertices};
//!
//! // Unit square split into two triangles
//! let mesh = PolyMesh::from_raw(
//!     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
//!     &[vec![0, 1, 2], vec![0, 2, 3]],
//! )?;
//!
//! assert_eq!(border_vertices(&mesh, None), vec![0, 1, 2, 3]);
//!
//! let chains = border_vertex_chains(&mesh, None);
//! assert_eq!(chains.len(), 1);
//! assert_eq!(chains[0].vertices, vec![0, 1, 2, 3]);
//! # Ok::<(), mesh_types::MeshError>(())
//! ```

use std::collections::VecDeque;

use hashbrown::HashSet;
use mesh_types::{FaceId, MeshView, VertexId};
use smallvec::{SmallVec, smallvec};
use tracing::{debug, info, warn};

use crate::adjacency::{FaceFaceAdjacency, VertexFaceAdjacency, face_face_adjacencies};

/// A closed loop of border vertices, in face orientation.
///
/// The first vertex is not repeated at the end; the loop closes from the
/// last vertex back to the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BorderChain {
    /// Vertices along the loop.
    pub vertices: Vec<VertexId>,
}

impl BorderChain {
    /// Number of vertices in the loop.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the chain has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of border edges in the loop, including the closing one.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the loop passes through `vertex`.
    #[must_use]
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Directed edges of the loop, closing edge last.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Which faces take part in a border query.
#[derive(Clone, Copy)]
enum Scope<'a> {
    All,
    Subset(&'a HashSet<FaceId>),
}

impl Scope<'_> {
    fn includes<M: MeshView>(self, mesh: &M, face: FaceId) -> bool {
        !mesh.is_face_deleted(face)
            && match self {
                Self::All => true,
                Self::Subset(subset) => subset.contains(&face),
            }
    }

    fn is_border_slot<M: MeshView>(
        self,
        mesh: &M,
        ff: &FaceFaceAdjacency,
        face: FaceId,
        pos: usize,
    ) -> bool {
        if !self.includes(mesh, face) {
            return false;
        }
        match ff.get(face as usize).and_then(|slots| slots.get(pos)) {
            Some(None) => true,
            Some(Some(neighbor)) => !self.includes(mesh, *neighbor),
            None => false,
        }
    }

    fn is_border_face<M: MeshView>(self, mesh: &M, ff: &FaceFaceAdjacency, face: FaceId) -> bool {
        (0..mesh.face_vertices(face).len()).any(|pos| self.is_border_slot(mesh, ff, face, pos))
    }

    fn is_border_vertex<M: MeshView>(
        self,
        mesh: &M,
        vf: &VertexFaceAdjacency,
        ff: &FaceFaceAdjacency,
        vertex: VertexId,
    ) -> bool {
        vf.incidences(vertex).any(|(face, pos)| {
            let n = mesh.face_vertices(face).len();
            n > 0
                && (self.is_border_slot(mesh, ff, face, pos)
                    || self.is_border_slot(mesh, ff, face, (pos + n - 1) % n))
        })
    }

    fn border_face_edges<M: MeshView>(self, mesh: &M, ff: &FaceFaceAdjacency) -> Vec<(FaceId, usize)> {
        mesh.face_ids()
            .flat_map(|face| (0..mesh.face_vertices(face).len()).map(move |pos| (face, pos)))
            .filter(|&(face, pos)| self.is_border_slot(mesh, ff, face, pos))
            .collect()
    }

    fn border_faces<M: MeshView>(self, mesh: &M, ff: &FaceFaceAdjacency) -> Vec<FaceId> {
        mesh.face_ids()
            .filter(|&face| self.is_border_face(mesh, ff, face))
            .collect()
    }

    fn border_vertices<M: MeshView>(self, mesh: &M, ff: &FaceFaceAdjacency) -> Vec<VertexId> {
        let mut vertices: Vec<VertexId> = self
            .border_face_edges(mesh, ff)
            .into_iter()
            .flat_map(|(face, pos)| {
                [
                    mesh.face_vertex_id(face, pos),
                    mesh.face_next_vertex_id(face, pos),
                ]
            })
            .collect();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
    }

    fn border_vertex_chains<M: MeshView>(self, mesh: &M, ff: &FaceFaceAdjacency) -> Vec<BorderChain> {
        let edges = self.border_face_edges(mesh, ff);
        let mut graph = BorderGraph::build(mesh, &edges);

        let mut chains = Vec::new();
        let mut failed_starts = 0usize;
        for vertex in 0..mesh.next_vertex_id() {
            while graph.has_unvisited(vertex) {
                match graph.find_chain(vertex) {
                    Some(vertices) => chains.push(BorderChain { vertices }),
                    None => {
                        failed_starts += 1;
                        break;
                    }
                }
            }
        }

        let leftover = graph.unvisited_count();
        if leftover > 0 {
            warn!(
                "{} border edges from {} start vertices do not close into a loop",
                leftover, failed_starts
            );
        }
        info!(
            "Found {} border chains over {} border edges",
            chains.len(),
            edges.len()
        );
        chains
    }
}

/// Per-vertex outgoing border edges with a visited flag per slot.
#[derive(Debug)]
struct BorderGraph {
    next: Vec<SmallVec<[VertexId; 2]>>,
    visited: Vec<SmallVec<[bool; 2]>>,
}

impl BorderGraph {
    fn build<M: MeshView>(mesh: &M, edges: &[(FaceId, usize)]) -> Self {
        let n = mesh.next_vertex_id() as usize;
        let mut next: Vec<SmallVec<[VertexId; 2]>> = vec![SmallVec::new(); n];
        for &(face, pos) in edges {
            let a = mesh.face_vertex_id(face, pos);
            let b = mesh.face_next_vertex_id(face, pos);
            if a != b && (a as usize) < n && (b as usize) < n {
                next[a as usize].push(b);
            }
        }
        let visited = next.iter().map(|slots| smallvec![false; slots.len()]).collect();
        debug!("Built border graph with {} edges", edges.len());
        Self { next, visited }
    }

    fn first_unvisited(&self, vertex: VertexId, from: usize) -> Option<usize> {
        self.visited
            .get(vertex as usize)?
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(slot, &done)| (!done).then_some(slot))
    }

    fn has_unvisited(&self, vertex: VertexId) -> bool {
        self.first_unvisited(vertex, 0).is_some()
    }

    fn unvisited_count(&self) -> usize {
        self.visited.iter().flatten().filter(|&&done| !done).count()
    }

    fn unvisited_slots(&self, vertex: VertexId) -> usize {
        self.visited
            .get(vertex as usize)
            .map_or(0, |slots| slots.iter().filter(|&&done| !done).count())
    }

    /// Whether `to` can be reached from `from` over unvisited edges.
    fn reaches(&self, from: VertexId, to: VertexId) -> bool {
        let mut seen: HashSet<VertexId> = HashSet::from_iter([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(vertex) = queue.pop_front() {
            let v = vertex as usize;
            for (&target, &done) in self.next[v].iter().zip(&self.visited[v]) {
                if done {
                    continue;
                }
                if target == to {
                    return true;
                }
                if seen.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        false
    }

    /// Marks and returns the first unvisited slot of `vertex` from which
    /// `start` is still reachable once the slot is used.
    fn step_towards(&mut self, vertex: VertexId, start: VertexId) -> Option<usize> {
        // Away from the start, an only remaining edge must lead back.
        let forced = vertex != start && self.unvisited_slots(vertex) == 1;
        let mut from = 0;
        while let Some(slot) = self.first_unvisited(vertex, from) {
            from = slot + 1;
            self.visited[vertex as usize][slot] = true;
            let target = self.next[vertex as usize][slot];
            if forced || target == start || self.reaches(target, start) {
                return Some(slot);
            }
            self.visited[vertex as usize][slot] = false;
        }
        None
    }

    /// Walks a loop of unvisited edges from `start` back to `start`.
    ///
    /// At each vertex the first unvisited edge that still leaves a way back
    /// is taken, which gives the same loop an exhaustive depth-first search
    /// over slot order would find, in polynomial time. Every vertex reached
    /// can get back to `start`, so only the first step can fail. On success
    /// the loop's edges stay marked. On failure nothing is marked.
    fn find_chain(&mut self, start: VertexId) -> Option<Vec<VertexId>> {
        let mut path = vec![start];
        let mut marked: Vec<(VertexId, usize)> = Vec::new();
        let mut vertex = start;
        loop {
            let Some(slot) = self.step_towards(vertex, start) else {
                for (v, slot) in marked {
                    self.visited[v as usize][slot] = false;
                }
                return None;
            };
            marked.push((vertex, slot));
            let target = self.next[vertex as usize][slot];
            if target == start {
                return Some(path);
            }
            path.push(target);
            vertex = target;
        }
    }
}

fn resolve_ff<'a, M: MeshView + Sync>(
    mesh: &M,
    ff: Option<&'a FaceFaceAdjacency>,
    owned: &'a mut Option<FaceFaceAdjacency>,
) -> &'a FaceFaceAdjacency {
    match ff {
        Some(ff) => ff,
        None => owned.insert(face_face_adjacencies(mesh, None)),
    }
}

// =============================================================================
// Whole mesh
// =============================================================================

/// Whether edge `pos` of `face` (from vertex `pos` to `pos + 1`) is a border edge.
#[must_use]
pub fn is_border_face_edge<M: MeshView>(
    mesh: &M,
    ff: &FaceFaceAdjacency,
    face: FaceId,
    pos: usize,
) -> bool {
    Scope::All.is_border_slot(mesh, ff, face, pos)
}

/// Whether `face` has at least one border edge.
#[must_use]
pub fn is_border_face<M: MeshView>(mesh: &M, ff: &FaceFaceAdjacency, face: FaceId) -> bool {
    Scope::All.is_border_face(mesh, ff, face)
}

/// Whether `vertex` starts or ends a border edge of some incident face.
#[must_use]
pub fn is_border_vertex<M: MeshView>(
    mesh: &M,
    vf: &VertexFaceAdjacency,
    ff: &FaceFaceAdjacency,
    vertex: VertexId,
) -> bool {
    Scope::All.is_border_vertex(mesh, vf, ff, vertex)
}

/// All border edges as `(face, position)` pairs, by ascending face ID.
pub fn border_face_edges<M: MeshView + Sync>(
    mesh: &M,
    ff: Option<&FaceFaceAdjacency>,
) -> Vec<(FaceId, usize)> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::All.border_face_edges(mesh, ff)
}

/// Faces with at least one border edge, sorted by ID.
pub fn border_faces<M: MeshView + Sync>(mesh: &M, ff: Option<&FaceFaceAdjacency>) -> Vec<FaceId> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::All.border_faces(mesh, ff)
}

/// Vertices touching a border edge, sorted and unique.
pub fn border_vertices<M: MeshView + Sync>(
    mesh: &M,
    ff: Option<&FaceFaceAdjacency>,
) -> Vec<VertexId> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::All.border_vertices(mesh, ff)
}

/// Closed border loops.
///
/// Each border edge is used by at most one chain. At a vertex where several
/// border edges leave, the walk takes the first one from which the start
/// vertex can still be reached. Edges that cannot be closed into a loop are
/// dropped with a warning.
pub fn border_vertex_chains<M: MeshView + Sync>(
    mesh: &M,
    ff: Option<&FaceFaceAdjacency>,
) -> Vec<BorderChain> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::All.border_vertex_chains(mesh, ff)
}

// =============================================================================
// Face selection
// =============================================================================

/// Like [`is_border_face_edge`], with neighbours outside `subset` treated as absent.
#[must_use]
pub fn subset_is_border_face_edge<M: MeshView>(
    mesh: &M,
    ff: &FaceFaceAdjacency,
    subset: &HashSet<FaceId>,
    face: FaceId,
    pos: usize,
) -> bool {
    Scope::Subset(subset).is_border_slot(mesh, ff, face, pos)
}

/// Like [`is_border_face`], restricted to `subset`.
#[must_use]
pub fn subset_is_border_face<M: MeshView>(
    mesh: &M,
    ff: &FaceFaceAdjacency,
    subset: &HashSet<FaceId>,
    face: FaceId,
) -> bool {
    Scope::Subset(subset).is_border_face(mesh, ff, face)
}

/// Like [`is_border_vertex`], restricted to `subset`.
#[must_use]
pub fn subset_is_border_vertex<M: MeshView>(
    mesh: &M,
    vf: &VertexFaceAdjacency,
    ff: &FaceFaceAdjacency,
    subset: &HashSet<FaceId>,
    vertex: VertexId,
) -> bool {
    Scope::Subset(subset).is_border_vertex(mesh, vf, ff, vertex)
}

/// Border edges of the selection.
pub fn subset_border_face_edges<M: MeshView + Sync>(
    mesh: &M,
    subset: &HashSet<FaceId>,
    ff: Option<&FaceFaceAdjacency>,
) -> Vec<(FaceId, usize)> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::Subset(subset).border_face_edges(mesh, ff)
}

/// Border faces of the selection.
pub fn subset_border_faces<M: MeshView + Sync>(
    mesh: &M,
    subset: &HashSet<FaceId>,
    ff: Option<&FaceFaceAdjacency>,
) -> Vec<FaceId> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::Subset(subset).border_faces(mesh, ff)
}

/// Border vertices of the selection.
pub fn subset_border_vertices<M: MeshView + Sync>(
    mesh: &M,
    subset: &HashSet<FaceId>,
    ff: Option<&FaceFaceAdjacency>,
) -> Vec<VertexId> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::Subset(subset).border_vertices(mesh, ff)
}

/// Border loops of the selection.
pub fn subset_border_vertex_chains<M: MeshView + Sync>(
    mesh: &M,
    subset: &HashSet<FaceId>,
    ff: Option<&FaceFaceAdjacency>,
) -> Vec<BorderChain> {
    let mut owned = None;
    let ff = resolve_ff(mesh, ff, &mut owned);
    Scope::Subset(subset).border_vertex_chains(mesh, ff)
}
