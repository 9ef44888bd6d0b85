//! Connected components over face-face adjacency.
//!
//! Two faces are connected when a face-face link joins them, in either
//! direction. Border slots (`None`) act as boundaries, so faces touching
//! only at a vertex, or across an inconsistently oriented edge, fall into
//! different components.

use hashbrown::HashSet;
use mesh_types::{FaceId, MeshView};
use smallvec::SmallVec;
use tracing::info;

use crate::adjacency::{FaceFaceAdjacency, face_face_adjacencies};

/// Partition of faces into connected components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceComponents {
    /// Faces of each component, sorted by ID. Components are numbered in
    /// discovery order, which follows ascending face ID of their first face.
    pub components: Vec<Vec<FaceId>>,
    /// Component index of each face ID; `None` for deleted or unselected faces.
    pub face_component: Vec<Option<usize>>,
}

impl FaceComponents {
    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether there are no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component containing `face`.
    #[must_use]
    pub fn component_of(&self, face: FaceId) -> Option<usize> {
        self.face_component.get(face as usize).copied().flatten()
    }

    /// The component with the most faces (the first one on ties).
    #[must_use]
    pub fn largest(&self) -> Option<&[FaceId]> {
        self.components
            .iter()
            .enumerate()
            .max_by_key(|(i, c)| (c.len(), std::cmp::Reverse(*i)))
            .map(|(_, c)| c.as_slice())
    }

    /// Sizes of all components, in component order.
    #[must_use]
    pub fn sizes(&self) -> Vec<usize> {
        self.components.iter().map(Vec::len).collect()
    }
}

/// Connected components of all non-deleted faces.
///
/// # Arguments
///
/// * `mesh` - The mesh to analyse
/// * `ff` - Precomputed face-face adjacency, or `None` to compute it here
///
/// # Example
///
/// ```
/// use mesh_types::PolyMesh;
/// use mesh_topology::connected_components;
///
/// // Two separate triangles
/// let mesh = PolyMesh::from_raw(
///     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
///       5.0, 0.0, 0.0, 6.0, 0.0, 0.0, 5.0, 1.0, 0.0],
///     &[vec![0, 1, 2], vec![3, 4, 5]],
/// )?;
///
/// let cc = connected_components(&mesh, None);
/// assert_eq!(cc.len(), 2);
/// assert_eq!(cc.component_of(1), Some(1));
/// # Ok::<(), mesh_types::MeshError>(())
/// ```
pub fn connected_components<M: MeshView + Sync>(
    mesh: &M,
    ff: Option<&FaceFaceAdjacency>,
) -> FaceComponents {
    let owned;
    let ff = if let Some(ff) = ff {
        ff
    } else {
        owned = face_face_adjacencies(mesh, None);
        &owned
    };
    let result = components_where(mesh, ff, |_| true);
    info!(
        "Found {} connected components over {} faces",
        result.len(),
        result.components.iter().map(Vec::len).sum::<usize>()
    );
    result
}

/// Connected components of a face selection.
///
/// Only faces in `subset` start components or are traversed, so the
/// components are those of the sub-mesh the selection describes.
pub fn subset_connected_components<M: MeshView + Sync>(
    mesh: &M,
    subset: &HashSet<FaceId>,
    ff: Option<&FaceFaceAdjacency>,
) -> FaceComponents {
    let owned;
    let ff = if let Some(ff) = ff {
        ff
    } else {
        owned = face_face_adjacencies(mesh, None);
        &owned
    };
    let result = components_where(mesh, ff, |f| subset.contains(&f));
    info!(
        "Found {} connected components in a selection of {} faces",
        result.len(),
        subset.len()
    );
    result
}

/// Iterative depth-first search from each unvisited eligible face.
///
/// Links are followed in both directions. Around a non-manifold edge the
/// adjacency slots form a one-way cycle, so `g` may appear in `ff[f]`
/// without `f` appearing in `ff[g]`.
fn components_where<M: MeshView>(
    mesh: &M,
    ff: &FaceFaceAdjacency,
    eligible: impl Fn(FaceId) -> bool,
) -> FaceComponents {
    let accept = |f: FaceId| !mesh.is_face_deleted(f) && eligible(f);
    let mut face_component = vec![None; mesh.next_face_id() as usize];
    let back = reverse_links(ff);
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in mesh.face_ids() {
        if face_component[start as usize].is_some() || !accept(start) {
            continue;
        }
        let index = components.len();
        let mut members = Vec::new();
        face_component[start as usize] = Some(index);
        stack.push(start);

        while let Some(f) = stack.pop() {
            members.push(f);
            let slots = ff.get(f as usize).map_or(&[][..], Vec::as_slice);
            let incoming = back.get(f as usize).map_or(&[][..], SmallVec::as_slice);
            for &g in slots.iter().flatten().chain(incoming) {
                let seen = face_component.get(g as usize).is_none_or(Option::is_some);
                if !seen && accept(g) {
                    face_component[g as usize] = Some(index);
                    stack.push(g);
                }
            }
        }
        members.sort_unstable();
        components.push(members);
    }

    FaceComponents {
        components,
        face_component,
    }
}

/// For each face, the faces whose slots point at it.
fn reverse_links(ff: &FaceFaceAdjacency) -> Vec<SmallVec<[FaceId; 4]>> {
    let mut back: Vec<SmallVec<[FaceId; 4]>> = vec![SmallVec::new(); ff.len()];
    for (f, slots) in ff.iter().enumerate() {
        for &g in slots.iter().flatten() {
            if let Some(incoming) = back.get_mut(g as usize) {
                incoming.push(f as FaceId);
            }
        }
    }
    back
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::PolyMesh;

    /// A 3x1 strip of quads: faces 0, 1, 2 left to right.
    fn strip() -> PolyMesh {
        let mut positions = Vec::new();
        for y in 0..2 {
            for x in 0..4 {
                positions.extend([f64::from(x), f64::from(y), 0.0]);
            }
        }
        PolyMesh::from_raw(
            &positions,
            &[vec![0, 1, 5, 4], vec![1, 2, 6, 5], vec![2, 3, 7, 6]],
        )
        .unwrap()
    }

    #[test]
    fn strip_is_one_component() {
        let cc = connected_components(&strip(), None);
        assert_eq!(cc.components, vec![vec![0, 1, 2]]);
        assert_eq!(cc.face_component, vec![Some(0); 3]);
    }

    #[test]
    fn deleting_middle_splits() {
        let mut mesh = strip();
        mesh.delete_face(1);
        let cc = connected_components(&mesh, None);
        assert_eq!(cc.components, vec![vec![0], vec![2]]);
        assert_eq!(cc.face_component, vec![Some(0), None, Some(1)]);
        assert_eq!(cc.sizes(), vec![1, 1]);
    }

    #[test]
    fn subset_restricts_traversal() {
        let mesh = strip();
        let subset: HashSet<FaceId> = [0, 2].into_iter().collect();
        let cc = subset_connected_components(&mesh, &subset, None);
        assert_eq!(cc.len(), 2);
        assert_eq!(cc.component_of(1), None);
        assert_eq!(cc.component_of(2), Some(1));
    }

    #[test]
    fn one_way_links_around_shared_edge_join() {
        // Three faces on edge 1-2: face 0 links to 1, faces 1 and 2 link
        // back to 0, and nothing links to 2.
        let mesh = PolyMesh::from_raw(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[vec![1, 2, 0], vec![2, 1, 0], vec![2, 1, 0]],
        )
        .unwrap();
        let ff = face_face_adjacencies(&mesh, None);
        assert!(ff.iter().all(|slots| !slots.contains(&Some(2))));

        let cc = connected_components(&mesh, Some(&ff));
        assert_eq!(cc.components, vec![vec![0, 1, 2]]);
        assert_eq!(cc.face_component, vec![Some(0); 3]);

        let subset: HashSet<FaceId> = [1, 2].into_iter().collect();
        let sub = subset_connected_components(&mesh, &subset, Some(&ff));
        assert_eq!(sub.components, vec![vec![1], vec![2]]);
    }

    #[test]
    fn largest_prefers_first_on_ties() {
        let cc = FaceComponents {
            components: vec![vec![0, 1], vec![2], vec![3, 4]],
            face_component: vec![Some(0), Some(0), Some(1), Some(2), Some(2)],
        };
        assert_eq!(cc.largest(), Some(&[0, 1][..]));
    }

    #[test]
    fn empty_mesh() {
        let cc = connected_components(&PolyMesh::new(), None);
        assert!(cc.is_empty());
        assert!(cc.largest().is_none());
    }
}
