//! Polygon/polyline mesh with stable IDs.

use nalgebra::Point3;
use smallvec::SmallVec;

use crate::{
    FaceId, MeshBuild, MeshError, MeshResult, MeshView, MeshViewMut, PolylineId, VertexId,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A polygonal face: an ordered cycle of vertex IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Face {
    /// Vertex cycle. Position `i` is connected to position `i + 1` (wrapping).
    pub vertices: SmallVec<[VertexId; 4]>,
}

/// A polyline: an ordered, open sequence of vertex IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polyline {
    /// Vertex sequence. The last vertex is not connected back to the first.
    pub vertices: Vec<VertexId>,
}

/// A mesh of vertices, polygonal faces and polylines with stable IDs.
///
/// Deletion only sets a tombstone flag: IDs are never reused and the storage
/// is never compacted, so adjacency maps indexed by ID stay meaningful.
///
/// # Example
///
/// ```
/// use mesh_types::{MeshBuild, MeshView, PolyMesh, Point3};
///
/// let mut mesh = PolyMesh::from_raw(
///     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
///     &[vec![0, 1, 2], vec![0, 2, 3]],
/// )?;
/// assert_eq!(mesh.face_count(), 2);
///
/// mesh.delete_face(0);
/// assert_eq!(mesh.face_count(), 1);
/// assert_eq!(mesh.next_face_id(), 2);
/// # Ok::<(), mesh_types::MeshError>(())
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolyMesh {
    positions: Vec<Point3<f64>>,
    faces: Vec<Face>,
    polylines: Vec<Polyline>,
    vertex_deleted: Vec<bool>,
    face_deleted: Vec<bool>,
    polyline_deleted: Vec<bool>,
}

impl PolyMesh {
    /// Create a new empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positions: Vec::new(),
            faces: Vec::new(),
            polylines: Vec::new(),
            vertex_deleted: Vec::new(),
            face_deleted: Vec::new(),
            polyline_deleted: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            polylines: Vec::new(),
            vertex_deleted: Vec::with_capacity(vertex_count),
            face_deleted: Vec::with_capacity(face_count),
            polyline_deleted: Vec::new(),
        }
    }

    /// Create a mesh from a flat position array and face index lists.
    ///
    /// # Arguments
    ///
    /// * `positions` - Flat array of vertex positions `[x0, y0, z0, x1, ...]`;
    ///   trailing values that do not form a full triple are ignored
    /// * `faces` - One vertex cycle per face
    ///
    /// # Errors
    ///
    /// Returns an error if a face has fewer than 3 vertices or references a
    /// vertex that was not created.
    pub fn from_raw(positions: &[f64], faces: &[Vec<VertexId>]) -> MeshResult<Self> {
        let mut mesh = Self::with_capacity(positions.len() / 3, faces.len());
        for c in positions.chunks_exact(3) {
            mesh.add_vertex(Point3::new(c[0], c[1], c[2]));
        }
        for face in faces {
            mesh.add_face(face)?;
        }
        Ok(mesh)
    }

    /// Position of a live vertex, or `None` if it is deleted or unknown.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Point3<f64>> {
        if self.is_vertex_deleted(id) {
            return None;
        }
        self.positions.get(id as usize)
    }

    /// Get a face, or `None` if it is deleted or unknown.
    #[must_use]
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        if self.is_face_deleted(id) {
            return None;
        }
        self.faces.get(id as usize)
    }

    /// Get a polyline, or `None` if it is deleted or unknown.
    #[must_use]
    pub fn polyline(&self, id: PolylineId) -> Option<&Polyline> {
        if self.is_polyline_deleted(id) {
            return None;
        }
        self.polylines.get(id as usize)
    }

    /// Mark a vertex deleted.
    ///
    /// Faces and polylines using the vertex are not touched; callers that
    /// delete a vertex are expected to delete the entities using it as well.
    /// Returns `false` if the vertex was already deleted or unknown.
    pub fn delete_vertex(&mut self, id: VertexId) -> bool {
        tombstone(&mut self.vertex_deleted, id)
    }

    /// Mark a face deleted. Returns `false` if it was already deleted or unknown.
    pub fn delete_face(&mut self, id: FaceId) -> bool {
        tombstone(&mut self.face_deleted, id)
    }

    /// Mark a polyline deleted. Returns `false` if it was already deleted or unknown.
    pub fn delete_polyline(&mut self, id: PolylineId) -> bool {
        tombstone(&mut self.polyline_deleted, id)
    }

    fn check_vertices(&self, vertices: &[VertexId]) -> MeshResult<()> {
        match vertices.iter().find(|&&v| self.is_vertex_deleted(v)) {
            Some(&vertex) => Err(MeshError::InvalidVertex {
                vertex,
                next_vertex_id: self.next_vertex_id(),
            }),
            None => Ok(()),
        }
    }
}

fn tombstone(flags: &mut [bool], id: u32) -> bool {
    match flags.get_mut(id as usize) {
        Some(flag) if !*flag => {
            *flag = true;
            true
        }
        _ => false,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn next_id(len: usize) -> MeshResult<u32> {
    if len >= u32::MAX as usize {
        return Err(MeshError::IdOverflow);
    }
    Ok(len as u32)
}

#[allow(clippy::cast_possible_truncation)]
impl MeshView for PolyMesh {
    fn next_vertex_id(&self) -> u32 {
        self.positions.len() as u32
    }

    fn next_face_id(&self) -> u32 {
        self.faces.len() as u32
    }

    fn next_polyline_id(&self) -> u32 {
        self.polylines.len() as u32
    }

    fn is_vertex_deleted(&self, id: VertexId) -> bool {
        self.vertex_deleted.get(id as usize).is_none_or(|&d| d)
    }

    fn is_face_deleted(&self, id: FaceId) -> bool {
        self.face_deleted.get(id as usize).is_none_or(|&d| d)
    }

    fn is_polyline_deleted(&self, id: PolylineId) -> bool {
        self.polyline_deleted.get(id as usize).is_none_or(|&d| d)
    }

    fn vertex_position(&self, id: VertexId) -> Point3<f64> {
        self.positions
            .get(id as usize)
            .copied()
            .unwrap_or_else(Point3::origin)
    }

    fn face_vertices(&self, id: FaceId) -> &[VertexId] {
        self.faces.get(id as usize).map_or(&[], |f| f.vertices.as_slice())
    }

    fn polyline_vertices(&self, id: PolylineId) -> &[VertexId] {
        self.polylines
            .get(id as usize)
            .map_or(&[], |p| p.vertices.as_slice())
    }
}

impl MeshViewMut for PolyMesh {
    fn set_vertex_position(&mut self, id: VertexId, position: Point3<f64>) {
        if let Some(p) = self.positions.get_mut(id as usize) {
            *p = position;
        }
    }
}

impl MeshBuild for PolyMesh {
    #[allow(clippy::cast_possible_truncation)]
    fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        let id = self.positions.len() as u32;
        self.positions.push(position);
        self.vertex_deleted.push(false);
        id
    }

    fn add_face(&mut self, vertices: &[VertexId]) -> MeshResult<FaceId> {
        if vertices.len() < 3 {
            return Err(MeshError::FaceTooSmall(vertices.len()));
        }
        self.check_vertices(vertices)?;
        let id = next_id(self.faces.len())?;
        self.faces.push(Face {
            vertices: SmallVec::from_slice(vertices),
        });
        self.face_deleted.push(false);
        Ok(id)
    }

    fn add_polyline(&mut self, vertices: &[VertexId]) -> MeshResult<PolylineId> {
        if vertices.len() < 2 {
            return Err(MeshError::PolylineTooSmall(vertices.len()));
        }
        self.check_vertices(vertices)?;
        let id = next_id(self.polylines.len())?;
        self.polylines.push(Polyline {
            vertices: vertices.to_vec(),
        });
        self.polyline_deleted.push(false);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeshBounds;

    fn unit_square() -> PolyMesh {
        PolyMesh::from_raw(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            &[vec![0, 1, 2], vec![0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn empty_mesh() {
        let mesh = PolyMesh::new();
        assert_eq!(mesh.next_vertex_id(), 0);
        assert_eq!(mesh.face_count(), 0);
        assert!(mesh.bounds_opt().is_none());
    }

    #[test]
    fn face_cycle_access() {
        let mesh = unit_square();
        assert_eq!(mesh.face_vertex_id(1, 1), 2);
        assert_eq!(mesh.face_next_vertex_id(1, 2), 0);
        assert_eq!(mesh.face_prev_vertex_id(1, 0), 3);
        assert_eq!(mesh.face_vertex_position(1, 3), Some(2));
        assert_eq!(mesh.face_vertex_position(1, 1), None);
    }

    #[test]
    fn deletion_is_tombstoned() {
        let mut mesh = unit_square();
        assert!(mesh.delete_face(0));
        assert!(!mesh.delete_face(0));
        assert!(mesh.is_face_deleted(0));
        assert!(mesh.face(0).is_none());
        assert_eq!(mesh.next_face_id(), 2);
        assert_eq!(mesh.face_ids().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn unknown_ids_count_as_deleted() {
        let mesh = unit_square();
        assert!(mesh.is_vertex_deleted(99));
        assert!(mesh.is_face_deleted(2));
        assert!(mesh.is_polyline_deleted(0));
        assert!(mesh.face_vertices(7).is_empty());
    }

    #[test]
    fn add_face_validates_input() {
        let mut mesh = unit_square();
        assert_eq!(mesh.add_face(&[0, 1]), Err(MeshError::FaceTooSmall(2)));
        assert!(matches!(
            mesh.add_face(&[0, 1, 9]),
            Err(MeshError::InvalidVertex { vertex: 9, .. })
        ));
        mesh.delete_vertex(3);
        assert!(mesh.add_face(&[0, 2, 3]).is_err());
    }

    #[test]
    fn polylines() {
        let mut mesh = unit_square();
        assert_eq!(mesh.add_polyline(&[0]), Err(MeshError::PolylineTooSmall(1)));
        let id = mesh.add_polyline(&[0, 1, 2]).unwrap();
        assert_eq!(mesh.polyline_vertices(id), &[0, 1, 2]);
        assert_eq!(mesh.polyline_count(), 1);
    }

    #[test]
    fn bounds_skip_deleted_vertices() {
        let mut mesh = unit_square();
        let far = mesh.add_vertex(Point3::new(10.0, 10.0, 10.0));
        mesh.delete_vertex(far);
        let b = mesh.bounds();
        assert!((b.max.x - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deleted_vertex_has_no_position() {
        let mut mesh = unit_square();
        assert_eq!(mesh.vertex(1), Some(&Point3::new(1.0, 0.0, 0.0)));
        mesh.delete_vertex(1);
        assert_eq!(mesh.vertex(1), None);
        assert_eq!(mesh.vertex(42), None);
    }

    #[test]
    fn set_position() {
        let mut mesh = unit_square();
        mesh.set_vertex_position(2, Point3::new(2.0, 2.0, 0.0));
        assert_eq!(mesh.vertex_position(2), Point3::new(2.0, 2.0, 0.0));
    }
}
