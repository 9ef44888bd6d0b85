//! Traits for mesh types.
//!
//! Algorithms in the workspace are written against these traits rather than
//! against a concrete mesh, so any container that can answer "which vertex
//! cycle does face `f` have" and "is entity `x` deleted" can be analysed.

use crate::{Aabb, FaceId, MeshResult, PolylineId, VertexId};
use nalgebra::Point3;

/// Read-only view of a mesh whose entities are addressed by stable IDs.
///
/// ID spaces are dense-ish: every ID below `next_*_id()` was allocated at
/// some point, but some of them may be deleted. Implementations report IDs
/// at or beyond `next_*_id()` as deleted.
pub trait MeshView {
    /// One past the highest vertex ID ever allocated.
    fn next_vertex_id(&self) -> u32;

    /// One past the highest face ID ever allocated.
    fn next_face_id(&self) -> u32;

    /// One past the highest polyline ID ever allocated.
    fn next_polyline_id(&self) -> u32;

    /// Whether the vertex is deleted (or was never allocated).
    fn is_vertex_deleted(&self, id: VertexId) -> bool;

    /// Whether the face is deleted (or was never allocated).
    fn is_face_deleted(&self, id: FaceId) -> bool;

    /// Whether the polyline is deleted (or was never allocated).
    fn is_polyline_deleted(&self, id: PolylineId) -> bool;

    /// Position of a vertex.
    ///
    /// The result for deleted vertices is unspecified.
    fn vertex_position(&self, id: VertexId) -> Point3<f64>;

    /// The vertex cycle of a face.
    ///
    /// Deleted faces may return an empty slice.
    fn face_vertices(&self, id: FaceId) -> &[VertexId];

    /// The ordered (open) vertex sequence of a polyline.
    ///
    /// Deleted polylines may return an empty slice.
    fn polyline_vertices(&self, id: PolylineId) -> &[VertexId];

    /// Iterate over non-deleted vertex IDs in ascending order.
    fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.next_vertex_id()).filter(move |&id| !self.is_vertex_deleted(id))
    }

    /// Iterate over non-deleted face IDs in ascending order.
    fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.next_face_id()).filter(move |&id| !self.is_face_deleted(id))
    }

    /// Iterate over non-deleted polyline IDs in ascending order.
    fn polyline_ids(&self) -> impl Iterator<Item = PolylineId> + '_ {
        (0..self.next_polyline_id()).filter(move |&id| !self.is_polyline_deleted(id))
    }

    /// Number of non-deleted vertices.
    fn vertex_count(&self) -> usize {
        self.vertex_ids().count()
    }

    /// Number of non-deleted faces.
    fn face_count(&self) -> usize {
        self.face_ids().count()
    }

    /// Number of non-deleted polylines.
    fn polyline_count(&self) -> usize {
        self.polyline_ids().count()
    }

    /// Vertex at position `pos` of the face cycle.
    fn face_vertex_id(&self, face: FaceId, pos: usize) -> VertexId {
        self.face_vertices(face)[pos]
    }

    /// Vertex following position `pos` in the face cycle (wrapping).
    fn face_next_vertex_id(&self, face: FaceId, pos: usize) -> VertexId {
        let cycle = self.face_vertices(face);
        cycle[(pos + 1) % cycle.len()]
    }

    /// Vertex preceding position `pos` in the face cycle (wrapping).
    fn face_prev_vertex_id(&self, face: FaceId, pos: usize) -> VertexId {
        let cycle = self.face_vertices(face);
        cycle[(pos + cycle.len() - 1) % cycle.len()]
    }

    /// Position of `vertex` inside the face cycle, if the face uses it.
    fn face_vertex_position(&self, face: FaceId, vertex: VertexId) -> Option<usize> {
        self.face_vertices(face).iter().position(|&v| v == vertex)
    }

    /// Positions of the vertices of a face, in cycle order.
    fn face_positions(&self, face: FaceId) -> Vec<Point3<f64>> {
        self.face_vertices(face)
            .iter()
            .map(|&v| self.vertex_position(v))
            .collect()
    }
}

/// A mesh whose vertex positions can be updated in place.
pub trait MeshViewMut: MeshView {
    /// Move a vertex.
    fn set_vertex_position(&mut self, id: VertexId, position: Point3<f64>);
}

/// A mesh that new entities can be appended to.
pub trait MeshBuild: MeshView {
    /// Append a vertex and return its ID.
    fn add_vertex(&mut self, position: Point3<f64>) -> VertexId;

    /// Append a face with the given vertex cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the cycle has fewer than 3 vertices or references
    /// a deleted or unknown vertex.
    fn add_face(&mut self, vertices: &[VertexId]) -> MeshResult<FaceId>;

    /// Append a polyline with the given vertex sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence has fewer than 2 vertices or
    /// references a deleted or unknown vertex.
    fn add_polyline(&mut self, vertices: &[VertexId]) -> MeshResult<PolylineId>;
}

/// Trait for types that can compute a bounding box.
pub trait MeshBounds {
    /// Compute the axis-aligned bounding box.
    ///
    /// Returns an empty AABB if the mesh has no vertices.
    fn bounds(&self) -> Aabb;

    /// Compute the bounding box, returning `None` if empty.
    fn bounds_opt(&self) -> Option<Aabb> {
        let b = self.bounds();
        if b.is_empty() { None } else { Some(b) }
    }

    /// Get the center of the bounding box.
    fn center(&self) -> Point3<f64> {
        self.bounds().center()
    }
}

impl<M: MeshView> MeshBounds for M {
    fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for v in self.vertex_ids() {
            aabb.expand_to_include(&self.vertex_position(v));
        }
        aabb
    }
}
