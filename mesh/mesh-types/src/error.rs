//! Error types for mesh construction.

use thiserror::Error;

use crate::VertexId;

/// Result type for mesh construction.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors that can occur while adding entities to a mesh.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MeshError {
    /// A face cycle needs at least three vertices.
    #[error("face needs at least 3 vertices, got {0}")]
    FaceTooSmall(usize),

    /// A polyline needs at least two vertices.
    #[error("polyline needs at least 2 vertices, got {0}")]
    PolylineTooSmall(usize),

    /// A referenced vertex does not exist or was deleted.
    #[error("vertex {vertex} does not exist (next vertex id is {next_vertex_id})")]
    InvalidVertex {
        /// The offending vertex ID.
        vertex: VertexId,
        /// One past the highest allocated vertex ID.
        next_vertex_id: u32,
    },

    /// The ID space is exhausted.
    #[error("id space exhausted")]
    IdOverflow,
}
