//! Error types for topology operations.

use std::fmt;

use mesh_types::{FaceId, MeshError, PolylineId, VertexId};
use thiserror::Error;

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// A mesh element that owns a vertex reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// A face.
    Face(FaceId),
    /// A polyline.
    Polyline(PolylineId),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Face(id) => write!(f, "face {id}"),
            Self::Polyline(id) => write!(f, "polyline {id}"),
        }
    }
}

/// Errors that can occur during topology operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TopologyError {
    /// An element references a deleted or unknown vertex.
    #[error("{element} references deleted vertex {vertex}")]
    DanglingVertex {
        /// The referencing element.
        element: Element,
        /// The missing vertex.
        vertex: VertexId,
    },

    /// The target mesh rejected an element.
    #[error("target mesh rejected an element: {0}")]
    Mesh(#[from] MeshError),
}
