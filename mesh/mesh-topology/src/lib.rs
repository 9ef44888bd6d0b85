//! Topology analysis for stable-ID polygon meshes.
//!
//! This crate provides tools for:
//! - Adjacency maps (vertex-vertex, vertex-face, face-face, polyline)
//! - Non-manifold edge diagnostics
//! - Connected components over face-face adjacency
//! - Border classification and closed border loop reconstruction
//! - Transferring meshes or face selections between mesh stores
//!
//! Every map is indexed by element ID and sized by the mesh's `next_*_id()`,
//! so entries for deleted elements are present but empty.
//!
//! # Example
//!
//! ```
//! use mesh_types::PolyMesh;
//! use mesh_topology::{
//!     AdjacencyOptions, border_vertex_chains, connected_components, face_face_adjacencies,
//!     vertex_vertex_adjacencies,
//! };
//!
//! // Unit square split along its diagonal
//! let mesh = PolyMesh::from_raw(
//!     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
//!     &[vec![0, 1, 2], vec![0, 2, 3]],
//! )?;
//!
//! let vv = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::default());
//! assert_eq!(vv[0], vec![1, 2, 3]);
//!
//! let ff = face_face_adjacencies(&mesh, None);
//! assert_eq!(ff, vec![vec![None, None, Some(1)], vec![Some(0), None, None]]);
//!
//! assert_eq!(connected_components(&mesh, Some(&ff)).len(), 1);
//! assert_eq!(border_vertex_chains(&mesh, Some(&ff))[0].len(), 4);
//! # Ok::<(), mesh_types::MeshError>(())
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod adjacency;
pub mod borders;
pub mod components;
mod error;
pub mod transfer;

// Re-export core types
pub use adjacency::{
    AdjacencyOptions, FaceFaceAdjacency, NonManifoldEdge, NonManifoldKind, VertexFaceAdjacency,
    VertexPolylineAdjacency, VertexVertexAdjacency, face_face_adjacencies, non_manifold_edges,
    polyline_polyline_adjacencies, vertex_face_adjacencies, vertex_polyline_adjacencies,
    vertex_vertex_adjacencies,
};
pub use borders::{
    BorderChain, border_face_edges, border_faces, border_vertex_chains, border_vertices,
    is_border_face, is_border_face_edge, is_border_vertex, subset_border_face_edges,
    subset_border_faces, subset_border_vertex_chains, subset_border_vertices,
    subset_is_border_face, subset_is_border_face_edge, subset_is_border_vertex,
};
pub use components::{FaceComponents, connected_components, subset_connected_components};
pub use error::{Element, TopologyError, TopologyResult};
pub use transfer::{MeshTransfer, TransferOptions, transfer_faces, transfer_mesh};
