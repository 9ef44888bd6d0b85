//! Core mesh types for the topology and spatial workspace.
//!
//! This crate provides the mesh abstraction every algorithm crate consumes:
//!
//! - [`MeshView`] - Read access to vertices, faces and polylines by stable ID
//! - [`MeshViewMut`] - Position updates (used by smoothing)
//! - [`MeshBuild`] - Entity creation (used by mesh transfer)
//! - [`PolyMesh`] - A polygon/polyline mesh with tombstoned deletion
//! - [`Triangle`] - A concrete triangle with vertex positions
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! # Stable IDs
//!
//! Vertices, faces and polylines are addressed by `u32` IDs that never move.
//! `next_*_id()` is one past the highest ID ever allocated. Deleting an entity
//! only marks it deleted; its ID is never reused or compacted, so maps indexed
//! by ID stay valid across deletions.
//!
//! # Winding
//!
//! A face is an ordered cycle of vertex IDs. Two faces are consistently
//! oriented across a shared edge when one traverses it as `a → b` and the
//! other as `b → a`.
//!
//! # Example
//!
//! ```
//! use mesh_types::{MeshBuild, MeshView, PolyMesh, Point3};
//!
//! let mut mesh = PolyMesh::new();
//! let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
//! let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let c = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
//! let d = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
//! let quad = mesh.add_face(&[a, b, c, d])?;
//!
//! assert_eq!(mesh.face_vertices(quad), &[a, b, c, d]);
//! assert_eq!(mesh.face_next_vertex_id(quad, 3), a);
//! # Ok::<(), mesh_types::MeshError>(())
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod error;
mod mesh;
mod traits;
mod triangle;

// Re-export core types
pub use bounds::Aabb;
pub use error::{MeshError, MeshResult};
pub use mesh::{Face, PolyMesh, Polyline};
pub use traits::{MeshBounds, MeshBuild, MeshView, MeshViewMut};
pub use triangle::Triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

/// Identifier of a vertex.
pub type VertexId = u32;

/// Identifier of a face.
pub type FaceId = u32;

/// Identifier of a polyline.
pub type PolylineId = u32;
