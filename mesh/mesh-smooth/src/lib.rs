//! Laplacian mesh smoothing with optional surface reprojection.
//!
//! Each iteration moves every free vertex part of the way towards the
//! weighted average of its neighbours:
//! - **Uniform** or **cotangent** neighbour weights
//! - **Fixed borders**: vertices on a mesh border can be pinned
//! - **Selections**: only a chosen vertex set moves
//! - **Reprojection**: smoothed vertices are pulled back onto the original
//!   surface, found through an AABB tree of triangles or an octree of
//!   vertices
//!
//! # Examples
//!
//! Smoothing a noisy patch while keeping it on its original surface:
//!
//! ```
//! use mesh_types::{MeshView, MeshViewMut, PolyMesh, Point3};
//! use mesh_smooth::{Reprojection, SmoothParams, smooth};
//!
//! // 2 x 2 grid of quads in the XY plane
//! let mut positions = Vec::new();
//! for j in 0..3 {
//!     for i in 0..3 {
//!         positions.extend([f64::from(i), f64::from(j), 0.0]);
//!     }
//! }
//! let mut mesh = PolyMesh::from_raw(
//!     &positions,
//!     &[vec![0, 1, 4, 3], vec![1, 2, 5, 4], vec![3, 4, 7, 6], vec![4, 5, 8, 7]],
//! )?;
//!
//! // Push the centre vertex sideways, within the plane
//! mesh.set_vertex_position(4, Point3::new(1.4, 0.7, 0.0));
//!
//! let params = SmoothParams::new()
//!     .with_iterations(20)
//!     .with_reprojection(Reprojection::AabbTree);
//! let output = smooth(&mut mesh, &params)?;
//!
//! let p = mesh.vertex_position(4);
//! assert!((p.x - 1.0).abs() < 1e-3 && (p.y - 1.0).abs() < 1e-3);
//! assert!(p.z.abs() < 1e-12);
//! assert_eq!(output.fixed_vertices, 8);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod params;
mod reproject;
mod result;
mod smooth;

pub use error::{SmoothError, SmoothResult};
pub use params::{Reprojection, SmoothParams, Weighting};
pub use result::SmoothOutput;
pub use smooth::{smooth, smooth_vertices};
