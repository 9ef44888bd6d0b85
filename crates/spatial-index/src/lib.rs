//! Spatial indexes for nearest-point and overlap queries.
//!
//! This crate has no mesh dependency. It provides:
//!
//! - [`Aabb`] - A `D`-dimensional axis-aligned bounding box
//! - [`AabbTree`] - A leaf-storing AVL tree ordered by a user comparator,
//!   with per-node boxes for pruned overlap and nearest queries
//! - [`PointTree`] - An [`AabbTree`] over `[f64; D]` points
//! - [`Octree`] - A bucketed octree over 3D points with neighbour finding
//!
//! # Ordering versus geometry
//!
//! An [`AabbTree`] is a search tree in the comparator's 1-D order:
//! [`AabbTree::find`] and [`AabbTree::range_query`] follow that order. The
//! boxes only drive [`AabbTree::aabb_overlap_query`],
//! [`AabbTree::aabb_overlap_check`] and [`AabbTree::nearest_by`].
//!
//! # Example
//!
//! ```
//! use spatial_index::{Aabb, AabbBound, AabbTree};
//!
//! // Segments on a line keyed by (start, end)
//! let extractor = |k: &(f64, f64), b: AabbBound, _axis: usize| match b {
//!     AabbBound::Min => k.0,
//!     AabbBound::Max => k.1,
//! };
//! let comparator = |a: &(f64, f64), b: &(f64, f64)| a.0.total_cmp(&b.0);
//!
//! let mut tree: AabbTree<_, u32, _, _, 1> = AabbTree::new(extractor, comparator);
//! tree.insert((0.0, 2.0), 1);
//! tree.insert((3.0, 4.0), 2);
//! tree.insert((1.5, 3.5), 3);
//!
//! let hits = tree.aabb_overlap_query(&Aabb::new([2.5], [2.6]));
//! assert_eq!(hits.len(), 1);
//! assert!(tree.check_invariants().is_ok());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod aabb;
mod aabb_tree;
mod error;
mod octree;

// Re-export core types
pub use aabb::{Aabb, AabbBound};
pub use aabb_tree::{
    AabbTree, DEFAULT_EPSILON, EntryId, Iter, PointComparator, PointExtractor, PointTree,
};
pub use error::{SpatialError, SpatialResult};
pub use octree::{NodeId, Octree, OctreeNode, OctreeParams};
