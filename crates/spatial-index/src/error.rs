//! Error types for spatial operations.

use nalgebra::Point3;

/// Result type for spatial operations.
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Errors that can occur during spatial operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SpatialError {
    /// The octree radius must be positive and finite.
    #[error("octree radius must be positive, got {0}")]
    InvalidRadius(f64),

    /// A node must be allowed to hold at least one entry.
    #[error("max box elements must be at least 1, got {0}")]
    InvalidCapacity(usize),

    /// A key lies outside the octree root cube.
    #[error("point {point:?} is outside the octree root (center {center:?}, radius {radius})")]
    OutOfBounds {
        /// The rejected point.
        point: Point3<f64>,
        /// Root center.
        center: Point3<f64>,
        /// Root half-extent.
        radius: f64,
    },

    /// A structural invariant check failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
