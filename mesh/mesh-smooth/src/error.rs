//! Error types for mesh smoothing operations.

use spatial_index::SpatialError;
use thiserror::Error;

/// Errors that can occur during smoothing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SmoothError {
    /// Mesh has no vertices.
    #[error("Mesh has no vertices")]
    EmptyMesh,

    /// Smoothing factor outside `[0, 1]`.
    #[error("Invalid smoothing factor: {0} (must be in [0, 1])")]
    InvalidAlpha(f64),

    /// Invalid iteration count.
    #[error("Invalid iteration count: {0} (must be >= 1)")]
    InvalidIterations(u32),

    /// The reprojection index could not be built.
    #[error("Reprojection index: {0}")]
    Spatial(#[from] SpatialError),
}

/// Result type for smoothing operations.
pub type SmoothResult<T> = std::result::Result<T, SmoothError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SmoothError::EmptyMesh;
        assert_eq!(format!("{err}"), "Mesh has no vertices");

        let err = SmoothError::InvalidAlpha(1.5);
        assert!(format!("{err}").contains("1.5"));

        let err = SmoothError::from(SpatialError::InvalidCapacity(0));
        assert!(format!("{err}").starts_with("Reprojection index"));
    }
}
