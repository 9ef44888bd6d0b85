//! Smoothing parameters.

use spatial_index::SpatialError;

use crate::error::{SmoothError, SmoothResult};

/// How neighbours are weighted in the Laplacian average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Weighting {
    /// Every neighbour counts the same.
    #[default]
    Uniform,
    /// Cotangent weights from the face corners opposite each edge.
    ///
    /// Negative weights are clamped to zero. A vertex whose weights sum to
    /// zero (for example one reached only through polylines) falls back to
    /// uniform weights.
    Cotangent,
}

/// Where smoothed vertices are pulled back to after each iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reprojection {
    /// Vertices stay where the Laplacian step puts them.
    #[default]
    None,
    /// Closest point on the original surface, via an AABB tree of triangles.
    AabbTree,
    /// Closest point on the triangles around the nearest original vertex,
    /// found through an octree. Points outside the octree root are left
    /// unprojected.
    Octree,
}

/// Parameters for Laplacian smoothing.
#[derive(Debug, Clone)]
pub struct SmoothParams {
    /// Number of iterations to perform.
    pub iterations: u32,

    /// Fraction of the way each vertex moves towards its neighbour average.
    pub alpha: f64,

    /// Neighbour weighting scheme.
    pub weighting: Weighting,

    /// Whether border vertices stay fixed.
    pub fix_borders: bool,

    /// Reprojection onto the original surface.
    pub reprojection: Reprojection,

    /// Leaf capacity of the reprojection octree.
    pub octree_max_box_elements: usize,

    /// Whether per-vertex updates run on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            iterations: 10,
            alpha: 0.5,
            weighting: Weighting::Uniform,
            fix_borders: true,
            reprojection: Reprojection::None,
            octree_max_box_elements: 16,
            parallel: true,
        }
    }
}

impl SmoothParams {
    /// Create new parameters with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A few light iterations.
    #[must_use]
    pub fn gentle() -> Self {
        Self {
            iterations: 3,
            alpha: 0.25,
            ..Self::default()
        }
    }

    /// Many strong iterations, reprojected so the shape is kept.
    #[must_use]
    pub fn strong() -> Self {
        Self {
            iterations: 30,
            alpha: 0.9,
            reprojection: Reprojection::AabbTree,
            ..Self::default()
        }
    }

    /// Set number of iterations.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the smoothing factor.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the weighting scheme.
    #[must_use]
    pub const fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Set whether border vertices stay fixed.
    #[must_use]
    pub const fn with_fix_borders(mut self, fix: bool) -> Self {
        self.fix_borders = fix;
        self
    }

    /// Set the reprojection mode.
    #[must_use]
    pub const fn with_reprojection(mut self, reprojection: Reprojection) -> Self {
        self.reprojection = reprojection;
        self
    }

    /// Set the reprojection octree leaf capacity.
    #[must_use]
    pub const fn with_octree_max_box_elements(mut self, max: usize) -> Self {
        self.octree_max_box_elements = max;
        self
    }

    /// Enable or disable parallel updates.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `iterations` is zero, `alpha` is outside `[0, 1]`,
    /// or octree reprojection is requested with a zero leaf capacity.
    pub fn validate(&self) -> SmoothResult<()> {
        if self.iterations == 0 {
            return Err(SmoothError::InvalidIterations(self.iterations));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SmoothError::InvalidAlpha(self.alpha));
        }
        if self.reprojection == Reprojection::Octree && self.octree_max_box_elements == 0 {
            return Err(SpatialError::InvalidCapacity(0).into());
        }
        Ok(())
    }
}
