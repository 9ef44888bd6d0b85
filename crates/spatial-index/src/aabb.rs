//! D-dimensional axis-aligned bounding boxes.

/// Which corner of a box an extractor is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AabbBound {
    /// Minimum corner.
    Min,
    /// Maximum corner.
    Max,
}

/// An axis-aligned bounding box in `D` dimensions.
///
/// # Example
///
/// ```
/// use spatial_index::Aabb;
///
/// let a = Aabb::new([0.0, 0.0], [1.0, 1.0]);
/// let b = Aabb::new([1.0, 0.5], [2.0, 2.0]);
///
/// // Touching boxes overlap
/// assert!(a.overlaps(&b, 0.0));
///
/// // A small gap is bridged by epsilon inflation
/// let c = Aabb::new([1.0 + 1e-12, 0.0], [2.0, 1.0]);
/// assert!(!a.overlaps(&c, 0.0));
/// assert!(a.overlaps(&c, 1e-9));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<const D: usize> {
    /// Minimum corner.
    pub min: [f64; D],
    /// Maximum corner.
    pub max: [f64; D],
}

impl<const D: usize> Aabb<D> {
    /// Create a box from two corners, reordered per axis if necessary.
    #[must_use]
    pub fn new(a: [f64; D], b: [f64; D]) -> Self {
        let mut min = a;
        let mut max = b;
        for i in 0..D {
            if min[i] > max[i] {
                std::mem::swap(&mut min[i], &mut max[i]);
            }
        }
        Self { min, max }
    }

    /// Create an empty (inverted) box, the identity of [`union`](Self::union).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            min: [f64::INFINITY; D],
            max: [f64::NEG_INFINITY; D],
        }
    }

    /// Degenerate box around a single point.
    #[must_use]
    pub const fn from_point(point: [f64; D]) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Smallest box containing all points. Empty if there are none.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; D]>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand_point(p);
        }
        aabb
    }

    /// Box of a key as reported by an extractor.
    pub fn from_extractor<K>(key: &K, extractor: impl Fn(&K, AabbBound, usize) -> f64) -> Self {
        let mut aabb = Self::empty();
        for i in 0..D {
            aabb.min[i] = extractor(key, AabbBound::Min, i);
            aabb.max[i] = extractor(key, AabbBound::Max, i);
        }
        aabb
    }

    /// Whether `min > max` on some axis.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        (0..D).any(|i| self.min[i] > self.max[i])
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.expand(other);
        out
    }

    /// Grow to contain another box.
    pub fn expand(&mut self, other: &Self) {
        for i in 0..D {
            self.min[i] = self.min[i].min(other.min[i]);
            self.max[i] = self.max[i].max(other.max[i]);
        }
    }

    /// Grow to contain a point.
    pub fn expand_point(&mut self, point: &[f64; D]) {
        for i in 0..D {
            self.min[i] = self.min[i].min(point[i]);
            self.max[i] = self.max[i].max(point[i]);
        }
    }

    /// Inclusive overlap test with both boxes inflated by `epsilon`.
    #[must_use]
    pub fn overlaps(&self, other: &Self, epsilon: f64) -> bool {
        (0..D).all(|i| {
            self.min[i] - epsilon <= other.max[i] + epsilon
                && other.min[i] - epsilon <= self.max[i] + epsilon
        })
    }

    /// Inclusive point containment.
    #[must_use]
    pub fn contains_point(&self, point: &[f64; D]) -> bool {
        (0..D).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> [f64; D] {
        let mut c = [0.0; D];
        for (i, v) in c.iter_mut().enumerate() {
            *v = (self.min[i] + self.max[i]) * 0.5;
        }
        c
    }

    /// Squared distance from a point to the box; zero inside.
    #[must_use]
    pub fn distance_squared_to_point(&self, point: &[f64; D]) -> f64 {
        let mut sum = 0.0;
        for i in 0..D {
            let d = if point[i] < self.min[i] {
                self.min[i] - point[i]
            } else if point[i] > self.max[i] {
                point[i] - self.max[i]
            } else {
                0.0
            };
            sum += d * d;
        }
        sum
    }
}

impl<const D: usize> Default for Aabb<D> {
    fn default() -> Self {
        Self::empty()
    }
}
