//! Axis-aligned boxes in mesh space.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Closed axis-aligned box `[min, max]` around mesh positions.
///
/// The empty box has `min = +inf` and `max = -inf`, so growing it by any
/// point gives the degenerate box of that point.
///
/// # Example
///
/// ```
/// use mesh_types::{Aabb, Point3};
///
/// let b = Aabb::from_points(&[Point3::new(1.0, 0.0, 2.0), Point3::new(-1.0, 3.0, 0.0)]);
/// assert_eq!(b.min, Point3::new(-1.0, 0.0, 0.0));
/// assert_eq!(b.center(), Point3::new(0.0, 1.5, 1.0));
/// assert!(b.contains(&Point3::new(0.0, 3.0, 2.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Smallest coordinate on each axis.
    pub min: Point3<f64>,
    /// Largest coordinate on each axis.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Box spanned by two opposite corners, in any order.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// The empty box.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::from([f64::INFINITY; 3]),
            max: Point3::from([f64::NEG_INFINITY; 3]),
        }
    }

    /// Degenerate box of a single point.
    #[must_use]
    pub const fn from_point(point: Point3<f64>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Smallest box holding every point; empty for no points.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        points.into_iter().fold(Self::empty(), |mut b, p| {
            b.expand_to_include(p);
            b
        })
    }

    /// Whether `min > max` on some axis.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        (0..3).any(|a| self.min[a] > self.max[a])
    }

    /// Edge lengths.
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Midpoint.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Longest edge length.
    #[must_use]
    pub fn max_extent(&self) -> f64 {
        self.size().max()
    }

    /// Whether `point` is inside, boundary included.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|a| self.min[a] <= point[a] && point[a] <= self.max[a])
    }

    /// Smallest box holding both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grow the box to hold `point`.
    pub fn expand_to_include(&mut self, point: &Point3<f64>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Box grown by `margin` on every side; negative margins shrink it.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_sorted() {
        let b = Aabb::new(Point3::new(2.0, 0.0, 5.0), Point3::new(0.0, 1.0, 3.0));
        assert_eq!(b.min, Point3::new(0.0, 0.0, 3.0));
        assert_eq!(b.max, Point3::new(2.0, 1.0, 5.0));
        assert!((b.max_extent() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_is_union_identity() {
        let b = Aabb::from_point(Point3::new(1.0, 2.0, 3.0));
        assert!(Aabb::empty().is_empty());
        assert!(!b.is_empty());
        assert_eq!(Aabb::empty().union(&b), b);
        assert_eq!(b.union(&Aabb::default()), b);
        assert!(Aabb::from_points(&[]).is_empty());
    }

    #[test]
    fn boundary_is_inside() {
        let b = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(b.contains(&Point3::new(1.0, 0.0, 0.5)));
        assert!(!b.contains(&Point3::new(1.0 + 1e-9, 0.0, 0.5)));
        assert!(b.expanded(0.1).contains(&Point3::new(1.05, -0.05, 0.5)));
        assert!(b.expanded(-0.6).is_empty());
    }
}
