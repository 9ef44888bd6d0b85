//! Triangle type for geometric calculations.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A triangle with concrete vertex positions.
///
/// Polygon faces are handled as triangle fans around their first vertex when
/// a triangle is needed (closest-point queries, cotangent weights).
///
/// # Example
///
/// ```
/// use mesh_types::{Triangle, Point3};
///
/// let tri = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// );
///
/// // Points above the plane project straight down
/// let p = tri.closest_point(&Point3::new(0.25, 0.25, 3.0));
/// assert!((p - Point3::new(0.25, 0.25, 0.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3<f64>,
    /// Second vertex.
    pub v1: Point3<f64>,
    /// Third vertex.
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Componentwise minimum and maximum corners.
    #[must_use]
    pub fn bounds(&self) -> ([f64; 3], [f64; 3]) {
        let min = self.v0.inf(&self.v1).inf(&self.v2);
        let max = self.v0.sup(&self.v1).sup(&self.v2);
        ([min.x, min.y, min.z], [max.x, max.y, max.z])
    }

    /// Closest point on the triangle (including its interior) to `p`.
    ///
    /// Uses the Voronoi-region classification of barycentric coordinates.
    #[must_use]
    #[allow(clippy::many_single_char_names)]
    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let (a, b, c) = (self.v0, self.v1, self.v2);
        let p = *p;
        let ab = b - a;
        let ac = c - a;
        let ap = p - a;

        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1.mul_add(d4, -(d3 * d2));
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return Point3::from(a.coords + ab * v);
        }

        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5.mul_add(d2, -(d1 * d6));
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return Point3::from(a.coords + ac * w);
        }

        let va = d3.mul_add(d6, -(d5 * d4));
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return Point3::from(b.coords + (c - b) * w);
        }

        let sum = va + vb + vc;
        if sum.is_nan() || sum <= 0.0 {
            // Collinear corners: nearest point on the three edges
            return [(a, b), (b, c), (c, a)]
                .into_iter()
                .map(|(start, end)| closest_on_segment(&start, &end, &p))
                .min_by(|x, y| (x - p).norm_squared().total_cmp(&(y - p).norm_squared()))
                .unwrap_or(a);
        }
        let denom = 1.0 / sum;
        let v = vb * denom;
        let w = vc * denom;
        Point3::from(a.coords + ab * v + ac * w)
    }
}

fn closest_on_segment(a: &Point3<f64>, b: &Point3<f64>, p: &Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= 0.0 {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}
