//! Validated world-space triangles.

use nalgebra::{Point3, Vector3};

use crate::{Aabb, GeometryError, Plane3D};

/// Tolerance on barycentric coordinates when testing coplanar points.
const BARYCENTRIC_EPSILON: f32 = 1e-6;

/// A non-degenerate triangle in 3D space.
///
/// The plane and bounding box are derived once at construction; the triangle
/// is immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    vertices: [Point3<f32>; 3],
    plane: Plane3D,
    bounds: Aabb,
}

impl Triangle {
    /// Creates a new triangle from three points.
    ///
    /// The winding order determines the normal direction via the right-hand rule:
    /// normal = (b - a) × (c - a)
    ///
    /// # Errors
    /// Returns [`GeometryError::NonFinite`] if any coordinate is NaN or
    /// infinite, and [`GeometryError::Degenerate`] if the triangle has zero area.
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Result<Self, GeometryError> {
        let vertices = [a, b, c];
        if vertices.iter().any(|v| !v.coords.iter().all(|x| x.is_finite())) {
            return Err(GeometryError::NonFinite);
        }
        let plane = Plane3D::from_three_points(a, b, c).ok_or(GeometryError::Degenerate)?;
        let bounds = Aabb::new(a, b).expanded_to(c);
        Ok(Self {
            vertices,
            plane,
            bounds,
        })
    }

    /// Returns the three vertices of the triangle.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>; 3] {
        &self.vertices
    }

    /// Returns the plane that this triangle lies on.
    #[inline]
    pub fn plane(&self) -> &Plane3D {
        &self.plane
    }

    /// Returns the unit normal of the triangle.
    #[inline]
    pub fn normal(&self) -> Vector3<f32> {
        self.plane.normal()
    }

    /// Returns the axis-aligned bounding box of the triangle.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Computes the area of the triangle.
    pub fn area(&self) -> f32 {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    /// Returns the three edges as `(start, end)` pairs.
    pub fn edges(&self) -> [(Point3<f32>, Point3<f32>); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }

    /// Returns the point of the triangle closest to `p`.
    ///
    /// Walks the Voronoi regions of the vertices and edges before falling
    /// back to the face interior.
    pub fn closest_point(&self, p: Point3<f32>) -> Point3<f32> {
        let [a, b, c] = self.vertices;
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

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        // Inside the face: the plane projection is exact.
        self.plane.project_point(p)
    }

    /// True when a point on the triangle's plane lies inside the triangle.
    pub fn contains_coplanar_point(&self, p: Point3<f32>) -> bool {
        let [a, b, c] = self.vertices;
        let v0 = b - a;
        let v1 = c - a;
        let v2 = p - a;
        let d00 = v0.dot(&v0);
        let d01 = v0.dot(&v1);
        let d11 = v1.dot(&v1);
        let d20 = v2.dot(&v0);
        let d21 = v2.dot(&v1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() <= f32::EPSILON {
            return false;
        }
        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        let u = 1.0 - v - w;
        u >= -BARYCENTRIC_EPSILON && v >= -BARYCENTRIC_EPSILON && w >= -BARYCENTRIC_EPSILON
    }

    /// Computes where a segment passes through the triangle, if it does.
    ///
    /// Returns the interpolation parameter along the segment and the point.
    /// Segments lying in the triangle's plane report no crossing.
    pub fn intersect_segment(
        &self,
        start: Point3<f32>,
        end: Point3<f32>,
    ) -> Option<(f32, Point3<f32>)> {
        self.plane
            .intersect_segment(start, end)
            .filter(|(_, point)| self.contains_coplanar_point(*point))
    }

    /// Intersects a ray with the triangle from either side.
    ///
    /// Returns the distance along `direction` (which need not be unit
    /// length, in which case the result is in units of its length).
    pub fn intersect_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_t: f32,
    ) -> Option<f32> {
        let normal = self.plane.normal();
        let denom = normal.dot(&direction);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let t = -self.plane.signed_distance(origin) / denom;
        if !(0.0..=max_t).contains(&t) {
            return None;
        }
        self.contains_coplanar_point(origin + direction * t)
            .then_some(t)
    }
}
