//! Bounding volume primitives: axis-aligned boxes and spheres.

use nalgebra::{Point3, Vector3};

/// An axis-aligned bounding box.
///
/// Invariant: `min` is component-wise less than or equal to `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    min: Point3<f32>,
    max: Point3<f32>,
}

impl Aabb {
    /// Creates a box from two opposite corners, in any order.
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Creates the smallest box containing every point.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |acc, p| acc.expanded_to(p)))
    }

    /// Creates a box centered at `center` with the given half extents.
    pub fn from_center_half_extents(center: Point3<f32>, half_extents: Vector3<f32>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Returns the minimum corner.
    #[inline]
    pub fn min(&self) -> Point3<f32> {
        self.min
    }

    /// Returns the maximum corner.
    #[inline]
    pub fn max(&self) -> Point3<f32> {
        self.max
    }

    /// Returns the center of the box.
    #[inline]
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the full edge lengths of the box.
    #[inline]
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Returns a box grown to include `point`.
    pub fn expanded_to(&self, point: Point3<f32>) -> Self {
        Self {
            min: self.min.inf(&point),
            max: self.max.sup(&point),
        }
    }

    /// Returns the union of two boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Inflates the box by a uniform margin in all directions.
    pub fn inflate(&self, margin: f32) -> Self {
        let delta = Vector3::repeat(margin);
        Self {
            min: self.min - delta,
            max: self.max + delta,
        }
    }

    /// True when `other` overlaps (intersects or touches) this box.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// True when `other` lies entirely inside this box (boundary included).
    pub fn contains(&self, other: &Self) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Point3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Returns the point of the box closest to `p`.
    pub fn closest_point(&self, p: Point3<f32>) -> Point3<f32> {
        p.sup(&self.min).inf(&self.max)
    }

    /// Returns one of the eight equal octants of this box.
    ///
    /// Bit 0 of `index` selects the upper half along X, bit 1 along Y and
    /// bit 2 along Z.
    pub fn octant(&self, index: usize) -> Self {
        debug_assert!(index < 8, "octant index out of range: {index}");
        let c = self.center();
        let pick = |bit: usize, lo: f32, mid: f32, hi: f32| {
            if index & bit == 0 { (lo, mid) } else { (mid, hi) }
        };
        let (x0, x1) = pick(1, self.min.x, c.x, self.max.x);
        let (y0, y1) = pick(2, self.min.y, c.y, self.max.y);
        let (z0, z1) = pick(4, self.min.z, c.z, self.max.z);
        Self {
            min: Point3::new(x0, y0, z0),
            max: Point3::new(x1, y1, z1),
        }
    }

    /// Returns the index of the octant that fully contains `inner`, if any.
    ///
    /// Boxes straddling a splitting plane belong to no octant.
    pub fn octant_containing(&self, inner: &Self) -> Option<usize> {
        let c = self.center();
        let mut index = 0;
        for (axis, bit) in [1, 2, 4].into_iter().enumerate() {
            if inner.min[axis] >= c[axis] {
                index |= bit;
            } else if inner.max[axis] > c[axis] {
                return None;
            }
        }
        self.octant(index).contains(inner).then_some(index)
    }

    /// Slab test against a ray given as `origin + t * direction`.
    ///
    /// Returns the entry and exit parameters clipped to `[0, max_t]`.
    pub fn ray_interval(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_t: f32,
    ) -> Option<(f32, f32)> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_t;
        for axis in 0..3 {
            let d = direction[axis];
            if d.abs() < f32::EPSILON {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - origin[axis]) * inv;
            let mut t1 = (self.max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some((t_min, t_max))
    }
}

/// A sphere given by its center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Point3<f32>,
    /// Radius of the sphere (non-negative).
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere.
    pub fn new(center: Point3<f32>, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Returns the bounding box of the sphere.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(self.center, Vector3::repeat(self.radius))
    }

    /// True when the sphere overlaps (or touches) the box.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = aabb.closest_point(self.center);
        (closest - self.center).norm_squared() <= self.radius * self.radius
    }
}

/// A query region for the octree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    /// Axis-aligned box region.
    Aabb(Aabb),
    /// Spherical region.
    Sphere(Sphere),
}

impl Volume {
    /// True when the region overlaps (or touches) the box.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        match self {
            Self::Aabb(region) => region.intersects(aabb),
            Self::Sphere(sphere) => sphere.intersects_aabb(aabb),
        }
    }

    /// Returns the bounding box of the region.
    pub fn bounds(&self) -> Aabb {
        match self {
            Self::Aabb(region) => *region,
            Self::Sphere(sphere) => sphere.bounds(),
        }
    }
}

impl From<Aabb> for Volume {
    fn from(aabb: Aabb) -> Self {
        Self::Aabb(aabb)
    }
}

impl From<Sphere> for Volume {
    fn from(sphere: Sphere) -> Self {
        Self::Sphere(sphere)
    }
}
