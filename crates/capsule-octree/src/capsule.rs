//! Character capsule shape.

use nalgebra::{Point3, Vector3};

use crate::{Aabb, DEFAULT_CAPSULE_RADIUS};

/// A swept sphere: every point within `radius` of the segment `start..end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    /// First endpoint of the core segment.
    pub start: Point3<f32>,
    /// Second endpoint of the core segment.
    pub end: Point3<f32>,
    /// Radius around the segment.
    pub radius: f32,
}

impl Default for Capsule {
    /// A zero-length capsule at the origin with the default character radius.
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin(), DEFAULT_CAPSULE_RADIUS)
    }
}

impl Capsule {
    /// Creates a capsule from its segment and radius.
    pub fn new(start: Point3<f32>, end: Point3<f32>, radius: f32) -> Self {
        Self {
            start,
            end,
            radius: radius.max(0.0),
        }
    }

    /// Creates an upright (+Y) character capsule standing on `foot`.
    ///
    /// `height` is the total height including both caps; it is clamped so the
    /// segment never inverts.
    pub fn standing(foot: Point3<f32>, radius: f32, height: f32) -> Self {
        let radius = radius.max(0.0);
        let top = (height - radius).max(radius);
        Self::new(
            foot + Vector3::new(0.0, radius, 0.0),
            foot + Vector3::new(0.0, top, 0.0),
            radius,
        )
    }

    /// Returns the segment midpoint.
    #[inline]
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.start, &self.end)
    }

    /// Returns the vector from `start` to `end`.
    #[inline]
    pub fn axis(&self) -> Vector3<f32> {
        self.end - self.start
    }

    /// Returns the total extent along the axis, caps included.
    pub fn height(&self) -> f32 {
        self.axis().norm() + 2.0 * self.radius
    }

    /// Moves both endpoints by `offset`.
    #[inline]
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.start += offset;
        self.end += offset;
    }

    /// Returns a copy moved by `offset`.
    #[inline]
    pub fn translated(&self, offset: Vector3<f32>) -> Self {
        let mut moved = *self;
        moved.translate(offset);
        moved
    }

    /// Returns the bounding box of the capsule.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.start, self.end).inflate(self.radius)
    }

    /// Returns the bounding box of the capsule swept along `movement`.
    pub fn swept_bounds(&self, movement: Vector3<f32>) -> Aabb {
        self.bounds().union(&self.translated(movement).bounds())
    }

    /// Returns the point of the segment closest to `p` and its parameter in `[0, 1]`.
    ///
    /// A zero-length segment always reports `start` with parameter 0.
    pub fn closest_point_on_segment(&self, p: Point3<f32>) -> (f32, Point3<f32>) {
        let axis = self.axis();
        let len_sq = axis.norm_squared();
        if len_sq <= f32::EPSILON {
            return (0.0, self.start);
        }
        let t = ((p - self.start).dot(&axis) / len_sq).clamp(0.0, 1.0);
        (t, self.start + axis * t)
    }

    /// True when the point lies inside the capsule (surface included).
    pub fn contains_point(&self, p: Point3<f32>) -> bool {
        let (_, closest) = self.closest_point_on_segment(p);
        (p - closest).norm_squared() <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero_length() {
        let capsule = Capsule::default();
        assert_eq!(capsule.start, capsule.end);
        assert_eq!(capsule.radius, DEFAULT_CAPSULE_RADIUS);
        assert_eq!(capsule.height(), 2.0 * DEFAULT_CAPSULE_RADIUS);
    }

    #[test]
    fn standing_capsule_spans_height() {
        let capsule = Capsule::standing(Point3::new(1.0, 0.0, 0.0), 0.5, 2.0);
        assert_eq!(capsule.start, Point3::new(1.0, 0.5, 0.0));
        assert_eq!(capsule.end, Point3::new(1.0, 1.5, 0.0));
        assert_eq!(capsule.height(), 2.0);
        assert_eq!(capsule.center(), Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn bounds_include_radius_and_sweep() {
        let capsule = Capsule::standing(Point3::origin(), 0.5, 2.0);
        let bounds = capsule.bounds();
        assert_eq!(bounds.min(), Point3::new(-0.5, 0.0, -0.5));
        assert_eq!(bounds.max(), Point3::new(0.5, 2.0, 0.5));

        let swept = capsule.swept_bounds(Vector3::new(3.0, 0.0, 0.0));
        assert_eq!(swept.max(), Point3::new(3.5, 2.0, 0.5));
        assert_eq!(swept.min(), bounds.min());
    }

    #[test]
    fn closest_point_clamps_to_segment() {
        let capsule = Capsule::new(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 2.0, 0.0), 0.25);
        assert_eq!(
            capsule.closest_point_on_segment(Point3::new(1.0, 1.0, 0.0)),
            (0.5, Point3::new(0.0, 1.0, 0.0))
        );
        assert_eq!(
            capsule.closest_point_on_segment(Point3::new(1.0, 5.0, 0.0)),
            (1.0, Point3::new(0.0, 2.0, 0.0))
        );
        assert!(capsule.contains_point(Point3::new(0.2, 2.1, 0.0)));
        assert!(!capsule.contains_point(Point3::new(0.3, 1.0, 0.0)));
    }
}
