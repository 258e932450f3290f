//! Narrow-phase contact generation and capsule resolution.
//!
//! The octree only answers "which triangles are near this region". This
//! module turns those candidates into exact contacts and moves a capsule out
//! of penetration:
//!
//! - [`capsule_triangle_contact`] / [`sphere_triangle_contact`]: exact tests
//!   against a single triangle.
//! - [`deepest_capsule_contact`] / [`deepest_sphere_contact`]: the deepest
//!   contact among a candidate list.
//! - [`resolve`]: one movement tick for a capsule, with sub-stepping,
//!   iterative push-out and slide projection.

mod narrow;
mod resolver;

use nalgebra::{Point3, Vector3};

use crate::TriangleId;

pub use narrow::{
    capsule_triangle_contact, closest_points_segment_segment, closest_points_segment_triangle,
    deepest_capsule_contact, deepest_sphere_contact, sphere_triangle_contact,
};
pub use resolver::{resolve, TickOutcome};

/// Penetration of a shape into one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Triangle being penetrated.
    pub triangle: TriangleId,
    /// Overlap distance; translating by `normal * depth` separates the shapes.
    pub depth: f32,
    /// Unit direction pointing from the triangle toward the shape.
    pub normal: Vector3<f32>,
    /// Closest point on the triangle.
    pub point: Point3<f32>,
}
