//! Exact capsule/sphere versus triangle tests.

use nalgebra::{Point3, Vector3};

use crate::{Capsule, Octree, Sphere, Triangle, TriangleId};

use super::Contact;

/// Below this separation the direction between closest points is unreliable
/// and the triangle normal is used instead.
const CONTACT_NORMAL_EPSILON: f32 = 1e-6;

/// Closest points between segments `p1..q1` and `p2..q2`.
///
/// Returns `(point_on_first, point_on_second)`. Zero-length segments are
/// treated as points; parallel segments pick the pair nearest `p1`.
pub fn closest_points_segment_segment(
    p1: Point3<f32>,
    q1: Point3<f32>,
    p2: Point3<f32>,
    q2: Point3<f32>,
) -> (Point3<f32>, Point3<f32>) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a <= f32::EPSILON && e <= f32::EPSILON {
        (0.0, 0.0)
    } else if a <= f32::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= f32::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let s = if denom > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// Closest points between the segment `start..end` and a triangle.
///
/// Returns `(point_on_segment, point_on_triangle)`; both are the same point
/// when the segment passes through the triangle.
pub fn closest_points_segment_triangle(
    start: Point3<f32>,
    end: Point3<f32>,
    triangle: &Triangle,
) -> (Point3<f32>, Point3<f32>) {
    if let Some((_, point)) = triangle.intersect_segment(start, end) {
        return (point, point);
    }

    let mut best = (start, triangle.closest_point(start));
    let mut best_dist_sq = (best.0 - best.1).norm_squared();
    let mut consider = |pair: (Point3<f32>, Point3<f32>)| {
        let dist_sq = (pair.0 - pair.1).norm_squared();
        if dist_sq < best_dist_sq {
            best = pair;
            best_dist_sq = dist_sq;
        }
    };

    consider((end, triangle.closest_point(end)));
    for (a, b) in triangle.edges() {
        consider(closest_points_segment_segment(start, end, a, b));
    }
    best
}

/// Penetration of a capsule into a triangle, if any.
///
/// `reference` is where the capsule came from. When the segment touches or
/// crosses the triangle, the triangle normal is flipped to face the
/// reference point and the depth pushes the whole segment back to that side.
/// Without a reference the triangle's own normal is used.
pub fn capsule_triangle_contact(
    capsule: &Capsule,
    id: TriangleId,
    triangle: &Triangle,
    reference: Option<Point3<f32>>,
) -> Option<Contact> {
    let (on_segment, on_triangle) =
        closest_points_segment_triangle(capsule.start, capsule.end, triangle);
    let delta = on_segment - on_triangle;
    let distance = delta.norm();
    if distance >= capsule.radius {
        return None;
    }

    if distance > CONTACT_NORMAL_EPSILON {
        return Some(Contact {
            triangle: id,
            depth: capsule.radius - distance,
            normal: delta / distance,
            point: on_triangle,
        });
    }

    let mut plane = *triangle.plane();
    if reference.is_some_and(|r| plane.signed_distance(r) < 0.0) {
        plane = plane.flipped();
    }
    let lowest = plane
        .signed_distance(capsule.start)
        .min(plane.signed_distance(capsule.end));
    Some(Contact {
        triangle: id,
        depth: capsule.radius - lowest.min(0.0),
        normal: plane.normal(),
        point: on_triangle,
    })
}

/// Penetration of a sphere into a triangle, if any.
pub fn sphere_triangle_contact(
    sphere: &Sphere,
    id: TriangleId,
    triangle: &Triangle,
) -> Option<Contact> {
    let on_triangle = triangle.closest_point(sphere.center);
    let delta: Vector3<f32> = sphere.center - on_triangle;
    let distance = delta.norm();
    if distance >= sphere.radius {
        return None;
    }
    let normal = if distance > CONTACT_NORMAL_EPSILON {
        delta / distance
    } else {
        triangle.normal()
    };
    Some(Contact {
        triangle: id,
        depth: sphere.radius - distance,
        normal,
        point: on_triangle,
    })
}

/// Deepest capsule contact among `candidates`.
pub fn deepest_capsule_contact(
    octree: &Octree,
    candidates: &[TriangleId],
    capsule: &Capsule,
    reference: Option<Point3<f32>>,
) -> Option<Contact> {
    deepest(candidates.iter().filter_map(|&id| {
        let triangle = octree.triangle(id)?;
        capsule_triangle_contact(capsule, id, triangle, reference)
    }))
}

/// Deepest sphere contact among `candidates`.
pub fn deepest_sphere_contact(
    octree: &Octree,
    candidates: &[TriangleId],
    sphere: &Sphere,
) -> Option<Contact> {
    deepest(candidates.iter().filter_map(|&id| {
        let triangle = octree.triangle(id)?;
        sphere_triangle_contact(sphere, id, triangle)
    }))
}

fn deepest(contacts: impl Iterator<Item = Contact>) -> Option<Contact> {
    contacts.fold(None, |best: Option<Contact>, contact| match best {
        Some(b) if b.depth >= contact.depth => Some(b),
        _ => Some(contact),
    })
}
