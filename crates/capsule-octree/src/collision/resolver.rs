//! Per-tick capsule resolution against the octree.

use nalgebra::Vector3;

use crate::{Capsule, Octree, ResolverSettings, Volume};

use super::{deepest_capsule_contact, Contact};

/// Movements shorter than this (squared) are treated as no movement.
const MIN_MOVE_SQ: f32 = 1e-8;

/// Lower bound on the sub-step length, for capsules with a tiny radius.
const MIN_SUBSTEP: f32 = 1e-3;

/// Result of one [`resolve`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// The corrected capsule.
    pub capsule: Capsule,
    /// Displacement actually applied to the capsule, corrections included.
    pub applied: Vector3<f32>,
    /// The requested movement with every blocked component projected away.
    ///
    /// Hosts integrating a velocity can use this to damp it against surfaces.
    pub slid_movement: Vector3<f32>,
    /// Last correction applied during the tick.
    pub contact: Option<Contact>,
    /// Whether a correction came from a surface flat enough to stand on.
    pub grounded: bool,
    /// Set when the result is best-effort: either a sub-step still
    /// penetrated after the last allowed pass, or the movement was longer
    /// than `max_substeps` sub-steps can cover and got cut short.
    pub exhausted: bool,
    /// Corrections applied over all sub-steps.
    pub iterations: u32,
    /// Sub-steps taken.
    pub substeps: u32,
    /// Candidate triangles returned by the broad phase.
    pub candidates: usize,
}

impl TickOutcome {
    fn at_rest(capsule: Capsule) -> Self {
        Self {
            capsule,
            applied: Vector3::zeros(),
            slid_movement: Vector3::zeros(),
            contact: None,
            grounded: false,
            exhausted: false,
            iterations: 0,
            substeps: 0,
            candidates: 0,
        }
    }
}

/// Moves `capsule` by `movement` and pushes it out of the geometry.
///
/// The octree is queried once with the swept bounds of the whole movement.
/// The movement is then split into sub-steps no longer than
/// `substep_fraction * radius`; after each sub-step the deepest contact is
/// resolved first, up to `max_iterations` times. Each correction removes the
/// part of the remaining movement that points into the contact normal, so
/// the capsule slides along surfaces instead of stopping dead.
///
/// A movement longer than `max_substeps` sub-steps can cover is shortened to
/// that reach and the outcome is flagged `exhausted`; the capsule never skips
/// over geometry between sub-steps.
///
/// A zero movement returns the capsule unchanged without querying the tree.
pub fn resolve(
    octree: &Octree,
    capsule: &Capsule,
    movement: Vector3<f32>,
    settings: &ResolverSettings,
) -> TickOutcome {
    let mut outcome = TickOutcome::at_rest(*capsule);
    if movement.norm_squared() <= MIN_MOVE_SQ {
        return outcome;
    }

    let max_step = max_substep(capsule.radius, settings);
    let reach = max_step * settings.max_substeps.max(1) as f32;
    let distance = movement.norm();
    let travel = if distance > reach {
        log::debug!("movement of {distance:.3} exceeds sub-step reach {reach:.3}, truncating");
        outcome.exhausted = true;
        movement * (reach / distance)
    } else {
        movement
    };

    let swept = capsule.swept_bounds(travel).inflate(settings.epsilon);
    let candidates = octree.query_candidates(&Volume::Aabb(swept));
    outcome.candidates = candidates.len();

    let steps = substep_count(travel.norm(), max_step, settings);
    let mut current = *capsule;
    let mut remaining = travel;
    let mut slid = movement;

    for i in 0..steps {
        let step = remaining / (steps - i) as f32;
        let reference = current.center();
        current.translate(step);
        remaining -= step;
        outcome.substeps += 1;

        for pass in 0..=settings.max_iterations {
            let Some(contact) =
                deepest_capsule_contact(octree, &candidates, &current, Some(reference))
            else {
                break;
            };
            if contact.depth <= settings.epsilon {
                break;
            }
            if pass == settings.max_iterations {
                outcome.exhausted = true;
                break;
            }

            log::trace!(
                "contact with {:?}: depth {:.4}, normal {:?}",
                contact.triangle,
                contact.depth,
                contact.normal
            );
            current.translate(contact.normal * contact.depth);
            remaining = remove_component_into(remaining, contact.normal);
            slid = remove_component_into(slid, contact.normal);
            if contact.normal.y >= settings.ground_normal_min_y {
                outcome.grounded = true;
            }
            outcome.contact = Some(contact);
            outcome.iterations += 1;
        }

        if remaining.norm_squared() <= MIN_MOVE_SQ {
            break;
        }
    }

    outcome.applied = current.start - capsule.start;
    outcome.slid_movement = slid;
    outcome.capsule = current;
    outcome
}

/// Longest distance a single sub-step may cover.
fn max_substep(radius: f32, settings: &ResolverSettings) -> f32 {
    (radius * settings.substep_fraction).max(MIN_SUBSTEP)
}

fn substep_count(distance: f32, max_step: f32, settings: &ResolverSettings) -> u32 {
    let steps = (distance / max_step).ceil();
    if steps.is_finite() {
        (steps as u32).clamp(1, settings.max_substeps.max(1))
    } else {
        settings.max_substeps.max(1)
    }
}

/// Drops the part of `v` that points into a surface with normal `normal`.
fn remove_component_into(v: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    let into = v.dot(&normal);
    if into < 0.0 {
        v - normal * into
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::closest_points_segment_triangle;
    use crate::scene::RawTriangle;
    use crate::OctreeSettings;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    /// Square of side `2 * half` at height `y`, facing +Y.
    fn floor(half: f32, y: f32) -> Vec<RawTriangle> {
        let a = Point3::new(-half, y, -half);
        let b = Point3::new(-half, y, half);
        let c = Point3::new(half, y, half);
        let d = Point3::new(half, y, -half);
        vec![[a, b, c], [a, c, d]]
    }

    /// Vertical square in the plane `x = x`, facing +X.
    fn wall(x: f32, half: f32) -> Vec<RawTriangle> {
        let a = Point3::new(x, -half, -half);
        let b = Point3::new(x, half, -half);
        let c = Point3::new(x, half, half);
        let d = Point3::new(x, -half, half);
        vec![[a, b, c], [a, c, d]]
    }

    fn octree_from(triangles: Vec<RawTriangle>) -> Octree {
        let mut octree = Octree::new(OctreeSettings::default());
        let report = octree.insert_subgraph(triangles);
        assert_eq!(report.skipped(), 0);
        octree
    }

    fn character() -> Capsule {
        Capsule::new(Point3::new(0.0, 0.2, 0.0), Point3::new(0.0, 1.8, 0.0), 0.2)
    }

    #[test]
    fn falling_capsule_lands_on_floor() {
        let octree = octree_from(floor(5.0, 0.0));
        let outcome = resolve(
            &octree,
            &character(),
            Vector3::new(0.0, -5.0, 0.0),
            &ResolverSettings::default(),
        );

        assert_relative_eq!(outcome.capsule.start.y, 0.2, epsilon = 1e-4);
        assert_relative_eq!(outcome.capsule.end.y, 1.8, epsilon = 1e-4);
        let contact = outcome.contact.unwrap();
        assert_relative_eq!(contact.normal, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        assert!(outcome.grounded);
        assert!(!outcome.exhausted);
        assert_relative_eq!(outcome.slid_movement.norm(), 0.0, epsilon = 1e-5);
        assert_eq!(outcome.candidates, 2);
    }

    #[test]
    fn fast_fall_does_not_tunnel_through_thin_floor() {
        let octree = octree_from(floor(5.0, 0.0));
        let high = character().translated(Vector3::new(0.0, 10.0, 0.0));
        let outcome = resolve(
            &octree,
            &high,
            Vector3::new(0.0, -50.0, 0.0),
            &ResolverSettings::default(),
        );
        assert!(outcome.capsule.start.y > 0.0);
        assert!(outcome.grounded);
        // 50 units is past what the default sub-steps cover.
        assert!(outcome.exhausted);
    }

    #[test]
    fn long_move_is_cut_short_instead_of_passing_through_wall() {
        let octree = octree_from(wall(30.0, 5.0));
        let capsule = Capsule::new(Point3::new(0.0, -1.0, 0.0), Point3::new(0.0, 1.0, 0.0), 0.2);
        let movement = Vector3::new(100.0, 0.0, 0.0);

        let outcome = resolve(&octree, &capsule, movement, &ResolverSettings::default());
        assert!(outcome.exhausted);
        assert!(outcome.capsule.start.x <= 29.8 + 1e-3);
        assert!(outcome.applied.norm() < movement.norm());

        // With enough sub-steps the whole move fits and the wall stops it.
        let settings = ResolverSettings {
            max_substeps: 2048,
            ..ResolverSettings::default()
        };
        let outcome = resolve(&octree, &capsule, movement, &settings);
        assert!(!outcome.exhausted);
        assert_relative_eq!(outcome.capsule.start.x, 29.8, epsilon = 1e-3);
        let contact = outcome.contact.unwrap();
        assert_relative_eq!(contact.normal, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn diagonal_move_slides_along_wall() {
        let mut triangles = wall(1.0, 5.0);
        triangles.extend(floor(5.0, -1.0));
        let octree = octree_from(triangles);
        let outcome = resolve(
            &octree,
            &character(),
            Vector3::new(2.0, 0.0, 2.0),
            &ResolverSettings::default(),
        );

        assert_relative_eq!(outcome.capsule.start.x, 0.8, epsilon = 1e-3);
        assert_relative_eq!(outcome.capsule.start.z, 2.0, epsilon = 1e-3);
        assert_relative_eq!(outcome.slid_movement.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(outcome.slid_movement.z, 2.0, epsilon = 1e-5);
        let contact = outcome.contact.unwrap();
        assert_relative_eq!(contact.normal, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
        assert!(!outcome.grounded);
    }

    #[test]
    fn zero_movement_is_a_no_op() {
        let octree = octree_from(floor(5.0, 0.0));
        // Even while penetrating, no movement means no work.
        let sunk = character().translated(Vector3::new(0.0, -0.1, 0.0));
        let outcome = resolve(&octree, &sunk, Vector3::zeros(), &ResolverSettings::default());
        assert_eq!(outcome.capsule, sunk);
        assert_eq!(outcome.applied, Vector3::zeros());
        assert_eq!(outcome.contact, None);
        assert!(!outcome.grounded);
        assert_eq!(outcome.candidates, 0);
        assert_eq!(outcome.substeps, 0);
    }

    #[test]
    fn free_movement_is_applied_in_full() {
        let octree = octree_from(floor(5.0, 0.0));
        let movement = Vector3::new(1.0, 0.5, -1.0);
        let outcome = resolve(&octree, &character(), movement, &ResolverSettings::default());
        assert_relative_eq!(outcome.applied, movement, epsilon = 1e-5);
        assert_eq!(outcome.contact, None);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn resolved_capsule_clears_every_candidate() {
        let settings = ResolverSettings::default();
        let mut triangles = Vec::new();
        // A 4x4 patch of tiles, so many candidates share the contact.
        for i in -2..2 {
            for j in -2..2 {
                let (x, z) = (i as f32, j as f32);
                let a = Point3::new(x, 0.0, z);
                let b = Point3::new(x, 0.0, z + 1.0);
                let c = Point3::new(x + 1.0, 0.0, z + 1.0);
                let d = Point3::new(x + 1.0, 0.0, z);
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
        }
        let octree = octree_from(triangles);
        let capsule = Capsule::new(Point3::new(0.3, 0.4, 0.1), Point3::new(0.3, 0.4, 0.9), 0.2);
        let outcome = resolve(&octree, &capsule, Vector3::new(0.05, -0.5, 0.0), &settings);

        assert!(!outcome.exhausted);
        for (_, triangle) in octree.store().iter() {
            let (s, t) = closest_points_segment_triangle(
                outcome.capsule.start,
                outcome.capsule.end,
                triangle,
            );
            assert!((s - t).norm() >= capsule.radius - settings.epsilon - 1e-5);
        }
    }

    #[test]
    fn iteration_cap_flags_exhausted() {
        let octree = octree_from(floor(5.0, 0.0));
        let settings = ResolverSettings {
            max_iterations: 0,
            ..ResolverSettings::default()
        };
        let outcome = resolve(&octree, &character(), Vector3::new(0.0, -1.0, 0.0), &settings);
        assert!(outcome.exhausted);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn substeps_respect_cap() {
        let settings = ResolverSettings {
            max_substeps: 4,
            ..ResolverSettings::default()
        };
        let max_step = max_substep(0.2, &settings);
        assert_eq!(substep_count(100.0, max_step, &settings), 4);
        assert_eq!(substep_count(0.05, max_step, &settings), 1);
        assert_eq!(substep_count(0.25, max_step, &ResolverSettings::default()), 3);
    }
}
