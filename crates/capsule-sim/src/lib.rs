//! Scene builders and a simple walking character for exercising
//! `capsule-octree` without a renderer.

use capsule_octree::{Mesh, SceneNode, Session, SessionConfig, SessionError, TickOutcome};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// Corner order shared by the cube builders.
const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0], // 0: left-bottom-back
    [1.0, -1.0, -1.0],  // 1: right-bottom-back
    [1.0, 1.0, -1.0],   // 2: right-top-back
    [-1.0, 1.0, -1.0],  // 3: left-top-back
    [-1.0, -1.0, 1.0],  // 4: left-bottom-front
    [1.0, -1.0, 1.0],   // 5: right-bottom-front
    [1.0, 1.0, 1.0],    // 6: right-top-front
    [-1.0, 1.0, 1.0],   // 7: left-top-front
];

/// Six faces with counter-clockwise winding seen from outside.
const CUBE_FACES: [[u32; 4]; 6] = [
    [4, 5, 6, 7], // front (+Z)
    [1, 0, 3, 2], // back (-Z)
    [0, 4, 7, 3], // left (-X)
    [5, 1, 2, 6], // right (+X)
    [7, 6, 2, 3], // top (+Y)
    [0, 1, 5, 4], // bottom (-Y)
];

/// Splits quads `[a, b, c, d]` into the triangles `abc` and `acd`.
fn quad_indices(quads: &[[u32; 4]]) -> Vec<u32> {
    quads
        .iter()
        .flat_map(|&[a, b, c, d]| [a, b, c, a, c, d])
        .collect()
}

/// An axis-aligned box mesh given its center and edge lengths.
pub fn box_mesh(center: Point3<f32>, size: Vector3<f32>) -> Mesh {
    let half = size / 2.0;
    let corners = CUBE_CORNERS
        .iter()
        .map(|[x, y, z]| center + Vector3::new(x * half.x, y * half.y, z * half.z))
        .collect();
    Mesh::indexed(corners, quad_indices(&CUBE_FACES))
}

/// A cube of edge `size` centred on the local origin, placed and rotated by
/// the node transform.
pub fn rotated_cube(center: Point3<f32>, size: f32, rotation: UnitQuaternion<f32>) -> SceneNode {
    let placement = Isometry3::from_parts(Translation3::from(center.coords), rotation);
    SceneNode::with_mesh(box_mesh(Point3::origin(), Vector3::repeat(size)))
        .transformed(placement.to_homogeneous())
}

/// A horizontal square of side `2 * half` at height `y`, facing up.
pub fn ground_quad(half: f32, y: f32) -> Mesh {
    Mesh::indexed(
        vec![
            Point3::new(-half, y, -half),
            Point3::new(-half, y, half),
            Point3::new(half, y, half),
            Point3::new(half, y, -half),
        ],
        quad_indices(&[[0, 1, 2, 3]]),
    )
}

/// A slope along -X: starts at `x_start` on the ground and reaches `rise`
/// after `run` meters. `half_width` extends along Z.
pub fn ramp(x_start: f32, run: f32, rise: f32, half_width: f32) -> Mesh {
    let x_end = x_start - run;
    Mesh::indexed(
        vec![
            Point3::new(x_start, 0.0, half_width),
            Point3::new(x_start, 0.0, -half_width),
            Point3::new(x_end, rise, -half_width),
            Point3::new(x_end, rise, half_width),
        ],
        quad_indices(&[[0, 1, 2, 3]]),
    )
}

/// The demo level: a floor, a wall block, a ramp and a tilted crate.
pub fn demo_world() -> SceneNode {
    let tilt = UnitQuaternion::from_euler_angles(0.3, 0.4, 0.25);
    SceneNode::group()
        .named("map")
        .with_child(SceneNode::with_mesh(ground_quad(10.0, 0.0)).named("floor"))
        .with_child(
            SceneNode::with_mesh(box_mesh(Point3::new(5.0, 1.5, 0.0), Vector3::new(1.0, 3.0, 8.0)))
                .named("wall"),
        )
        .with_child(SceneNode::with_mesh(ramp(-2.0, 4.0, 2.0, 2.0)).named("ramp"))
        .with_child(rotated_cube(Point3::new(0.0, 0.5, -4.0), 1.0, tilt).named("crate"))
}

/// Placeholder character model; the capsule does the colliding.
pub fn character_model() -> SceneNode {
    SceneNode::group().named("character")
}

/// Builds a sealed session with the demo world loaded.
pub fn demo_session(config: SessionConfig) -> Result<Session, Box<dyn std::error::Error>> {
    let mut session = Session::new(config)?;
    session.register_model("character", character_model())?;
    session.register_model("map", demo_world())?;
    let report = session.insert_model("map")?;
    log::info!(
        "map indexed: {} triangles, {} skipped",
        report.inserted,
        report.skipped()
    );
    session.enter_query_phase()?;
    Ok(session)
}

/// Integrates gravity and a constant walking velocity into per-tick movement.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Horizontal velocity in meters per second.
    pub walk: Vector3<f32>,
    /// Gravity acceleration (negative is down).
    pub gravity: f32,
    velocity_y: f32,
}

impl Walker {
    /// Creates a walker at rest vertically. The vertical part of `walk` is
    /// dropped; `gravity` alone drives vertical motion.
    pub fn new(walk: Vector3<f32>, gravity: f32) -> Self {
        Self {
            walk: Vector3::new(walk.x, 0.0, walk.z),
            gravity,
            velocity_y: 0.0,
        }
    }

    /// Current vertical speed.
    pub fn vertical_speed(&self) -> f32 {
        self.velocity_y
    }

    /// Advances the session by `dt` seconds.
    pub fn step(&mut self, session: &mut Session, dt: f32) -> Result<TickOutcome, SessionError> {
        self.velocity_y += self.gravity * dt;
        let movement = self.walk * dt + Vector3::new(0.0, self.velocity_y * dt, 0.0);
        let outcome = session.tick(movement)?;

        // Damp the fall against whatever blocked it.
        if movement.y != 0.0 {
            self.velocity_y *= (outcome.slid_movement.y / movement.y).clamp(0.0, 1.0);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_faces_point_outward() {
        let center = Point3::new(1.0, 2.0, 3.0);
        let triangles = SceneNode::with_mesh(box_mesh(center, Vector3::new(2.0, 2.0, 2.0)))
            .world_triangles();
        assert_eq!(triangles.len(), 12);
        for [a, b, c] in triangles {
            let normal = (b - a).cross(&(c - a));
            let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
            assert!(normal.dot(&(centroid - center)) > 0.0);
        }
    }

    #[test]
    fn demo_world_indexes_cleanly() {
        let session = demo_session(SessionConfig::default()).unwrap();
        assert_eq!(session.octree().triangle_count(), 2 + 12 + 2 + 12);
        assert!(session.is_ready());
    }

    #[test]
    fn walker_lands_and_stops_at_wall() {
        let mut session = demo_session(SessionConfig::default()).unwrap();
        session.spawn_character(Point3::new(2.0, 1.0, 0.0));
        let mut walker = Walker::new(Vector3::new(3.0, 0.0, 0.0), -9.8);

        let mut grounded = false;
        for _ in 0..180 {
            grounded = walker.step(&mut session, 1.0 / 60.0).unwrap().grounded;
        }

        let capsule = session.capsule();
        assert!(grounded);
        assert!((capsule.start.y - 0.2).abs() < 1e-3);
        // Wall face is at x = 4.5.
        assert!((capsule.start.x - 4.3).abs() < 1e-3);
    }
}
