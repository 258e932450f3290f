//! Minimal scene graph used to hand mesh subgraphs to the octree.
//!
//! Loaders convert whatever asset format they decode into [`SceneNode`]s;
//! the octree only ever sees the world-space triangles harvested from them.

use nalgebra::{Matrix4, Point3};

/// Raw triangle corners, before validation.
pub type RawTriangle = [Point3<f32>; 3];

/// Triangle mesh in the local space of its node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    positions: Vec<Point3<f32>>,
    indices: Option<Vec<u32>>,
}

impl Mesh {
    /// Creates a non-indexed mesh: every three positions form a triangle.
    pub fn new(positions: Vec<Point3<f32>>) -> Self {
        Self {
            positions,
            indices: None,
        }
    }

    /// Creates an indexed mesh: every three indices form a triangle.
    pub fn indexed(positions: Vec<Point3<f32>>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices: Some(indices),
        }
    }

    /// Returns the vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Returns the number of triangles described by the mesh.
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Emits the mesh triangles transformed by `world`.
    ///
    /// Triangles referencing out-of-range indices are dropped; a trailing
    /// partial triangle is ignored.
    fn emit(&self, world: &Matrix4<f32>, out: &mut Vec<RawTriangle>) {
        let transform = |p: &Point3<f32>| world.transform_point(p);
        match &self.indices {
            Some(indices) => {
                for (i, tri) in indices.chunks_exact(3).enumerate() {
                    let corner = |k: usize| self.positions.get(tri[k] as usize).map(transform);
                    match (corner(0), corner(1), corner(2)) {
                        (Some(a), Some(b), Some(c)) => out.push([a, b, c]),
                        _ => log::warn!("mesh triangle {i} references a missing vertex; dropped"),
                    }
                }
            }
            None => {
                out.extend(
                    self.positions
                        .chunks_exact(3)
                        .map(|p| [transform(&p[0]), transform(&p[1]), transform(&p[2])]),
                );
            }
        }
    }
}

/// A node of a scene graph: local transform, optional mesh, children.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Human-readable node name, if the asset provided one.
    pub name: Option<String>,
    /// Transform from this node's space into its parent's space.
    pub transform: Matrix4<f32>,
    /// Geometry attached to this node.
    pub mesh: Option<Mesh>,
    /// Child nodes.
    pub children: Vec<SceneNode>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: None,
            transform: Matrix4::identity(),
            mesh: None,
            children: Vec::new(),
        }
    }
}

impl SceneNode {
    /// Creates an empty group node with an identity transform.
    pub fn group() -> Self {
        Self::default()
    }

    /// Creates a leaf node holding a mesh.
    pub fn with_mesh(mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::default()
        }
    }

    /// Sets the node name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the local transform.
    pub fn transformed(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    /// Appends a child node.
    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Collects the world-space triangles of this node and all descendants.
    ///
    /// The node's own transform is applied as if its parent were the world.
    pub fn world_triangles(&self) -> Vec<RawTriangle> {
        let mut out = Vec::new();
        self.collect(&Matrix4::identity(), &mut out);
        out
    }

    fn collect(&self, parent: &Matrix4<f32>, out: &mut Vec<RawTriangle>) {
        let world = parent * self.transform;
        if let Some(mesh) = &self.mesh {
            mesh.emit(&world, out);
        }
        for child in &self.children {
            child.collect(&world, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn unit_quad() -> Mesh {
        Mesh::indexed(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn harvest_applies_nested_transforms() {
        let scene = SceneNode::group()
            .named("map")
            .transformed(Matrix4::new_translation(&Vector3::new(0.0, 5.0, 0.0)))
            .with_child(
                SceneNode::with_mesh(unit_quad())
                    .transformed(Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0))),
            );

        let triangles = scene.world_triangles();
        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[0][0], Point3::new(10.0, 5.0, 0.0));
        assert_eq!(triangles[1][2], Point3::new(11.0, 5.0, 0.0));
    }

    #[test]
    fn non_indexed_mesh_ignores_partial_triangle() {
        let mesh = Mesh::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ]);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(SceneNode::with_mesh(mesh).world_triangles().len(), 1);
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let mesh = Mesh::indexed(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 1, 7],
        );
        assert_eq!(SceneNode::with_mesh(mesh).world_triangles().len(), 1);
    }
}
