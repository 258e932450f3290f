//! Octree spatial index over static world triangles.
//!
//! The tree recursively splits space into eight equal octants. Triangles
//! live in a shared [`TriangleStore`](crate::TriangleStore) and nodes refer
//! to them by [`TriangleId`](crate::TriangleId), so each triangle is stored
//! exactly once no matter how the hierarchy is rebuilt.
//!
//! # Example
//!
//! ```ignore
//! use capsule_octree::{Octree, OctreeSettings, Sphere, Volume};
//! use nalgebra::Point3;
//!
//! let mut octree = Octree::new(OctreeSettings::default());
//! octree.insert_scene(&map_scene);
//!
//! let near = Volume::Sphere(Sphere::new(Point3::new(0.0, 1.0, 0.0), 2.0));
//! for id in octree.query_candidates(&near) {
//!     let triangle = &octree.store()[id];
//!     // exact tests on `triangle`
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Octree`]: owns the store and the root node, tracks inserted subgraphs
//! - [`OctreeNode`]: a box, the triangles that straddle its octants, and up
//!   to eight lazily created children
//! - [`OctreeVisitor`]: callback trait for streaming query results

mod node;
mod tree;
mod visitor;

pub use node::OctreeNode;
pub use tree::{InsertReport, Octree, RayHit, RejectedTriangle};
pub use visitor::{CollectingVisitor, FnVisitor, OctreeVisitor};
