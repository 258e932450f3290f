//! Visitor pattern for octree range queries.
//!
//! Visitors receive candidate triangles as the query walks the tree, so
//! callers can filter or accumulate without an intermediate allocation.

use crate::{Triangle, TriangleId};

/// Visitor for processing candidate triangles during an octree query.
pub trait OctreeVisitor {
    /// Called once for each candidate triangle.
    fn visit(&mut self, id: TriangleId, triangle: &Triangle);
}

/// A simple visitor that collects the handles of all visited triangles.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<TriangleId>,
}

impl CollectingVisitor {
    /// Creates a new empty collecting visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected handles.
    pub fn into_ids(self) -> Vec<TriangleId> {
        self.collected
    }

    /// Returns a reference to the collected handles.
    pub fn ids(&self) -> &[TriangleId] {
        &self.collected
    }
}

impl OctreeVisitor for CollectingVisitor {
    fn visit(&mut self, id: TriangleId, _triangle: &Triangle) {
        self.collected.push(id);
    }
}

/// A visitor that calls a closure for each candidate triangle.
pub struct FnVisitor<F>
where
    F: FnMut(TriangleId, &Triangle),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(TriangleId, &Triangle),
{
    /// Creates a new visitor from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> OctreeVisitor for FnVisitor<F>
where
    F: FnMut(TriangleId, &Triangle),
{
    fn visit(&mut self, id: TriangleId, triangle: &Triangle) {
        (self.func)(id, triangle);
    }
}
