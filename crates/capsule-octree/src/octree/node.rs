//! Octree node implementation.

use crate::{Aabb, OctreeSettings, TriangleId, TriangleStore, Volume};

use super::visitor::OctreeVisitor;

/// A node in the octree.
///
/// Each node covers an axis-aligned box. Triangles that fit entirely inside
/// one octant of the box are pushed down into the matching child once the
/// node has split; triangles straddling an octant boundary stay listed here,
/// so no triangle is ever stored twice.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// Region covered by this node.
    bounds: Aabb,

    /// Triangles kept at this level, in insertion order.
    triangles: Vec<TriangleId>,

    /// Child slots indexed by octant; created on first use.
    children: [Option<Box<OctreeNode>>; 8],

    /// Set once the node exceeded its triangle budget and started routing
    /// triangles into children.
    split: bool,
}

impl OctreeNode {
    /// Creates an empty leaf covering `bounds`.
    pub fn new(bounds: Aabb) -> Self {
        Self {
            bounds,
            triangles: Vec::new(),
            children: Default::default(),
            split: false,
        }
    }

    /// Returns the region covered by this node.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Returns the triangles listed directly at this node.
    #[inline]
    pub fn triangles(&self) -> &[TriangleId] {
        &self.triangles
    }

    /// Returns the child in octant `index`, if it exists.
    #[inline]
    pub fn child(&self, index: usize) -> Option<&OctreeNode> {
        self.children.get(index)?.as_deref()
    }

    /// Iterates over the existing children.
    pub fn children(&self) -> impl Iterator<Item = &OctreeNode> {
        self.children.iter().filter_map(|c| c.as_deref())
    }

    /// Checks if this node has any children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Returns the total number of triangles in this subtree.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() + self.children().map(OctreeNode::triangle_count).sum::<usize>()
    }

    /// Returns the number of nodes in this subtree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.children().map(OctreeNode::node_count).sum::<usize>()
    }

    /// Returns the depth of this subtree (1 for a leaf node).
    pub fn depth(&self) -> usize {
        1 + self.children().map(OctreeNode::depth).max().unwrap_or(0)
    }

    /// Inserts a stored triangle into this subtree.
    ///
    /// The caller guarantees the triangle's bounds lie inside this node.
    pub(crate) fn insert(
        &mut self,
        id: TriangleId,
        store: &TriangleStore,
        settings: &OctreeSettings,
        depth: usize,
    ) {
        if self.split {
            if let Some(octant) = self.bounds.octant_containing(store[id].bounds()) {
                let child_bounds = self.bounds.octant(octant);
                self.children[octant]
                    .get_or_insert_with(|| Box::new(OctreeNode::new(child_bounds)))
                    .insert(id, store, settings, depth + 1);
                return;
            }
            self.triangles.push(id);
            return;
        }

        self.triangles.push(id);
        if self.triangles.len() > settings.max_triangles_per_node && depth < settings.max_depth {
            self.subdivide(store, settings, depth);
        }
    }

    /// Starts routing triangles into octants and redistributes the ones held here.
    fn subdivide(&mut self, store: &TriangleStore, settings: &OctreeSettings, depth: usize) {
        self.split = true;
        let held = std::mem::take(&mut self.triangles);
        let count = held.len();
        for id in held {
            self.insert(id, store, settings, depth);
        }
        log::debug!(
            "split octree node at depth {depth}: {} of {count} triangles moved to children",
            count - self.triangles.len()
        );
    }

    /// Visits every triangle whose bounds intersect `region`.
    ///
    /// Children are only entered when their box intersects the region. A
    /// triangle is always inside the box of the node listing it, so pruning a
    /// node can never drop a matching triangle.
    pub(crate) fn visit<V: OctreeVisitor>(
        &self,
        region: &Volume,
        store: &TriangleStore,
        visitor: &mut V,
    ) {
        if !region.intersects_aabb(&self.bounds) {
            return;
        }
        for &id in &self.triangles {
            let triangle = &store[id];
            if region.intersects_aabb(triangle.bounds()) {
                visitor.visit(id, triangle);
            }
        }
        for child in self.children() {
            child.visit(region, store, visitor);
        }
    }
}
