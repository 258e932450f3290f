//! Append-only storage for world triangles.

use std::ops::Index;

use crate::Triangle;

/// Stable handle to a triangle in a [`TriangleStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriangleId(u32);

impl TriangleId {
    /// Returns the position of the triangle in its store.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owns every triangle inserted into an octree.
///
/// Triangles are never removed or reordered, so a [`TriangleId`] stays valid
/// for the lifetime of the store.
#[derive(Debug, Clone, Default)]
pub struct TriangleStore {
    triangles: Vec<Triangle>,
}

impl TriangleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a triangle and returns its handle.
    ///
    /// # Panics
    /// Panics if the store already holds `u32::MAX` triangles.
    pub fn push(&mut self, triangle: Triangle) -> TriangleId {
        let id = u32::try_from(self.triangles.len()).expect("triangle store is full");
        self.triangles.push(triangle);
        TriangleId(id)
    }

    /// Returns the triangle for `id`, if it belongs to this store.
    #[inline]
    pub fn get(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id.index())
    }

    /// Returns the number of stored triangles.
    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if the store holds no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Iterates over every triangle with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (TriangleId, &Triangle)> {
        self.triangles
            .iter()
            .enumerate()
            .map(|(i, t)| (TriangleId(i as u32), t))
    }
}

impl Index<TriangleId> for TriangleStore {
    type Output = Triangle;

    fn index(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id.index()]
    }
}
