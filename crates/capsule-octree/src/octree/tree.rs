//! Octree container and incremental construction.

use nalgebra::{Point3, Vector3};

use crate::collision::{self, Contact};
use crate::scene::{RawTriangle, SceneNode};
use crate::{
    Aabb, Capsule, GeometryError, OctreeSettings, Sphere, Triangle, TriangleId, TriangleStore,
    Volume,
};

use super::node::OctreeNode;
use super::visitor::{CollectingVisitor, OctreeVisitor};

/// A triangle dropped during insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedTriangle {
    /// Position of the triangle within the submitted batch.
    pub index: usize,
    /// Why it was dropped.
    pub error: GeometryError,
}

/// Summary of one [`Octree::insert_subgraph`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Number of triangles added to the store.
    pub inserted: usize,
    /// Triangles that were skipped, with the reason.
    pub rejected: Vec<RejectedTriangle>,
}

impl InsertReport {
    /// Number of triangles skipped as invalid geometry.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.rejected.len()
    }
}

/// Result of [`Octree::ray_cast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Triangle that was hit.
    pub triangle: TriangleId,
    /// Distance from the ray origin.
    pub distance: f32,
    /// World-space hit point.
    pub point: Point3<f32>,
    /// Unit normal of the hit triangle.
    pub normal: Vector3<f32>,
}

/// Spatial index over static world triangles.
///
/// The octree owns a [`TriangleStore`]; nodes only hold [`TriangleId`]s.
/// Geometry arrives in subgraphs (one per [`Octree::insert_subgraph`] call),
/// and the number of subgraphs received is tracked for readiness checks.
///
/// # Construction
///
/// ```ignore
/// let mut octree = Octree::new(OctreeSettings::default());
/// let report = octree.insert_scene(&map_scene);
/// assert_eq!(report.skipped(), 0);
/// ```
///
/// # Queries
///
/// All queries take `&self`. Once construction is finished the tree can be
/// shared between threads and queried concurrently.
#[derive(Debug, Clone, Default)]
pub struct Octree {
    store: TriangleStore,
    root: Option<OctreeNode>,
    settings: OctreeSettings,
    /// Exact union of the bounds of every stored triangle.
    geometry_bounds: Option<Aabb>,
    subgraphs: usize,
}

impl Octree {
    /// Creates an empty octree.
    pub fn new(settings: OctreeSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Returns the subdivision settings.
    #[inline]
    pub fn settings(&self) -> &OctreeSettings {
        &self.settings
    }

    /// Returns `true` if the tree contains no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns a reference to the root node, if any.
    #[inline]
    pub fn root(&self) -> Option<&OctreeNode> {
        self.root.as_ref()
    }

    /// Returns the region covered by the root node.
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.as_ref().map(|root| *root.bounds())
    }

    /// Returns the triangle store backing this tree.
    #[inline]
    pub fn store(&self) -> &TriangleStore {
        &self.store
    }

    /// Returns a stored triangle.
    #[inline]
    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.store.get(id)
    }

    /// Returns the total number of triangles in the tree.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.store.len()
    }

    /// Returns the number of nodes (0 for an empty tree).
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, OctreeNode::node_count)
    }

    /// Returns the maximum depth of the tree (0 for an empty tree).
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, OctreeNode::depth)
    }

    /// Returns how many subgraphs have been inserted so far.
    #[inline]
    pub fn subgraph_count(&self) -> usize {
        self.subgraphs
    }

    /// Adds one subgraph worth of world-space triangles.
    ///
    /// Degenerate and non-finite triangles are skipped and listed in the
    /// report; the rest of the batch is still inserted. The subgraph counter
    /// increments even if every triangle was rejected.
    ///
    /// When the batch reaches outside the current root bound the hierarchy is
    /// rebuilt over the enlarged bound. Otherwise the new triangles are pushed
    /// into the existing nodes.
    pub fn insert_subgraph<I>(&mut self, triangles: I) -> InsertReport
    where
        I: IntoIterator<Item = RawTriangle>,
    {
        let subgraph = self.subgraphs;
        let first_new = self.store.len();
        let mut report = InsertReport::default();

        for (index, [a, b, c]) in triangles.into_iter().enumerate() {
            match Triangle::new(a, b, c) {
                Ok(triangle) => {
                    let bounds = *triangle.bounds();
                    self.geometry_bounds = Some(
                        self.geometry_bounds
                            .map_or(bounds, |current| current.union(&bounds)),
                    );
                    self.store.push(triangle);
                    report.inserted += 1;
                }
                Err(error) => {
                    log::warn!("subgraph {subgraph}: skipping triangle {index}: {error}");
                    report.rejected.push(RejectedTriangle { index, error });
                }
            }
        }

        let fits = match (&self.root, &self.geometry_bounds) {
            (Some(root), Some(geometry)) => root.bounds().contains(geometry),
            (None, Some(_)) => false,
            (_, None) => true,
        };

        if fits {
            if let Some(root) = self.root.as_mut() {
                for (id, _) in self.store.iter().skip(first_new) {
                    root.insert(id, &self.store, &self.settings, 0);
                }
            }
        } else {
            self.rebuild();
        }

        self.subgraphs += 1;
        log::info!(
            "inserted subgraph {subgraph}: {} triangles, {} skipped, {} nodes",
            report.inserted,
            report.skipped(),
            self.node_count()
        );
        report
    }

    /// Harvests the world-space triangles of a scene subgraph and inserts
    /// them as one subgraph.
    pub fn insert_scene(&mut self, node: &SceneNode) -> InsertReport {
        self.insert_subgraph(node.world_triangles())
    }

    /// Rebuilds every node over the padded union of all stored geometry.
    fn rebuild(&mut self) {
        let Some(geometry) = self.geometry_bounds else {
            self.root = None;
            return;
        };
        let mut root = OctreeNode::new(geometry.inflate(self.settings.bounds_padding));
        for (id, _) in self.store.iter() {
            root.insert(id, &self.store, &self.settings, 0);
        }
        log::debug!(
            "rebuilt octree over {:?}..{:?}: {} triangles, {} nodes, depth {}",
            root.bounds().min(),
            root.bounds().max(),
            self.store.len(),
            root.node_count(),
            root.depth()
        );
        self.root = Some(root);
    }

    /// Returns every triangle whose bounding box intersects `region`.
    ///
    /// May include triangles that do not touch the region itself; callers
    /// must run exact tests on the result. Never misses one whose bounding
    /// box does intersect.
    pub fn query_candidates(&self, region: &Volume) -> Vec<TriangleId> {
        let mut visitor = CollectingVisitor::new();
        self.visit_candidates(region, &mut visitor);
        visitor.into_ids()
    }

    /// Streams the candidates of [`Octree::query_candidates`] to a visitor.
    pub fn visit_candidates<V: OctreeVisitor>(&self, region: &Volume, visitor: &mut V) {
        if let Some(root) = &self.root {
            root.visit(region, &self.store, visitor);
        }
    }

    /// Finds the nearest triangle hit by a ray, within `max_distance`.
    ///
    /// Triangles are hit from either side. Returns `None` for a zero
    /// direction.
    pub fn ray_cast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize(f32::EPSILON)?;
        let root = self.root.as_ref()?;

        let mut best: Option<RayHit> = None;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let limit = best.map_or(max_distance, |hit| hit.distance);
            if node.bounds().ray_interval(origin, direction, limit).is_none() {
                continue;
            }
            for &id in node.triangles() {
                let triangle = &self.store[id];
                let limit = best.map_or(max_distance, |hit| hit.distance);
                if let Some(distance) = triangle.intersect_ray(origin, direction, limit) {
                    best = Some(RayHit {
                        triangle: id,
                        distance,
                        point: origin + direction * distance,
                        normal: triangle.normal(),
                    });
                }
            }
            stack.extend(node.children());
        }
        best
    }

    /// Returns the deepest penetration of a sphere into the geometry.
    pub fn sphere_intersect(&self, sphere: &Sphere) -> Option<Contact> {
        let candidates = self.query_candidates(&Volume::Sphere(*sphere));
        collision::deepest_sphere_contact(self, &candidates, sphere)
    }

    /// Returns the deepest penetration of a capsule into the geometry,
    /// without moving it.
    pub fn capsule_intersect(&self, capsule: &Capsule) -> Option<Contact> {
        let candidates = self.query_candidates(&Volume::Aabb(capsule.bounds()));
        collision::deepest_capsule_contact(self, &candidates, capsule, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Mesh, SceneNode};
    use approx::assert_relative_eq;

    fn raw(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> RawTriangle {
        [
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        ]
    }

    /// Floor quad of `size` × `size` centered on the origin at `y`, facing +Y.
    fn floor(size: f32, y: f32) -> Vec<RawTriangle> {
        let h = size / 2.0;
        vec![
            raw([-h, y, -h], [-h, y, h], [h, y, h]),
            raw([-h, y, -h], [h, y, h], [h, y, -h]),
        ]
    }

    /// A grid of small separated triangles, enough to force splits.
    fn scattered(count: usize) -> Vec<RawTriangle> {
        (0..count)
            .map(|i| {
                let x = (i % 10) as f32 * 2.0;
                let z = (i / 10) as f32 * 2.0;
                raw([x, 0.0, z], [x, 0.0, z + 0.5], [x + 0.5, 0.0, z])
            })
            .collect()
    }

    #[test]
    fn empty_tree() {
        let tree = Octree::new(OctreeSettings::default());
        assert!(tree.is_empty());
        assert_eq!(tree.triangle_count(), 0);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.node_count(), 0);
        assert!(tree.bounds().is_none());
        assert!(tree.query_candidates(&Volume::Sphere(Sphere::new(Point3::origin(), 10.0))).is_empty());
    }

    #[test]
    fn insert_counts_subgraphs_and_pads_bounds() {
        let mut tree = Octree::new(OctreeSettings::default());
        let report = tree.insert_subgraph(floor(10.0, 0.0));

        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped(), 0);
        assert_eq!(tree.subgraph_count(), 1);
        assert_eq!(tree.triangle_count(), 2);

        let bounds = tree.bounds().unwrap();
        assert_relative_eq!(bounds.min(), Point3::new(-5.01, -0.01, -5.01), epsilon = 1e-6);
        assert_relative_eq!(bounds.max(), Point3::new(5.01, 0.01, 5.01), epsilon = 1e-6);
    }

    #[test]
    fn empty_subgraph_still_counts() {
        let mut tree = Octree::new(OctreeSettings::default());
        let report = tree.insert_subgraph(Vec::new());
        assert_eq!(report, InsertReport::default());
        assert_eq!(tree.subgraph_count(), 1);
        assert!(tree.root().is_none());
    }

    #[test]
    fn degenerate_triangles_are_skipped_not_fatal() {
        let mut tree = Octree::new(OctreeSettings::default());
        let mut batch = floor(4.0, 0.0);
        batch.insert(1, raw([0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [2.0, 1.0, 0.0]));
        batch.push(raw([f32::INFINITY, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]));

        let report = tree.insert_subgraph(batch);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped(), 2);
        assert_eq!(
            report.rejected,
            vec![
                RejectedTriangle { index: 1, error: GeometryError::Degenerate },
                RejectedTriangle { index: 3, error: GeometryError::NonFinite },
            ]
        );

        let everything = Volume::Aabb(Aabb::new(
            Point3::new(-100.0, -100.0, -100.0),
            Point3::new(100.0, 100.0, 100.0),
        ));
        assert_eq!(tree.query_candidates(&everything).len(), 2);
    }

    #[test]
    fn many_triangles_subdivide() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(scattered(100));

        assert_eq!(tree.triangle_count(), 100);
        assert_eq!(tree.root().unwrap().triangle_count(), 100);
        assert!(tree.depth() > 1);
        assert!(tree.node_count() > 1);
    }

    #[test]
    fn query_prunes_far_triangles() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(scattered(100));

        // Only the triangle whose corner sits at (0, 0, 0) is nearby.
        let region = Volume::Aabb(Aabb::new(
            Point3::new(-0.1, -0.1, -0.1),
            Point3::new(0.2, 0.1, 0.2),
        ));
        let hits = tree.query_candidates(&region);
        assert_eq!(hits.len(), 1);
        assert_eq!(tree.triangle(hits[0]).unwrap().vertices()[0], Point3::origin());
    }

    #[test]
    fn later_subgraph_outside_bounds_triggers_rebuild() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(floor(2.0, 0.0));
        tree.insert_subgraph(vec![raw([50.0, 0.0, 50.0], [50.0, 0.0, 51.0], [51.0, 0.0, 50.0])]);

        let bounds = tree.bounds().unwrap();
        assert!(bounds.contains_point(Point3::new(51.0, 0.0, 51.0)));
        assert_eq!(tree.subgraph_count(), 2);
        assert_eq!(tree.root().unwrap().triangle_count(), 3);

        let far = Volume::Sphere(Sphere::new(Point3::new(50.5, 0.0, 50.5), 0.1));
        assert_eq!(tree.query_candidates(&far).len(), 1);
    }

    #[test]
    fn later_subgraph_inside_bounds_is_incremental() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(floor(10.0, 0.0));
        let before = tree.bounds();
        tree.insert_subgraph(vec![raw([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0])]);
        assert_eq!(tree.bounds(), before);
        assert_eq!(tree.root().unwrap().triangle_count(), 3);
    }

    #[test]
    fn insert_scene_harvests_subgraph() {
        let quad = Mesh::indexed(
            vec![
                Point3::new(-1.0, 0.0, -1.0),
                Point3::new(-1.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, -1.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        );
        let scene = SceneNode::group().with_child(SceneNode::with_mesh(quad));

        let mut tree = Octree::new(OctreeSettings::default());
        let report = tree.insert_scene(&scene);
        assert_eq!(report.inserted, 2);
        assert_eq!(tree.subgraph_count(), 1);
    }

    #[test]
    fn ray_cast_finds_nearest() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(floor(10.0, 0.0));
        tree.insert_subgraph(floor(10.0, 3.0));

        let hit = tree
            .ray_cast(Point3::new(0.5, 5.0, 0.25), Vector3::new(0.0, -2.0, 0.0), 100.0)
            .unwrap();
        assert_eq!(hit.distance, 2.0);
        assert_eq!(hit.point, Point3::new(0.5, 3.0, 0.25));
        assert_eq!(hit.normal, Vector3::new(0.0, 1.0, 0.0));

        assert!(tree
            .ray_cast(Point3::new(0.5, 5.0, 0.25), Vector3::new(0.0, 1.0, 0.0), 100.0)
            .is_none());
        assert!(tree
            .ray_cast(Point3::new(0.5, 5.0, 0.25), Vector3::zeros(), 100.0)
            .is_none());
    }

    #[test]
    fn sphere_intersect_reports_depth() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(floor(10.0, 0.0));

        let contact = tree
            .sphere_intersect(&Sphere::new(Point3::new(1.0, 0.3, 1.5), 0.5))
            .unwrap();
        assert_relative_eq!(contact.depth, 0.2, epsilon = 1e-6);
        assert_relative_eq!(contact.normal, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);

        assert!(tree.sphere_intersect(&Sphere::new(Point3::new(1.0, 0.6, 1.5), 0.5)).is_none());
    }

    #[test]
    fn capsule_intersect_does_not_move() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(floor(10.0, 0.0));

        let capsule = Capsule::standing(Point3::new(1.0, -0.05, 1.5), 0.2, 2.0);
        let contact = tree.capsule_intersect(&capsule).unwrap();
        assert_relative_eq!(contact.depth, 0.05, epsilon = 1e-5);
        assert_relative_eq!(contact.normal, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn octree_is_send_and_sync() {
        assert_send_sync::<Octree>();
    }

    #[test]
    fn concurrent_queries_agree() {
        let mut tree = Octree::new(OctreeSettings::default());
        tree.insert_subgraph(scattered(100));
        let regions: Vec<Volume> = (0..8)
            .map(|i| {
                let c = i as f32 * 2.5;
                Volume::Sphere(Sphere::new(Point3::new(c, 0.0, c), 3.0))
            })
            .collect();
        let expected: Vec<Vec<TriangleId>> =
            regions.iter().map(|r| tree.query_candidates(r)).collect();

        let tree = &tree;
        std::thread::scope(|scope| {
            let handles: Vec<_> = regions
                .iter()
                .map(|region| scope.spawn(move || tree.query_candidates(region)))
                .collect();
            for (handle, expected) in handles.into_iter().zip(&expected) {
                assert_eq!(&handle.join().unwrap(), expected);
            }
        });
    }
}
