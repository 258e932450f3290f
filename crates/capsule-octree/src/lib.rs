//! Octree broad phase and capsule collision resolution for static 3D scenes.
//!
//! World geometry is inserted as subgraphs of triangles into an [`Octree`].
//! A character [`Capsule`] is then moved through it once per tick by
//! [`collision::resolve`], which pushes the capsule out of penetrations and
//! lets it slide along walls and floors. [`Session`] ties both together with
//! the model bookkeeping that decides when the world is ready.

pub mod aggregator;
mod capsule;
pub mod collision;
mod config;
mod error;
pub mod octree;
mod plane;
pub mod scene;
mod session;
mod store;
mod triangle;
mod volume;

pub use aggregator::{LoadedModel, SceneAggregator};
pub use capsule::Capsule;
pub use collision::{Contact, TickOutcome};
pub use config::{
    CapsuleSettings, OctreeSettings, ResolverSettings, SceneSettings, SessionConfig,
    DEFAULT_CAPSULE_HEIGHT, DEFAULT_CAPSULE_RADIUS,
};
pub use error::{ConfigError, GeometryError, SessionError};
pub use octree::{InsertReport, Octree, OctreeNode, RayHit, RejectedTriangle};
pub use plane::Plane3D;
pub use scene::{Mesh, RawTriangle, SceneNode};
pub use session::{CapsuleReader, CapsuleSnapshot, CapsuleState, Session, SessionPhase};
pub use store::{TriangleId, TriangleStore};
pub use triangle::Triangle;
pub use volume::{Aabb, Sphere, Volume};
