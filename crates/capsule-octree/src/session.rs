//! Build/query sequencing around one octree and one character capsule.

use std::sync::{Arc, PoisonError, RwLock};

use nalgebra::{Point3, Vector3};

use crate::aggregator::{LoadedModel, SceneAggregator};
use crate::collision::{self, Contact, TickOutcome};
use crate::octree::{InsertReport, Octree, RayHit};
use crate::scene::{RawTriangle, SceneNode};
use crate::{Capsule, ConfigError, SessionConfig, SessionError, TriangleId, Volume};

/// Whether the session still accepts geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Geometry and models may be added; queries are refused.
    Build,
    /// Geometry is frozen; queries and ticks are allowed.
    Query,
}

/// Lifecycle of the character capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapsuleState {
    /// No capsule was set; a zero-length stand-in sits at the origin.
    NoCapsule,
    /// A capsule was set and has not been resolved since.
    CapsuleSet,
    /// The capsule was moved by at least one tick.
    Resolved,
}

/// The capsule state published after every change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleSnapshot {
    /// Lifecycle state at publication time.
    pub state: CapsuleState,
    /// Current capsule.
    pub capsule: Capsule,
    /// Last contact of the most recent tick.
    pub contact: Option<Contact>,
    /// Whether the most recent tick ended on walkable ground.
    pub grounded: bool,
    /// Number of ticks resolved so far.
    pub tick: u64,
}

/// Read-only view of the session's capsule, usable from other threads.
///
/// Each tick swaps in a whole new [`CapsuleSnapshot`], so a reader never sees
/// a segment that is only partly updated.
#[derive(Debug, Clone)]
pub struct CapsuleReader {
    shared: Arc<RwLock<CapsuleSnapshot>>,
}

impl CapsuleReader {
    /// Returns a copy of the latest published snapshot.
    pub fn snapshot(&self) -> CapsuleSnapshot {
        *self.shared.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One collision world: the octree, its models and the character capsule.
///
/// A session starts in [`SessionPhase::Build`], where models are registered
/// and geometry is inserted. [`Session::enter_query_phase`] seals it once the
/// readiness gate holds; from then on the octree is immutable and the capsule
/// can be ticked.
///
/// ```ignore
/// let mut session = Session::new(SessionConfig::default())?;
/// session.register_model("character", character_scene)?;
/// session.register_model("map", map_scene)?;
/// session.insert_model("map")?;
/// session.enter_query_phase()?;
///
/// session.spawn_character(Point3::new(0.0, 1.0, 0.0));
/// let outcome = session.tick(Vector3::new(0.0, -0.1, 0.0))?;
/// ```
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    octree: Octree,
    aggregator: SceneAggregator,
    phase: SessionPhase,
    capsule: Capsule,
    state: CapsuleState,
    last_outcome: Option<TickOutcome>,
    ticks: u64,
    published: Arc<RwLock<CapsuleSnapshot>>,
}

impl Session {
    /// Creates a session in the build phase.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if `config` fails validation.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capsule = Capsule::new(Point3::origin(), Point3::origin(), config.capsule.radius);
        let snapshot = CapsuleSnapshot {
            state: CapsuleState::NoCapsule,
            capsule,
            contact: None,
            grounded: false,
            tick: 0,
        };
        Ok(Self {
            octree: Octree::new(config.octree),
            aggregator: SceneAggregator::new(&config.scene),
            config,
            phase: SessionPhase::Build,
            capsule,
            state: CapsuleState::NoCapsule,
            last_outcome: None,
            ticks: 0,
            published: Arc::new(RwLock::new(snapshot)),
        })
    }

    /// Returns the configuration the session was created with.
    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the octree.
    #[inline]
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Returns the model bookkeeping.
    #[inline]
    pub fn aggregator(&self) -> &SceneAggregator {
        &self.aggregator
    }

    /// Returns the current phase.
    #[inline]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns the current capsule.
    #[inline]
    pub fn capsule(&self) -> &Capsule {
        &self.capsule
    }

    /// Returns where the capsule is in its lifecycle.
    #[inline]
    pub fn capsule_state(&self) -> CapsuleState {
        self.state
    }

    /// Returns the outcome of the most recent tick.
    #[inline]
    pub fn last_outcome(&self) -> Option<&TickOutcome> {
        self.last_outcome.as_ref()
    }

    /// Returns a handle that observes the published capsule state.
    pub fn reader(&self) -> CapsuleReader {
        CapsuleReader {
            shared: Arc::clone(&self.published),
        }
    }

    /// Registers a loaded model, returning the one it replaces.
    ///
    /// # Errors
    /// Returns [`SessionError::Sealed`] in the query phase.
    pub fn register_model(
        &mut self,
        name: impl Into<String>,
        model: impl Into<LoadedModel>,
    ) -> Result<Option<LoadedModel>, SessionError> {
        self.ensure_build()?;
        Ok(self.aggregator.register_model(name, model))
    }

    /// Inserts one subgraph of world-space triangles.
    ///
    /// # Errors
    /// Returns [`SessionError::Sealed`] in the query phase and
    /// [`SessionError::SubgraphOverflow`] once the expected number of
    /// subgraphs has been inserted.
    pub fn insert_subgraph<I>(&mut self, triangles: I) -> Result<InsertReport, SessionError>
    where
        I: IntoIterator<Item = RawTriangle>,
    {
        self.ensure_build()?;
        let expected = self.aggregator.octree_expected_count();
        if self.octree.subgraph_count() >= expected {
            return Err(SessionError::SubgraphOverflow { expected });
        }
        Ok(self.octree.insert_subgraph(triangles))
    }

    /// Inserts the triangles of a scene graph as one subgraph.
    ///
    /// # Errors
    /// Same as [`Session::insert_subgraph`].
    pub fn insert_scene(&mut self, node: &SceneNode) -> Result<InsertReport, SessionError> {
        self.insert_subgraph(node.world_triangles())
    }

    /// Inserts the scene of a registered model as one subgraph.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownModel`] if no model has that name, plus
    /// the errors of [`Session::insert_subgraph`].
    pub fn insert_model(&mut self, name: &str) -> Result<InsertReport, SessionError> {
        let triangles = self
            .aggregator
            .model_scene(name)
            .ok_or_else(|| SessionError::UnknownModel(name.to_owned()))?
            .world_triangles();
        self.insert_subgraph(triangles)
    }

    /// Evaluates the readiness gate against the current counters.
    pub fn is_ready(&self) -> bool {
        self.aggregator.is_ready(&self.octree)
    }

    /// Seals the geometry and allows queries.
    ///
    /// Calling it again once sealed is a no-op.
    ///
    /// # Errors
    /// Returns [`SessionError::NotReady`] while the readiness gate fails.
    pub fn enter_query_phase(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Query {
            return Ok(());
        }
        if !self.is_ready() {
            return Err(self.aggregator.not_ready(&self.octree));
        }
        self.phase = SessionPhase::Query;
        log::info!(
            "session sealed: {} triangles in {} nodes (depth {})",
            self.octree.triangle_count(),
            self.octree.node_count(),
            self.octree.depth()
        );
        Ok(())
    }

    /// Replaces the character capsule.
    pub fn set_capsule(&mut self, capsule: Capsule) {
        self.capsule = capsule;
        self.state = CapsuleState::CapsuleSet;
        self.last_outcome = None;
        self.publish();
    }

    /// Places an upright capsule of the configured shape standing on `foot`.
    pub fn spawn_character(&mut self, foot: Point3<f32>) {
        let settings = self.config.capsule;
        self.set_capsule(Capsule::standing(foot, settings.radius, settings.height));
    }

    /// Moves the capsule by `movement`, resolves collisions and publishes the
    /// corrected state.
    ///
    /// # Errors
    /// Returns [`SessionError::NotReady`] in the build phase.
    pub fn tick(&mut self, movement: Vector3<f32>) -> Result<TickOutcome, SessionError> {
        self.ensure_query()?;
        let outcome = collision::resolve(&self.octree, &self.capsule, movement, &self.config.resolver);
        if outcome.exhausted {
            log::warn!(
                "tick {}: resolution is best-effort (movement truncated or {} passes used up)",
                self.ticks,
                self.config.resolver.max_iterations
            );
        }

        self.capsule = outcome.capsule;
        self.state = CapsuleState::Resolved;
        self.last_outcome = Some(outcome);
        self.ticks += 1;
        self.publish();
        Ok(outcome)
    }

    /// Triangles whose bounds intersect `region`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotReady`] in the build phase.
    pub fn query_candidates(&self, region: &Volume) -> Result<Vec<TriangleId>, SessionError> {
        self.ensure_query()?;
        Ok(self.octree.query_candidates(region))
    }

    /// Nearest triangle along a ray.
    ///
    /// # Errors
    /// Returns [`SessionError::NotReady`] in the build phase.
    pub fn ray_cast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Result<Option<RayHit>, SessionError> {
        self.ensure_query()?;
        Ok(self.octree.ray_cast(origin, direction, max_distance))
    }

    fn ensure_build(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Build => Ok(()),
            SessionPhase::Query => Err(SessionError::Sealed),
        }
    }

    fn ensure_query(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Query => Ok(()),
            SessionPhase::Build => Err(self.aggregator.not_ready(&self.octree)),
        }
    }

    fn publish(&self) {
        let snapshot = CapsuleSnapshot {
            state: self.state,
            capsule: self.capsule,
            contact: self.last_outcome.and_then(|o| o.contact),
            grounded: self.last_outcome.is_some_and(|o| o.grounded),
            tick: self.ticks,
        };
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}
