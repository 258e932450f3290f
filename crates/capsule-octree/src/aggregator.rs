//! Model bookkeeping and the readiness gate.

use std::collections::BTreeMap;

use crate::scene::SceneNode;
use crate::{Octree, SceneSettings, SessionError};

/// A model handed over by the asset loader.
#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    scene: SceneNode,
}

impl LoadedModel {
    /// Wraps the root of a loaded scene graph.
    pub fn new(scene: SceneNode) -> Self {
        Self { scene }
    }

    /// Returns the model's scene graph.
    #[inline]
    pub fn scene(&self) -> &SceneNode {
        &self.scene
    }
}

impl From<SceneNode> for LoadedModel {
    fn from(scene: SceneNode) -> Self {
        Self::new(scene)
    }
}

/// Tracks loaded models and decides when collision queries may start.
///
/// Readiness is computed from the current counters on every call and never
/// cached, so it cannot go stale.
#[derive(Debug, Clone)]
pub struct SceneAggregator {
    models: BTreeMap<String, LoadedModel>,
    model_count: usize,
    octree_expected_count: usize,
    required_models: Vec<String>,
}

impl SceneAggregator {
    /// Creates an aggregator expecting what `settings` describes.
    pub fn new(settings: &SceneSettings) -> Self {
        Self {
            models: BTreeMap::new(),
            model_count: settings.model_count,
            octree_expected_count: settings.octree_expected_count,
            required_models: settings.required_models.clone(),
        }
    }

    /// Records a model under `name`, returning the one it replaces.
    pub fn register_model(
        &mut self,
        name: impl Into<String>,
        model: impl Into<LoadedModel>,
    ) -> Option<LoadedModel> {
        let name = name.into();
        log::debug!("registered model `{name}`");
        self.models.insert(name, model.into())
    }

    /// Looks up a model by name.
    pub fn model(&self, name: &str) -> Option<&LoadedModel> {
        self.models.get(name)
    }

    /// Looks up a model's scene graph by name.
    pub fn model_scene(&self, name: &str) -> Option<&SceneNode> {
        self.model(name).map(LoadedModel::scene)
    }

    /// Iterates over the registered model names in order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Number of distinct models registered.
    #[inline]
    pub fn loaded_model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of models expected.
    #[inline]
    pub fn model_count(&self) -> usize {
        self.model_count
    }

    /// Number of octree subgraphs expected.
    #[inline]
    pub fn octree_expected_count(&self) -> usize {
        self.octree_expected_count
    }

    /// True once every expected model is registered and `octree` has received
    /// exactly the expected number of subgraphs.
    pub fn is_ready(&self, octree: &Octree) -> bool {
        self.models.len() == self.model_count
            && self
                .required_models
                .iter()
                .all(|name| self.models.contains_key(name))
            && octree.subgraph_count() == self.octree_expected_count
    }

    /// Describes the current counters as a [`SessionError::NotReady`].
    pub fn not_ready(&self, octree: &Octree) -> SessionError {
        SessionError::NotReady {
            loaded_models: self.models.len(),
            model_count: self.model_count,
            inserted: octree.subgraph_count(),
            expected: self.octree_expected_count,
        }
    }
}

impl Default for SceneAggregator {
    fn default() -> Self {
        Self::new(&SceneSettings::default())
    }
}
