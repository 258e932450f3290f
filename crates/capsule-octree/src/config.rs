//! Session configuration, loadable from TOML.
//!
//! Every section has defaults, so a config file only needs the values it
//! overrides:
//!
//! ```toml
//! [capsule]
//! radius = 0.35
//!
//! [scene]
//! model_count = 3
//! octree_expected_count = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default capsule radius for a standing character (meters).
pub const DEFAULT_CAPSULE_RADIUS: f32 = 0.2;

/// Default total capsule height for a standing character (meters).
pub const DEFAULT_CAPSULE_HEIGHT: f32 = 2.0;

/// Octree subdivision limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeSettings {
    /// A node splits once it holds more triangles than this.
    pub max_triangles_per_node: usize,
    /// Nodes at this depth never split (the root is depth 0).
    pub max_depth: usize,
    /// Margin added around the union of all geometry for the root bound.
    pub bounds_padding: f32,
}

impl Default for OctreeSettings {
    fn default() -> Self {
        Self {
            max_triangles_per_node: 8,
            max_depth: 8,
            bounds_padding: 0.01,
        }
    }
}

/// Tuning for the iterative capsule resolver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Correction passes per sub-step before giving up.
    pub max_iterations: u32,
    /// Penetrations at or below this depth are ignored (meters).
    pub epsilon: f32,
    /// Largest sub-step as a fraction of the capsule radius.
    pub substep_fraction: f32,
    /// Upper bound on sub-steps per tick.
    pub max_substeps: u32,
    /// Minimum up-component of a contact normal for the capsule to count as grounded.
    pub ground_normal_min_y: f32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            epsilon: 1e-4,
            substep_fraction: 0.5,
            max_substeps: 128,
            ground_normal_min_y: 0.7,
        }
    }
}

/// Shape of the character capsule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleSettings {
    /// Radius of the capsule.
    pub radius: f32,
    /// Total height including both caps.
    pub height: f32,
}

impl Default for CapsuleSettings {
    fn default() -> Self {
        Self {
            radius: DEFAULT_CAPSULE_RADIUS,
            height: DEFAULT_CAPSULE_HEIGHT,
        }
    }
}

/// What the scene must contain before collision queries may start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Number of distinct named models expected.
    pub model_count: usize,
    /// Number of mesh subgraphs expected in the octree.
    pub octree_expected_count: usize,
    /// Model names that must be present, in addition to the count matching.
    pub required_models: Vec<String>,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            model_count: 2,
            octree_expected_count: 1,
            required_models: vec!["character".to_owned(), "map".to_owned()],
        }
    }
}

/// Complete configuration of a [`Session`](crate::Session).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Octree subdivision limits.
    pub octree: OctreeSettings,
    /// Resolver tuning.
    pub resolver: ResolverSettings,
    /// Character capsule shape.
    pub capsule: CapsuleSettings,
    /// Readiness expectations.
    pub scene: SceneSettings,
}

impl SessionConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if self.octree.max_triangles_per_node == 0 {
            return invalid("octree.max_triangles_per_node", "must be at least 1");
        }
        if !(self.octree.bounds_padding >= 0.0) {
            return invalid("octree.bounds_padding", "must be a non-negative number");
        }
        if self.resolver.max_iterations == 0 {
            return invalid("resolver.max_iterations", "must be at least 1");
        }
        if !(self.resolver.epsilon > 0.0) {
            return invalid("resolver.epsilon", "must be positive");
        }
        if !(self.resolver.substep_fraction > 0.0) {
            return invalid("resolver.substep_fraction", "must be positive");
        }
        if self.resolver.max_substeps == 0 {
            return invalid("resolver.max_substeps", "must be at least 1");
        }
        if !(self.capsule.radius > 0.0) {
            return invalid("capsule.radius", "must be positive");
        }
        if !(self.capsule.height >= 2.0 * self.capsule.radius) {
            return invalid("capsule.height", "must be at least twice the radius");
        }
        if self.scene.required_models.len() > self.scene.model_count {
            return invalid("scene.required_models", "names more models than model_count");
        }
        Ok(())
    }
}
