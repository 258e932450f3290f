//! Error types for geometry ingestion, session sequencing and configuration.

use thiserror::Error;

/// A triangle that cannot be stored in the octree.
///
/// These are reported per triangle and never abort a whole insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The vertices are collinear or coincident (zero area).
    #[error("degenerate triangle (zero area)")]
    Degenerate,
    /// A vertex coordinate is NaN or infinite.
    #[error("triangle has non-finite vertex coordinates")]
    NonFinite,
}

/// Caller-contract violations on a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A query or tick was issued before the readiness gate held.
    #[error("spatial index not ready: {loaded_models}/{model_count} models, {inserted}/{expected} subgraphs")]
    NotReady {
        /// Distinct models currently registered.
        loaded_models: usize,
        /// Models expected.
        model_count: usize,
        /// Subgraphs inserted into the octree.
        inserted: usize,
        /// Subgraphs expected.
        expected: usize,
    },
    /// An insertion was attempted after the session entered its query phase.
    #[error("session is sealed; geometry can no longer be inserted")]
    Sealed,
    /// More subgraphs were offered than the session expects.
    #[error("all {expected} expected subgraphs have already been inserted")]
    SubgraphOverflow {
        /// Subgraphs expected.
        expected: usize,
    },
    /// No model is registered under the given name.
    #[error("unknown model `{0}`")]
    UnknownModel(String),
}

/// Errors while loading or validating a [`SessionConfig`](crate::SessionConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}
