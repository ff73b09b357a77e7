// Error types for the pathfinder.
//
// Only genuinely exceptional conditions are errors. An exhausted search
// (no path) is a normal terminal state reported through `SearchStatus`, and
// plain column lookups outside the footprint return `None`.

use crate::controller::PathRequestId;
use crate::types::Layer;

/// Failure reported by a `CollisionOracle` implementation, e.g. when the
/// underlying physics engine is unavailable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("collision oracle failed: {message}")]
pub struct OracleError {
    pub message: String,
}

impl OracleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the pathfinder's public operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PathFinderError {
    /// A search operation ran before the voxel map finished generating.
    #[error("voxel map not generated")]
    NotGenerated,

    /// An explicit start/destination lies outside the configured footprint.
    #[error("column {layer}({x}, {z}) is outside the footprint")]
    OutOfBounds { layer: Layer, x: i32, z: i32 },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config JSON could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// The collision oracle failed while probing. Not retried.
    #[error(transparent)]
    Probe(#[from] OracleError),

    /// A path request id that this controller never issued.
    #[error("unknown path request {0:?}")]
    UnknownRequest(PathRequestId),
}
