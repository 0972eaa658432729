//! Error types for mesh simplification

use thiserror::Error;

/// Errors surfaced by a simplification session.
///
/// A singular error quadric is not an error: it is recovered from locally by
/// collapsing to the edge midpoint and never reaches the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimplificationError {
    #[error("Mesh has no triangles")]
    EmptyMesh,

    #[error("Mesh already has {current} triangles, which is not above the target of {target}")]
    AlreadyBelowTarget { current: usize, target: usize },

    #[error("Invalid target triangle count: {0}")]
    InvalidTargetCount(i64),

    #[error("Invalid reduction ratio: {0} (must be between 0.0 and 1.0)")]
    InvalidRatio(f32),

    #[error("Triangle {triangle} is invalid: {reason}")]
    InvalidTriangle { triangle: usize, reason: String },

    /// A stored reference points outside the live mesh. This indicates a
    /// defect in reindexing and aborts the running operation.
    #[error("{context}: index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        context: &'static str,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Core(#[from] qemesh_core::Error),
}

/// Result type alias for simplification operations
pub type Result<T> = std::result::Result<T, SimplificationError>;
