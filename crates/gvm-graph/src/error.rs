//! Error types for graph-level structural operations.

use gvm_util::Ref;
use thiserror::Error;

/// Structural errors a [`crate::Graph`] operation can fail with.
///
/// These map onto spec's "Capacity" and node/key lookup failure kinds;
/// they are returned to callers rather than collapsed to a sentinel,
/// since graph operations are host-facing (unlike opcode dispatch, which
/// spec requires to collapse failures to process termination).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The underlying node storage refused to grow further.
    #[error("node storage exhausted")]
    Capacity,

    /// `src` does not name a live node.
    #[error("no such node: {0}")]
    NoSuchNode(Ref),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
