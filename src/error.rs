use thiserror::Error;

use crate::model::{Edge, ResourceId};

/// Main error type for partchain
#[derive(Error, Debug)]
pub enum PartchainError {
    /// Resource index unreachable, rejected the query, or the body could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response row matched none of the expected shapes
    #[error("Malformed response row: {row:?} ({reason})")]
    MalformedResponse { row: String, reason: String },

    /// An identifier or predicate cannot be embedded in a query as an opaque token
    #[error("Invalid query token: {0:?}")]
    InvalidToken(String),

    /// More than one member of a parent claims to be first
    #[error("Multiple items are \"first\": {}", join_ids(.0))]
    AmbiguousHead(Vec<ResourceId>),

    /// A resource is followed by more than one resource
    #[error("Multiple items follow {predecessor}: {}", join_ids(.successors))]
    AmbiguousSuccessor {
        predecessor: ResourceId,
        successors: Vec<ResourceId>,
    },

    /// Structural head inference found more than one candidate
    #[error("Two \"first\" children: {}", join_ids(.0))]
    MultipleHeads(Vec<ResourceId>),

    /// Edges exist but no member could be identified as first
    #[error("No first child among {} edge(s): {}", .unconsumed.len(), join_edges(.unconsumed))]
    NoHead { unconsumed: Vec<Edge> },

    /// The walk from the head left edges behind
    #[error("Broken relationship chain, unconsumed: {}", join_edges(.unconsumed))]
    BrokenChain { unconsumed: Vec<Edge> },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_ids(ids: &[ResourceId]) -> String {
    ids.iter()
        .map(ResourceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_edges(edges: &[Edge]) -> String {
    edges
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenient Result type using PartchainError
pub type Result<T> = std::result::Result<T, PartchainError>;
