//! Error types for the knowledge graph engine.

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Operation-level failures of the store and indexer.
///
/// Per-file scan problems never surface here; they are collected into
/// [`crate::IndexingProgress::errors`] instead.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("repository id must not be empty")]
    InvalidRepositoryId,

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Tagged failure returned by every query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("no graph indexed for repository '{0}'")]
    RepositoryNotFound(String),

    #[error("node '{0}' not found")]
    NodeNotFound(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}
