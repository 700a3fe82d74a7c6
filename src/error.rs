//! Crate-wide error types
//!
//! Infrastructure failures (storage, serialization) propagate as `Err` via
//! `?`. Business-level failures (empty query, readiness gate, contradiction
//! resolution) are returned as *values* in each operation's response
//! envelope — see spec §7. `RetrievalError`/`GraphError` exist to build
//! those envelopes, not to be handed back to callers as `Result::Err`.

use thiserror::Error;

/// Infrastructure-level storage failures. Always propagated.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("edge not found: {0}")]
    EdgeNotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Business-level retrieval failure taxonomy (spec §7). Built internally by
/// each searcher and folded into a `error: Option<String>` field on the
/// response envelope — never propagated as `Err` from public search entry
/// points.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("{0}")]
    UserInput(String),

    #[error("{0}")]
    ReadinessFailure(String),

    #[error("{0}")]
    ProviderFailure(String),

    #[error("{0}")]
    Corruption(String),
}

impl RetrievalError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Infrastructure-level graph engine failures. Propagated via `?`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("edge not found: {0}")]
    EdgeNotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
