//! Plexus Hybrid: a hybrid retrieval engine and bi-temporal knowledge graph
//! over a single SQLite-backed multi-model store.
//!
//! # Core concepts
//!
//! - **Documents**: content-agnostic records with optional tags and
//!   embeddings, scoped to a collection.
//! - **Edges**: directed, bi-temporal relationships between documents, with
//!   contradiction detection and resolution.
//! - **Search**: five independent signals (lexical, semantic, tag, graph,
//!   and their weighted fusion) that return structured outcomes rather than
//!   errors for business-level failures.
//! - **Q&A generation**: a retry-bounded pipeline that derives grounded
//!   question/answer pairs (plus their reversals) from a document's corpus.

pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod llm;
pub mod mcp;
pub mod qa;
pub mod search;
pub mod storage;
pub mod vector;

pub use config::{Config, QAGenerationConfig};
pub use document::{Document, DocumentId, EmbeddingMetadata};
pub use error::{GraphError, GraphResult, RetrievalError, StoreError, StoreResult};
pub use search::hybrid::{HybridRequest, SearchContext};
pub use search::{CollectionStatus, SearchHit, SearchOutcome};

/// Library version, surfaced by the MCP server's `get_info` and the CLI's
/// `--version` flag.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
