//! Storage contracts (spec §6 "Database" collaborator) and the SQLite
//! realization of them. Modeled on the teacher's `storage::traits::GraphStore`
//! split: a narrow trait describing the operations every component needs,
//! with a single concrete backend behind a `Mutex<Connection>`.

pub mod sqlite;
pub mod vector_store;

use crate::document::{Document, DocumentId};
use crate::error::{StoreError, StoreResult};
use crate::graph::edge::{Edge, EdgeId};
use async_trait::async_trait;

/// Filters shared by BM25, tag, and plain document lookups.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub collections: Vec<String>,
    pub tags: Vec<String>,
    pub require_all_tags: bool,
    pub attribute_equals: Vec<(String, serde_json::Value)>,
}

/// The document + edge persistence contract (spec §6 item 1).
///
/// Every method that can fail for infrastructure reasons returns
/// `StoreResult`; business-level "not found"/"empty"/"readiness" conditions
/// are represented as `Ok` values (empty vectors, `None`) so callers can build
/// the spec §7 response envelopes without unwrapping error variants for
/// expected conditions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn has_collection(&self, collection: &str) -> StoreResult<bool>;
    async fn create_collection(&self, collection: &str, is_edge: bool) -> StoreResult<()>;
    async fn count(&self, collection: &str) -> StoreResult<u64>;

    async fn insert_document(&self, doc: &Document) -> StoreResult<()>;
    async fn get_document(&self, id: &DocumentId) -> StoreResult<Option<Document>>;
    async fn update_document(&self, doc: &Document) -> StoreResult<()>;
    async fn delete_document(&self, id: &DocumentId) -> StoreResult<()>;
    async fn list_documents(&self, filter: &DocumentFilter) -> StoreResult<Vec<Document>>;

    async fn insert_edge(&self, edge: &Edge) -> StoreResult<()>;
    async fn update_edge(&self, edge: &Edge) -> StoreResult<()>;
    async fn get_edge(&self, id: &EdgeId) -> StoreResult<Option<Edge>>;
    async fn edges_between(
        &self,
        from: &DocumentId,
        to: &DocumentId,
        edge_type: Option<&str>,
        include_invalidated: bool,
    ) -> StoreResult<Vec<Edge>>;
    async fn edges_touching(
        &self,
        vertex: &DocumentId,
        direction: Direction,
        relationship_types: Option<&[String]>,
    ) -> StoreResult<Vec<Edge>>;
    async fn all_edges(&self, collection: &str) -> StoreResult<Vec<Edge>>;

    /// Corpus blocks for a document, filtered to the block types C3/C15
    /// ground answers against (spec SPEC_FULL §3.S).
    async fn corpus_blocks(&self, document_id: &DocumentId) -> StoreResult<Vec<CorpusBlock>>;

    /// Lexical candidates for C4, scored by the backing FTS5 `bm25()`
    /// ranking function (negated by SQLite convention so higher is better
    /// once we flip the sign). `limit` bounds how many rows SQLite scores
    /// before C4 applies `min_score`/tag filtering in-process.
    async fn bm25_candidates(
        &self,
        query_text: &str,
        collections: &[String],
        limit: usize,
    ) -> StoreResult<Vec<(DocumentId, f32)>>;
}

/// Sentinel passed to `bm25_candidates` when the caller wants every matching
/// row rather than a page — used to build the auxiliary, unpaginated total
/// count spec §4.3 step 5 requires (same query/collection `WHERE` clause,
/// no `LIMIT`).
pub const BM25_NO_LIMIT: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
    Any,
}

/// One block of a document's source corpus (spec SPEC_FULL §3.S:
/// `{Text, Table, Code, Section}`, non-null text).
#[derive(Debug, Clone)]
pub struct CorpusBlock {
    pub block_id: String,
    pub block_type: CorpusBlockType,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusBlockType {
    Text,
    Table,
    Code,
    Section,
}

impl std::str::FromStr for CorpusBlockType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "Text" => Ok(CorpusBlockType::Text),
            "table" | "Table" => Ok(CorpusBlockType::Table),
            "code" | "Code" => Ok(CorpusBlockType::Code),
            "section" | "Section" => Ok(CorpusBlockType::Section),
            other => Err(StoreError::Other(format!("unknown corpus block type: {other}"))),
        }
    }
}
