//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Bm25SearchParams {
    #[schemars(description = "Free-text query")]
    pub query: String,
    #[schemars(description = "Collections to search; empty means all")]
    pub collections: Option<Vec<String>>,
    #[schemars(description = "Minimum BM25 score to keep")]
    pub min_score: Option<f32>,
    #[schemars(description = "Maximum number of results")]
    pub top_n: Option<usize>,
    #[schemars(description = "Tags every result must carry")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SemanticSearchParams {
    #[schemars(description = "Free-text query to embed and search with")]
    pub query: String,
    #[schemars(description = "Collection to search")]
    pub collection: String,
    #[schemars(description = "Minimum cosine similarity to keep")]
    pub min_score: Option<f32>,
    #[schemars(description = "Maximum number of results")]
    pub top_n: Option<usize>,
    #[schemars(description = "Tags every result must carry")]
    pub tags: Option<Vec<String>>,
    #[schemars(description = "Attempt to repair missing/inconsistent embeddings before searching")]
    pub auto_fix_embeddings: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TagSearchParams {
    #[schemars(description = "Collections to search; empty means all")]
    pub collections: Option<Vec<String>>,
    #[schemars(description = "Tags to match")]
    pub tags: Vec<String>,
    #[schemars(description = "Require every tag (\"all\") or any tag (\"any\"); default \"any\"")]
    pub mode: Option<String>,
    #[schemars(description = "Maximum number of results")]
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HybridSearchParams {
    #[schemars(description = "Free-text query")]
    pub query: String,
    #[schemars(description = "Collection to search")]
    pub collection: String,
    #[schemars(description = "Weight given to the lexical (BM25) signal")]
    pub bm25_weight: Option<f32>,
    #[schemars(description = "Weight given to the semantic (vector) signal")]
    pub semantic_weight: Option<f32>,
    #[schemars(description = "Weight given to the graph-traversal signal")]
    pub graph_weight: Option<f32>,
    #[schemars(description = "Whether to seed and fuse in the graph-traversal signal")]
    pub use_graph: Option<bool>,
    #[schemars(description = "Tags every result must carry")]
    pub tags: Option<Vec<String>>,
    #[schemars(description = "Maximum number of results")]
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GraphTraverseParams {
    #[schemars(description = "Document ids to start traversal from")]
    pub start_ids: Vec<String>,
    #[schemars(description = "Maximum traversal depth, hard-capped at 3")]
    pub max_depth: Option<u32>,
    #[schemars(description = "Relationship types to follow; empty means all")]
    pub relationship_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateAnswerParams {
    #[schemars(description = "Candidate answer text to check for corpus grounding")]
    pub answer: String,
    #[schemars(description = "Document id the answer should be grounded in")]
    pub document_id: String,
}
