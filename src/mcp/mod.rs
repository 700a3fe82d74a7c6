//! MCP server for Plexus Hybrid — exposes the retrieval engine and the Q&A
//! grounding check via the Model Context Protocol.
//!
//! Tools: bm25_search, semantic_search, tag_search, hybrid_search,
//! graph_traverse, validate_answer.

pub mod params;

use crate::corpus::CorpusValidator;
use crate::document::DocumentId;
use crate::embedding::{Embedder, MockEmbedder};
use crate::search::bm25::{bm25_search, Bm25Query};
use crate::search::graph_traverse::{graph_traverse, TraversalRequest};
use crate::search::hybrid::{hybrid_search, HybridRequest, SearchContext};
use crate::search::semantic::{semantic_search, SemanticQuery, SemanticSearchRequest};
use crate::search::tag::{tag_search, TagMatchMode, TagQuery};
use crate::storage::sqlite::SqliteStore;
use crate::storage::vector_store::{InMemoryVectorStore, VectorStore};
use crate::storage::Direction;
use params::*;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use std::path::PathBuf;
use std::sync::Arc;

fn ok_json(value: impl serde::Serialize) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(&value) {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => err_text(e.to_string()),
    }
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

#[derive(Clone)]
pub struct PlexusHybridMcpServer {
    ctx: Arc<SearchContext>,
    validator: Arc<CorpusValidator>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PlexusHybridMcpServer {
    pub fn new(ctx: Arc<SearchContext>, validation_threshold: f32) -> Self {
        Self {
            ctx,
            validator: Arc::new(CorpusValidator::new(validation_threshold)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Lexical (BM25) search over a collection's text index")]
    async fn bm25_search(&self, Parameters(p): Parameters<Bm25SearchParams>) -> Result<CallToolResult, McpError> {
        let outcome = bm25_search(
            self.ctx.store.as_ref(),
            &Bm25Query {
                query_text: p.query,
                collections: p.collections.unwrap_or_default(),
                min_score: p.min_score.unwrap_or(0.0),
                top_n: p.top_n.unwrap_or(10),
                offset: 0,
                tag_list: p.tags.unwrap_or_default(),
            },
        )
        .await;
        ok_json(outcome)
    }

    #[tool(description = "Semantic (embedding/cosine) search over a collection")]
    async fn semantic_search(&self, Parameters(p): Parameters<SemanticSearchParams>) -> Result<CallToolResult, McpError> {
        let outcome = semantic_search(
            self.ctx.store.as_ref(),
            self.ctx.vector_store.as_ref(),
            &self.ctx.embedder,
            &p.collection,
            SemanticSearchRequest {
                query: SemanticQuery::Text(p.query),
                collections: vec![p.collection.clone()],
                min_score: p.min_score.unwrap_or(0.7),
                top_n: p.top_n.unwrap_or(10),
                tag_list: p.tags.unwrap_or_default(),
                validate_before_search: true,
                auto_fix_embeddings: p.auto_fix_embeddings.unwrap_or(false),
            },
        )
        .await;
        ok_json(outcome)
    }

    #[tool(description = "Tag-set search (ANY or ALL match) over a collection")]
    async fn tag_search(&self, Parameters(p): Parameters<TagSearchParams>) -> Result<CallToolResult, McpError> {
        let mode = match p.mode.as_deref() {
            Some("all") => TagMatchMode::All,
            _ => TagMatchMode::Any,
        };
        let outcome = tag_search(
            self.ctx.store.as_ref(),
            &TagQuery {
                collections: p.collections.unwrap_or_default(),
                tags: p.tags,
                mode,
                attribute_equals: vec![],
                top_n: p.top_n.unwrap_or(10),
            },
        )
        .await;
        ok_json(outcome)
    }

    #[tool(description = "Fused hybrid search (BM25 + semantic + optional graph, RRF-combined)")]
    async fn hybrid_search(&self, Parameters(p): Parameters<HybridSearchParams>) -> Result<CallToolResult, McpError> {
        let outcome = hybrid_search(
            &self.ctx,
            HybridRequest {
                query_text: p.query,
                collection: p.collection,
                bm25_weight: p.bm25_weight.unwrap_or(0.5),
                semantic_weight: p.semantic_weight.unwrap_or(0.5),
                graph_weight: p.graph_weight.unwrap_or(0.0),
                use_graph: p.use_graph.unwrap_or(false),
                tag_list: p.tags.unwrap_or_default(),
                top_n: p.top_n.unwrap_or(10),
                min_score: 0.0,
            },
        )
        .await;
        ok_json(outcome)
    }

    #[tool(description = "Bounded breadth-first traversal of the knowledge graph from one or more seeds")]
    async fn graph_traverse(&self, Parameters(p): Parameters<GraphTraverseParams>) -> Result<CallToolResult, McpError> {
        let request = TraversalRequest {
            start_vertices: p.start_ids.into_iter().map(DocumentId::from_string).collect(),
            max_depth: p.max_depth.unwrap_or(3),
            direction: Direction::Any,
            relationship_types: p.relationship_types,
            ..Default::default()
        };
        match graph_traverse(self.ctx.store.as_ref(), &request).await {
            Ok(outcome) => ok_json(outcome.hits.iter().map(|h| serde_json::json!({
                "vertex": h.vertex.as_str(),
                "depth": h.depth,
                "score": h.score,
            })).collect::<Vec<_>>()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Check whether a candidate answer is grounded in a document's source text")]
    async fn validate_answer(&self, Parameters(p): Parameters<ValidateAnswerParams>) -> Result<CallToolResult, McpError> {
        let document_id = DocumentId::from_string(p.document_id);
        match self.validator.validate(self.ctx.store.as_ref(), &p.answer, &document_id).await {
            Ok(result) => ok_json(serde_json::json!({
                "valid": result.valid,
                "score": result.score,
                "matched_block_id": result.matched_block_id,
            })),
            Err(e) => err_text(e.to_string()),
        }
    }
}

#[tool_handler]
impl ServerHandler for PlexusHybridMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Plexus Hybrid MCP server — lexical, semantic, tag, and graph search over a bi-temporal knowledge graph"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Builds the default, fully in-process search context: SQLite store,
/// brute-force in-memory vector index, and the hash-based mock embedder.
/// A real deployment swaps in `SqliteVecStore`/`FastEmbedEmbedder` behind the
/// `embeddings` feature without touching this wiring.
fn default_context(db_path: Option<PathBuf>) -> Result<SearchContext, String> {
    let store: Arc<dyn crate::storage::Store> = match db_path {
        Some(path) => Arc::new(SqliteStore::open(path).map_err(|e| e.to_string())?),
        None => {
            let path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".plexus-hybrid.db");
            Arc::new(SqliteStore::open(path).map_err(|e| e.to_string())?)
        }
    };
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::default());
    Ok(SearchContext { store, vector_store, embedder })
}

pub fn run_mcp_server(db_path: Option<PathBuf>) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {e}");
            return 1;
        }
    };

    rt.block_on(async {
        let ctx = match default_context(db_path) {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                eprintln!("failed to open database: {e}");
                return 1;
            }
        };

        let server = PlexusHybridMcpServer::new(ctx, 0.97);
        eprintln!("plexus-hybrid mcp server starting on stdio...");

        let service = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to start MCP server: {e}");
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            eprintln!("MCP server error: {e}");
            return 1;
        }

        0
    })
}
