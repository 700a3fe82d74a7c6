//! SQLite-backed realization of the multi-model store (spec §6).
//!
//! ArangoSearch views are modeled as FTS5 virtual tables kept in sync via
//! triggers; the vector index is modeled separately in
//! [`super::vector_store`]. Schema creation runs in phases the way the
//! teacher's `SqliteStore::init_schema` does, so later migrations can add
//! columns without breaking existing databases.

use super::{CorpusBlock, CorpusBlockType, Direction, DocumentFilter, Store};
use crate::document::{Document, DocumentId, EmbeddingMetadata};
use crate::error::{StoreError, StoreResult};
use crate::graph::edge::{Edge, EdgeId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// Rewrite a free-text query into an FTS5 MATCH expression: tokens are
/// quoted and OR'd together, so "python database" matches documents
/// containing either token (scoring favors those containing both).
fn sanitize_fts_query(query_text: &str) -> String {
    query_text
        .split_whitespace()
        .map(|tok| tok.replace('"', ""))
        .filter(|tok| !tok.is_empty())
        .map(|tok| format!("\"{tok}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                is_edge INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                text TEXT NOT NULL,
                tags_json TEXT NOT NULL,
                embedding_json TEXT,
                embedding_model TEXT,
                embedding_dimensions INTEGER,
                embedding_created_at TEXT,
                attributes_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);

            CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
                id UNINDEXED, text, content='documents', content_rowid='rowid'
            );
            CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
                INSERT INTO documents_fts(rowid, id, text) VALUES (new.rowid, new.id, new.text);
            END;
            CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
                INSERT INTO documents_fts(documents_fts, rowid, id, text) VALUES ('delete', old.rowid, old.id, old.text);
            END;
            CREATE TRIGGER IF NOT EXISTS documents_au AFTER UPDATE ON documents BEGIN
                INSERT INTO documents_fts(documents_fts, rowid, id, text) VALUES ('delete', old.rowid, old.id, old.text);
                INSERT INTO documents_fts(rowid, id, text) VALUES (new.rowid, new.id, new.text);
            END;

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                edge_type TEXT NOT NULL,
                valid_at TEXT NOT NULL,
                invalid_at TEXT,
                created_at TEXT NOT NULL,
                confidence REAL,
                context_confidence REAL,
                rationale TEXT,
                invalidation_reason TEXT,
                invalidated_by TEXT,
                merged_from_json TEXT NOT NULL,
                weight REAL,
                attributes_json TEXT NOT NULL,
                question_type TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id);
            CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id);
            CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(edge_type);
            CREATE INDEX IF NOT EXISTS idx_edges_endpoints_type ON edges(from_id, to_id, edge_type);

            CREATE TABLE IF NOT EXISTS corpus_blocks (
                block_id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                block_type TEXT NOT NULL,
                text TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_corpus_document ON corpus_blocks(document_id);
            "#,
        )?;
        Ok(())
    }

    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let tags_json: String = row.get("tags_json")?;
        let attributes_json: String = row.get("attributes_json")?;
        let embedding_json: Option<String> = row.get("embedding_json")?;
        let embedding_model: Option<String> = row.get("embedding_model")?;
        let embedding_dimensions: Option<i64> = row.get("embedding_dimensions")?;
        let embedding_created_at: Option<String> = row.get("embedding_created_at")?;

        let tags: HashSet<String> = serde_json::from_str(&tags_json).unwrap_or_default();
        let attributes: HashMap<String, serde_json::Value> =
            serde_json::from_str(&attributes_json).unwrap_or_default();
        let embedding: Option<Vec<f32>> = embedding_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok());
        let embedding_metadata = match (embedding_model, embedding_dimensions, embedding_created_at) {
            (Some(model), Some(dimensions), Some(created_at)) => Some(EmbeddingMetadata {
                model,
                dimensions: dimensions as usize,
                created_at: created_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
            }),
            _ => None,
        };

        Ok(Document {
            id: DocumentId::from_string(row.get::<_, String>("id")?),
            key: row.get("key")?,
            doc_type: row.get("doc_type")?,
            text: row.get("text")?,
            tags,
            embedding,
            embedding_metadata,
            attributes,
        })
    }

    fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
        let merged_from_json: String = row.get("merged_from_json")?;
        let attributes_json: String = row.get("attributes_json")?;
        let question_type: Option<String> = row.get("question_type")?;

        Ok(Edge {
            id: EdgeId::from(row.get::<_, String>("id")?),
            key: row.get("key")?,
            from: DocumentId::from_string(row.get::<_, String>("from_id")?),
            to: DocumentId::from_string(row.get::<_, String>("to_id")?),
            edge_type: row.get("edge_type")?,
            valid_at: row.get::<_, String>("valid_at")?.parse().unwrap_or_else(|_| Utc::now()),
            invalid_at: row
                .get::<_, Option<String>>("invalid_at")?
                .and_then(|s| s.parse().ok()),
            created_at: row.get::<_, String>("created_at")?.parse().unwrap_or_else(|_| Utc::now()),
            confidence: row.get("confidence")?,
            context_confidence: row.get("context_confidence")?,
            rationale: row.get("rationale")?,
            invalidation_reason: row.get("invalidation_reason")?,
            invalidated_by: row.get("invalidated_by")?,
            merged_from: serde_json::from_str(&merged_from_json).unwrap_or_default(),
            weight: row.get("weight")?,
            attributes: serde_json::from_str(&attributes_json).unwrap_or_default(),
            question_type: question_type.and_then(|s| serde_json::from_value(serde_json::Value::String(s)).ok()),
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn has_collection(&self, collection: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let registered: i64 =
            conn.query_row("SELECT COUNT(*) FROM collections WHERE name = ?1", params![collection], |r| r.get(0))?;
        if registered > 0 {
            return Ok(true);
        }
        let has_rows: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM documents WHERE collection = ?1)
                   + (SELECT COUNT(*) FROM edges WHERE collection = ?1)",
            params![collection],
            |r| r.get(0),
        )?;
        Ok(has_rows > 0)
    }

    async fn create_collection(&self, collection: &str, is_edge: bool) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO collections (name, is_edge) VALUES (?1, ?2)",
            params![collection, is_edge as i64],
        )?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |r| r.get(0),
        )?;
        Ok(n as u64)
    }

    async fn insert_document(&self, doc: &Document) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let collection = doc.id.collection().unwrap_or("documents");
        conn.execute(
            "INSERT OR REPLACE INTO documents
             (id, collection, key, doc_type, text, tags_json, embedding_json,
              embedding_model, embedding_dimensions, embedding_created_at, attributes_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.id.as_str(),
                collection,
                doc.key,
                doc.doc_type,
                doc.text,
                serde_json::to_string(&doc.tags)?,
                doc.embedding.as_ref().map(|e| serde_json::to_string(e)).transpose()?,
                doc.embedding_metadata.as_ref().map(|m| m.model.clone()),
                doc.embedding_metadata.as_ref().map(|m| m.dimensions as i64),
                doc.embedding_metadata.as_ref().map(|m| m.created_at.to_rfc3339()),
                serde_json::to_string(&doc.attributes)?,
            ],
        )?;
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> StoreResult<Option<Document>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM documents WHERE id = ?1",
            params![id.as_str()],
            Self::row_to_document,
        )
        .optional()
        .map_err(StoreError::from)
    }

    async fn update_document(&self, doc: &Document) -> StoreResult<()> {
        self.insert_document(doc).await
    }

    async fn delete_document(&self, id: &DocumentId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id.as_str()])?;
        Ok(())
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = if filter.collections.is_empty() {
            conn.prepare("SELECT * FROM documents")?
        } else {
            let placeholders = filter
                .collections
                .iter()
                .map(|_| "?")
                .collect::<Vec<_>>()
                .join(",");
            conn.prepare(&format!(
                "SELECT * FROM documents WHERE collection IN ({placeholders})"
            ))?
        };

        let docs: Vec<Document> = if filter.collections.is_empty() {
            stmt.query_map([], Self::row_to_document)?
                .collect::<rusqlite::Result<_>>()?
        } else {
            let bind: Vec<&dyn rusqlite::ToSql> = filter
                .collections
                .iter()
                .map(|c| c as &dyn rusqlite::ToSql)
                .collect();
            stmt.query_map(bind.as_slice(), Self::row_to_document)?
                .collect::<rusqlite::Result<_>>()?
        };

        Ok(docs
            .into_iter()
            .filter(|d| {
                if filter.tags.is_empty() {
                    return true;
                }
                if filter.require_all_tags {
                    d.matches_all_tags(&filter.tags)
                } else {
                    d.matches_any_tag(&filter.tags)
                }
            })
            .filter(|d| {
                filter
                    .attribute_equals
                    .iter()
                    .all(|(k, v)| d.attributes.get(k) == Some(v))
            })
            .collect())
    }

    async fn insert_edge(&self, edge: &Edge) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let collection = edge.id.as_str().split('/').next().unwrap_or("relationships");
        conn.execute(
            "INSERT OR REPLACE INTO edges
             (id, collection, key, from_id, to_id, edge_type, valid_at, invalid_at,
              created_at, confidence, context_confidence, rationale, invalidation_reason,
              invalidated_by, merged_from_json, weight, attributes_json, question_type)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            params![
                edge.id.as_str(),
                collection,
                edge.key,
                edge.from.as_str(),
                edge.to.as_str(),
                edge.edge_type,
                edge.valid_at.to_rfc3339(),
                edge.invalid_at.map(|t| t.to_rfc3339()),
                edge.created_at.to_rfc3339(),
                edge.confidence,
                edge.context_confidence,
                edge.rationale,
                edge.invalidation_reason,
                edge.invalidated_by,
                serde_json::to_string(&edge.merged_from)?,
                edge.weight,
                serde_json::to_string(&edge.attributes)?,
                edge.question_type.map(|qt| serde_json::to_value(qt).ok()).flatten().and_then(|v| v.as_str().map(String::from)),
            ],
        )?;
        Ok(())
    }

    async fn update_edge(&self, edge: &Edge) -> StoreResult<()> {
        self.insert_edge(edge).await
    }

    async fn get_edge(&self, id: &EdgeId) -> StoreResult<Option<Edge>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM edges WHERE id = ?1",
            params![id.as_str()],
            Self::row_to_edge,
        )
        .optional()
        .map_err(StoreError::from)
    }

    async fn edges_between(
        &self,
        from: &DocumentId,
        to: &DocumentId,
        edge_type: Option<&str>,
        include_invalidated: bool,
    ) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let sql = match (edge_type, include_invalidated) {
            (Some(_), false) => {
                "SELECT * FROM edges WHERE from_id=?1 AND to_id=?2 AND edge_type=?3 AND invalid_at IS NULL"
            }
            (Some(_), true) => "SELECT * FROM edges WHERE from_id=?1 AND to_id=?2 AND edge_type=?3",
            (None, false) => "SELECT * FROM edges WHERE from_id=?1 AND to_id=?2 AND invalid_at IS NULL",
            (None, true) => "SELECT * FROM edges WHERE from_id=?1 AND to_id=?2",
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = if let Some(et) = edge_type {
            stmt.query_map(params![from.as_str(), to.as_str(), et], Self::row_to_edge)?
        } else {
            stmt.query_map(params![from.as_str(), to.as_str()], Self::row_to_edge)?
        };
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    async fn edges_touching(
        &self,
        vertex: &DocumentId,
        direction: Direction,
        relationship_types: Option<&[String]>,
    ) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let sql = match direction {
            Direction::Outbound => "SELECT * FROM edges WHERE from_id = ?1 AND invalid_at IS NULL",
            Direction::Inbound => "SELECT * FROM edges WHERE to_id = ?1 AND invalid_at IS NULL",
            Direction::Any => {
                "SELECT * FROM edges WHERE (from_id = ?1 OR to_id = ?1) AND invalid_at IS NULL"
            }
        };
        let mut stmt = conn.prepare(sql)?;
        let rows: Vec<Edge> = stmt
            .query_map(params![vertex.as_str()], Self::row_to_edge)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows
            .into_iter()
            .filter(|e| {
                relationship_types
                    .map(|types| types.iter().any(|t| t == &e.edge_type))
                    .unwrap_or(true)
            })
            .collect())
    }

    async fn all_edges(&self, collection: &str) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM edges WHERE collection = ?1")?;
        let rows = stmt.query_map(params![collection], Self::row_to_edge)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    async fn bm25_candidates(
        &self,
        query_text: &str,
        collections: &[String],
        limit: usize,
    ) -> StoreResult<Vec<(DocumentId, f32)>> {
        if query_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let fts_query = sanitize_fts_query(query_text);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        // SQLite treats a negative LIMIT as "no limit"; `bm25_count` passes
        // `usize::MAX` to request every matching row, which we translate to
        // -1 rather than binding an enormous literal.
        let limit_param: i64 = if limit == usize::MAX { -1 } else { limit as i64 };

        let sql = if collections.is_empty() {
            "SELECT d.id, bm25(documents_fts) AS rank FROM documents_fts
             JOIN documents d ON d.rowid = documents_fts.rowid
             WHERE documents_fts MATCH ?1 ORDER BY rank LIMIT ?2"
                .to_string()
        } else {
            let placeholders = collections.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            format!(
                "SELECT d.id, bm25(documents_fts) AS rank FROM documents_fts
                 JOIN documents d ON d.rowid = documents_fts.rowid
                 WHERE documents_fts MATCH ?1 AND d.collection IN ({placeholders})
                 ORDER BY rank LIMIT ?{}",
                collections.len() + 2
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<(String, f64)> = if collections.is_empty() {
            stmt.query_map(params![fts_query, limit_param], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?
        } else {
            let mut bind: Vec<&dyn rusqlite::ToSql> = vec![&fts_query];
            for c in collections {
                bind.push(c as &dyn rusqlite::ToSql);
            }
            bind.push(&limit_param);
            stmt.query_map(bind.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?
        };

        // SQLite's bm25() returns a *negated* score (lower/more negative is
        // better); flip the sign so higher means more relevant everywhere
        // downstream.
        Ok(rows
            .into_iter()
            .map(|(id, rank)| (DocumentId::from_string(id), -rank as f32))
            .collect())
    }

    async fn corpus_blocks(&self, document_id: &DocumentId) -> StoreResult<Vec<CorpusBlock>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT block_id, block_type, text FROM corpus_blocks WHERE document_id = ?1",
        )?;
        let rows = stmt.query_map(params![document_id.as_str()], |row| {
            let block_type: String = row.get(1)?;
            Ok((row.get::<_, String>(0)?, block_type, row.get::<_, String>(2)?))
        })?;

        let mut blocks = Vec::new();
        for row in rows {
            let (block_id, block_type, text) = row?;
            if let Ok(block_type) = CorpusBlockType::from_str(&block_type) {
                blocks.push(CorpusBlock { block_id, block_type, text });
            }
        }

        // Documents with no explicit sectioning serve as their own corpus:
        // fall back to a single text block built from the document itself.
        if blocks.is_empty() {
            let text: Option<String> = conn
                .query_row(
                    "SELECT text FROM documents WHERE id = ?1",
                    params![document_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(text) = text {
                blocks.push(CorpusBlock {
                    block_id: format!("{}#full", document_id.as_str()),
                    block_type: CorpusBlockType::Text,
                    text,
                });
            }
        }

        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DocumentFilter;

    #[tokio::test]
    async fn insert_and_fetch_document_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let doc = Document::new("documents", "note", "hello world").with_tags(["python"]);
        store.insert_document(&doc).await.unwrap();
        let fetched = store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.text, "hello world");
        assert!(fetched.tags.contains("python"));
    }

    #[tokio::test]
    async fn list_documents_filters_by_collection_and_tag() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = Document::new("documents", "note", "a").with_tags(["python", "db"]);
        let b = Document::new("documents", "note", "b").with_tags(["python"]);
        store.insert_document(&a).await.unwrap();
        store.insert_document(&b).await.unwrap();

        let filter = DocumentFilter {
            collections: vec!["documents".to_string()],
            tags: vec!["python".to_string(), "db".to_string()],
            require_all_tags: true,
            attribute_equals: vec![],
        };
        let results = store.list_documents(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, a.id);
    }

    #[tokio::test]
    async fn edge_invalidation_persists() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut edge = Edge::new(
            "relationships",
            DocumentId::from("documents/x"),
            DocumentId::from("documents/y"),
            "relates_to",
            Utc::now(),
        );
        store.insert_edge(&edge).await.unwrap();
        edge.invalidate(Utc::now(), "test", None);
        store.update_edge(&edge).await.unwrap();

        let fetched = store.get_edge(&edge.id).await.unwrap().unwrap();
        assert!(fetched.invalid_at.is_some());
    }
}
