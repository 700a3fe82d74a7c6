//! Vector index abstraction (C2/C5). The default build keeps vectors in an
//! in-memory brute-force index; with the `embeddings` feature the
//! `sqlite-vec`-backed store takes over, grounded on the teacher's
//! `SqliteVecStore` (L2-normalize on insert, L2→cosine conversion).

use crate::document::DocumentId;
use std::collections::HashMap;
use std::sync::Mutex;

/// A pluggable ANN index keyed by collection name.
pub trait VectorStore: Send + Sync {
    fn upsert(&self, collection: &str, id: &DocumentId, vector: Vec<f32>);
    fn has(&self, collection: &str, id: &DocumentId) -> bool;
    /// Returns up to `k` nearest neighbors by cosine similarity, unfiltered
    /// by threshold — callers apply `min_score` themselves (spec §4.4).
    fn knn(&self, collection: &str, query: &[f32], k: usize) -> Vec<(DocumentId, f32)>;
    fn dimensions(&self, collection: &str) -> Option<usize>;
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[derive(Default)]
struct CollectionIndex {
    dimensions: Option<usize>,
    vectors: HashMap<String, Vec<f32>>,
}

/// Brute-force in-memory ANN index. Fine up to a few tens of thousands of
/// vectors per collection; the `embeddings` feature swaps in
/// [`SqliteVecStore`] for anything larger.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: Mutex<HashMap<String, CollectionIndex>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn upsert(&self, collection: &str, id: &DocumentId, mut vector: Vec<f32>) {
        l2_normalize(&mut vector);
        let mut collections = self.collections.lock().unwrap();
        let entry = collections.entry(collection.to_string()).or_default();
        entry.dimensions.get_or_insert(vector.len());
        entry.vectors.insert(id.as_str().to_string(), vector);
    }

    fn has(&self, collection: &str, id: &DocumentId) -> bool {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.vectors.contains_key(id.as_str()))
            .unwrap_or(false)
    }

    fn knn(&self, collection: &str, query: &[f32], k: usize) -> Vec<(DocumentId, f32)> {
        let mut normalized_query = query.to_vec();
        l2_normalize(&mut normalized_query);
        let collections = self.collections.lock().unwrap();
        let Some(index) = collections.get(collection) else {
            return Vec::new();
        };
        let mut scored: Vec<(DocumentId, f32)> = index
            .vectors
            .iter()
            .map(|(id, vec)| (DocumentId::from_string(id.clone()), cosine(&normalized_query, vec)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    fn dimensions(&self, collection: &str) -> Option<usize> {
        self.collections.lock().unwrap().get(collection).and_then(|c| c.dimensions)
    }
}

#[cfg(feature = "embeddings")]
mod sqlite_vec_store {
    use super::{l2_normalize, VectorStore};
    use crate::document::DocumentId;
    use rusqlite::Connection;
    use std::path::Path;
    use std::sync::{Mutex, Once};

    fn register_vec_extension() {
        static INIT: Once = Once::new();
        INIT.call_once(|| unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        });
    }

    fn f32_slice_as_bytes(slice: &[f32]) -> &[u8] {
        unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, slice.len() * 4) }
    }

    /// Persistent ANN index, one `vec0` virtual table per dimensionality,
    /// partitioned by collection. Vectors are L2-normalized on insert so the
    /// vec0 L2 distance can be converted to cosine similarity:
    /// `sim = 1 - dist^2 / 2`.
    pub struct SqliteVecStore {
        conn: Mutex<Connection>,
        dimensions: usize,
    }

    impl SqliteVecStore {
        pub fn open(path: &Path, dimensions: usize) -> Result<Self, String> {
            register_vec_extension();
            let conn = Connection::open(path).map_err(|e| e.to_string())?;
            Self::init(conn, dimensions)
        }

        pub fn open_in_memory(dimensions: usize) -> Result<Self, String> {
            register_vec_extension();
            let conn = Connection::open_in_memory().map_err(|e| e.to_string())?;
            Self::init(conn, dimensions)
        }

        fn init(conn: Connection, dimensions: usize) -> Result<Self, String> {
            conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(|e| e.to_string())?;
            let sql = format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS vec_documents USING vec0(\
                    collection TEXT PARTITION KEY, document_id TEXT, embedding float[{dimensions}])"
            );
            conn.execute_batch(&sql).map_err(|e| e.to_string())?;
            Ok(Self { conn: Mutex::new(conn), dimensions })
        }
    }

    impl VectorStore for SqliteVecStore {
        fn upsert(&self, collection: &str, id: &DocumentId, mut vector: Vec<f32>) {
            l2_normalize(&mut vector);
            let conn = self.conn.lock().unwrap();
            let bytes = f32_slice_as_bytes(&vector);
            conn.execute(
                "INSERT OR REPLACE INTO vec_documents(collection, document_id, embedding) VALUES (?1, ?2, ?3)",
                rusqlite::params![collection, id.as_str(), bytes],
            )
            .expect("vec_documents insert failed");
        }

        fn has(&self, collection: &str, id: &DocumentId) -> bool {
            let conn = self.conn.lock().unwrap();
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM vec_documents WHERE collection = ?1 AND document_id = ?2",
                    rusqlite::params![collection, id.as_str()],
                    |r| r.get(0),
                )
                .unwrap_or(0);
            count > 0
        }

        fn knn(&self, collection: &str, query: &[f32], k: usize) -> Vec<(DocumentId, f32)> {
            let mut normalized = query.to_vec();
            l2_normalize(&mut normalized);
            let conn = self.conn.lock().unwrap();
            let bytes = f32_slice_as_bytes(&normalized);
            let mut stmt = match conn.prepare(
                "SELECT document_id, distance FROM vec_documents
                 WHERE embedding MATCH ?1 AND collection = ?2 AND k = ?3",
            ) {
                Ok(stmt) => stmt,
                Err(_) => return Vec::new(),
            };
            stmt.query_map(rusqlite::params![bytes, collection, k as i64], |row| {
                let id: String = row.get(0)?;
                let distance: f32 = row.get(1)?;
                Ok((DocumentId::from_string(id), 1.0 - (distance * distance) / 2.0))
            })
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
        }

        fn dimensions(&self, _collection: &str) -> Option<usize> {
            Some(self.dimensions)
        }
    }
}

#[cfg(feature = "embeddings")]
pub use sqlite_vec_store::SqliteVecStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knn_ranks_closer_vectors_first() {
        let store = InMemoryVectorStore::new();
        let a = DocumentId::from("documents/a");
        let b = DocumentId::from("documents/b");
        store.upsert("documents", &a, vec![1.0, 0.0, 0.0]);
        store.upsert("documents", &b, vec![0.0, 1.0, 0.0]);

        let results = store.knn("documents", &[1.0, 0.0, 0.0], 2);
        assert_eq!(results[0].0, a);
        assert!(results[0].1 > results[1].1);
    }
}
