//! Persistent vector + metadata store keyed by chunk id (spec §4.5).
//!
//! Grounded on the teacher's `SemanticIndex` (`crates/core/src/types.rs`):
//! "flat embedding storage ... for SIMD-friendly access" plus a parallel
//! metadata vector. Durability here is delegated to `sled`, an embedded
//! single-writer/multi-reader KV store (precedented in the retrieval pack —
//! see DESIGN.md) so the index survives process restarts without running a
//! separate database server.

use crate::error::CoreResult;
use crate::types::{Chunk, ChunkMetadata};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;

#[derive(Serialize, Deserialize)]
struct StoredChunk {
    source_id: String,
    ordinal: usize,
    text: String,
    embedding: Option<Vec<f32>>,
    metadata: ChunkMetadata,
}

/// Stats reported by `ChunkStore::stats` (spec §4.5).
#[derive(Clone, Debug, Serialize)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub dimension: usize,
    pub persist_dir: String,
}

/// One hit from [`ChunkStore::query_semantic`].
pub struct SemanticHit {
    pub chunk_id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
    pub text: String,
}

/// In-memory cache entry backing the brute-force cosine scan. Kept alongside
/// the durable `sled` tree so restarts rebuild it from disk once at open.
struct CacheEntry {
    chunk_id: String,
    source_id: String,
    embedding: Vec<f32>,
    metadata: ChunkMetadata,
    text: String,
}

/// Durable, single-writer/multi-reader chunk store.
pub struct ChunkStore {
    db: sled::Db,
    tree: sled::Tree,
    persist_dir: String,
    dimension: RwLock<usize>,
    cache: RwLock<Vec<CacheEntry>>,
}

impl ChunkStore {
    /// Open (or create) the store rooted at `dir`.
    pub fn open(dir: &Path) -> CoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let db = sled::open(dir.join("chunks.sled"))?;
        let tree = db.open_tree("chunks")?;

        let mut cache = Vec::new();
        let mut dimension = 0usize;
        for kv in tree.iter() {
            let (key, value) = kv?;
            let chunk_id = String::from_utf8_lossy(&key).to_string();
            let stored: StoredChunk = serde_json::from_slice(&value)?;
            if let Some(ref emb) = stored.embedding {
                dimension = dimension.max(emb.len());
            }
            cache.push(CacheEntry {
                chunk_id,
                source_id: stored.source_id,
                embedding: stored.embedding.unwrap_or_default(),
                metadata: stored.metadata,
                text: stored.text,
            });
        }

        Ok(Self {
            db,
            tree,
            persist_dir: dir.display().to_string(),
            dimension: RwLock::new(dimension),
            cache: RwLock::new(cache),
        })
    }

    /// Insert or replace a chunk. Idempotent on `chunk_id`.
    pub fn upsert(
        &self,
        chunk_id: &str,
        embedding: Option<Vec<f32>>,
        metadata: ChunkMetadata,
        text: String,
    ) -> CoreResult<()> {
        let stored = StoredChunk {
            source_id: metadata.source_id.clone(),
            ordinal: metadata.ordinal,
            text: text.clone(),
            embedding: embedding.clone(),
            metadata: metadata.clone(),
        };
        let bytes = serde_json::to_vec(&stored)?;
        self.tree.insert(chunk_id.as_bytes(), bytes)?;
        self.tree.flush()?;

        if let Some(ref emb) = embedding {
            let mut dim = self.dimension.write().unwrap();
            if *dim == 0 {
                *dim = emb.len();
            }
        }

        let mut cache = self.cache.write().unwrap();
        cache.retain(|e| e.chunk_id != chunk_id);
        cache.push(CacheEntry {
            chunk_id: chunk_id.to_string(),
            source_id: stored.source_id,
            embedding: embedding.unwrap_or_default(),
            metadata,
            text,
        });
        Ok(())
    }

    /// Upsert a fully-built `Chunk` in one call.
    pub fn upsert_chunk(&self, chunk: &Chunk) -> CoreResult<()> {
        self.upsert(
            &chunk.chunk_id,
            chunk.embedding.clone(),
            chunk.metadata.clone(),
            chunk.text.clone(),
        )
    }

    /// Delete every chunk belonging to `source_id`. Idempotent.
    pub fn delete_by_source(&self, source_id: &str) -> CoreResult<Vec<String>> {
        let removed: Vec<String> = {
            let cache = self.cache.read().unwrap();
            cache
                .iter()
                .filter(|e| e.source_id == source_id)
                .map(|e| e.chunk_id.clone())
                .collect()
        };
        for chunk_id in &removed {
            self.tree.remove(chunk_id.as_bytes())?;
        }
        self.tree.flush()?;
        self.cache.write().unwrap().retain(|e| e.source_id != source_id);
        Ok(removed)
    }

    /// Cosine-similarity search, descending, score in `[-1, 1]`.
    pub fn query_semantic(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&dyn Fn(&ChunkMetadata) -> bool>,
    ) -> CoreResult<Vec<SemanticHit>> {
        let cache = self.cache.read().unwrap();
        let mut scored: Vec<(f32, &CacheEntry)> = cache
            .iter()
            .filter(|e| !e.embedding.is_empty())
            .filter(|e| filter.map(|f| f(&e.metadata)).unwrap_or(true))
            .map(|e| (cosine_similarity(query, &e.embedding), e))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.chunk_id.cmp(&b.1.chunk_id))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, e)| SemanticHit {
                chunk_id: e.chunk_id.clone(),
                score,
                metadata: e.metadata.clone(),
                text: e.text.clone(),
            })
            .collect())
    }

    /// Fetch a single chunk's text by id, used by the lexical scorer to
    /// compute term frequencies without re-walking the Ledger.
    pub fn get_text(&self, chunk_id: &str) -> Option<String> {
        self.cache.read().unwrap().iter().find(|e| e.chunk_id == chunk_id).map(|e| e.text.clone())
    }

    pub fn get_metadata(&self, chunk_id: &str) -> Option<ChunkMetadata> {
        self.cache
            .read()
            .unwrap()
            .iter()
            .find(|e| e.chunk_id == chunk_id)
            .map(|e| e.metadata.clone())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_chunks: self.cache.read().unwrap().len(),
            dimension: *self.dimension.read().unwrap(),
            persist_dir: self.persist_dir.clone(),
        }
    }

    /// Force the underlying `sled` tree to disk; called at the end of an
    /// ingest batch so a crash mid-task never loses completed work.
    pub fn flush(&self) -> CoreResult<()> {
        self.tree.flush()?;
        self.db.flush()?;
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(source_id: &str, ordinal: usize) -> ChunkMetadata {
        ChunkMetadata {
            display_name: "a.txt".into(),
            file_type: "txt".into(),
            source_id: source_id.into(),
            ordinal,
            total_in_source: 1,
        }
    }

    #[test]
    fn upsert_then_query_semantic_orders_by_cosine() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::open(dir.path()).unwrap();

        store.upsert("c1", Some(vec![1.0, 0.0]), meta("s1", 0), "alpha".into()).unwrap();
        store.upsert("c2", Some(vec![0.0, 1.0]), meta("s2", 0), "beta".into()).unwrap();

        let hits = store.query_semantic(&[1.0, 0.0], 10, None).unwrap();
        assert_eq!(hits[0].chunk_id, "c1");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn delete_by_source_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::open(dir.path()).unwrap();
        store.upsert("c1", Some(vec![1.0, 0.0]), meta("s1", 0), "alpha".into()).unwrap();

        let removed = store.delete_by_source("s1").unwrap();
        assert_eq!(removed, vec!["c1".to_string()]);
        assert!(store.delete_by_source("s1").unwrap().is_empty());
        assert_eq!(store.stats().total_chunks, 0);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = ChunkStore::open(dir.path()).unwrap();
            store.upsert("c1", Some(vec![1.0, 0.0]), meta("s1", 0), "alpha".into()).unwrap();
        }
        let reopened = ChunkStore::open(dir.path()).unwrap();
        assert_eq!(reopened.stats().total_chunks, 1);
    }
}
