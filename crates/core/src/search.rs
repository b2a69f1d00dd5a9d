//! Keyword/semantic/hybrid query orchestration (spec §4.10).
//!
//! Grounded on `openai-codex`'s `search/hybrid.rs` fusion shape (min-max
//! score normalization + weighted combination) and
//! `tyaso777/hybrid-search-rs`'s ingest-then-query service shape — both
//! read-only reference material, not the teacher (see DESIGN.md).

use crate::embedder::{l2_normalize, Embedder};
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::lexical::LexicalIndex;
use crate::snippet::{snippet, DEFAULT_WINDOW};
use crate::store::ChunkStore;
use crate::tokenizer::tokenize;
use crate::types::{ChunkMetadata, SearchResult, SearchType};
use std::collections::HashMap;

/// Tunable parameters for one search call, threaded down from `Config`/the
/// request body (spec §4.10).
#[derive(Clone, Debug)]
pub struct SearchParams {
    pub limit: usize,
    pub threshold: f32,
    pub over_fetch: usize,
    pub alpha: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { limit: 10, threshold: 0.3, over_fetch: 3, alpha: 0.5 }
    }
}

/// Orchestrates keyword/semantic/hybrid search over a shared lexical index
/// and chunk store (spec §4.10 "Search Engine").
pub struct SearchEngine<'a> {
    pub lexical: &'a LexicalIndex,
    pub store: &'a ChunkStore,
    pub embedder: Option<&'a dyn Embedder>,
    /// Optional — when present, results are enriched with `size_bytes` and
    /// `last_modified` from the source's ledger entry (not part of the chunk
    /// store itself, spec §6 search response fields).
    pub ledger: Option<&'a Ledger>,
}

/// One scored chunk before result assembly (keeps the chunk id so callers
/// can dedup to one result per `source_id`).
struct ScoredChunk {
    chunk_id: String,
    score: f32,
    metadata: ChunkMetadata,
    text: String,
}

impl<'a> SearchEngine<'a> {
    pub fn new(lexical: &'a LexicalIndex, store: &'a ChunkStore, embedder: Option<&'a dyn Embedder>) -> Self {
        Self { lexical, store, embedder, ledger: None }
    }

    pub fn with_ledger(mut self, ledger: &'a Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Top-level entry point matching spec §4.10's `search(...)` contract.
    pub fn search(
        &self,
        query: &str,
        search_type: SearchType,
        params: &SearchParams,
    ) -> CoreResult<Vec<SearchResult>> {
        let query_tokens = tokenize(query);

        let scored = match search_type {
            SearchType::Keyword => self.keyword_scores(&query_tokens)?,
            SearchType::Semantic => self.semantic_scores(query, params)?,
            SearchType::Hybrid => self.hybrid_scores(query, &query_tokens, params)?,
        };

        Ok(self.assemble_results(scored, &query_tokens, params.limit))
    }

    /// Keyword (TF-IDF) scoring: union of postings, drop zero scores, tie-break
    /// by lower ordinal then lexicographic `source_id` (spec §4.10).
    fn keyword_scores(&self, query_tokens: &[String]) -> CoreResult<Vec<ScoredChunk>> {
        let ranked = self.lexical.score(query_tokens);
        let mut out = Vec::with_capacity(ranked.len());
        for (chunk_id, score) in ranked {
            if score <= 0.0 {
                continue;
            }
            let Some(metadata) = self.store.get_metadata(&chunk_id) else { continue };
            let text = self.store.get_text(&chunk_id).unwrap_or_default();
            out.push(ScoredChunk { chunk_id, score, metadata, text });
        }
        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.metadata.ordinal.cmp(&b.metadata.ordinal))
                .then_with(|| a.metadata.source_id.cmp(&b.metadata.source_id))
        });
        Ok(out)
    }

    /// Semantic (vector) scoring: embed the query, over-fetch, filter by
    /// threshold (spec §4.10).
    fn semantic_scores(&self, query: &str, params: &SearchParams) -> CoreResult<Vec<ScoredChunk>> {
        let embedder = self
            .embedder
            .ok_or_else(|| CoreError::EmbedderUnavailable("semantic search not configured".into()))?;
        let mut vector = embedder.embed(query)?;
        l2_normalize(&mut vector);

        let k = params.limit.saturating_mul(params.over_fetch.max(1));
        let hits = self.store.query_semantic(&vector, k, None)?;

        Ok(hits
            .into_iter()
            .filter(|h| h.score >= params.threshold)
            .map(|h| ScoredChunk { chunk_id: h.chunk_id, score: h.score, metadata: h.metadata, text: h.text })
            .collect())
    }

    /// Hybrid: run both, min-max normalize each score set to `[0,1]`, combine
    /// as `alpha * semantic_norm + (1-alpha) * keyword_norm` (spec §4.10).
    /// A side missing for a given chunk contributes 0.
    fn hybrid_scores(
        &self,
        query: &str,
        query_tokens: &[String],
        params: &SearchParams,
    ) -> CoreResult<Vec<ScoredChunk>> {
        let keyword = self.keyword_scores(query_tokens)?;
        let semantic = match self.semantic_scores(query, params) {
            Ok(s) => s,
            Err(CoreError::EmbedderUnavailable(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let keyword_norm = normalize_scores(&keyword);
        let semantic_norm = normalize_scores(&semantic);

        let mut by_chunk: HashMap<String, (Option<f32>, Option<f32>, ChunkMetadata, String)> =
            HashMap::new();
        for (chunk, norm) in keyword.iter().zip(keyword_norm.iter()) {
            by_chunk
                .entry(chunk.chunk_id.clone())
                .or_insert_with(|| (None, None, chunk.metadata.clone(), chunk.text.clone()))
                .0 = Some(*norm);
        }
        for (chunk, norm) in semantic.iter().zip(semantic_norm.iter()) {
            let entry = by_chunk
                .entry(chunk.chunk_id.clone())
                .or_insert_with(|| (None, None, chunk.metadata.clone(), chunk.text.clone()));
            entry.1 = Some(*norm);
        }

        let alpha = params.alpha.clamp(0.0, 1.0);
        let mut out: Vec<ScoredChunk> = by_chunk
            .into_iter()
            .map(|(chunk_id, (kw, sem, metadata, text))| {
                let score = alpha * sem.unwrap_or(0.0) + (1.0 - alpha) * kw.unwrap_or(0.0);
                ScoredChunk { chunk_id, score, metadata, text }
            })
            .collect();

        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.metadata.ordinal.cmp(&b.metadata.ordinal))
                .then_with(|| a.metadata.source_id.cmp(&b.metadata.source_id))
        });
        Ok(out)
    }

    /// One `SearchResult` per unique `source_id`, keeping its best-scoring
    /// chunk and generating its snippet (spec §4.10 "Result assembly").
    fn assemble_results(
        &self,
        scored: Vec<ScoredChunk>,
        query_tokens: &[String],
        limit: usize,
    ) -> Vec<SearchResult> {
        let mut best_per_source: HashMap<String, ScoredChunk> = HashMap::new();
        for chunk in scored {
            best_per_source
                .entry(chunk.metadata.source_id.clone())
                .and_modify(|existing| {
                    if chunk.score > existing.score {
                        *existing = ScoredChunk {
                            chunk_id: chunk.chunk_id.clone(),
                            score: chunk.score,
                            metadata: chunk.metadata.clone(),
                            text: chunk.text.clone(),
                        };
                    }
                })
                .or_insert(chunk);
        }

        let mut results: Vec<SearchResult> = best_per_source
            .into_values()
            .map(|c| {
                let file_state = self
                    .ledger
                    .and_then(|l| l.lookup(&c.metadata.source_id).ok().flatten());
                SearchResult {
                    source_id: c.metadata.source_id.clone(),
                    display_name: c.metadata.display_name.clone(),
                    file_type: c.metadata.file_type.clone(),
                    size_bytes: file_state.as_ref().map(|s| s.size_bytes).unwrap_or(0),
                    score: c.score,
                    snippet: snippet(&c.text, query_tokens, DEFAULT_WINDOW),
                    last_modified: file_state.map(|s| s.modified_at),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        results.truncate(limit);
        results
    }
}

/// Min-max normalize scores to `[0,1]`. A single-element or constant-score
/// set normalizes to all-`1.0` (no information to discriminate on, but the
/// side still contributes its full weight rather than collapsing to 0).
fn normalize_scores(chunks: &[ScoredChunk]) -> Vec<f32> {
    if chunks.is_empty() {
        return Vec::new();
    }
    let min = chunks.iter().map(|c| c.score).fold(f32::INFINITY, f32::min);
    let max = chunks.iter().map(|c| c.score).fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return vec![1.0; chunks.len()];
    }
    chunks.iter().map(|c| (c.score - min) / (max - min)).collect()
}
