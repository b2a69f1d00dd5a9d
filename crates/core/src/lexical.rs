//! Inverted index + TF-IDF scoring (spec §4.6).
//!
//! Grounded on the teacher's `TermDocFreq` (`crates/core/src/types.rs`),
//! whose `idf()` uses Laplace-smoothed IDF (`((N+1)/(df+1)).ln() + 1`) —
//! kept verbatim here since it is already the standard smoothed form and the
//! teacher's own doc comment calls out avoiding a division by zero for
//! unseen terms.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Inverted index: term -> (chunk_id -> term frequency in that chunk).
///
/// `dashmap` gives the scheduler's rayon-parallel ingest workers lock-free
/// concurrent access to the same map (same reasoning as the teacher's
/// `DashMap`-backed symbol table).
#[derive(Default)]
pub struct LexicalIndex {
    postings: DashMap<String, DashMap<String, u32>>,
    /// Total term count per chunk, needed to normalize TF.
    chunk_lengths: DashMap<String, u32>,
    total_docs: AtomicUsize,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `chunk_id`'s already-tokenized terms. Replaces any prior
    /// postings for this id (call [`remove`](Self::remove) first if unsure).
    ///
    /// Registers the chunk (length + doc count) even when `terms` is empty
    /// — a stop-word-only or all-punctuation chunk still gets upserted into
    /// the Chunk Store and the Ledger, so it must be counted here too or the
    /// chunk-id sets across Store/Index/Ledger stop matching (spec §8.1).
    pub fn add(&self, chunk_id: &str, terms: &[String]) {
        let mut tf: HashMap<&str, u32> = HashMap::new();
        for t in terms {
            *tf.entry(t.as_str()).or_insert(0) += 1;
        }
        for (term, count) in &tf {
            let entry = self.postings.entry(term.to_string()).or_default();
            entry.insert(chunk_id.to_string(), *count);
        }
        self.chunk_lengths.insert(chunk_id.to_string(), terms.len() as u32);
        self.total_docs.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove all postings for `chunk_id`. Idempotent; no-op if absent.
    pub fn remove(&self, chunk_id: &str) {
        if self.chunk_lengths.remove(chunk_id).is_none() {
            return;
        }
        self.postings.retain(|_, docs| {
            docs.remove(chunk_id);
            !docs.is_empty()
        });
        self.total_docs.fetch_sub(1, Ordering::Relaxed);
    }

    /// Documents (chunks) containing `term`, with raw term frequency.
    pub fn postings(&self, term: &str) -> Vec<(String, u32)> {
        self.postings
            .get(term)
            .map(|docs| docs.iter().map(|e| (e.key().clone(), *e.value())).collect())
            .unwrap_or_default()
    }

    /// Number of distinct chunks containing `term`.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn total_docs(&self) -> usize {
        self.total_docs.load(Ordering::Relaxed)
    }

    pub fn chunk_length(&self, chunk_id: &str) -> u32 {
        self.chunk_lengths.get(chunk_id).map(|v| *v).unwrap_or(0)
    }

    /// Laplace-smoothed inverse document frequency for `term`.
    fn idf(&self, term: &str) -> f32 {
        let n = self.total_docs() as f32;
        let df = self.doc_freq(term) as f32;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    /// TF-IDF score of `query_terms` against every chunk with at least one
    /// matching term. TF is normalized by chunk length (spec §4.6).
    pub fn score(&self, query_terms: &[String]) -> Vec<(String, f32)> {
        let mut scores: HashMap<String, f32> = HashMap::new();
        for term in query_terms {
            let idf = self.idf(term);
            for (chunk_id, tf) in self.postings(term) {
                let len = self.chunk_length(&chunk_id).max(1) as f32;
                let normalized_tf = tf as f32 / len;
                *scores.entry(chunk_id).or_insert(0.0) += normalized_tf * idf;
            }
        }
        let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_score_ranks_by_tfidf() {
        let idx = LexicalIndex::new();
        idx.add("c1", &["rust".into(), "memory".into(), "safety".into()]);
        idx.add("c2", &["rust".into(), "rust".into(), "rust".into()]);
        idx.add("c3", &["python".into(), "snake".into()]);

        let ranked = idx.score(&["rust".to_string()]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "c2");
    }

    #[test]
    fn remove_is_idempotent_and_drops_postings() {
        let idx = LexicalIndex::new();
        idx.add("c1", &["rust".into()]);
        idx.remove("c1");
        idx.remove("c1");
        assert_eq!(idx.doc_freq("rust"), 0);
        assert_eq!(idx.total_docs(), 0);
    }

    #[test]
    fn unseen_term_has_nonzero_idf_no_panic() {
        let idx = LexicalIndex::new();
        idx.add("c1", &["rust".into()]);
        let ranked = idx.score(&["nonexistent".to_string()]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn empty_terms_still_register_the_chunk() {
        let idx = LexicalIndex::new();
        idx.add("c1", &[]);
        assert_eq!(idx.total_docs(), 1);
        assert_eq!(idx.chunk_length("c1"), 0);
        idx.remove("c1");
        assert_eq!(idx.total_docs(), 0);
    }

    #[test]
    fn reindexing_same_chunk_replaces_postings() {
        let idx = LexicalIndex::new();
        idx.add("c1", &["alpha".into()]);
        idx.remove("c1");
        idx.add("c1", &["beta".into()]);
        assert_eq!(idx.doc_freq("alpha"), 0);
        assert_eq!(idx.doc_freq("beta"), 1);
        assert_eq!(idx.total_docs(), 1);
    }
}
