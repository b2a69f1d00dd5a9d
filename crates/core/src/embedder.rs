//! Text → fixed-dimension float vector (spec §4.4).
//!
//! Grounded on the teacher's `Cargo.toml`-declared `fastembed`+`ort`
//! dependency pair behind the `semantic` feature (see DESIGN.md for why this
//! implementation follows the declared dependency table rather than the
//! `candle`-based body found in the retrieved `semantic.rs` snapshot, which
//! doesn't match its own manifest).

use crate::error::{CoreError, CoreResult};
use std::sync::Mutex;
use std::time::Duration;

/// Blocking batch embedding contract. Implementations load their model once
/// and reuse it; batching MAY reorder internally but must return results in
/// input order (spec §4.4).
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> CoreResult<Vec<f32>>;

    /// Embed a batch, returned in input order. Default impl calls `embed`
    /// per item; real backends override this for throughput.
    fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Output vector dimensionality.
    fn dimension(&self) -> usize;

    /// Model name, recorded in the Chunk Store's stats for restart consistency.
    fn model_name(&self) -> &str;
}

/// Per-batch timeout applied around the embedder call (spec §5, default 15s).
/// A timed-out batch fails without aborting the enclosing ingest task.
pub fn with_batch_timeout<F, T>(timeout: Duration, f: F) -> CoreResult<T>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(CoreError::EmbedderUnavailable(format!(
            "embedding batch exceeded {:?} timeout",
            timeout
        ))),
    }
}

#[cfg(feature = "semantic")]
mod fastembed_backend {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    /// Embedder backed by a locally-run `fastembed` ONNX model. Cold-start
    /// loads the model once; subsequent calls reuse the same instance
    /// (spec §4.4 "Cold-start loads model once").
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
        dim: usize,
        name: String,
    }

    /// Resolve a model name to its `fastembed` enum variant and dimension.
    /// `None` (and any unrecognized name) falls back to the default model,
    /// documented by name only per spec §4.4.
    fn resolve_model(name: Option<&str>) -> (EmbeddingModel, usize, &'static str) {
        match name {
            Some("bge-small") => (EmbeddingModel::BGESmallENV15, 384, "bge-small-en-v1.5"),
            Some("bge-base") => (EmbeddingModel::BGEBaseENV15, 768, "bge-base-en-v1.5"),
            _ => (EmbeddingModel::AllMiniLML6V2, 384, "all-MiniLM-L6-v2"),
        }
    }

    impl FastEmbedEmbedder {
        pub fn new(model_name: Option<&str>) -> CoreResult<Self> {
            let (model, dim, name) = resolve_model(model_name);
            let init = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(init)
                .map_err(|e| CoreError::EmbedderUnavailable(e.to_string()))?;
            Ok(Self { model: Mutex::new(embedding), dim, name: name.to_string() })
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn embed(&self, text: &str) -> CoreResult<Vec<f32>> {
            let vecs = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
            vecs.into_iter()
                .next()
                .ok_or_else(|| CoreError::Internal("embedder returned no vectors".into()))
        }

        fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let model = self
                .model
                .lock()
                .map_err(|_| CoreError::Internal("embedder mutex poisoned".into()))?;
            let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
            model
                .embed(refs, None)
                .map_err(|e| CoreError::EmbedderUnavailable(e.to_string()))
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }
}

#[cfg(feature = "semantic")]
pub use fastembed_backend::FastEmbedEmbedder;

/// Construct the configured embedder. Kept separate from `FastEmbedEmbedder`
/// so `server` never needs to know which backend is compiled in.
#[cfg(feature = "semantic")]
pub fn build_embedder(model_name: Option<&str>) -> CoreResult<Box<dyn Embedder>> {
    Ok(Box::new(FastEmbedEmbedder::new(model_name)?))
}

#[cfg(not(feature = "semantic"))]
pub fn build_embedder(_model_name: Option<&str>) -> CoreResult<Box<dyn Embedder>> {
    Err(CoreError::EmbedderUnavailable("semantic feature not compiled in".into()))
}

/// L2-normalize a vector in place — embeddings are stored normalized so
/// cosine similarity reduces to a dot product in the Chunk Store.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector_is_noop() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
