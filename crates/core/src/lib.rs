//! `dsearch-core` — ingest/indexing pipeline, hybrid search engine, directory
//! lifecycle state machine, and auth/rate-limit gate for a local desktop
//! search service (spec §1–§9; ambient stack and supplemented features in
//! `SPEC_FULL.md`).
//!
//! `server` is a thin axum shell around [`Engine`], the composition root
//! that wires every component together — mirroring the teacher's split
//! between `crates/core` (pure domain logic) and `server` (HTTP transport).

pub mod auth;
pub mod chunker;
pub mod config;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod ledger;
pub mod lexical;
pub mod ratelimit;
pub mod registry;
pub mod scheduler;
pub mod search;
pub mod snippet;
pub mod store;
pub mod tokenizer;
pub mod types;

use config::Config;
use error::{CoreError, CoreResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Composition root owning every shared component (spec §5 "Shared-resource
/// policy"). Built once at process start and handed to the HTTP layer as a
/// single `Arc`, the same shape as the teacher's `ServerState`/`AppContext`.
pub struct Engine {
    pub config: Config,
    pub registry: Arc<registry::Registry>,
    pub ledger: Arc<ledger::Ledger>,
    pub store: Arc<store::ChunkStore>,
    pub lexical: Arc<lexical::LexicalIndex>,
    pub extractors: Arc<extractor::ExtractorRegistry>,
    pub embedder: Option<Arc<dyn embedder::Embedder>>,
    pub scheduler: Arc<scheduler::Scheduler>,
    pub auth: Arc<auth::AuthStore>,
    pub rate_gate: Arc<ratelimit::RateGate>,
}

impl Engine {
    /// Build every component from `config`, rooted at `config.data_dir`
    /// (spec §6 "Persisted state layout").
    pub fn open(config: Config) -> CoreResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let db = sled::open(config.data_dir.join("dsearch.sled"))?;
        let registry = Arc::new(registry::Registry::open(&db)?);
        let ledger = Arc::new(ledger::Ledger::open(&db)?);
        let auth = Arc::new(auth::AuthStore::open(&db)?);
        let store = Arc::new(store::ChunkStore::open(&config.data_dir.join("chunks"))?);
        let lexical = Arc::new(lexical::LexicalIndex::new());
        let extractors = Arc::new(extractor::ExtractorRegistry::default_for(config.max_file_size_bytes));

        let embedder: Option<Arc<dyn embedder::Embedder>> =
            match embedder::build_embedder(config.embedder_model.as_deref()) {
                Ok(e) => Some(Arc::from(e)),
                Err(err) => {
                    tracing::warn!(error = %err, "semantic embedder unavailable at startup; search falls back to keyword-only");
                    None
                }
            };

        let skip_dirs: HashSet<String> = config.skip_dirs.iter().cloned().collect();
        let chunker_config = chunker::ChunkerConfig {
            target_chars: config.chunk_target_chars,
            overlap_chars: config.chunk_overlap_chars,
        };

        let scheduler = Arc::new(scheduler::Scheduler::new(
            config.scheduler_concurrency,
            Arc::clone(&registry),
            Arc::clone(&ledger),
            Arc::clone(&store),
            Arc::clone(&lexical),
            Arc::clone(&extractors),
            embedder.clone(),
            std::time::Duration::from_secs(config.embedder_batch_timeout_secs),
            true,
            chunker_config,
            skip_dirs,
        ));

        let rate_gate = Arc::new(ratelimit::RateGate::new(
            config.rate_limit_global_per_min,
            config.rate_limit_search_per_min,
            config.rate_limit_index_per_min,
        ));

        Ok(Self {
            config,
            registry,
            ledger,
            store,
            lexical,
            extractors,
            embedder,
            scheduler,
            auth,
            rate_gate,
        })
    }

    /// Register a directory for indexing (spec §4.8 "add").
    pub fn add_directory(&self, path: &str) -> CoreResult<types::DirectoryEntry> {
        let name = std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());
        self.registry.add(path, name)
    }

    /// Remove a directory: cancel its running task, purge chunks + ledger
    /// entries under it, then drop the registry record (spec §4.8 "remove",
    /// spec §5 "remove implicitly cancels its running task").
    pub fn remove_directory(&self, path: &str) -> CoreResult<()> {
        let entry = self
            .registry
            .get(path)?
            .ok_or_else(|| CoreError::NotFound(format!("directory not registered: {path}")))?;

        self.scheduler.cancel(&entry.path);
        // Cooperative cancellation finishes at the current file boundary;
        // give the worker a moment to observe it before purging under it.
        for _ in 0..50 {
            if let Some(task) = self.scheduler.last_task_for(&entry.path) {
                if matches!(task.status(), scheduler::TaskStatus::Running | scheduler::TaskStatus::Queued) {
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    continue;
                }
            }
            break;
        }

        scheduler::purge_directory(&self.ledger, &self.store, &self.lexical, &entry.path)?;
        self.registry.remove(&entry.path)?;
        Ok(())
    }

    pub fn list_directories(&self) -> CoreResult<Vec<types::DirectoryEntry>> {
        self.registry.list()
    }

    pub fn directory_status(&self, path: &str) -> CoreResult<types::DirectoryEntry> {
        self.registry
            .get(path)?
            .ok_or_else(|| CoreError::NotFound(format!("directory not registered: {path}")))
    }

    /// Start (or join) the ingest task for `path` (spec §4.9).
    pub fn refresh_directory(&self, path: &str) -> CoreResult<String> {
        let entry = self
            .registry
            .get(path)?
            .ok_or_else(|| CoreError::NotFound(format!("directory not registered: {path}")))?;
        self.scheduler.refresh(&entry.path)
    }

    /// Run a search of `search_type` over the shared index (spec §4.10).
    pub fn search(
        &self,
        query: &str,
        search_type: types::SearchType,
        params: &search::SearchParams,
    ) -> CoreResult<Vec<types::SearchResult>> {
        let embedder_ref = self.embedder.as_deref();
        let engine = search::SearchEngine::new(&self.lexical, &self.store, embedder_ref)
            .with_ledger(&self.ledger);
        engine.search(query, search_type, params)
    }

    pub fn stats(&self) -> EngineStats {
        let store_stats = self.store.stats();
        let directories = self.registry.list().unwrap_or_default();
        EngineStats {
            total_chunks: store_stats.total_chunks,
            dimension: store_stats.dimension,
            persist_dir: store_stats.persist_dir,
            total_directories: directories.len(),
            indexed_directories: directories
                .iter()
                .filter(|d| d.status == types::DirectoryStatus::Indexed)
                .count(),
            total_files: directories.iter().map(|d| d.total_files).sum(),
            model_name: self.embedder.as_ref().map(|e| e.model_name().to_string()),
            semantic_enabled: self.embedder.is_some(),
        }
    }
}

/// Snapshot backing `GET /api/v1/stats/system` (spec §6 "Stats").
#[derive(Clone, Debug, serde::Serialize)]
pub struct EngineStats {
    pub total_chunks: usize,
    pub dimension: usize,
    pub persist_dir: String,
    pub total_directories: usize,
    pub indexed_directories: usize,
    pub total_files: usize,
    pub model_name: Option<String>,
    pub semantic_enabled: bool,
}
