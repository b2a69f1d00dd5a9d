//! Runtime configuration — loaded from `dsearch.toml` if present, then
//! overridden by environment variables and CLI flags by the caller.
//!
//! Mirrors the teacher's `.codescope.toml` / `ScanConfig` pattern: a single
//! struct with a `Default` impl carrying sane defaults, plus a TOML loader
//! that falls back to defaults on any parse error rather than failing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory names skipped during every ingest walk (spec glossary "Skip rules").
pub fn default_skip_dirs() -> Vec<String> {
    [
        ".git", ".svn", "node_modules", "__pycache__", "dist", "build", ".vscode", ".idea",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding the chunk store, ledger, registry, and auth trees.
    pub data_dir: PathBuf,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Port; `0` means "auto-scan a free port" (see server::main).
    pub port: u16,
    /// File-size cap for extraction (spec §4.2), default 50 MB.
    pub max_file_size_bytes: u64,
    /// Chunk window target in characters (spec §4.3).
    pub chunk_target_chars: usize,
    /// Chunk overlap in characters (spec §4.3).
    pub chunk_overlap_chars: usize,
    /// Global concurrency cap for the indexing scheduler (spec §4.9).
    pub scheduler_concurrency: usize,
    /// Embedding model name; `None` uses the embedder's compiled-in default.
    pub embedder_model: Option<String>,
    /// Per-batch embedder timeout (spec §5).
    pub embedder_batch_timeout_secs: u64,
    /// Process-wide admin secret gating key-lifecycle routes. Empty = disabled.
    pub admin_key: String,
    /// HMAC secret used to sign exchanged JWTs (spec §4.11).
    pub jwt_secret: String,
    /// Default over-fetch multiplier for semantic search (spec §4.10).
    pub semantic_over_fetch: usize,
    /// Default semantic score threshold.
    pub semantic_default_threshold: f32,
    /// Default hybrid alpha (weight on the semantic side).
    pub hybrid_default_alpha: f32,
    pub rate_limit_global_per_min: u32,
    pub rate_limit_search_per_min: u32,
    pub rate_limit_index_per_min: u32,
    pub skip_dirs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            max_file_size_bytes: 50 * 1024 * 1024,
            chunk_target_chars: 1000,
            chunk_overlap_chars: 200,
            scheduler_concurrency: 5,
            embedder_model: None,
            embedder_batch_timeout_secs: 15,
            admin_key: String::new(),
            jwt_secret: String::new(),
            semantic_over_fetch: 3,
            semantic_default_threshold: 0.3,
            hybrid_default_alpha: 0.5,
            rate_limit_global_per_min: 100,
            rate_limit_search_per_min: 50,
            rate_limit_index_per_min: 10,
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults if the file is absent
    /// or malformed (the latter is logged by the caller).
    pub fn load(path: &Path) -> Self {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&raw).unwrap_or_default()
    }

    /// Whether admin (key-lifecycle) routes should be enabled.
    pub fn admin_enabled(&self) -> bool {
        !self.admin_key.is_empty()
    }
}
