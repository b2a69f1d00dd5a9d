//! Core error type shared by every component — maps 1:1 onto the HTTP status
//! table in the engine's error handling design.

use thiserror::Error;

/// Errors surfaced by the ingest pipeline, search engine, and auth gate.
///
/// `server` maps each variant onto an HTTP status code; per-file extraction
/// errors (`UnsupportedType`, `TooLarge`, `ContentRejected`) never reach an
/// HTTP handler — the scheduler swallows them into per-task statistics.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("file too large: {size_bytes} bytes (cap {cap_bytes})")]
    TooLarge { size_bytes: u64, cap_bytes: u64 },

    #[error("content rejected by policy: {0}")]
    ContentRejected(String),

    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("chunk store unavailable: {0}")]
    ChunkStoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Whether this error should be swallowed into per-file task statistics
    /// rather than failing the whole ingest task.
    pub fn is_recoverable_per_file(&self) -> bool {
        matches!(
            self,
            CoreError::UnsupportedType(_) | CoreError::TooLarge { .. } | CoreError::ContentRejected(_)
        )
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Internal(e.to_string())
    }
}

impl From<sled::Error> for CoreError {
    fn from(e: sled::Error) -> Self {
        CoreError::ChunkStoreUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Internal(format!("serialization: {e}"))
    }
}
