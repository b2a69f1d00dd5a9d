//! Shared data-model types (spec §3) — `SourceRef`, `Chunk`, `FileState`,
//! `DirectoryEntry`. These are the nouns every component below passes
//! around; keeping them in one module avoids import cycles between
//! `store`, `lexical`, `ledger`, `registry`, and `scheduler`.

use serde::{Deserialize, Serialize};

/// Identity of an indexable item — a local file path or an opaque remote URI.
///
/// `source_id` is treated as fully opaque outside the extractor: for local
/// files it is the absolute path; for remote sources whatever the
/// extractor's URI scheme is (e.g. `gdrive://...`). Nothing in `core` parses
/// its structure.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub source_id: String,
    pub display_name: String,
    pub file_type: String,
    pub size_bytes: u64,
    pub modified_at: chrono::DateTime<chrono::Utc>,
    /// 32-byte (sha256) hash over decoded text; `None` until extraction runs.
    pub content_hash: Option<[u8; 32]>,
}

/// Metadata carried alongside a chunk's text and embedding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub display_name: String,
    pub file_type: String,
    pub source_id: String,
    pub ordinal: usize,
    pub total_in_source: usize,
}

/// An atomic indexable unit of text (spec §3 "Chunk").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub source_id: String,
    pub ordinal: usize,
    pub text: String,
    /// Absent only when semantic indexing is disabled.
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

/// Deterministic chunk id = `H(source_id || ordinal)`. Stable across re-runs
/// for an unchanged source, so re-indexing never churns ids (spec §8.3).
pub fn chunk_id(source_id: &str, ordinal: usize) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(ordinal.to_le_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest)
}

pub fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Ledger entry per `source_id` (spec §3 "FileState").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileState {
    pub size_bytes: u64,
    pub modified_at: chrono::DateTime<chrono::Utc>,
    pub content_hash: [u8; 32],
    pub chunk_ids: Vec<String>,
    pub indexed_at: chrono::DateTime<chrono::Utc>,
}

/// Result of comparing a freshly observed `SourceRef` against the Ledger
/// (spec §4.7 "Change classification").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeClass {
    New,
    Unchanged,
    Modified,
    Deleted,
}

/// Lifecycle status of a registered directory (spec §3 "DirectoryEntry").
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryStatus {
    NotIndexed,
    Indexing,
    Indexed,
    Error,
}

/// Registry record for one registered root directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub path: String,
    pub name: String,
    pub status: DirectoryStatus,
    pub progress: f32,
    pub total_files: usize,
    pub indexed_files: usize,
    pub last_task_id: Option<String>,
    pub last_error: Option<String>,
    pub last_indexed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl DirectoryEntry {
    pub fn new(path: String, name: String) -> Self {
        Self {
            path,
            name,
            status: DirectoryStatus::NotIndexed,
            progress: 0.0,
            total_files: 0,
            indexed_files: 0,
            last_task_id: None,
            last_error: None,
            last_indexed_at: None,
        }
    }
}

/// Capability tags on an API key (spec §3 "ApiKey").
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
    Search,
    Index,
    Admin,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Search => "search",
            Permission::Index => "index",
            Permission::Admin => "admin",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub permissions: Vec<Permission>,
    pub active: bool,
    /// sha256 of the plaintext secret — never the secret itself.
    pub hashed_secret: String,
}

impl ApiKeyRecord {
    pub fn has_permission(&self, perm: Permission) -> bool {
        self.permissions.contains(&perm)
    }

    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// The search mode requested by a query (spec §4.10).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Keyword,
    Semantic,
    Hybrid,
}

/// One ranked search result (spec §6 "Search").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub source_id: String,
    pub display_name: String,
    pub file_type: String,
    pub size_bytes: u64,
    pub score: f32,
    pub snippet: String,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}
