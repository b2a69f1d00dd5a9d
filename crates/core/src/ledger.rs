//! Per-file durable state tracking incremental re-index decisions (spec §4.7).
//!
//! Grounded on the same `sled` persistence pattern as [`crate::store`], kept
//! as its own tree in the shared `sled::Db` so a crash between a chunk-store
//! write and a ledger write never leaves the two permanently disagreeing
//! about whether a file is current — the scheduler always re-derives
//! `ChangeClass` from both on its next pass rather than trusting a flag.

use crate::error::CoreResult;
use crate::types::{ChangeClass, FileState};
use std::path::Path;

pub struct Ledger {
    tree: sled::Tree,
}

impl Ledger {
    pub fn open(db: &sled::Db) -> CoreResult<Self> {
        Ok(Self { tree: db.open_tree("ledger")? })
    }

    /// Open a standalone ledger rooted at `dir` — used by tests and by any
    /// caller that doesn't need a shared `sled::Db`.
    pub fn open_standalone(dir: &Path) -> CoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let db = sled::open(dir.join("ledger.sled"))?;
        let tree = db.open_tree("ledger")?;
        Ok(Self { tree })
    }

    pub fn lookup(&self, source_id: &str) -> CoreResult<Option<FileState>> {
        match self.tree.get(source_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put(&self, source_id: &str, state: &FileState) -> CoreResult<()> {
        let bytes = serde_json::to_vec(state)?;
        self.tree.insert(source_id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Drop a source's ledger entry (spec §4.7 "Deleted" reconciliation).
    pub fn forget(&self, source_id: &str) -> CoreResult<Option<FileState>> {
        match self.tree.remove(source_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All `source_id`s currently tracked — used to detect deletions by
    /// diffing against a fresh directory walk.
    pub fn known_sources(&self) -> CoreResult<Vec<String>> {
        let mut ids = Vec::new();
        for kv in self.tree.iter() {
            let (key, _) = kv?;
            ids.push(String::from_utf8_lossy(&key).to_string());
        }
        Ok(ids)
    }

    pub fn flush(&self) -> CoreResult<()> {
        self.tree.flush()?;
        Ok(())
    }

    /// Classify `source_id` against its recorded state (spec §4.7):
    /// - no prior entry -> `New`
    /// - size AND modified_at unchanged -> `Unchanged` (hash not recomputed,
    ///   this is the fast path that avoids re-reading file contents)
    /// - otherwise -> `Modified`
    ///
    /// `Deleted` is never returned here — it is detected by the caller
    /// diffing [`known_sources`](Self::known_sources) against a fresh walk,
    /// since a missing source has no observed size/mtime to compare.
    pub fn classify(
        &self,
        source_id: &str,
        observed_size: u64,
        observed_modified_at: chrono::DateTime<chrono::Utc>,
    ) -> CoreResult<ChangeClass> {
        match self.lookup(source_id)? {
            None => Ok(ChangeClass::New),
            Some(state) => {
                if state.size_bytes == observed_size && state.modified_at == observed_modified_at {
                    Ok(ChangeClass::Unchanged)
                } else {
                    Ok(ChangeClass::Modified)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn state(size: u64, ts: chrono::DateTime<chrono::Utc>) -> FileState {
        FileState {
            size_bytes: size,
            modified_at: ts,
            content_hash: [0u8; 32],
            chunk_ids: vec!["c1".into()],
            indexed_at: ts,
        }
    }

    #[test]
    fn classify_unseen_source_as_new() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open_standalone(dir.path()).unwrap();
        let now = chrono::Utc::now();
        assert_eq!(ledger.classify("s1", 10, now).unwrap(), ChangeClass::New);
    }

    #[test]
    fn classify_matching_size_and_mtime_as_unchanged() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open_standalone(dir.path()).unwrap();
        let now = chrono::Utc::now();
        ledger.put("s1", &state(10, now)).unwrap();
        assert_eq!(ledger.classify("s1", 10, now).unwrap(), ChangeClass::Unchanged);
    }

    #[test]
    fn classify_changed_size_as_modified() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open_standalone(dir.path()).unwrap();
        let now = chrono::Utc::now();
        ledger.put("s1", &state(10, now)).unwrap();
        assert_eq!(ledger.classify("s1", 99, now).unwrap(), ChangeClass::Modified);
    }

    #[test]
    fn forget_then_known_sources_excludes_it() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open_standalone(dir.path()).unwrap();
        let now = chrono::Utc::now();
        ledger.put("s1", &state(10, now)).unwrap();
        ledger.forget("s1").unwrap();
        assert!(ledger.known_sources().unwrap().is_empty());
    }
}
