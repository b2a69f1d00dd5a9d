//! Directory lifecycle registry (spec §4.8) — tracks every root directory a
//! client has registered for indexing, along with its current status.
//!
//! Grounded on the same `sled`-tree pattern as [`crate::ledger`]; `path` is
//! the registry key since a client registers a directory at most once.

use crate::error::{CoreError, CoreResult};
use crate::types::{DirectoryEntry, DirectoryStatus};
use std::path::{Path, PathBuf};

pub struct Registry {
    tree: sled::Tree,
}

impl Registry {
    pub fn open(db: &sled::Db) -> CoreResult<Self> {
        Ok(Self { tree: db.open_tree("registry")? })
    }

    pub fn open_standalone(dir: &Path) -> CoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let db = sled::open(dir.join("registry.sled"))?;
        let tree = db.open_tree("registry")?;
        Ok(Self { tree })
    }

    /// Register `path` for indexing. The path must be an existing, readable
    /// directory (spec §4.8 "validation"); re-registering an already-known
    /// path is a conflict, not silently ignored, so a client can't
    /// accidentally reset an in-progress directory's status.
    pub fn add(&self, path: &str, name: String) -> CoreResult<DirectoryEntry> {
        let canonical = normalize_path(path)?;
        if self.tree.contains_key(canonical.as_bytes())? {
            return Err(CoreError::Conflict(format!("directory already registered: {canonical}")));
        }
        let entry = DirectoryEntry::new(canonical.clone(), name);
        self.put(&entry)?;
        Ok(entry)
    }

    pub fn remove(&self, path: &str) -> CoreResult<Option<DirectoryEntry>> {
        let canonical = normalize_path_lenient(path);
        match self.tree.remove(canonical.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, path: &str) -> CoreResult<Option<DirectoryEntry>> {
        let canonical = normalize_path_lenient(path);
        match self.tree.get(canonical.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> CoreResult<Vec<DirectoryEntry>> {
        let mut out = Vec::new();
        for kv in self.tree.iter() {
            let (_, value) = kv?;
            out.push(serde_json::from_slice(&value)?);
        }
        out.sort_by(|a: &DirectoryEntry, b: &DirectoryEntry| a.path.cmp(&b.path));
        Ok(out)
    }

    pub fn put(&self, entry: &DirectoryEntry) -> CoreResult<()> {
        let bytes = serde_json::to_vec(entry)?;
        self.tree.insert(entry.path.as_bytes(), bytes)?;
        Ok(())
    }

    /// Mutate a single directory entry in place, returning it. Used by the
    /// scheduler to push status/progress updates without the caller having
    /// to re-serialize the whole struct.
    pub fn update<F>(&self, path: &str, f: F) -> CoreResult<DirectoryEntry>
    where
        F: FnOnce(&mut DirectoryEntry),
    {
        let canonical = normalize_path_lenient(path);
        let mut entry = self
            .get(&canonical)?
            .ok_or_else(|| CoreError::NotFound(format!("directory not registered: {canonical}")))?;
        f(&mut entry);
        self.put(&entry)?;
        Ok(entry)
    }

    pub fn set_status(&self, path: &str, status: DirectoryStatus) -> CoreResult<DirectoryEntry> {
        self.update(path, |e| e.status = status)
    }
}

/// Canonicalize `path`, validating it exists and is a directory — used at
/// registration time so bad input fails fast (spec §4.8).
fn normalize_path(path: &str) -> CoreResult<String> {
    let p = PathBuf::from(path);
    let canonical = p
        .canonicalize()
        .map_err(|e| CoreError::InvalidInput(format!("cannot access {path}: {e}")))?;
    if !canonical.is_dir() {
        return Err(CoreError::InvalidInput(format!("not a directory: {path}")));
    }
    Ok(canonical.display().to_string())
}

/// Best-effort canonicalization for lookups on paths that may no longer
/// exist (e.g. removing a directory that was already deleted on disk).
fn normalize_path_lenient(path: &str) -> String {
    PathBuf::from(path)
        .canonicalize()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_then_list_round_trips() {
        let store_dir = tempdir().unwrap();
        let target_dir = tempdir().unwrap();
        let registry = Registry::open_standalone(store_dir.path()).unwrap();

        let entry = registry
            .add(target_dir.path().to_str().unwrap(), "docs".to_string())
            .unwrap();
        assert_eq!(entry.status, DirectoryStatus::NotIndexed);

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn add_same_path_twice_conflicts() {
        let store_dir = tempdir().unwrap();
        let target_dir = tempdir().unwrap();
        let registry = Registry::open_standalone(store_dir.path()).unwrap();

        registry.add(target_dir.path().to_str().unwrap(), "docs".to_string()).unwrap();
        let err = registry.add(target_dir.path().to_str().unwrap(), "docs".to_string());
        assert!(matches!(err, Err(CoreError::Conflict(_))));
    }

    #[test]
    fn add_nonexistent_path_is_invalid_input() {
        let store_dir = tempdir().unwrap();
        let registry = Registry::open_standalone(store_dir.path()).unwrap();
        let err = registry.add("/does/not/exist/at/all", "x".to_string());
        assert!(matches!(err, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn set_status_updates_entry() {
        let store_dir = tempdir().unwrap();
        let target_dir = tempdir().unwrap();
        let registry = Registry::open_standalone(store_dir.path()).unwrap();
        let entry = registry.add(target_dir.path().to_str().unwrap(), "docs".to_string()).unwrap();

        let updated = registry.set_status(&entry.path, DirectoryStatus::Indexing).unwrap();
        assert_eq!(updated.status, DirectoryStatus::Indexing);
    }
}
