//! API-key store, permission checks, and JWT exchange (spec §4.11).
//!
//! Grounded on the `marlon-costa-dc-mcp-context-browser` manifest's auth
//! stack for this same domain (see DESIGN.md): `sha2` for secret hashing
//! (high-entropy random secrets, not user passwords, so a password KDF buys
//! nothing here), `rand` for secret generation, `jsonwebtoken` for the
//! optional JWT exchange.

pub mod jwt;

use crate::error::{CoreError, CoreResult};
use crate::types::{ApiKeyRecord, Permission};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Durable store of API keys, keyed by key id. One `sled` tree, consistent
/// with the rest of the engine's "single data root, one tree per concern"
/// layout (spec §6).
pub struct AuthStore {
    tree: sled::Tree,
}

/// The plaintext secret, returned exactly once at creation time (spec §3).
pub struct CreatedKey {
    pub record: ApiKeyRecord,
    pub plaintext: String,
}

impl AuthStore {
    pub fn open(db: &sled::Db) -> CoreResult<Self> {
        Ok(Self { tree: db.open_tree("auth_keys")? })
    }

    pub fn open_standalone(dir: &Path) -> CoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let db = sled::open(dir.join("auth.sled"))?;
        let tree = db.open_tree("auth_keys")?;
        Ok(Self { tree })
    }

    /// Create a new key. Returns the plaintext secret once; only its hash is
    /// persisted (spec §3 "ApiKey").
    pub fn create_key(
        &self,
        name: String,
        description: Option<String>,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
        permissions: Vec<Permission>,
    ) -> CoreResult<CreatedKey> {
        if self.find_by_name(&name)?.is_some() {
            return Err(CoreError::Conflict(format!("key name already in use: {name}")));
        }

        let mut secret_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret_bytes);
        let plaintext = format!("ds_{}", base62_encode(&secret_bytes));

        let record = ApiKeyRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            created_at: chrono::Utc::now(),
            expires_at,
            permissions,
            active: true,
            hashed_secret: hash_secret(&plaintext),
        };

        let bytes = serde_json::to_vec(&record)?;
        self.tree.insert(record.id.as_bytes(), bytes)?;
        self.tree.flush()?;
        Ok(CreatedKey { record, plaintext })
    }

    /// Validate a presented plaintext secret: must exist, be active, and not
    /// be expired (spec §4.11 step 2).
    pub fn validate(&self, plaintext: &str) -> CoreResult<ApiKeyRecord> {
        let hashed = hash_secret(plaintext);
        let record = self
            .find_by_hash(&hashed)?
            .ok_or(CoreError::Unauthenticated)?;
        if !record.active {
            return Err(CoreError::Unauthenticated);
        }
        if record.is_expired(chrono::Utc::now()) {
            return Err(CoreError::Unauthenticated);
        }
        Ok(record)
    }

    pub fn get(&self, key_id: &str) -> CoreResult<Option<ApiKeyRecord>> {
        match self.tree.get(key_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> CoreResult<Vec<ApiKeyRecord>> {
        let mut out = Vec::new();
        for kv in self.tree.iter() {
            let (_, value) = kv?;
            out.push(serde_json::from_slice(&value)?);
        }
        out.sort_by(|a: &ApiKeyRecord, b: &ApiKeyRecord| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    /// Soft-revoke: sets `active = false`, never deletes the record (spec §3).
    pub fn revoke(&self, key_id: &str) -> CoreResult<ApiKeyRecord> {
        let mut record = self
            .get(key_id)?
            .ok_or_else(|| CoreError::NotFound(format!("api key not found: {key_id}")))?;
        record.active = false;
        let bytes = serde_json::to_vec(&record)?;
        self.tree.insert(key_id.as_bytes(), bytes)?;
        Ok(record)
    }

    fn find_by_hash(&self, hashed: &str) -> CoreResult<Option<ApiKeyRecord>> {
        for kv in self.tree.iter() {
            let (_, value) = kv?;
            let record: ApiKeyRecord = serde_json::from_slice(&value)?;
            if record.hashed_secret == hashed {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn find_by_name(&self, name: &str) -> CoreResult<Option<ApiKeyRecord>> {
        for kv in self.tree.iter() {
            let (_, value) = kv?;
            let record: ApiKeyRecord = serde_json::from_slice(&value)?;
            if record.name == name {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

fn hash_secret(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    crate::types::hex_encode(&hasher.finalize())
}

const BASE62_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode raw bytes as base62 — used only for the returned plaintext secret,
/// so it reads cleanly in a header without URL-escaping. `bytes` (32 bytes)
/// is wider than any native integer, so this folds it through a big-endian
/// byte-wise base conversion rather than assuming it fits a u128.
fn base62_encode(bytes: &[u8]) -> String {
    let mut digits = bytes.to_vec();
    let mut out = Vec::new();
    while !digits.iter().all(|&b| b == 0) {
        let mut remainder = 0u32;
        for d in digits.iter_mut() {
            let acc = (remainder << 8) | *d as u32;
            *d = (acc / 62) as u8;
            remainder = acc % 62;
        }
        out.push(BASE62_ALPHABET[remainder as usize]);
    }
    out.reverse();
    if out.is_empty() {
        "0".to_string()
    } else {
        String::from_utf8(out).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, AuthStore) {
        let dir = tempdir().unwrap();
        let store = AuthStore::open_standalone(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn create_then_validate_round_trips() {
        let (_dir, store) = store();
        let created = store
            .create_key("ci".to_string(), None, None, vec![Permission::Search])
            .unwrap();

        let validated = store.validate(&created.plaintext).unwrap();
        assert_eq!(validated.id, created.record.id);
        assert!(validated.has_permission(Permission::Search));
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let (_dir, store) = store();
        store.create_key("ci".to_string(), None, None, vec![Permission::Read]).unwrap();
        let err = store.validate("ds_not-the-real-secret").unwrap_err();
        assert!(matches!(err, CoreError::Unauthenticated));
    }

    #[test]
    fn revoked_key_fails_validation() {
        let (_dir, store) = store();
        let created = store.create_key("ci".to_string(), None, None, vec![Permission::Read]).unwrap();
        store.revoke(&created.record.id).unwrap();
        let err = store.validate(&created.plaintext).unwrap_err();
        assert!(matches!(err, CoreError::Unauthenticated));
    }

    #[test]
    fn expired_key_fails_validation() {
        let (_dir, store) = store();
        let past = chrono::Utc::now() - chrono::Duration::hours(1);
        let created = store
            .create_key("ci".to_string(), None, Some(past), vec![Permission::Read])
            .unwrap();
        let err = store.validate(&created.plaintext).unwrap_err();
        assert!(matches!(err, CoreError::Unauthenticated));
    }

    #[test]
    fn duplicate_name_is_conflict() {
        let (_dir, store) = store();
        store.create_key("dup".to_string(), None, None, vec![Permission::Read]).unwrap();
        let err = store.create_key("dup".to_string(), None, None, vec![Permission::Read]).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }
}
