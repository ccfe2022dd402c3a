//! Delegated-signer keypair storage
//!
//! The generated delegated keypair persists across runs in a fixed file
//! so the same signer can be re-registered or funded later. Cleared only
//! on explicit user request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Stored delegated keypair, both halves base58-encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKeypair {
    pub public_key: String,
    pub secret_key: String,
}

impl StoredKeypair {
    /// Decode back into a usable keypair
    pub fn to_keypair(&self) -> Result<Keypair> {
        let bytes = bs58::decode(&self.secret_key)
            .into_vec()
            .map_err(|e| Error::InvalidKeypair(format!("stored secret key: {}", e)))?;
        Keypair::from_bytes(&bytes)
            .map_err(|e| Error::InvalidKeypair(format!("stored secret key: {}", e)))
    }
}

/// File-backed store for the delegated-signer keypair
pub struct KeypairStore {
    path: PathBuf,
}

impl KeypairStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the stored keypair, if one exists
    pub fn load(&self) -> Result<Option<StoredKeypair>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = std::fs::read_to_string(&self.path)?;
        let stored: StoredKeypair = serde_json::from_str(&data)
            .map_err(|e| Error::Deserialization(format!("{}: {}", self.path.display(), e)))?;
        debug!("Loaded delegated keypair {}", stored.public_key);
        Ok(Some(stored))
    }

    /// Generate a fresh keypair and persist it, replacing any previous one
    pub fn generate(&self) -> Result<StoredKeypair> {
        let keypair = Keypair::new();
        let stored = StoredKeypair {
            public_key: keypair.pubkey().to_string(),
            secret_key: bs58::encode(keypair.to_bytes()).into_string(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;

        // Secret material: owner-only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!("Generated delegated keypair {}", stored.public_key);
        Ok(stored)
    }

    /// Remove the stored keypair. No-op when none exists.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared delegated keypair");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeypairStore::new(dir.path().join("delegated.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_generate_load_clear_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeypairStore::new(dir.path().join("delegated.json"));

        let generated = store.generate().unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.public_key, generated.public_key);

        let keypair = loaded.to_keypair().unwrap();
        assert_eq!(keypair.pubkey().to_string(), generated.public_key);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_generate_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeypairStore::new(dir.path().join("delegated.json"));

        let first = store.generate().unwrap();
        let second = store.generate().unwrap();
        assert_ne!(first.public_key, second.public_key);
        assert_eq!(store.load().unwrap().unwrap().public_key, second.public_key);
    }

    #[cfg(unix)]
    #[test]
    fn test_stored_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delegated.json");
        let store = KeypairStore::new(&path);
        store.generate().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
