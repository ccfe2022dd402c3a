//! Local signing-wallet adapter
//!
//! Wraps the keypair the user controls behind a connect/disconnect/sign
//! contract. Connecting asks the user to authorize the session; signing
//! delegates straight to the keypair. No retries, single attempt per
//! user action.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dialoguer::Confirm;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::WalletSigner;

/// Connection state of the signing wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Session for the active signing wallet. In-memory only, gone when the
/// process exits.
#[derive(Debug, Clone)]
pub struct Session {
    pub public_key: Option<Pubkey>,
    pub state: ConnectionState,
    pub error: Option<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            public_key: None,
            state: ConnectionState::Disconnected,
            error: None,
        }
    }
}

struct WalletInner {
    keypair: Option<Keypair>,
    session: Session,
}

/// Adapter over the local admin keypair file
pub struct KeypairWallet {
    keypair_path: PathBuf,
    inner: Arc<RwLock<WalletInner>>,
    /// Prompt the user before connecting and signing
    interactive: bool,
}

impl KeypairWallet {
    /// Create an adapter for the keypair at `path`. The keypair is not
    /// loaded until `connect` is called.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            keypair_path: path.as_ref().to_path_buf(),
            inner: Arc::new(RwLock::new(WalletInner {
                keypair: None,
                session: Session::new(),
            })),
            interactive: true,
        }
    }

    /// Create an adapter that skips approval prompts
    pub fn non_interactive<P: AsRef<Path>>(path: P) -> Self {
        let mut wallet = Self::new(path);
        wallet.interactive = false;
        wallet
    }

    /// Request authorization and load the keypair.
    ///
    /// Fails with `NotInstalled` when no keypair exists at the configured
    /// path, or `UserRejected` when the user declines the prompt.
    pub async fn connect(&self) -> Result<Pubkey> {
        {
            let inner = self.inner.read().await;
            if let (ConnectionState::Connected, Some(key)) =
                (inner.session.state, inner.session.public_key)
            {
                return Ok(key);
            }
        }

        {
            let mut inner = self.inner.write().await;
            inner.session.state = ConnectionState::Connecting;
            inner.session.error = None;
        }

        let result = self.try_connect().await;

        let mut inner = self.inner.write().await;
        match result {
            Ok((keypair, public_key)) => {
                inner.keypair = Some(keypair);
                inner.session.state = ConnectionState::Connected;
                inner.session.public_key = Some(public_key);
                info!("Signing wallet connected: {}", public_key);
                Ok(public_key)
            }
            Err(e) => {
                inner.session.state = ConnectionState::Disconnected;
                inner.session.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<(Keypair, Pubkey)> {
        if !self.keypair_path.exists() {
            return Err(Error::NotInstalled(format!(
                "no keypair at {}; create one with `solana-keygen new -o {}`",
                self.keypair_path.display(),
                self.keypair_path.display()
            )));
        }

        if self.interactive {
            self.approve("Authorize connecting this wallet?")?;
        }

        let keypair = load_keypair(&self.keypair_path)?;
        let public_key = keypair.pubkey();
        Ok((keypair, public_key))
    }

    /// Clear local connection state. Best-effort, never fails.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.write().await;
        inner.keypair = None;
        inner.session = Session::new();
        debug!("Signing wallet disconnected");
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> Session {
        self.inner.read().await.session.clone()
    }

    /// Connected public key, if any
    pub async fn public_key(&self) -> Option<Pubkey> {
        self.inner.read().await.session.public_key
    }

    fn approve(&self, prompt: &str) -> Result<()> {
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("approval prompt failed: {}", e)))?;

        if !confirmed {
            warn!("User declined: {}", prompt);
            return Err(Error::UserRejected);
        }
        Ok(())
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn address(&self) -> Result<Pubkey> {
        // Session state lives behind an async lock; use try_read since
        // address lookups never race connect in practice
        let inner = self
            .inner
            .try_read()
            .map_err(|_| Error::Internal("wallet state locked".to_string()))?;
        inner.session.public_key.ok_or(Error::NotConnected)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
        if self.interactive {
            self.approve("Approve signing this message?")?;
        }

        let inner = self.inner.read().await;
        let keypair = inner.keypair.as_ref().ok_or(Error::NotConnected)?;
        Ok(keypair.sign_message(message))
    }

    async fn sign_transaction(&self, transaction: &mut Transaction) -> Result<Signature> {
        if self.interactive {
            self.approve("Approve signing this transaction?")?;
        }

        let inner = self.inner.read().await;
        let keypair = inner.keypair.as_ref().ok_or(Error::NotConnected)?;

        let positions = transaction
            .get_signing_keypair_positions(&[keypair.pubkey()])
            .map_err(|e| Error::Internal(format!("signer position lookup failed: {}", e)))?;

        let position = positions
            .first()
            .copied()
            .flatten()
            .ok_or_else(|| Error::InvalidKeypair("signer is not required by this transaction".to_string()))?;

        let signature = keypair.sign_message(&transaction.message_data());
        transaction.signatures[position] = signature;
        Ok(signature)
    }
}

/// Load a keypair from the JSON byte-array format used by the standard
/// tooling
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let data = std::fs::read_to_string(path)?;
    let bytes: Vec<u8> = serde_json::from_str(&data)
        .map_err(|e| Error::InvalidKeypair(format!("{}: {}", path.display(), e)))?;
    Keypair::from_bytes(&bytes)
        .map_err(|e| Error::InvalidKeypair(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_keypair(dir: &tempfile::TempDir) -> (PathBuf, Pubkey) {
        let keypair = Keypair::new();
        let path = dir.path().join("keypair.json");
        let bytes: Vec<u8> = keypair.to_bytes().to_vec();
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();
        (path, keypair.pubkey())
    }

    #[tokio::test]
    async fn test_connect_missing_keypair_is_not_installed() {
        let wallet = KeypairWallet::non_interactive("/nonexistent/keypair.json");
        let err = wallet.connect().await.unwrap_err();
        assert!(matches!(err, Error::NotInstalled(_)));

        let session = wallet.session().await;
        assert_eq!(session.state, ConnectionState::Disconnected);
        assert!(session.error.is_some());
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let (path, expected) = write_keypair(&dir);

        let wallet = KeypairWallet::non_interactive(&path);
        let key = wallet.connect().await.unwrap();
        assert_eq!(key, expected);
        assert_eq!(wallet.session().await.state, ConnectionState::Connected);

        // Second connect returns the same key without reloading
        assert_eq!(wallet.connect().await.unwrap(), expected);

        wallet.disconnect().await;
        let session = wallet.session().await;
        assert_eq!(session.state, ConnectionState::Disconnected);
        assert!(session.public_key.is_none());
    }

    #[tokio::test]
    async fn test_sign_message_requires_connection() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_keypair(&dir);

        let wallet = KeypairWallet::non_interactive(&path);
        let err = wallet.sign_message(b"hello").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));

        wallet.connect().await.unwrap();
        let signature = wallet.sign_message(b"hello").await.unwrap();
        let key = wallet.public_key().await.unwrap();
        assert!(signature.verify(key.as_ref(), b"hello"));
    }
}
