//! Signing-wallet adapter and delegated-signer management
//!
//! The user's own signing wallet acts as the admin signer for the managed
//! smart wallet. The hosted platform never sees the private key; it hands
//! back approval challenges that are signed locally through the
//! [`WalletSigner`] seam.

pub mod adapter;
pub mod delegated;
pub mod storage;

pub use adapter::{ConnectionState, KeypairWallet, Session};
pub use delegated::{RegistrationState, SignerManager};
pub use storage::{KeypairStore, StoredKeypair};

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::Result;

/// Abstract signer the hosted platform's approval flow calls into.
///
/// Implemented by [`KeypairWallet`]; sign failures propagate verbatim to
/// the caller, one attempt per user action.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Public address of this signer
    fn address(&self) -> Result<Pubkey>;

    /// Sign an arbitrary message, returning the raw signature
    async fn sign_message(&self, message: &[u8]) -> Result<Signature>;

    /// Sign a transaction in place, returning this signer's signature
    async fn sign_transaction(&self, transaction: &mut Transaction) -> Result<Signature>;
}
