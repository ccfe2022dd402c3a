//! Remote wallet client for the hosted wallet-management API
//!
//! All custody, signing policy, and balance computation live on the
//! platform side; this client only moves requests and approval
//! signatures back and forth. Provider failures are surfaced as
//! `Error::Provider` and are never retried here.

pub mod types;

pub use types::{
    DelegatedSigner, ManagedWallet, SignerType, SubmittedTransaction, TransactionPhase,
    TransactionResponse,
};

use std::collections::HashMap;

use base64::Engine;
use reqwest::Client;
use solana_sdk::transaction::Transaction;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::balance::{BalanceSnapshot, TokenBalance, TRACKED_TOKENS};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::signer::WalletSigner;

use types::{
    ApproveRequest, CreateTransactionRequest, CreateWalletRequest, ErrorBody,
    PendingApproval, RegisterSignerRequest, SubmittedApproval, KEYPAIR_LOCATOR_PREFIX,
};

/// Response shape of the signer-registration call: the signer resource
/// plus an optional on-chain transaction carrying approval challenges.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterSignerResponse {
    #[serde(flatten)]
    pub signer: DelegatedSigner,
    #[serde(default)]
    pub transaction: Option<TransactionResponse>,
}

/// Client for the hosted wallet platform
#[derive(Debug)]
pub struct WalletProvider {
    client: Client,
    base_url: String,
    api_key: String,
    /// Wallets already resolved this session, keyed by admin address.
    /// Makes get-or-create idempotent without a second round trip.
    resolved: RwLock<HashMap<String, ManagedWallet>>,
    /// Last successful snapshot, served with a stale flag when a fetch
    /// fails
    balance_cache: RwLock<BalanceSnapshot>,
}

impl WalletProvider {
    /// Create a provider client. Missing credentials are fatal at
    /// startup, not user-recoverable.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config(
                "hosted wallet API key is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            resolved: RwLock::new(HashMap::new()),
            balance_cache: RwLock::new(BalanceSnapshot::empty()),
        })
    }

    /// Resolve or create the smart wallet bound to `admin_signer_address`.
    ///
    /// Idempotent: the platform keeps one wallet per admin signer, and a
    /// wallet resolved earlier in this session is returned from cache
    /// without a network call.
    pub async fn get_or_create_wallet(
        &self,
        admin_signer_address: &str,
        signer: &dyn WalletSigner,
    ) -> Result<ManagedWallet> {
        {
            let resolved = self.resolved.read().await;
            if let Some(wallet) = resolved.get(admin_signer_address) {
                debug!("Wallet cache hit for admin {}", admin_signer_address);
                return Ok(wallet.clone());
            }
        }

        // The wallet must bind to the connected signing wallet
        let signer_address = signer.address()?.to_string();
        if signer_address != admin_signer_address {
            return Err(Error::Config(format!(
                "connected signer {} does not match admin signer {}",
                signer_address, admin_signer_address
            )));
        }

        let request = CreateWalletRequest::for_admin(admin_signer_address);
        let response = self
            .client
            .post(format!("{}/wallets", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let wallet: ManagedWallet = Self::check(response).await?.json().await?;
        info!(
            "Resolved smart wallet {} for admin {}",
            wallet.address, wallet.admin_signer
        );

        let mut resolved = self.resolved.write().await;
        resolved.insert(admin_signer_address.to_string(), wallet.clone());
        Ok(wallet)
    }

    /// Record an already-resolved wallet, e.g. when restoring a session
    pub async fn cache_wallet(&self, wallet: ManagedWallet) {
        let mut resolved = self.resolved.write().await;
        resolved.insert(wallet.admin_signer.clone(), wallet);
    }

    /// Fetch current balances for the tracked tokens.
    ///
    /// Best-effort: on any failure the previous snapshot is returned
    /// with the stale flag set, since a stale balance is acceptable but
    /// breaking the caller is not.
    pub async fn get_balances(&self, wallet: &ManagedWallet) -> BalanceSnapshot {
        match self.fetch_balances(wallet).await {
            Ok(snapshot) => {
                let mut cache = self.balance_cache.write().await;
                *cache = snapshot.clone();
                snapshot
            }
            Err(e) => {
                warn!("Balance fetch failed, serving stale snapshot: {}", e);
                let cache = self.balance_cache.read().await;
                let mut stale = cache.clone();
                stale.stale = true;
                stale
            }
        }
    }

    async fn fetch_balances(&self, wallet: &ManagedWallet) -> Result<BalanceSnapshot> {
        let tokens = TRACKED_TOKENS
            .iter()
            .map(|t| t.symbol())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(format!(
                "{}/wallets/{}/balances",
                self.base_url, wallet.address
            ))
            .header("X-API-KEY", &self.api_key)
            .query(&[("tokens", tokens.as_str())])
            .send()
            .await?;

        let entries: Vec<types::TokenBalanceEntry> = Self::check(response).await?.json().await?;

        let tokens = TRACKED_TOKENS
            .iter()
            .map(|token| {
                let entry = entries.iter().find(|e| e.token == *token);
                TokenBalance {
                    token: *token,
                    decimals: entry.map(|e| e.decimals).unwrap_or(token.decimals()),
                    total_raw: entry
                        .map(|e| e.balances.total.clone())
                        .unwrap_or_else(|| "0".to_string()),
                }
            })
            .collect();

        Ok(BalanceSnapshot {
            tokens,
            stale: false,
        })
    }

    /// Submit an unsigned transaction for execution by the smart wallet,
    /// answering the platform's approval challenge with the admin signer.
    pub async fn submit_transaction(
        &self,
        wallet: &ManagedWallet,
        signer: &dyn WalletSigner,
        transaction: &Transaction,
    ) -> Result<SubmittedTransaction> {
        let serialized = bincode::serialize(transaction)
            .map_err(|e| Error::Serialization(format!("transaction encode failed: {}", e)))?;
        let request = CreateTransactionRequest {
            transaction: base64::engine::general_purpose::STANDARD.encode(serialized),
        };

        let response = self
            .client
            .post(format!(
                "{}/wallets/{}/transactions",
                self.base_url, wallet.address
            ))
            .header("X-API-KEY", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let mut txn: TransactionResponse = Self::check(response).await?.json().await?;
        debug!("Created transaction {} ({})", txn.id, txn.status);

        if let Some(pending) = txn.approvals.as_ref().map(|a| a.pending.clone()) {
            if !pending.is_empty() {
                txn = self
                    .approve_transaction(wallet, &txn.id, signer, &pending)
                    .await?;
            }
        }

        Ok(SubmittedTransaction {
            phase: TransactionPhase::from_status(&txn.status),
            tx_id: txn.on_chain.and_then(|o| o.tx_id),
            id: txn.id,
        })
    }

    /// Answer pending approval challenges for a transaction
    async fn approve_transaction(
        &self,
        wallet: &ManagedWallet,
        transaction_id: &str,
        signer: &dyn WalletSigner,
        pending: &[PendingApproval],
    ) -> Result<TransactionResponse> {
        let mut approvals = Vec::with_capacity(pending.len());
        for challenge in pending {
            let message = bs58::decode(&challenge.message)
                .into_vec()
                .map_err(|e| Error::Deserialization(format!("approval message: {}", e)))?;
            let signature = signer.sign_message(&message).await?;
            approvals.push(SubmittedApproval {
                signer: challenge.signer.clone(),
                signature: signature.to_string(),
            });
        }

        let response = self
            .client
            .post(format!(
                "{}/wallets/{}/transactions/{}/approvals",
                self.base_url, wallet.address, transaction_id
            ))
            .header("X-API-KEY", &self.api_key)
            .json(&ApproveRequest { approvals })
            .send()
            .await?;

        let txn: TransactionResponse = Self::check(response).await?.json().await?;
        info!("Transaction {} now {}", txn.id, txn.status);
        Ok(txn)
    }

    /// List transactions the platform has recorded for this wallet
    pub async fn get_transactions(
        &self,
        wallet: &ManagedWallet,
    ) -> Result<Vec<TransactionResponse>> {
        let response = self
            .client
            .get(format!(
                "{}/wallets/{}/transactions",
                self.base_url, wallet.address
            ))
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    /// List delegated signers registered on this wallet
    pub async fn get_delegated_signers(
        &self,
        wallet: &ManagedWallet,
    ) -> Result<Vec<DelegatedSigner>> {
        let response = self
            .client
            .get(format!(
                "{}/wallets/{}/signers",
                self.base_url, wallet.address
            ))
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    /// Register a delegated signer, approving the registration with the
    /// admin signer when the platform asks for it
    pub async fn register_delegated_signer(
        &self,
        wallet: &ManagedWallet,
        signer: &dyn WalletSigner,
        address: &str,
    ) -> Result<DelegatedSigner> {
        let request = RegisterSignerRequest {
            signer: format!("{}{}", KEYPAIR_LOCATOR_PREFIX, address),
        };

        let response = self
            .client
            .post(format!(
                "{}/wallets/{}/signers",
                self.base_url, wallet.address
            ))
            .header("X-API-KEY", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let registered: RegisterSignerResponse = Self::check(response).await?.json().await?;

        if let Some(txn) = &registered.transaction {
            if let Some(pending) = txn.approvals.as_ref().map(|a| a.pending.clone()) {
                if !pending.is_empty() {
                    self.approve_transaction(wallet, &txn.id, signer, &pending)
                        .await?;
                }
            }
        }

        info!("Registered delegated signer {}", registered.signer.locator);
        Ok(registered.signer)
    }

    /// Health probe: can we reach the platform with our credentials
    pub async fn check_reachable(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/wallets", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        // Any HTTP response means the platform is up; auth problems
        // surface as Provider errors
        if response.status().is_server_error() {
            return Err(Error::Provider(format!(
                "platform unhealthy: {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Map non-2xx responses onto `Error::Provider` with the platform's
    /// message when it sends one
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| "no error detail".to_string());

        Err(Error::Provider(format!("{}: {}", status, message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::Token;
    use solana_sdk::signature::Keypair;
    use solana_sdk::signer::Signer;

    fn test_provider() -> WalletProvider {
        // Unroutable base URL: any network attempt fails fast
        let config = ProviderConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "sk_test_key".to_string(),
            timeout_ms: 100,
        };
        WalletProvider::new(&config).unwrap()
    }

    async fn connected_wallet(dir: &tempfile::TempDir) -> (crate::signer::KeypairWallet, String) {
        let keypair = Keypair::new();
        let path = dir.path().join("keypair.json");
        let bytes: Vec<u8> = keypair.to_bytes().to_vec();
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();

        let wallet = crate::signer::KeypairWallet::non_interactive(&path);
        wallet.connect().await.unwrap();
        (wallet, keypair.pubkey().to_string())
    }

    #[test]
    fn test_new_rejects_missing_api_key() {
        let config = ProviderConfig {
            api_key: "  ".to_string(),
            ..ProviderConfig::default()
        };
        let err = WalletProvider::new(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_get_or_create_returns_cached_wallet_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let (signer, admin) = connected_wallet(&dir).await;

        let provider = test_provider();
        provider
            .cache_wallet(ManagedWallet {
                address: "FsmwalletAddr111111111111111111111111111111".to_string(),
                admin_signer: admin.clone(),
            })
            .await;

        // The base URL is unroutable, so this only succeeds via cache
        let first = provider.get_or_create_wallet(&admin, &signer).await.unwrap();
        let second = provider.get_or_create_wallet(&admin, &signer).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.admin_signer, admin);
    }

    #[tokio::test]
    async fn test_get_or_create_rejects_mismatched_signer() {
        let dir = tempfile::tempdir().unwrap();
        let (signer, _admin) = connected_wallet(&dir).await;

        let provider = test_provider();
        let err = provider
            .get_or_create_wallet("SomeOtherAdminAddr11111111111111111111111111", &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_get_balances_serves_stale_snapshot_on_failure() {
        let provider = test_provider();

        // Seed the cache as if a poll had succeeded earlier
        {
            let mut cache = provider.balance_cache.write().await;
            *cache = BalanceSnapshot {
                tokens: vec![TokenBalance {
                    token: Token::Sol,
                    decimals: 9,
                    total_raw: "1000000000".to_string(),
                }],
                stale: false,
            };
        }

        let wallet = ManagedWallet {
            address: "FsmwalletAddr111111111111111111111111111111".to_string(),
            admin_signer: "admin".to_string(),
        };

        let snapshot = provider.get_balances(&wallet).await;
        assert!(snapshot.stale);
        assert_eq!(snapshot.total(Token::Sol), "1000000000");
    }
}
