//! Wire types for the hosted wallet-management API

use serde::{Deserialize, Serialize};

use crate::balance::Token;

/// Locator prefix the platform uses for plain keypair signers
pub const KEYPAIR_LOCATOR_PREFIX: &str = "solana-keypair:";

/// Strip the keypair locator prefix, leaving the bare address
pub fn normalize_locator(locator: &str) -> &str {
    locator
        .strip_prefix(KEYPAIR_LOCATOR_PREFIX)
        .unwrap_or(locator)
}

/// Managed smart wallet bound to an admin signer. Immutable once
/// created; the platform enforces one wallet per admin signer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedWallet {
    pub address: String,
    pub admin_signer: String,
}

/// Request body for the idempotent get-or-create wallet call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    #[serde(rename = "type")]
    pub wallet_type: String,
    pub config: CreateWalletConfig,
    pub linked_user: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletConfig {
    pub admin_signer: AdminSignerPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSignerPayload {
    #[serde(rename = "type")]
    pub signer_type: String,
    pub address: String,
}

impl CreateWalletRequest {
    pub fn for_admin(admin_signer_address: &str) -> Self {
        Self {
            wallet_type: "solana-smart-wallet".to_string(),
            config: CreateWalletConfig {
                admin_signer: AdminSignerPayload {
                    signer_type: "solana-keypair".to_string(),
                    address: admin_signer_address.to_string(),
                },
            },
            linked_user: format!("userId:{}", admin_signer_address),
        }
    }
}

/// One entry of the balances response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBalanceEntry {
    pub token: Token,
    pub decimals: u8,
    pub balances: BalanceTotals,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceTotals {
    pub total: String,
}

/// Delegated signer as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedSigner {
    #[serde(rename = "type")]
    pub signer_type: SignerType,
    pub locator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl DelegatedSigner {
    /// Bare address of this signer, whichever field carries it
    pub fn bare_address(&self) -> &str {
        match &self.address {
            Some(address) => normalize_locator(address),
            None => normalize_locator(&self.locator),
        }
    }

    /// Whether this signer matches a candidate address (after
    /// prefix-normalization on both sides)
    pub fn matches(&self, candidate: &str) -> bool {
        self.bare_address() == normalize_locator(candidate)
    }
}

/// Kind of delegated signer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerType {
    #[serde(rename = "solana-keypair")]
    Keypair,
    #[serde(rename = "solana-fireblocks-custodial")]
    Custodial,
}

impl std::fmt::Display for SignerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerType::Keypair => write!(f, "keypair"),
            SignerType::Custodial => write!(f, "custodial"),
        }
    }
}

/// Request body for registering a delegated signer
#[derive(Debug, Clone, Serialize)]
pub struct RegisterSignerRequest {
    pub signer: String,
}

/// Request body for submitting a transaction
#[derive(Debug, Clone, Serialize)]
pub struct CreateTransactionRequest {
    /// Base64-encoded unsigned transaction
    pub transaction: String,
}

/// Transaction resource returned by the platform
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub on_chain: Option<OnChainDetails>,
    #[serde(default)]
    pub approvals: Option<Approvals>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainDetails {
    #[serde(default)]
    pub tx_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Approvals {
    #[serde(default)]
    pub pending: Vec<PendingApproval>,
}

/// Approval challenge: a base58 message the named signer must sign
#[derive(Debug, Clone, Deserialize)]
pub struct PendingApproval {
    pub signer: String,
    pub message: String,
}

/// Request body answering an approval challenge
#[derive(Debug, Clone, Serialize)]
pub struct ApproveRequest {
    pub approvals: Vec<SubmittedApproval>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedApproval {
    pub signer: String,
    /// Base58 signature over the challenge message
    pub signature: String,
}

/// Error body returned by the platform on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

/// Coarse phase of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Pending,
    Success,
    Failed,
}

impl TransactionPhase {
    /// Map the platform's status string onto a phase. Anything
    /// unrecognized counts as still pending.
    pub fn from_status(status: &str) -> Self {
        match status {
            "success" | "confirmed" => TransactionPhase::Success,
            "failed" => TransactionPhase::Failed,
            _ => TransactionPhase::Pending,
        }
    }
}

/// Result of a submitted transaction after the approval round-trip
#[derive(Debug, Clone)]
pub struct SubmittedTransaction {
    pub id: String,
    pub phase: TransactionPhase,
    pub tx_id: Option<String>,
}
