//! In-memory transfer ledger
//!
//! Records are created optimistically on submit and driven through an
//! explicit state machine keyed by record id. Pending records that never
//! resolve expire after a fixed timeout without any further network
//! interaction. Everything here is per-process memory, gone on restart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::balance::Token;
use crate::error::{Error, Result};

/// Status of a transfer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Success,
    Failed,
    Expired,
}

impl TransferStatus {
    /// Terminal statuses never transition again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }

    /// Allowed transitions: pending -> success | failed | expired
    pub fn can_transition(&self, next: TransferStatus) -> bool {
        matches!(self, TransferStatus::Pending) && next != TransferStatus::Pending
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStatus::Pending => write!(f, "pending"),
            TransferStatus::Success => write!(f, "success"),
            TransferStatus::Failed => write!(f, "failed"),
            TransferStatus::Expired => write!(f, "expired"),
        }
    }
}

/// One optimistic transfer record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: String,
    pub token: Token,
    pub recipient: String,
    pub amount: f64,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub explorer_url: Option<String>,
}

/// Ledger of transfer records for the current session (newest first)
pub struct TransferLedger {
    records: RwLock<Vec<TransferRecord>>,
    pending_timeout: Duration,
}

impl TransferLedger {
    pub fn new(pending_timeout_secs: u64) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            pending_timeout: Duration::seconds(pending_timeout_secs as i64),
        }
    }

    /// Create a pending record before the submit call goes out
    pub async fn record_pending(
        &self,
        token: Token,
        recipient: &str,
        amount: f64,
    ) -> TransferRecord {
        let record = TransferRecord {
            id: Uuid::new_v4().to_string(),
            token,
            recipient: recipient.to_string(),
            amount,
            status: TransferStatus::Pending,
            created_at: Utc::now(),
            explorer_url: None,
        };

        debug!("Recorded pending transfer {}", record.id);
        let mut records = self.records.write().await;
        records.insert(0, record.clone());
        record
    }

    /// Resolve a pending record from the submit response
    pub async fn resolve(
        &self,
        id: &str,
        status: TransferStatus,
        explorer_url: Option<String>,
    ) -> Result<TransferRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;

        if !record.status.can_transition(status) {
            return Err(Error::InvalidTransition {
                from: record.status.to_string(),
                to: status.to_string(),
            });
        }

        record.status = status;
        if explorer_url.is_some() {
            record.explorer_url = explorer_url;
        }
        info!("Transfer {} -> {}", record.id, record.status);
        Ok(record.clone())
    }

    /// Expire pending records older than the timeout. Purely local;
    /// returns how many records expired.
    pub async fn expire_stale(&self) -> usize {
        self.expire_stale_at(Utc::now()).await
    }

    async fn expire_stale_at(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let mut expired = 0;

        for record in records.iter_mut() {
            if record.status == TransferStatus::Pending
                && now - record.created_at > self.pending_timeout
            {
                record.status = TransferStatus::Expired;
                expired += 1;
                info!("Transfer {} expired", record.id);
            }
        }

        expired
    }

    /// Most recent records, newest first
    pub async fn list(&self, limit: usize) -> Vec<TransferRecord> {
        let records = self.records.read().await;
        records.iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_resolve_success() {
        let ledger = TransferLedger::new(60);
        let record = ledger
            .record_pending(Token::Sol, "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin", 0.5)
            .await;
        assert_eq!(record.status, TransferStatus::Pending);

        let resolved = ledger
            .resolve(
                &record.id,
                TransferStatus::Success,
                Some("https://solscan.io/tx/abc?cluster=devnet".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(resolved.status, TransferStatus::Success);
        assert!(resolved.explorer_url.is_some());
    }

    #[tokio::test]
    async fn test_terminal_records_do_not_transition() {
        let ledger = TransferLedger::new(60);
        let record = ledger.record_pending(Token::Usdc, "recipient", 1.0).await;

        ledger
            .resolve(&record.id, TransferStatus::Failed, None)
            .await
            .unwrap();

        let err = ledger
            .resolve(&record.id, TransferStatus::Success, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_resolve_unknown_record() {
        let ledger = TransferLedger::new(60);
        let err = ledger
            .resolve("missing", TransferStatus::Success, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_pending_expires_after_timeout() {
        let ledger = TransferLedger::new(60);
        let record = ledger.record_pending(Token::Sol, "recipient", 0.1).await;

        // Just inside the timeout: nothing expires
        let now = record.created_at + Duration::seconds(59);
        assert_eq!(ledger.expire_stale_at(now).await, 0);

        // Just past it: the record expires
        let now = record.created_at + Duration::seconds(61);
        assert_eq!(ledger.expire_stale_at(now).await, 1);

        let listed = ledger.list(10).await;
        assert_eq!(listed[0].status, TransferStatus::Expired);

        // A second sweep finds nothing left to expire
        assert_eq!(ledger.expire_stale_at(now).await, 0);
    }

    #[tokio::test]
    async fn test_expiry_skips_resolved_records() {
        let ledger = TransferLedger::new(60);
        let record = ledger.record_pending(Token::Sol, "recipient", 0.1).await;
        ledger
            .resolve(&record.id, TransferStatus::Success, None)
            .await
            .unwrap();

        let now = record.created_at + Duration::seconds(3600);
        assert_eq!(ledger.expire_stale_at(now).await, 0);
        assert_eq!(ledger.list(1).await[0].status, TransferStatus::Success);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let ledger = TransferLedger::new(60);
        ledger.record_pending(Token::Sol, "first", 0.1).await;
        ledger.record_pending(Token::Usdc, "second", 0.2).await;

        let listed = ledger.list(10).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].recipient, "second");
    }
}
