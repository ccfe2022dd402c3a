//! Balance poller
//!
//! Polls the hosted platform on a fixed interval while a wallet is
//! resolved and republishes the snapshot only when a tracked token's
//! total actually changed, so downstream views are not refreshed for
//! nothing. No backoff on repeated failures; the provider already
//! degrades to a stale snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tracing::{debug, info};

use crate::provider::{ManagedWallet, WalletProvider};

use super::BalanceSnapshot;

/// Periodic balance poller for the resolved smart wallet
pub struct BalanceFeed {
    provider: Arc<WalletProvider>,
    poll_interval: Duration,
    /// Wallet currently polled; cleared on logout
    wallet: Arc<RwLock<Option<ManagedWallet>>>,
    /// Last published snapshot
    published: Arc<RwLock<BalanceSnapshot>>,
    /// Shutdown signal
    shutdown: broadcast::Sender<()>,
}

impl BalanceFeed {
    pub fn new(provider: Arc<WalletProvider>, poll_interval: Duration) -> Self {
        let (shutdown, _) = broadcast::channel(1);

        Self {
            provider,
            poll_interval,
            wallet: Arc::new(RwLock::new(None)),
            published: Arc::new(RwLock::new(BalanceSnapshot::empty())),
            shutdown,
        }
    }

    /// Set the wallet to poll
    pub async fn set_wallet(&self, wallet: ManagedWallet) {
        let mut guard = self.wallet.write().await;
        *guard = Some(wallet);
    }

    /// Clear the wallet; the polling loop stops on its next tick
    pub async fn clear_wallet(&self) {
        let mut guard = self.wallet.write().await;
        *guard = None;
    }

    /// Last published snapshot
    pub async fn published(&self) -> BalanceSnapshot {
        self.published.read().await.clone()
    }

    /// Start the polling loop. Each changed snapshot is sent on
    /// `update_tx`; in-flight fetches are not aborted on stop.
    pub fn start(&self, update_tx: mpsc::Sender<BalanceSnapshot>) {
        info!(
            "Starting balance feed with {}s poll interval",
            self.poll_interval.as_secs()
        );

        let provider = self.provider.clone();
        let wallet = self.wallet.clone();
        let published = self.published.clone();
        let poll_interval = self.poll_interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = interval(poll_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let current = {
                            let guard = wallet.read().await;
                            guard.clone()
                        };

                        let Some(current) = current else {
                            info!("Balance feed stopping: no wallet");
                            break;
                        };

                        let snapshot = provider.get_balances(&current).await;

                        let changed = {
                            let previous = published.read().await;
                            snapshot.differs_from(&previous)
                        };

                        if !changed {
                            debug!("Balances unchanged, skipping publish");
                            continue;
                        }

                        {
                            let mut previous = published.write().await;
                            *previous = snapshot.clone();
                        }

                        if update_tx.send(snapshot).await.is_err() {
                            debug!("Balance update channel closed");
                            return;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Balance feed shutting down");
                        break;
                    }
                }
            }
        });
    }

    /// Stop the polling loop
    pub fn stop(&self) {
        let _ = self.shutdown.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    fn unroutable_provider() -> Arc<WalletProvider> {
        let config = ProviderConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "sk_test_key".to_string(),
            timeout_ms: 50,
        };
        Arc::new(WalletProvider::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_feed_stops_when_wallet_is_cleared() {
        let feed = BalanceFeed::new(unroutable_provider(), Duration::from_millis(10));
        let (tx, mut rx) = mpsc::channel(4);

        // No wallet set: the loop exits on the first tick and the
        // sender side is dropped with it
        feed.start(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_is_not_republished() {
        let feed = BalanceFeed::new(unroutable_provider(), Duration::from_millis(10));
        feed.set_wallet(ManagedWallet {
            address: "FsmwalletAddr111111111111111111111111111111".to_string(),
            admin_signer: "admin".to_string(),
        })
        .await;

        let (tx, mut rx) = mpsc::channel(4);
        feed.start(tx);

        // Every poll fails and degrades to the same (empty, stale)
        // totals, so nothing is ever published
        tokio::time::sleep(Duration::from_millis(120)).await;
        feed.stop();

        assert!(rx.try_recv().is_err());
        assert!(feed.published().await.tokens.is_empty());
    }
}
