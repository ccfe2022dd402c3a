//! CLI command implementations
//!
//! The presentation layer: renders wallet state, captures input, and
//! turns component errors into inline messages or transient notices.
//! Validation failures never leave the form boundary; provider failures
//! are printed and dismissed without touching local state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use solana_client::rpc_client::RpcClient;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::balance::{format_balance, BalanceFeed, BalanceSnapshot, Token, TRACKED_TOKENS};
use crate::config::Config;
use crate::error::Error;
use crate::provider::{ManagedWallet, TransactionPhase, WalletProvider};
use crate::signer::{KeypairStore, KeypairWallet, SignerManager};
use crate::transfer::{
    build_sol_transfer, build_token_transfer, check_balance, is_valid_address, TransferLedger,
    TransferStatus, USDC_DEVNET_MINT,
};

/// Shorten an address for display: first and last ten characters
fn shorten_address(address: &str) -> String {
    if address.len() <= 20 {
        return address.to_string();
    }
    format!("{}...{}", &address[..10], &address[address.len() - 10..])
}

fn explorer_url(config: &Config, tx_id: &str) -> String {
    format!(
        "{}/{}?cluster={}",
        config.transfer.explorer_base_url, tx_id, config.transfer.explorer_cluster
    )
}

/// Print a provider failure as a dismissable notice
fn notice(e: &Error) {
    warn!("{}", e);
    println!("Notice: wallet unavailable ({})", e);
}

/// Connect the signing wallet and resolve the managed smart wallet
async fn resolve_wallet(
    config: &Config,
) -> Result<Option<(KeypairWallet, Arc<WalletProvider>, ManagedWallet)>> {
    let signing_wallet = KeypairWallet::new(&config.signer.keypair_path);

    let admin = match signing_wallet.connect().await {
        Ok(key) => key.to_string(),
        Err(Error::NotInstalled(detail)) => {
            println!("No signing wallet found: {}", detail);
            return Ok(None);
        }
        Err(Error::UserRejected) => {
            println!("Connection cancelled.");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let provider = Arc::new(WalletProvider::new(&config.provider)?);

    let wallet = match provider.get_or_create_wallet(&admin, &signing_wallet).await {
        Ok(wallet) => wallet,
        Err(e) if e.is_provider() => {
            notice(&e);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Some((signing_wallet, provider, wallet)))
}

/// Connect and print the resolved smart wallet
pub async fn connect(config: &Config) -> Result<()> {
    let Some((signing_wallet, _provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    println!("\nSmart wallet: {}", wallet.address);
    println!("Admin signer: {}", wallet.admin_signer);

    let session = signing_wallet.session().await;
    println!("Session: {}", session.state);
    Ok(())
}

/// Show local session and delegated-keypair state. No network.
pub async fn status(config: &Config) -> Result<()> {
    println!("\n=== WALLET STATUS ===\n");

    let keypair_path = std::path::Path::new(&config.signer.keypair_path);
    if keypair_path.exists() {
        println!("Signing wallet: configured ({})", config.signer.keypair_path);
    } else {
        println!(
            "Signing wallet: not installed (expected at {})",
            config.signer.keypair_path
        );
    }

    let store = KeypairStore::new(&config.signer.delegated_keypair_path);
    match store.load() {
        Ok(Some(stored)) => println!("Delegated keypair: {}", stored.public_key),
        Ok(None) => println!("Delegated keypair: none generated"),
        Err(e) => println!("Delegated keypair: unreadable ({})", e),
    }

    Ok(())
}

/// One-shot balance fetch
pub async fn balance(config: &Config) -> Result<()> {
    let Some((_signing_wallet, provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    let snapshot = provider.get_balances(&wallet).await;
    print_balances(&snapshot);
    Ok(())
}

fn print_balances(snapshot: &BalanceSnapshot) {
    println!("\n=== WALLET BALANCE ===\n");
    for token in TRACKED_TOKENS {
        println!(
            "{:>5}  {}",
            token.symbol().to_uppercase(),
            format_balance(snapshot.total(token), token.decimals())
        );
    }
    if snapshot.stale {
        println!("\n(stale: last fetch failed, showing previous values)");
    }
}

/// Poll balances until interrupted, printing only actual changes
pub async fn watch(config: &Config) -> Result<()> {
    let Some((_signing_wallet, provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    let feed = BalanceFeed::new(
        provider,
        Duration::from_secs(config.balance.poll_interval_secs),
    );
    feed.set_wallet(wallet).await;

    let (tx, mut rx) = mpsc::channel::<BalanceSnapshot>(16);
    feed.start(tx);

    println!(
        "Watching balances every {}s (ctrl-c to stop)...",
        config.balance.poll_interval_secs
    );

    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                match snapshot {
                    Some(snapshot) => print_balances(&snapshot),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping balance watch");
                feed.clear_wallet().await;
                feed.stop();
                break;
            }
        }
    }

    Ok(())
}

/// Transfer funds from the smart wallet
pub async fn transfer(config: &Config, token: &str, recipient: &str, amount: f64) -> Result<()> {
    let token: Token = match token.parse() {
        Ok(token) => token,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };

    if !is_valid_address(recipient) {
        println!("Invalid recipient address: {}", recipient);
        return Ok(());
    }

    let Some((signing_wallet, provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    if recipient == wallet.admin_signer {
        println!("{}", Error::TransferToAdminSigner);
        return Ok(());
    }

    // Check against the currently displayed balance before building
    // anything
    let snapshot = provider.get_balances(&wallet).await;
    if let Err(e) = check_balance(&snapshot, token, amount) {
        println!("{}", e);
        return Ok(());
    }

    let from = crate::transfer::build::parse_address(&wallet.address)?;
    let transaction = match token {
        Token::Sol => build_sol_transfer(&from, recipient, amount)?,
        Token::Usdc => {
            build_token_transfer(&from, recipient, USDC_DEVNET_MINT, amount, token.decimals())?
        }
    };

    let ledger = TransferLedger::new(config.transfer.pending_timeout_secs);
    let record = ledger.record_pending(token, recipient, amount).await;

    println!(
        "Transferring {} {} to {}...",
        amount,
        token.symbol().to_uppercase(),
        shorten_address(recipient)
    );

    match provider
        .submit_transaction(&wallet, &signing_wallet, &transaction)
        .await
    {
        Ok(submitted) => match submitted.phase {
            TransactionPhase::Success => {
                let url = submitted.tx_id.as_deref().map(|id| explorer_url(config, id));
                let resolved = ledger
                    .resolve(&record.id, TransferStatus::Success, url)
                    .await?;
                println!("Transfer complete.");
                if let Some(url) = &resolved.explorer_url {
                    println!("View on explorer: {}", url);
                }
            }
            TransactionPhase::Failed => {
                ledger
                    .resolve(&record.id, TransferStatus::Failed, None)
                    .await?;
                println!("Transfer failed on the platform side.");
            }
            TransactionPhase::Pending => {
                println!(
                    "Transfer still pending; waiting up to {}s for resolution...",
                    config.transfer.pending_timeout_secs
                );
                // The record expires locally; no further network calls
                tokio::time::sleep(Duration::from_secs(config.transfer.pending_timeout_secs))
                    .await;
                let expired = ledger.expire_stale().await;
                if expired > 0 {
                    println!("Transfer expired without resolving.");
                }
            }
        },
        Err(e) if e.is_provider() => {
            ledger
                .resolve(&record.id, TransferStatus::Failed, None)
                .await?;
            notice(&e);
        }
        Err(e) => {
            ledger
                .resolve(&record.id, TransferStatus::Failed, None)
                .await?;
            return Err(e.into());
        }
    }

    for entry in ledger.list(5).await {
        println!(
            "  [{}] {} {} -> {} ({})",
            entry.status,
            entry.amount,
            entry.token.symbol().to_uppercase(),
            shorten_address(&entry.recipient),
            entry.created_at.format("%H:%M:%S")
        );
    }

    Ok(())
}

/// List delegated signers for the wallet
pub async fn signer_list(config: &Config) -> Result<()> {
    let Some((_signing_wallet, provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    let manager = SignerManager::new(provider, wallet);
    let signers = match manager.list().await {
        Ok(signers) => signers,
        Err(e) if e.is_provider() => {
            notice(&e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("\n=== DELEGATED SIGNERS ===\n");
    if signers.is_empty() {
        println!("No delegated signers yet.");
    }
    for signer in signers {
        println!(
            "  {}  ({})",
            shorten_address(signer.bare_address()),
            signer.signer_type
        );
    }

    Ok(())
}

/// Register a delegated signer. With no address given, uses the locally
/// generated delegated keypair.
pub async fn signer_add(config: &Config, address: Option<String>) -> Result<()> {
    let address = match address {
        Some(address) => address,
        None => {
            let store = KeypairStore::new(&config.signer.delegated_keypair_path);
            match store.load()? {
                Some(stored) => stored.public_key,
                None => {
                    println!(
                        "No address given and no generated keypair found; \
                         run `signer generate` first."
                    );
                    return Ok(());
                }
            }
        }
    };

    let Some((signing_wallet, provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    let manager = SignerManager::new(provider, wallet);

    // Warm the duplicate-check cache; a provider failure here means the
    // platform is unreachable anyway
    if let Err(e) = manager.list().await {
        if e.is_provider() {
            notice(&e);
            return Ok(());
        }
        return Err(e.into());
    }

    match manager.add(&address, &signing_wallet).await {
        Ok(registered) => {
            println!("Delegated signer registered: {}", registered.locator);
        }
        Err(e) if e.is_validation() => println!("{}", e),
        Err(Error::InvalidTransactionSigner { expected_admin }) => {
            println!(
                "The approval was signed by an unexpected wallet. \
                 Connect the admin wallet {} and try again.",
                expected_admin
            );
        }
        Err(Error::UserRejected) => println!("Registration cancelled."),
        Err(e) if e.is_provider() => notice(&e),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Generate (or show) the local delegated-signer keypair
pub async fn signer_generate(config: &Config) -> Result<()> {
    let store = KeypairStore::new(&config.signer.delegated_keypair_path);

    if let Some(existing) = store.load()? {
        println!(
            "A delegated keypair already exists: {}\n\
             Run `signer clear` first to replace it.",
            existing.public_key
        );
        return Ok(());
    }

    let stored = store.generate()?;
    println!("Generated delegated keypair: {}", stored.public_key);
    println!("Register it with `signer add`.");
    Ok(())
}

/// Remove the local delegated-signer keypair
pub async fn signer_clear(config: &Config) -> Result<()> {
    let store = KeypairStore::new(&config.signer.delegated_keypair_path);
    store.clear()?;
    println!("Delegated keypair cleared.");
    Ok(())
}

/// Show the platform's transaction history for the wallet
pub async fn history(config: &Config, limit: usize) -> Result<()> {
    let Some((_signing_wallet, provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    let transactions = match provider.get_transactions(&wallet).await {
        Ok(transactions) => transactions,
        Err(e) if e.is_provider() => {
            notice(&e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("\n=== TRANSACTION HISTORY ===\n");
    if transactions.is_empty() {
        println!("No transactions yet.");
    }
    for txn in transactions.iter().take(limit) {
        let tx_id = txn
            .on_chain
            .as_ref()
            .and_then(|o| o.tx_id.as_deref())
            .unwrap_or("-");
        println!("  {}  {}  {}", txn.id, txn.status, tx_id);
    }

    Ok(())
}

/// Request a devnet airdrop to the smart wallet
pub async fn airdrop(config: &Config, amount_sol: f64) -> Result<()> {
    let Some((_signing_wallet, _provider, wallet)) = resolve_wallet(config).await? else {
        return Ok(());
    };

    let address = crate::transfer::build::parse_address(&wallet.address)?;
    let rpc_client = RpcClient::new_with_timeout(
        config.rpc.endpoint.clone(),
        Duration::from_millis(config.rpc.timeout_ms),
    );

    let lamports = crate::transfer::build::sol_to_lamports(amount_sol);
    match crate::faucet::request_airdrop(&rpc_client, &address, lamports) {
        Ok(signature) => {
            println!("Airdrop requested: {} SOL (sig: {})", amount_sol, signature);
        }
        Err(e) => {
            error!("Airdrop failed: {}", e);
            notice(&e);
        }
    }

    Ok(())
}

/// Show current configuration with secrets masked
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check connectivity to the hosted platform and the RPC endpoint
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== SYSTEM HEALTH CHECK ===\n");

    print!("Wallet platform... ");
    let provider = WalletProvider::new(&config.provider)?;
    match provider.check_reachable().await {
        Ok(_) => println!("OK"),
        Err(e) => println!("FAILED: {}", e),
    }

    print!("RPC... ");
    let rpc_client = RpcClient::new_with_timeout(
        config.rpc.endpoint.clone(),
        Duration::from_millis(config.rpc.timeout_ms),
    );
    let started = std::time::Instant::now();
    match rpc_client.get_latest_blockhash() {
        Ok(_) => println!("OK ({}ms)", started.elapsed().as_millis()),
        Err(e) => println!("FAILED: {}", e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_address() {
        assert_eq!(
            shorten_address("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"),
            "9xQeWvG816...Zb9PusVFin"
        );
        assert_eq!(shorten_address("short"), "short");
    }

    #[test]
    fn test_explorer_url() {
        let config = Config::default();
        assert_eq!(
            explorer_url(&config, "abc123"),
            "https://solscan.io/tx/abc123?cluster=devnet"
        );
    }
}
