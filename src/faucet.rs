//! Devnet faucet airdrop
//!
//! The only direct use of the blockchain RPC in this client; everything
//! else goes through the hosted platform.

use solana_client::rpc_client::RpcClient;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing::info;

use crate::error::{Error, Result};

/// Request a devnet airdrop for `address`
pub fn request_airdrop(
    rpc_client: &RpcClient,
    address: &Pubkey,
    lamports: u64,
) -> Result<Signature> {
    let signature = rpc_client
        .request_airdrop(address, lamports)
        .map_err(|e| Error::Rpc(format!("airdrop request failed: {}", e)))?;

    info!(
        "Requested airdrop of {} SOL to {} (sig: {})",
        lamports as f64 / LAMPORTS_PER_SOL as f64,
        address,
        signature
    );
    Ok(signature)
}

/// Default airdrop size: 1 SOL
pub const DEFAULT_AIRDROP_LAMPORTS: u64 = LAMPORTS_PER_SOL;
