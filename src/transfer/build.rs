//! Unsigned transfer construction
//!
//! Builders produce unsigned transactions for the smart wallet to
//! execute; submission and fee payment are the remote wallet client's
//! responsibility. Address and amount validation happens here, before
//! any network call.

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use crate::error::{Error, Result};

/// USDC mint on devnet
pub const USDC_DEVNET_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// Validation is exactly the key-parsing verdict; nothing else
pub fn is_valid_address(address: &str) -> bool {
    Pubkey::from_str(address).is_ok()
}

/// Parse an address or fail with `InvalidAddress`
pub fn parse_address(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address).map_err(|_| Error::InvalidAddress(address.to_string()))
}

/// Convert SOL to lamports
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * 1_000_000_000.0) as u64
}

/// Convert a fractional token amount to base units
pub fn token_to_base_units(amount: f64, decimals: u8) -> u64 {
    (amount * 10f64.powi(decimals as i32)) as u64
}

fn require_positive(amount: f64) -> Result<()> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Build an unsigned native transfer from the smart wallet
pub fn build_sol_transfer(from: &Pubkey, to: &str, amount_sol: f64) -> Result<Transaction> {
    require_positive(amount_sol)?;
    let recipient = parse_address(to)?;

    let instruction = system_instruction::transfer(from, &recipient, sol_to_lamports(amount_sol));
    Ok(Transaction::new_with_payer(&[instruction], Some(from)))
}

/// Build an unsigned fungible-token transfer between associated token
/// accounts, creating the recipient's account when missing
pub fn build_token_transfer(
    from: &Pubkey,
    to: &str,
    mint: &str,
    amount: f64,
    decimals: u8,
) -> Result<Transaction> {
    require_positive(amount)?;
    let recipient = parse_address(to)?;
    let mint = parse_address(mint)?;

    let source = get_associated_token_address(from, &mint);
    let destination = get_associated_token_address(&recipient, &mint);

    let create_destination =
        create_associated_token_account_idempotent(from, &recipient, &mint, &spl_token::id());

    let transfer = spl_token::instruction::transfer_checked(
        &spl_token::id(),
        &source,
        &mint,
        &destination,
        from,
        &[],
        token_to_base_units(amount, decimals),
        decimals,
    )
    .map_err(|e| Error::Internal(format!("token transfer instruction: {}", e)))?;

    Ok(Transaction::new_with_payer(
        &[create_destination, transfer],
        Some(from),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    #[test]
    fn test_is_valid_address_agrees_with_pubkey_parsing() {
        let cases = [
            RECIPIENT,
            USDC_DEVNET_MINT,
            "",
            "abc",
            "0x52908400098527886E0F7030069857D2E4169EE7",
            "IIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIII",
        ];

        for case in cases {
            assert_eq!(
                is_valid_address(case),
                Pubkey::from_str(case).is_ok(),
                "divergence for {:?}",
                case
            );
        }
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(sol_to_lamports(1.0), 1_000_000_000);
        assert_eq!(sol_to_lamports(0.5), 500_000_000);
        assert_eq!(token_to_base_units(1.0, 6), 1_000_000);
        assert_eq!(token_to_base_units(2.5, 6), 2_500_000);
    }

    #[test]
    fn test_build_sol_transfer() {
        let from = Pubkey::new_unique();
        let txn = build_sol_transfer(&from, RECIPIENT, 0.25).unwrap();

        assert_eq!(txn.message.instructions.len(), 1);
        assert_eq!(txn.message.account_keys[0], from);
        assert!(txn.signatures.iter().all(|s| *s == Default::default()));
    }

    #[test]
    fn test_build_sol_transfer_rejects_invalid_recipient() {
        let from = Pubkey::new_unique();
        let err = build_sol_transfer(&from, "not-an-address", 0.25).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[test]
    fn test_build_rejects_non_positive_amounts() {
        let from = Pubkey::new_unique();
        assert!(matches!(
            build_sol_transfer(&from, RECIPIENT, 0.0).unwrap_err(),
            Error::InvalidAmount(_)
        ));
        assert!(matches!(
            build_sol_transfer(&from, RECIPIENT, -1.0).unwrap_err(),
            Error::InvalidAmount(_)
        ));
        assert!(matches!(
            build_token_transfer(&from, RECIPIENT, USDC_DEVNET_MINT, f64::NAN, 6).unwrap_err(),
            Error::InvalidAmount(_)
        ));
    }

    #[test]
    fn test_build_token_transfer() {
        let from = Pubkey::new_unique();
        let txn = build_token_transfer(&from, RECIPIENT, USDC_DEVNET_MINT, 1.5, 6).unwrap();

        // Create-destination (idempotent) followed by transfer_checked
        assert_eq!(txn.message.instructions.len(), 2);
        assert_eq!(txn.message.account_keys[0], from);
    }

    #[test]
    fn test_build_token_transfer_rejects_invalid_mint() {
        let from = Pubkey::new_unique();
        let err = build_token_transfer(&from, RECIPIENT, "bogus", 1.0, 6).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }
}
