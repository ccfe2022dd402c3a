//! Transfer construction and the in-memory transfer ledger

pub mod build;
pub mod ledger;

pub use build::{build_sol_transfer, build_token_transfer, is_valid_address, USDC_DEVNET_MINT};
pub use ledger::{TransferLedger, TransferRecord, TransferStatus};

use crate::balance::{format_balance, BalanceSnapshot, Token};
use crate::error::{Error, Result};

/// Reject a transfer amount that exceeds the currently displayed
/// balance. Caller-side check; runs before any transaction is built.
pub fn check_balance(snapshot: &BalanceSnapshot, token: Token, amount: f64) -> Result<()> {
    let available = snapshot.amount(token);
    if amount > available {
        return Err(Error::InsufficientBalance {
            token: token.symbol().to_uppercase(),
            available: format_balance(snapshot.total(token), token.decimals()),
            required: format!("{:.2}", amount),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::TokenBalance;

    fn snapshot_with_sol(total_raw: &str) -> BalanceSnapshot {
        BalanceSnapshot {
            tokens: vec![TokenBalance {
                token: Token::Sol,
                decimals: 9,
                total_raw: total_raw.to_string(),
            }],
            stale: false,
        }
    }

    #[test]
    fn test_check_balance_rejects_overdraft() {
        let snapshot = snapshot_with_sol("1000000000"); // 1 SOL
        let err = check_balance(&snapshot, Token::Sol, 1.5).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_check_balance_allows_within_balance() {
        let snapshot = snapshot_with_sol("2000000000"); // 2 SOL
        assert!(check_balance(&snapshot, Token::Sol, 1.5).is_ok());
        assert!(check_balance(&snapshot, Token::Sol, 2.0).is_ok());
    }

    #[test]
    fn test_check_balance_with_empty_snapshot() {
        let snapshot = BalanceSnapshot::empty();
        assert!(check_balance(&snapshot, Token::Usdc, 0.01).is_err());
    }
}
