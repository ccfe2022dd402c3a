//! Balance snapshot model and formatting

pub mod feed;

pub use feed::BalanceFeed;

use serde::{Deserialize, Serialize};

/// Tokens tracked for the managed wallet
pub const TRACKED_TOKENS: [Token; 2] = [Token::Sol, Token::Usdc];

/// Token kinds the demo wallet tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Sol,
    Usdc,
}

impl Token {
    /// Decimal places of the token's base unit
    pub fn decimals(&self) -> u8 {
        match self {
            Token::Sol => 9,
            Token::Usdc => 6,
        }
    }

    /// Symbol used in API calls and display
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Sol => "sol",
            Token::Usdc => "usdc",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for Token {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sol" => Ok(Token::Sol),
            "usdc" => Ok(Token::Usdc),
            other => Err(crate::error::Error::UnknownToken(other.to_string())),
        }
    }
}

/// Balance of a single tracked token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: Token,
    pub decimals: u8,
    /// Total in base units, as returned by the platform
    pub total_raw: String,
}

/// Point-in-time balances for the managed wallet. Replaced wholesale on
/// each successful poll; `stale` marks a snapshot carried over after a
/// failed fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub tokens: Vec<TokenBalance>,
    pub stale: bool,
}

impl BalanceSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw total for a token, "0" when untracked
    pub fn total(&self, token: Token) -> &str {
        self.tokens
            .iter()
            .find(|t| t.token == token)
            .map(|t| t.total_raw.as_str())
            .unwrap_or("0")
    }

    /// Token total as a fractional amount
    pub fn amount(&self, token: Token) -> f64 {
        let raw: u128 = self.total(token).parse().unwrap_or(0);
        raw as f64 / 10f64.powi(token.decimals() as i32)
    }

    /// True when at least one tracked token's total differs. Drives the
    /// publish-only-on-change rule of the balance poller.
    pub fn differs_from(&self, other: &BalanceSnapshot) -> bool {
        TRACKED_TOKENS
            .iter()
            .any(|token| self.total(*token) != other.total(*token))
    }
}

/// Render a raw base-unit total with two decimal places
pub fn format_balance(raw: &str, decimals: u8) -> String {
    let value: u128 = raw.parse().unwrap_or(0);
    let cents = if decimals >= 2 {
        value / 10u128.pow(decimals as u32 - 2)
    } else {
        value * 10u128.pow(2 - decimals as u32)
    };
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance("1000000", 6), "1.00");
        assert_eq!(format_balance("0", 9), "0.00");
        assert_eq!(format_balance("1500000000", 9), "1.50");
        assert_eq!(format_balance("2750000", 6), "2.75");
        assert_eq!(format_balance("not-a-number", 6), "0.00");
    }

    fn snapshot(sol: &str, usdc: &str) -> BalanceSnapshot {
        BalanceSnapshot {
            tokens: vec![
                TokenBalance {
                    token: Token::Sol,
                    decimals: 9,
                    total_raw: sol.to_string(),
                },
                TokenBalance {
                    token: Token::Usdc,
                    decimals: 6,
                    total_raw: usdc.to_string(),
                },
            ],
            stale: false,
        }
    }

    #[test]
    fn test_differs_from_is_structural() {
        let a = snapshot("1000000000", "5000000");
        let b = snapshot("1000000000", "5000000");
        assert!(!a.differs_from(&b));

        let c = snapshot("2000000000", "5000000");
        assert!(a.differs_from(&c));
    }

    #[test]
    fn test_stale_flag_does_not_affect_diff() {
        let a = snapshot("1000000000", "5000000");
        let mut b = snapshot("1000000000", "5000000");
        b.stale = true;
        assert!(!a.differs_from(&b));
    }

    #[test]
    fn test_empty_snapshot_totals() {
        let empty = BalanceSnapshot::empty();
        assert_eq!(empty.total(Token::Sol), "0");
        assert_eq!(empty.amount(Token::Usdc), 0.0);
    }

    #[test]
    fn test_amount_conversion() {
        let snap = snapshot("1500000000", "2500000");
        assert!((snap.amount(Token::Sol) - 1.5).abs() < f64::EPSILON);
        assert!((snap.amount(Token::Usdc) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_token_parsing() {
        assert_eq!("sol".parse::<Token>().unwrap(), Token::Sol);
        assert_eq!("USDC".parse::<Token>().unwrap(), Token::Usdc);
        assert!("doge".parse::<Token>().is_err());
    }
}
