//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub balance: BalanceConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub signer: SignerConfig,
}

/// Hosted wallet platform configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the wallet-management API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// API key for the hosted service. Required; comes from
    /// WALLET__PROVIDER__API_KEY or the config file.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: String::new(),
            timeout_ms: default_provider_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_rpc_timeout_ms(),
        }
    }
}

/// Balance polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceConfig {
    /// Poll interval in seconds while a wallet is resolved
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Transfer and ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Seconds after which an unresolved pending transfer expires
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,

    /// Explorer base URL for transaction links
    #[serde(default = "default_explorer_base_url")]
    pub explorer_base_url: String,

    /// Explorer cluster query parameter
    #[serde(default = "default_explorer_cluster")]
    pub explorer_cluster: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            pending_timeout_secs: default_pending_timeout_secs(),
            explorer_base_url: default_explorer_base_url(),
            explorer_cluster: default_explorer_cluster(),
        }
    }
}

/// Local signing-wallet configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
    /// Path to the admin signing keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,

    /// Path where the generated delegated-signer keypair is persisted
    #[serde(default = "default_delegated_keypair_path")]
    pub delegated_keypair_path: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
            delegated_keypair_path: default_delegated_keypair_path(),
        }
    }
}

fn default_provider_base_url() -> String {
    "https://staging.crossmint.com/api/2022-06-09".to_string()
}
fn default_provider_timeout_ms() -> u64 {
    30_000
}
fn default_rpc_endpoint() -> String {
    "https://api.devnet.solana.com".to_string()
}
fn default_rpc_timeout_ms() -> u64 {
    30_000
}
fn default_poll_interval_secs() -> u64 {
    5
}
fn default_pending_timeout_secs() -> u64 {
    60
}
fn default_explorer_base_url() -> String {
    "https://solscan.io/tx".to_string()
}
fn default_explorer_cluster() -> String {
    "devnet".to_string()
}
fn default_keypair_path() -> String {
    "credentials/admin-keypair.json".to_string()
}
fn default_delegated_keypair_path() -> String {
    "credentials/delegated-signer.json".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix WALLET_)
            .add_source(
                config::Environment::with_prefix("WALLET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.provider.base_url)
            .with_context(|| format!("Invalid provider base_url: {}", self.provider.base_url))?;

        url::Url::parse(&self.rpc.endpoint)
            .with_context(|| format!("Invalid rpc endpoint: {}", self.rpc.endpoint))?;

        if self.balance.poll_interval_secs == 0 {
            anyhow::bail!("balance.poll_interval_secs must be positive");
        }

        if self.transfer.pending_timeout_secs == 0 {
            anyhow::bail!("transfer.pending_timeout_secs must be positive");
        }

        Ok(())
    }

    /// Check that the hosted-service credential is present.
    /// Called once at startup; absence is fatal, not user-recoverable.
    pub fn require_api_key(&self) -> crate::error::Result<()> {
        if self.provider.api_key.trim().is_empty() {
            return Err(crate::error::Error::MissingEnvVar(
                "WALLET__PROVIDER__API_KEY".to_string(),
            ));
        }
        Ok(())
    }

    /// Display configuration with secrets masked
    pub fn masked_display(&self) -> String {
        let masked_key = if self.provider.api_key.is_empty() {
            "<unset>".to_string()
        } else {
            let key = &self.provider.api_key;
            let visible = key.len().min(4);
            format!("{}{}", &key[..visible], "*".repeat(8))
        };

        format!(
            "provider.base_url = {}\n\
             provider.api_key = {}\n\
             provider.timeout_ms = {}\n\
             rpc.endpoint = {}\n\
             rpc.timeout_ms = {}\n\
             balance.poll_interval_secs = {}\n\
             transfer.pending_timeout_secs = {}\n\
             transfer.explorer_base_url = {}\n\
             transfer.explorer_cluster = {}\n\
             signer.keypair_path = {}\n\
             signer.delegated_keypair_path = {}",
            self.provider.base_url,
            masked_key,
            self.provider.timeout_ms,
            self.rpc.endpoint,
            self.rpc.timeout_ms,
            self.balance.poll_interval_secs,
            self.transfer.pending_timeout_secs,
            self.transfer.explorer_base_url,
            self.transfer.explorer_cluster,
            self.signer.keypair_path,
            self.signer.delegated_keypair_path,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            rpc: RpcConfig::default(),
            balance: BalanceConfig::default(),
            transfer: TransferConfig::default(),
            signer: SignerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.balance.poll_interval_secs, 5);
        assert_eq!(config.transfer.pending_timeout_secs, 60);
        assert_eq!(config.rpc.endpoint, "https://api.devnet.solana.com");
        assert!(config.provider.api_key.is_empty());
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::default();
        assert!(config.require_api_key().is_err());

        config.provider.api_key = "sk_staging_abc123".to_string();
        assert!(config.require_api_key().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.balance.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_display_hides_key() {
        let mut config = Config::default();
        config.provider.api_key = "sk_staging_secretsecret".to_string();
        let display = config.masked_display();
        assert!(!display.contains("secretsecret"));
        assert!(display.contains("sk_s"));
    }
}
