//! Error types for the smart-wallet client

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the smart-wallet client
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    // Signing-wallet adapter errors
    #[error("Signing wallet not installed: {0}")]
    NotInstalled(String),

    #[error("User rejected the request")]
    UserRejected,

    #[error("Wallet not connected")]
    NotConnected,

    // Hosted wallet platform errors
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Transaction approved by an unexpected signer; connect the admin wallet {expected_admin}")]
    InvalidTransactionSigner { expected_admin: String },

    // Validation errors (caught before any network call)
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Insufficient {token} balance: {available} available, {required} required")]
    InsufficientBalance {
        token: String,
        available: String,
        required: String,
    },

    #[error("Duplicate signer: {0}")]
    DuplicateSigner(String),

    #[error("Cannot transfer to the admin signer address")]
    TransferToAdminSigner,

    // Transfer ledger errors
    #[error("Transfer record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid registration transition: {from} -> {to}")]
    InvalidRegistrationTransition { from: String, to: String },

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is a validation failure handled at the form boundary
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress(_)
                | Error::InvalidAmount(_)
                | Error::UnknownToken(_)
                | Error::InsufficientBalance { .. }
                | Error::DuplicateSigner(_)
                | Error::TransferToAdminSigner
        )
    }

    /// Check if this error means the hosted platform is unavailable.
    /// Callers surface these as a transient notice; nothing is retried.
    pub fn is_provider(&self) -> bool {
        matches!(self, Error::Provider(_) | Error::Rpc(_))
    }

    /// Check if this error is fatal at startup (not user-recoverable)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::MissingEnvVar(_) | Error::InvalidKeypair(_)
        )
    }
}

// Conversion from solana_client errors
impl From<solana_client::client_error::ClientError> for Error {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(e.to_string())
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Provider(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(Error::InvalidAddress("abc".to_string()).is_validation());
        assert!(Error::DuplicateSigner("abc".to_string()).is_validation());
        assert!(Error::TransferToAdminSigner.is_validation());
        assert!(!Error::Provider("down".to_string()).is_validation());
    }

    #[test]
    fn test_provider_classification() {
        assert!(Error::Provider("timeout".to_string()).is_provider());
        assert!(Error::Rpc("connrefused".to_string()).is_provider());
        assert!(!Error::UserRejected.is_provider());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::MissingEnvVar("WALLET_API_KEY".to_string()).is_fatal());
        assert!(!Error::InvalidAmount("0".to_string()).is_fatal());
    }
}
