//! Delegated-signer management
//!
//! Registers and lists secondary signers on a managed wallet. Duplicate
//! checks run against the locally cached signer set before any network
//! call; the platform stays authoritative.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::provider::types::normalize_locator;
use crate::provider::{DelegatedSigner, ManagedWallet, WalletProvider};
use crate::transfer::build::parse_address;

use super::WalletSigner;

/// Lifecycle of a single delegated-signer registration. Terminal states
/// are `Registered` and `Failed`; there is no automatic retry out of
/// `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    NotRequested,
    Generating,
    Registering,
    Registered { locator: String },
    Failed { reason: String },
}

impl RegistrationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrationState::Registered { .. } | RegistrationState::Failed { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            RegistrationState::NotRequested => "not-requested",
            RegistrationState::Generating => "generating",
            RegistrationState::Registering => "registering",
            RegistrationState::Registered { .. } => "registered",
            RegistrationState::Failed { .. } => "failed",
        }
    }

    /// Advance to `next`, rejecting transitions the lifecycle does not
    /// allow
    pub fn advance(self, next: RegistrationState) -> Result<RegistrationState> {
        let allowed = match (&self, &next) {
            (RegistrationState::NotRequested, RegistrationState::Generating) => true,
            (RegistrationState::NotRequested, RegistrationState::Registering) => true,
            (RegistrationState::Generating, RegistrationState::Registering) => true,
            (RegistrationState::Generating, RegistrationState::Failed { .. }) => true,
            (RegistrationState::Registering, RegistrationState::Registered { .. }) => true,
            (RegistrationState::Registering, RegistrationState::Failed { .. }) => true,
            _ => false,
        };

        if !allowed {
            return Err(Error::InvalidRegistrationTransition {
                from: self.name().to_string(),
                to: next.name().to_string(),
            });
        }
        Ok(next)
    }
}

/// Reject a candidate that collides with the admin signer or an existing
/// delegated signer. Pure; comparisons strip any locator prefix first.
pub fn ensure_unique(
    candidate: &str,
    admin_signer: &str,
    existing: &[DelegatedSigner],
) -> Result<()> {
    let bare = normalize_locator(candidate);

    if bare == normalize_locator(admin_signer) {
        return Err(Error::DuplicateSigner(
            "cannot add the admin signer as a delegated signer".to_string(),
        ));
    }

    if existing.iter().any(|signer| signer.matches(bare)) {
        return Err(Error::DuplicateSigner(
            "this signer is already configured for this wallet".to_string(),
        ));
    }

    Ok(())
}

/// Manager for the delegated-signer set of one managed wallet
pub struct SignerManager {
    provider: Arc<WalletProvider>,
    wallet: ManagedWallet,
    signers: RwLock<Vec<DelegatedSigner>>,
}

impl SignerManager {
    pub fn new(provider: Arc<WalletProvider>, wallet: ManagedWallet) -> Self {
        Self {
            provider,
            wallet,
            signers: RwLock::new(Vec::new()),
        }
    }

    /// Fetch the current signer set from the platform and refresh the
    /// local cache
    pub async fn list(&self) -> Result<Vec<DelegatedSigner>> {
        let fetched = self.provider.get_delegated_signers(&self.wallet).await?;
        debug!("Fetched {} delegated signers", fetched.len());

        let mut signers = self.signers.write().await;
        *signers = fetched.clone();
        Ok(fetched)
    }

    /// Signer set as of the last fetch, without a network call
    pub async fn cached(&self) -> Vec<DelegatedSigner> {
        self.signers.read().await.clone()
    }

    /// Register a new delegated signer.
    ///
    /// Validation (address syntax, admin collision, duplicates against
    /// the cached set) happens before any network call. A platform
    /// rejection for a wrong approval signature is re-raised as
    /// `InvalidTransactionSigner` naming the expected admin wallet.
    pub async fn add(
        &self,
        address: &str,
        signer: &dyn WalletSigner,
    ) -> Result<DelegatedSigner> {
        let bare = normalize_locator(address);
        parse_address(bare)?;

        {
            let signers = self.signers.read().await;
            ensure_unique(bare, &self.wallet.admin_signer, &signers)?;
        }

        let mut state = RegistrationState::NotRequested
            .advance(RegistrationState::Registering)?;

        match self
            .provider
            .register_delegated_signer(&self.wallet, signer, bare)
            .await
        {
            Ok(registered) => {
                state = state.advance(RegistrationState::Registered {
                    locator: registered.locator.clone(),
                })?;
                info!("Delegated signer registered: {} ({})", bare, state.name());

                let mut signers = self.signers.write().await;
                signers.push(registered.clone());
                Ok(registered)
            }
            Err(e) => {
                let clarified = clarify_registration_error(e, &self.wallet.admin_signer);
                // Terminal; surfacing the error is the only followup
                let _ = state.advance(RegistrationState::Failed {
                    reason: clarified.to_string(),
                })?;
                Err(clarified)
            }
        }
    }
}

/// Re-raise a platform "invalid signature" rejection as an actionable
/// error: the approval came from a wallet other than the admin signer.
fn clarify_registration_error(error: Error, admin_signer: &str) -> Error {
    if let Error::Provider(message) = &error {
        let lower = message.to_lowercase();
        if lower.contains("invalid") && lower.contains("signature") {
            return Error::InvalidTransactionSigner {
                expected_admin: admin_signer.to_string(),
            };
        }
    }
    error
}
