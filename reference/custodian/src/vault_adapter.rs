//! Vault fallback adapter.

use std::sync::Arc;

use custodian_common::{Address, AssetRef, Collaborator, CustodianError, Result, Shares};
use tracing::{debug, warn};

use crate::collaborators::{AssetLedger, VaultFacility};

/// Hands lapsed assets to the vault facility in exchange for shares.
pub struct VaultAdapter {
    vault: Arc<dyn VaultFacility>,
    ledger: Arc<dyn AssetLedger>,
    vault_address: Address,
    custodian: Address,
}

impl VaultAdapter {
    pub fn new(
        vault: Arc<dyn VaultFacility>,
        ledger: Arc<dyn AssetLedger>,
        vault_address: Address,
        custodian: Address,
    ) -> Self {
        Self {
            vault,
            ledger,
            vault_address,
            custodian,
        }
    }

    pub fn vault_address(&self) -> Address {
        self.vault_address
    }

    /// Approve the facility for `asset` and deposit it, returning the
    /// shares minted to the custodian.
    pub fn dispose(&self, asset: &AssetRef) -> Result<Shares> {
        self.ledger
            .approve(&self.custodian, Some(&self.vault_address), asset)
            .map_err(|r| CustodianError::delegated(Collaborator::AssetLedger, r))?;
        debug!(asset = %asset, vault = %self.vault_address, "Vault facility approved");

        match self.vault.deposit(&self.custodian, asset) {
            Ok(shares) => Ok(shares),
            Err(rejection) => {
                if let Err(e) = self.ledger.approve(&self.custodian, None, asset) {
                    warn!(asset = %asset, error = %e, "Failed to withdraw vault approval");
                }
                Err(CustodianError::delegated(Collaborator::VaultFacility, rejection))
            }
        }
    }
}
