//! Interfaces of the external systems the manager delegates to.
//!
//! Each collaborator performs its own validation; a refusal surfaces as a
//! [`Rejection`] whose reason is opaque to the manager.

use custodian_common::{Address, AssetRef, Rejection, Shares};
use custodian_protocol::{OrderPair, ProofBundle};

/// The custodied asset's home ledger.
pub trait AssetLedger: Send + Sync {
    /// Current holder of the asset, if it exists.
    fn owner_of(&self, asset: &AssetRef) -> Option<Address>;

    /// Authorize `operator` to move the asset on the owner's behalf.
    /// `None` clears any existing authorization.
    fn approve(&self, owner: &Address, operator: Option<&Address>, asset: &AssetRef) -> Result<(), Rejection>;

    /// Move the asset from `from` to `to`, acting as `operator`.
    fn transfer_from(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        asset: &AssetRef,
    ) -> Result<(), Rejection>;
}

/// The order-matching exchange.
pub trait Exchange: Send + Sync {
    /// Proxy through which the exchange moves assets owned by `maker`.
    fn transfer_agent(&self, maker: &Address) -> Option<Address>;

    /// Verify signatures and pricing, then atomically swap the asset for
    /// payment. Either everything happens or nothing does.
    fn atomic_match(&self, orders: &OrderPair, proof: &ProofBundle) -> Result<(), Rejection>;
}

/// The vault facility that mints fungible shares against deposited assets.
pub trait VaultFacility: Send + Sync {
    /// Pull `asset` from `depositor` into the collection's vault and mint
    /// shares to the depositor.
    fn deposit(&self, depositor: &Address, asset: &AssetRef) -> Result<Shares, Rejection>;
}
