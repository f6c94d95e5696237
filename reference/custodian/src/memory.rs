//! In-memory collaborators for tests and simulation.
//!
//! These model the observable behaviour of the external systems closely
//! enough to exercise every manager path, including rejections. Signature
//! verification is not modelled: any proof bundle is accepted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use custodian_common::{Address, AssetRef, Rejection, Shares};
use custodian_protocol::{decode_transfer, OrderPair, ProofBundle};

use crate::collaborators::{AssetLedger, Exchange, VaultFacility};

/// Single-token-per-id asset ledger spanning any number of collections.
#[derive(Debug, Default)]
pub struct InMemoryAssetLedger {
    owners: DashMap<AssetRef, Address>,
    approvals: DashMap<AssetRef, Address>,
    transfers: AtomicU64,
}

impl InMemoryAssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `asset` owned by `owner`.
    pub fn mint(&self, asset: AssetRef, owner: Address) {
        self.owners.insert(asset, owner);
    }

    /// Operator currently approved for `asset`.
    pub fn approved(&self, asset: &AssetRef) -> Option<Address> {
        self.approvals.get(asset).map(|entry| *entry)
    }

    /// Number of completed transfers.
    pub fn transfer_count(&self) -> u64 {
        self.transfers.load(Ordering::Relaxed)
    }
}

impl AssetLedger for InMemoryAssetLedger {
    fn owner_of(&self, asset: &AssetRef) -> Option<Address> {
        self.owners.get(asset).map(|entry| *entry)
    }

    fn approve(&self, owner: &Address, operator: Option<&Address>, asset: &AssetRef) -> Result<(), Rejection> {
        if self.owner_of(asset) != Some(*owner) {
            return Err(Rejection::new("approve caller is not owner"));
        }
        match operator {
            Some(operator) => {
                self.approvals.insert(*asset, *operator);
            }
            None => {
                self.approvals.remove(asset);
            }
        }
        Ok(())
    }

    fn transfer_from(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        asset: &AssetRef,
    ) -> Result<(), Rejection> {
        match self.owner_of(asset) {
            None => return Err(Rejection::new("invalid token ID")),
            Some(owner) if owner != *from => return Err(Rejection::new("transfer from incorrect owner")),
            Some(_) => {}
        }
        if to.is_zero() {
            return Err(Rejection::new("transfer to the zero address"));
        }
        if operator != from && self.approved(asset) != Some(*operator) {
            return Err(Rejection::new("transfer caller is not owner nor approved"));
        }

        self.approvals.remove(asset);
        self.owners.insert(*asset, *to);
        self.transfers.fetch_add(1, Ordering::Relaxed);
        debug!(asset = %asset, from = %from, to = %to, "Token transferred");
        Ok(())
    }
}

/// Exchange that moves the sell-side asset to the buyer through the
/// seller's registered transfer agent.
pub struct InMemoryExchange {
    ledger: Arc<dyn AssetLedger>,
    agents: DashMap<Address, Address>,
    reject_next: Mutex<Option<String>>,
    matches: AtomicU64,
}

impl InMemoryExchange {
    pub fn new(ledger: Arc<dyn AssetLedger>) -> Self {
        Self {
            ledger,
            agents: DashMap::new(),
            reject_next: Mutex::new(None),
            matches: AtomicU64::new(0),
        }
    }

    /// Register `agent` as the transfer proxy for `maker`.
    pub fn register_agent(&self, maker: Address, agent: Address) {
        self.agents.insert(maker, agent);
    }

    /// Revoke the transfer proxy of `maker`.
    pub fn deregister_agent(&self, maker: &Address) {
        self.agents.remove(maker);
    }

    /// Make the next match fail with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        *self.reject_next.lock() = Some(reason.into());
    }

    /// Number of successful matches.
    pub fn match_count(&self) -> u64 {
        self.matches.load(Ordering::Relaxed)
    }
}

impl Exchange for InMemoryExchange {
    fn transfer_agent(&self, maker: &Address) -> Option<Address> {
        self.agents.get(maker).map(|entry| *entry)
    }

    fn atomic_match(&self, orders: &OrderPair, _proof: &ProofBundle) -> Result<(), Rejection> {
        if let Some(reason) = self.reject_next.lock().take() {
            return Err(Rejection(reason));
        }

        let (buy, sell) = (&orders.buy, &orders.sell);
        if buy.base_price < sell.base_price {
            return Err(Rejection::new("buy price below sell price"));
        }

        let call = decode_transfer(&sell.target, sell.calldata.as_slice())
            .map_err(|e| Rejection(format!("invalid sell calldata: {}", e)))?;
        let agent = self
            .transfer_agent(&sell.maker)
            .ok_or_else(|| Rejection::new("seller has no transfer agent"))?;

        self.ledger
            .transfer_from(&agent, &sell.maker, &buy.maker, &call.asset)
            .map_err(|r| Rejection(format!("asset transfer failed: {}", r)))?;

        self.matches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Vault facility with one vault per collection, minting one whole share
/// per deposited asset.
pub struct InMemoryVaultFacility {
    address: Address,
    ledger: Arc<dyn AssetLedger>,
    vaults: DashMap<Address, Address>,
    reject_next: Mutex<Option<String>>,
    deposits: AtomicU64,
}

impl InMemoryVaultFacility {
    /// Create a facility operating under `address`.
    pub fn new(address: Address, ledger: Arc<dyn AssetLedger>) -> Self {
        Self {
            address,
            ledger,
            vaults: DashMap::new(),
            reject_next: Mutex::new(None),
            deposits: AtomicU64::new(0),
        }
    }

    /// Open a vault for `collection`, holding deposits at `vault`.
    pub fn create_vault(&self, collection: Address, vault: Address) {
        self.vaults.insert(collection, vault);
    }

    pub fn vault_for(&self, collection: &Address) -> Option<Address> {
        self.vaults.get(collection).map(|entry| *entry)
    }

    /// Make the next deposit fail with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        *self.reject_next.lock() = Some(reason.into());
    }

    pub fn deposit_count(&self) -> u64 {
        self.deposits.load(Ordering::Relaxed)
    }
}

impl VaultFacility for InMemoryVaultFacility {
    fn deposit(&self, depositor: &Address, asset: &AssetRef) -> Result<Shares, Rejection> {
        if let Some(reason) = self.reject_next.lock().take() {
            return Err(Rejection(reason));
        }

        let vault = self
            .vault_for(&asset.collection)
            .ok_or_else(|| Rejection(format!("no vault for collection {}", asset.collection)))?;

        self.ledger
            .transfer_from(&self.address, depositor, &vault, asset)
            .map_err(|r| Rejection(format!("asset transfer failed: {}", r)))?;

        self.deposits.fetch_add(1, Ordering::Relaxed);
        Ok(Shares::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetRef {
        AssetRef::new(Address::from_low_u8(0xc0), 1u128)
    }

    #[test]
    fn test_transfer_requires_approval() {
        let ledger = InMemoryAssetLedger::new();
        let (owner, operator, to) = (Address::from_low_u8(1), Address::from_low_u8(2), Address::from_low_u8(3));
        ledger.mint(asset(), owner);

        let err = ledger.transfer_from(&operator, &owner, &to, &asset()).unwrap_err();
        assert_eq!(err.to_string(), "transfer caller is not owner nor approved");

        ledger.approve(&owner, Some(&operator), &asset()).unwrap();
        ledger.transfer_from(&operator, &owner, &to, &asset()).unwrap();
        assert_eq!(ledger.owner_of(&asset()), Some(to));
        assert_eq!(ledger.approved(&asset()), None);
        assert_eq!(ledger.transfer_count(), 1);
    }

    #[test]
    fn test_only_owner_can_approve() {
        let ledger = InMemoryAssetLedger::new();
        ledger.mint(asset(), Address::from_low_u8(1));
        assert!(ledger
            .approve(&Address::from_low_u8(2), Some(&Address::from_low_u8(3)), &asset())
            .is_err());
    }

    #[test]
    fn test_vault_requires_collection_vault() {
        let ledger = Arc::new(InMemoryAssetLedger::new());
        let facility_address = Address::from_low_u8(0xf0);
        let facility = InMemoryVaultFacility::new(facility_address, ledger.clone());
        let owner = Address::from_low_u8(1);
        ledger.mint(asset(), owner);
        ledger.approve(&owner, Some(&facility_address), &asset()).unwrap();

        assert!(facility.deposit(&owner, &asset()).is_err());

        facility.create_vault(asset().collection, Address::from_low_u8(0xf1));
        assert_eq!(facility.deposit(&owner, &asset()).unwrap(), Shares::ONE);
        assert_eq!(ledger.owner_of(&asset()), Some(Address::from_low_u8(0xf1)));
        assert_eq!(facility.deposit_count(), 1);
    }
}
