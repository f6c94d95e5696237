//! Custody ledger: which assets the custodian holds and for whom.

use std::collections::HashMap;

use custodian_common::{Address, AssetRef, Timestamp};
use serde::{Deserialize, Serialize};

/// Custody of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyRecord {
    /// Who deposited the asset.
    pub depositor: Address,
    /// Whether the custodian currently holds the asset.
    pub held: bool,
    /// When the most recent deposit happened.
    pub deposited_at: Timestamp,
}

/// Per-asset custody records.
#[derive(Debug, Default, Clone)]
pub struct CustodyLedger {
    records: HashMap<AssetRef, CustodyRecord>,
}

impl CustodyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deposit, replacing any record left by an earlier custody.
    pub fn record_deposit(&mut self, asset: AssetRef, depositor: Address, at: Timestamp) {
        self.records.insert(
            asset,
            CustodyRecord {
                depositor,
                held: true,
                deposited_at: at,
            },
        );
    }

    /// Mark the asset as having left custody. Returns false if it was not held.
    pub fn release(&mut self, asset: &AssetRef) -> bool {
        match self.records.get_mut(asset) {
            Some(record) if record.held => {
                record.held = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_held(&self, asset: &AssetRef) -> bool {
        self.records.get(asset).map(|r| r.held).unwrap_or(false)
    }

    pub fn get(&self, asset: &AssetRef) -> Option<&CustodyRecord> {
        self.records.get(asset)
    }

    /// Number of assets currently held.
    pub fn held_count(&self) -> usize {
        self.records.values().filter(|r| r.held).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetRef {
        AssetRef::new(Address::from_low_u8(0xc0), 1u128)
    }

    #[test]
    fn test_deposit_and_release() {
        let mut ledger = CustodyLedger::new();
        assert!(!ledger.is_held(&asset()));

        ledger.record_deposit(asset(), Address::from_low_u8(1), chrono::Utc::now());
        assert!(ledger.is_held(&asset()));
        assert_eq!(ledger.held_count(), 1);

        assert!(ledger.release(&asset()));
        assert!(!ledger.is_held(&asset()));
        assert!(!ledger.release(&asset()));
        assert_eq!(ledger.get(&asset()).unwrap().depositor, Address::from_low_u8(1));
    }

    #[test]
    fn test_fresh_deposit_replaces_record() {
        let mut ledger = CustodyLedger::new();
        ledger.record_deposit(asset(), Address::from_low_u8(1), chrono::Utc::now());
        ledger.release(&asset());
        ledger.record_deposit(asset(), Address::from_low_u8(2), chrono::Utc::now());

        let record = ledger.get(&asset()).unwrap();
        assert!(record.held);
        assert_eq!(record.depositor, Address::from_low_u8(2));
    }
}
