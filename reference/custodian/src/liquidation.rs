//! Liquidation state machine.
//!
//! An asset moves through
//! `Deposited -> LiquidationActive -> LiquidationExpired -> Disposed*`,
//! where the active/expired split is a function of the clock and the
//! window length snapshotted when liquidation began. The disposition is
//! a latch: once set, it never changes until a fresh deposit clears the
//! record.

use std::collections::HashMap;
use std::fmt;

use custodian_common::{window_deadline, within_window, AssetRef, CustodianError, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// Channel through which an asset left custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    ViaExchange,
    ViaVault,
}

/// Observable lifecycle phase of a custodied asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPhase {
    /// Held, not liquidated.
    Deposited,
    /// Liquidated; the exchange channel is open.
    LiquidationActive,
    /// Liquidated; the window lapsed and only the vault channel remains.
    LiquidationExpired,
    DisposedViaExchange,
    DisposedViaVault,
}

impl AssetPhase {
    /// Check if the asset has left custody for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetPhase::DisposedViaExchange | AssetPhase::DisposedViaVault)
    }
}

impl fmt::Display for AssetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetPhase::Deposited => "deposited",
            AssetPhase::LiquidationActive => "liquidation active",
            AssetPhase::LiquidationExpired => "liquidation expired",
            AssetPhase::DisposedViaExchange => "disposed via exchange",
            AssetPhase::DisposedViaVault => "disposed via vault",
        };
        f.write_str(name)
    }
}

impl From<Disposition> for AssetPhase {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::ViaExchange => AssetPhase::DisposedViaExchange,
            Disposition::ViaVault => AssetPhase::DisposedViaVault,
        }
    }
}

/// Liquidation of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationRecord {
    /// When liquidation began.
    pub liquidated_at: Timestamp,
    /// Window length in force when liquidation began.
    pub window_secs: u64,
    /// Set once the asset has been disposed of.
    pub disposition: Option<Disposition>,
}

impl LiquidationRecord {
    /// Last instant at which the exchange channel is open.
    /// `None` if the window never closes.
    pub fn deadline(&self) -> Option<Timestamp> {
        window_deadline(self.liquidated_at, self.window_secs)
    }

    /// Check if the window is still open at `now`.
    pub fn is_open(&self, now: Timestamp) -> bool {
        within_window(self.liquidated_at, self.window_secs, now)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposition.is_some()
    }

    /// Phase implied by this record at `now`.
    pub fn phase(&self, now: Timestamp) -> AssetPhase {
        match self.disposition {
            Some(disposition) => disposition.into(),
            None if self.is_open(now) => AssetPhase::LiquidationActive,
            None => AssetPhase::LiquidationExpired,
        }
    }

    /// Deadline for error reporting; saturates when unrepresentable.
    fn reported_deadline(&self) -> Timestamp {
        self.deadline().unwrap_or(Timestamp::MAX_UTC)
    }
}

/// Per-asset liquidation records.
#[derive(Debug, Default, Clone)]
pub struct LiquidationBook {
    records: HashMap<AssetRef, LiquidationRecord>,
}

impl LiquidationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, asset: &AssetRef) -> Option<&LiquidationRecord> {
        self.records.get(asset)
    }

    /// Check that liquidation may begin.
    pub fn ensure_startable(&self, asset: &AssetRef) -> Result<()> {
        if self.records.contains_key(asset) {
            return Err(CustodianError::AlreadyLiquidated { asset: *asset });
        }
        Ok(())
    }

    /// Begin liquidation, snapshotting the window length.
    pub fn begin(&mut self, asset: AssetRef, at: Timestamp, window_secs: u64) -> Result<&LiquidationRecord> {
        self.ensure_startable(&asset)?;
        Ok(self.records.entry(asset).or_insert(LiquidationRecord {
            liquidated_at: at,
            window_secs,
            disposition: None,
        }))
    }

    /// Forget the record of a disposed asset so a fresh deposit starts over.
    /// Records of liquidations still in flight are kept.
    pub fn reset(&mut self, asset: &AssetRef) -> bool {
        if self.records.get(asset).is_some_and(|r| r.is_disposed()) {
            self.records.remove(asset);
            return true;
        }
        false
    }

    /// The record of a liquidated asset that has not been disposed of yet.
    ///
    /// A disposed asset is no longer in custody and is reported as such.
    pub fn pending(&self, asset: &AssetRef) -> Result<&LiquidationRecord> {
        let record = self
            .records
            .get(asset)
            .ok_or(CustodianError::NotLiquidated { asset: *asset })?;
        if record.is_disposed() {
            return Err(CustodianError::NotOwner { asset: *asset });
        }
        Ok(record)
    }

    /// Guard for the exchange channel: the window must still be open.
    pub fn ensure_window_open(&self, asset: &AssetRef, now: Timestamp) -> Result<&LiquidationRecord> {
        let record = self.pending(asset)?;
        if !record.is_open(now) {
            return Err(CustodianError::AuctionExpired {
                asset: *asset,
                deadline: record.reported_deadline(),
            });
        }
        Ok(record)
    }

    /// Guard for the vault channel: the window must have lapsed.
    pub fn ensure_window_lapsed(&self, asset: &AssetRef, now: Timestamp) -> Result<&LiquidationRecord> {
        let record = self.pending(asset)?;
        if record.is_open(now) {
            return Err(CustodianError::AuctionInProgress {
                asset: *asset,
                deadline: record.reported_deadline(),
            });
        }
        Ok(record)
    }

    /// Latch the disposition. Returns false if the asset was not pending.
    pub fn settle(&mut self, asset: &AssetRef, disposition: Disposition) -> bool {
        match self.records.get_mut(asset) {
            Some(record) if record.disposition.is_none() => {
                record.disposition = Some(disposition);
                true
            }
            _ => false,
        }
    }
}
