//! Auction window configuration store.

use custodian_common::constants::{DEFAULT_AUCTION_WINDOW_SECS, MIN_AUCTION_WINDOW_SECS};
use custodian_common::{CustodianError, Result};

/// Global auction window length, bounded below by the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionWindow {
    secs: u64,
}

impl AuctionWindow {
    /// Create a window store, rejecting a length below the floor.
    pub fn new(secs: u64) -> Result<Self> {
        Self::check(secs)?;
        Ok(Self { secs })
    }

    /// Current window length in seconds.
    pub fn secs(&self) -> u64 {
        self.secs
    }

    /// Replace the window length. The stored value is untouched on failure.
    pub fn set(&mut self, secs: u64) -> Result<()> {
        Self::check(secs)?;
        self.secs = secs;
        Ok(())
    }

    /// Check a candidate length against the floor.
    pub fn check(secs: u64) -> Result<()> {
        if secs < MIN_AUCTION_WINDOW_SECS {
            return Err(CustodianError::InvalidDuration {
                requested: secs,
                minimum: MIN_AUCTION_WINDOW_SECS,
            });
        }
        Ok(())
    }
}

impl Default for AuctionWindow {
    fn default() -> Self {
        Self {
            secs: DEFAULT_AUCTION_WINDOW_SECS,
        }
    }
}
