//! Manager state definitions.

use custodian_common::Address;

use crate::custody::CustodyLedger;
use crate::liquidation::LiquidationBook;
use crate::notifications::NotificationLog;
use crate::window::AuctionWindow;

/// Everything the manager owns and mutates.
///
/// Only a committing unit of work writes here, and only after every
/// external call it made has succeeded.
#[derive(Debug, Clone)]
pub struct ManagerState {
    /// Controlling authority.
    pub authority: Address,
    /// Global auction window.
    pub window: AuctionWindow,
    /// Custody records.
    pub custody: CustodyLedger,
    /// Liquidation records.
    pub liquidations: LiquidationBook,
    /// Committed notifications.
    pub journal: NotificationLog,
}

impl ManagerState {
    /// Create empty state under `authority`.
    pub fn new(authority: Address, window: AuctionWindow) -> Self {
        Self {
            authority,
            window,
            custody: CustodyLedger::new(),
            liquidations: LiquidationBook::new(),
            journal: NotificationLog::new(),
        }
    }

    /// Check if `caller` is the controlling authority.
    pub fn is_authority(&self, caller: &Address) -> bool {
        self.authority == *caller
    }
}
