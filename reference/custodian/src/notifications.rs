//! Notifications emitted by committed operations.

use custodian_common::{Address, AssetRef, Shares, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Observable event emitted when a unit of work commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// An asset entered custody.
    Deposited { asset: AssetRef, depositor: Address },
    /// Liquidation began with the window length in force at that moment.
    LiquidationStarted {
        asset: AssetRef,
        liquidated_at: Timestamp,
        window_secs: u64,
    },
    /// The asset was sold through the exchange.
    SoldViaExchange { asset: AssetRef },
    /// The asset was deposited into the vault for shares.
    SoldViaVault { asset: AssetRef, proceeds: Shares },
    /// The global window length changed.
    WindowLengthChanged { window_secs: u64 },
    /// Control passed to a new authority.
    AuthorityTransferred { previous: Address, current: Address },
}

impl Notification {
    /// Short event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Deposited { .. } => "deposited",
            Notification::LiquidationStarted { .. } => "liquidation_started",
            Notification::SoldViaExchange { .. } => "sold_via_exchange",
            Notification::SoldViaVault { .. } => "sold_via_vault",
            Notification::WindowLengthChanged { .. } => "window_length_changed",
            Notification::AuthorityTransferred { .. } => "authority_transferred",
        }
    }

    /// Asset the notification concerns, if any.
    pub fn asset(&self) -> Option<&AssetRef> {
        match self {
            Notification::Deposited { asset, .. }
            | Notification::LiquidationStarted { asset, .. }
            | Notification::SoldViaExchange { asset }
            | Notification::SoldViaVault { asset, .. } => Some(asset),
            Notification::WindowLengthChanged { .. } | Notification::AuthorityTransferred { .. } => None,
        }
    }
}

/// A notification as recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Time-ordered identifier.
    pub id: Uuid,
    /// Position in the journal, starting at zero.
    pub sequence: u64,
    /// Ledger time of the committing unit of work.
    pub emitted_at: Timestamp,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Append-only journal of committed notifications.
#[derive(Debug, Default, Clone)]
pub struct NotificationLog {
    records: Vec<NotificationRecord>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a notification and return its record.
    pub fn emit(&mut self, notification: Notification, at: Timestamp) -> &NotificationRecord {
        let sequence = self.records.len() as u64;
        self.records.push(NotificationRecord {
            id: Uuid::now_v7(),
            sequence,
            emitted_at: at,
            notification,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_common::{Clock, ManualClock};

    #[test]
    fn test_sequence_and_serialization() {
        let clock = ManualClock::default();
        let asset = AssetRef::new(Address::from_low_u8(0xc0), 1u128);
        let mut log = NotificationLog::new();

        log.emit(Notification::WindowLengthChanged { window_secs: 43_200 }, clock.now());
        let record = log.emit(Notification::SoldViaExchange { asset }, clock.now()).clone();

        assert_eq!(log.len(), 2);
        assert_eq!(record.sequence, 1);
        assert_eq!(record.notification.asset(), Some(&asset));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "sold_via_exchange");
        assert_eq!(json["sequence"], 1);
        assert_eq!(json["asset"]["token_id"], "1");
    }
}
