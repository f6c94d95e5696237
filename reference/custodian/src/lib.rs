//! Custodian Core
//!
//! The liquidation manager holds deposited assets and, once an asset is
//! liquidated, disposes of it exactly once: through the exchange while the
//! auction window is open, or through the vault facility after it lapses.

pub mod collaborators;
pub mod config;
pub mod custody;
pub mod exchange_adapter;
pub mod liquidation;
pub mod manager;
pub mod memory;
pub mod metrics;
pub mod notifications;
pub mod state;
pub mod vault_adapter;
pub mod window;

pub use collaborators::{AssetLedger, Exchange, VaultFacility};
pub use config::{ManagerConfig, Network};
pub use custody::CustodyRecord;
pub use liquidation::{AssetPhase, Disposition, LiquidationRecord};
pub use manager::{Collaborators, LiquidationManager};
pub use notifications::{Notification, NotificationRecord};
