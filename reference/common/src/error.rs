//! Error types for custodian operations.

use crate::{Address, AssetRef, Timestamp};
use std::fmt;
use thiserror::Error;

/// External collaborator a call was delegated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    /// The asset's home ledger.
    AssetLedger,
    /// The order-matching exchange.
    Exchange,
    /// The vault-minting facility.
    VaultFacility,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collaborator::AssetLedger => "asset ledger",
            Collaborator::Exchange => "exchange",
            Collaborator::VaultFacility => "vault facility",
        };
        f.write_str(name)
    }
}

/// Opaque rejection reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Rejection(pub String);

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Main error type for custodian operations.
///
/// Every failing call leaves custody, liquidation and configuration
/// records exactly as they were before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodianError {
    /// Caller lacks the controlling-authority capability.
    #[error("Caller {caller} is not the controlling authority")]
    NotAuthorized { caller: Address },

    /// The custodian does not currently hold the asset.
    #[error("Not token owner: {asset}")]
    NotOwner { asset: AssetRef },

    /// Liquidation re-triggered on an asset already past the deposited state.
    #[error("Already liquidated: {asset}")]
    AlreadyLiquidated { asset: AssetRef },

    /// Disposal attempted on an asset that was never liquidated.
    #[error("Not liquidated: {asset}")]
    NotLiquidated { asset: AssetRef },

    /// Exchange path attempted after the window lapsed.
    #[error("Exchange auction for {asset} expired at {deadline}")]
    AuctionExpired { asset: AssetRef, deadline: Timestamp },

    /// Vault path attempted before the window lapsed.
    #[error("Exchange auction for {asset} in progress until {deadline}")]
    AuctionInProgress { asset: AssetRef, deadline: Timestamp },

    /// Window length below the floor.
    #[error("Invalid duration: {requested}s is below the minimum of {minimum}s")]
    InvalidDuration { requested: u64, minimum: u64 },

    /// Order payload does not reference the asset under consideration or
    /// targets the wrong exchange.
    #[error("Malformed order: {reason}")]
    MalformedOrder { reason: String },

    /// An external collaborator rejected the forwarded call.
    #[error("{collaborator} rejected the call: {reason}")]
    DelegatedFailure {
        collaborator: Collaborator,
        reason: String,
    },

    /// A mutating call re-entered the custodian from a collaborator callback.
    #[error("Re-entrant call rejected")]
    ReentrantCall,

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CustodianError {
    /// Wrap a collaborator rejection.
    pub fn delegated(collaborator: Collaborator, rejection: Rejection) -> Self {
        CustodianError::DelegatedFailure {
            collaborator,
            reason: rejection.0,
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            CustodianError::NotAuthorized { .. } => "NOT_AUTHORIZED",
            CustodianError::NotOwner { .. } => "NOT_OWNER",
            CustodianError::AlreadyLiquidated { .. } => "ALREADY_LIQUIDATED",
            CustodianError::NotLiquidated { .. } => "NOT_LIQUIDATED",
            CustodianError::AuctionExpired { .. } => "AUCTION_EXPIRED",
            CustodianError::AuctionInProgress { .. } => "AUCTION_IN_PROGRESS",
            CustodianError::InvalidDuration { .. } => "INVALID_DURATION",
            CustodianError::MalformedOrder { .. } => "MALFORMED_ORDER",
            CustodianError::DelegatedFailure { .. } => "DELEGATED_FAILURE",
            CustodianError::ReentrantCall => "REENTRANT_CALL",
            CustodianError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for custodian operations.
pub type Result<T> = std::result::Result<T, CustodianError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let asset = AssetRef::new(Address::from_low_u8(1), 1u128);
        let now = chrono::Utc::now();
        let errors = vec![
            CustodianError::NotAuthorized { caller: Address::ZERO },
            CustodianError::NotOwner { asset },
            CustodianError::AlreadyLiquidated { asset },
            CustodianError::NotLiquidated { asset },
            CustodianError::AuctionExpired { asset, deadline: now },
            CustodianError::AuctionInProgress { asset, deadline: now },
            CustodianError::InvalidDuration { requested: 1, minimum: 2 },
            CustodianError::MalformedOrder { reason: "x".into() },
            CustodianError::delegated(Collaborator::Exchange, Rejection::new("nope")),
            CustodianError::ReentrantCall,
            CustodianError::Configuration("bad".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.error_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_delegated_message() {
        let err = CustodianError::delegated(Collaborator::VaultFacility, Rejection::new("no vault"));
        assert_eq!(err.to_string(), "vault facility rejected the call: no vault");
    }
}
