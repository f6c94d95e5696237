//! Order adapter: checks a submitted order pair against the custodied
//! asset and forwards it to the exchange.
//!
//! The adapter only establishes referential integrity. Signature and price
//! checks stay with the exchange.

use std::sync::Arc;

use custodian_common::{Address, AssetRef, Collaborator, CustodianError, Rejection, Result};
use custodian_protocol::{validate_order_pair, OrderPair, ProofBundle};
use tracing::{debug, warn};

use crate::collaborators::{AssetLedger, Exchange};

/// Forwards validated order pairs to the configured exchange.
pub struct ExchangeAdapter {
    exchange: Arc<dyn Exchange>,
    ledger: Arc<dyn AssetLedger>,
    exchange_address: Address,
    custodian: Address,
}

impl ExchangeAdapter {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        ledger: Arc<dyn AssetLedger>,
        exchange_address: Address,
        custodian: Address,
    ) -> Self {
        Self {
            exchange,
            ledger,
            exchange_address,
            custodian,
        }
    }

    /// Address orders must be bound to.
    pub fn exchange_address(&self) -> Address {
        self.exchange_address
    }

    /// Structural checks only; makes no external call.
    pub fn verify(&self, asset: &AssetRef, orders: &OrderPair) -> Result<()> {
        validate_order_pair(orders, asset, &self.exchange_address)?;
        Ok(())
    }

    /// Approve the custodian's transfer agent for `asset` and submit the
    /// match. On rejection the approval is withdrawn again.
    pub fn forward(&self, asset: &AssetRef, orders: &OrderPair, proof: &ProofBundle) -> Result<()> {
        let agent = self.exchange.transfer_agent(&self.custodian).ok_or_else(|| {
            CustodianError::delegated(
                Collaborator::Exchange,
                Rejection::new(format!("no transfer agent registered for {}", self.custodian)),
            )
        })?;

        self.ledger
            .approve(&self.custodian, Some(&agent), asset)
            .map_err(|r| CustodianError::delegated(Collaborator::AssetLedger, r))?;
        debug!(asset = %asset, agent = %agent, "Transfer agent approved");

        if let Err(rejection) = self.exchange.atomic_match(orders, proof) {
            self.withdraw_approval(asset);
            return Err(CustodianError::delegated(Collaborator::Exchange, rejection));
        }

        Ok(())
    }

    fn withdraw_approval(&self, asset: &AssetRef) {
        if let Err(e) = self.ledger.approve(&self.custodian, None, asset) {
            warn!(asset = %asset, error = %e, "Failed to withdraw transfer agent approval");
        }
    }
}
