//! The liquidation manager.
//!
//! Every mutating operation runs as one unit of work: guards are checked,
//! external collaborators are called, and only when all of them succeed is
//! state written and notifications emitted. Units of work are serialized
//! by a reentrant lock; a collaborator calling back into a mutating
//! operation is refused, while queries remain available and observe the
//! state as it was before the call.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{info, instrument, warn};

use custodian_common::{Address, AssetRef, Clock, Collaborator, CustodianError, Result, Shares, Timestamp};
use custodian_protocol::{OrderPair, ProofBundle};

use crate::collaborators::{AssetLedger, Exchange, VaultFacility};
use crate::config::ManagerConfig;
use crate::custody::CustodyRecord;
use crate::exchange_adapter::ExchangeAdapter;
use crate::liquidation::{AssetPhase, Disposition, LiquidationRecord};
use crate::metrics::{Metrics, MetricsSnapshot, SharedMetrics};
use crate::notifications::{Notification, NotificationRecord};
use crate::state::ManagerState;
use crate::vault_adapter::VaultAdapter;
use crate::window::AuctionWindow;

/// External systems the manager delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn AssetLedger>,
    pub exchange: Arc<dyn Exchange>,
    pub vault: Arc<dyn VaultFacility>,
}

struct Core {
    state: RefCell<ManagerState>,
    entered: Cell<bool>,
}

/// Exclusive access to the state for the duration of one mutating call.
struct UnitOfWork<'a> {
    guard: ReentrantMutexGuard<'a, Core>,
}

impl<'a> UnitOfWork<'a> {
    fn enter(core: &'a ReentrantMutex<Core>) -> Result<Self> {
        let guard = core.lock();
        if guard.entered.get() {
            return Err(CustodianError::ReentrantCall);
        }
        guard.entered.set(true);
        Ok(Self { guard })
    }

    fn state(&self) -> Ref<'_, ManagerState> {
        self.guard.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, ManagerState> {
        self.guard.state.borrow_mut()
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}

/// Custodies assets and drives their liquidation through the exchange or
/// the vault facility.
pub struct LiquidationManager {
    custodian: Address,
    ledger: Arc<dyn AssetLedger>,
    orders: ExchangeAdapter,
    vault: VaultAdapter,
    clock: Arc<dyn Clock>,
    core: ReentrantMutex<Core>,
    metrics: SharedMetrics,
}

impl LiquidationManager {
    /// Create a manager. The exchange and vault addresses are fixed from here on.
    pub fn new(config: ManagerConfig, collaborators: Collaborators, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let window = AuctionWindow::new(config.auction_window_secs)?;

        info!(
            network = %config.network,
            custodian = %config.custodian,
            authority = %config.authority,
            exchange = %config.exchange,
            vault = %config.vault_factory,
            window_secs = window.secs(),
            "Liquidation manager created"
        );

        Ok(Self {
            custodian: config.custodian,
            ledger: collaborators.ledger.clone(),
            orders: ExchangeAdapter::new(
                collaborators.exchange,
                collaborators.ledger.clone(),
                config.exchange,
                config.custodian,
            ),
            vault: VaultAdapter::new(
                collaborators.vault,
                collaborators.ledger,
                config.vault_factory,
                config.custodian,
            ),
            clock,
            core: ReentrantMutex::new(Core {
                state: RefCell::new(ManagerState::new(config.authority, window)),
                entered: Cell::new(false),
            }),
            metrics: Arc::new(Metrics::new()),
        })
    }

    // --- Operations ---

    /// Take custody of `asset` from `caller`, who must own it and have
    /// authorized the custodian to move it.
    #[instrument(skip_all, fields(caller = %caller, asset = %asset))]
    pub fn deposit(&self, caller: Address, asset: AssetRef) -> Result<()> {
        let result = self.run_deposit(caller, asset);
        self.observe(result)
    }

    /// Start liquidation, snapshotting the current window length.
    #[instrument(skip_all, fields(caller = %caller, asset = %asset))]
    pub fn liquidate(&self, caller: Address, asset: AssetRef) -> Result<LiquidationRecord> {
        let result = self.run_liquidate(caller, asset);
        self.observe(result)
    }

    /// Sell `asset` through the exchange while its window is open.
    #[instrument(skip_all, fields(caller = %caller, asset = %asset))]
    pub fn fulfill_via_exchange(
        &self,
        caller: Address,
        asset: AssetRef,
        orders: &OrderPair,
        proof: &ProofBundle,
    ) -> Result<()> {
        let result = self.run_fulfill(caller, asset, orders, proof);
        self.observe(result)
    }

    /// Hand `asset` to the vault facility once its window has lapsed.
    #[instrument(skip_all, fields(caller = %caller, asset = %asset))]
    pub fn dispose_via_vault(&self, caller: Address, asset: AssetRef) -> Result<Shares> {
        let result = self.run_dispose(caller, asset);
        self.observe(result)
    }

    /// Change the global window length. In-flight liquidations keep theirs.
    #[instrument(skip_all, fields(caller = %caller, window_secs = window_secs))]
    pub fn set_window_length(&self, caller: Address, window_secs: u64) -> Result<()> {
        let result = self.run_set_window(caller, window_secs);
        self.observe(result)
    }

    /// Pass control to `new_authority`.
    #[instrument(skip_all, fields(caller = %caller, new_authority = %new_authority))]
    pub fn transfer_authority(&self, caller: Address, new_authority: Address) -> Result<()> {
        let result = self.run_transfer_authority(caller, new_authority);
        self.observe(result)
    }

    // --- Queries ---

    pub fn window_length(&self) -> u64 {
        self.read(|s| s.window.secs())
    }

    pub fn is_held(&self, asset: &AssetRef) -> bool {
        self.read(|s| s.custody.is_held(asset))
    }

    pub fn authority(&self) -> Address {
        self.read(|s| s.authority)
    }

    /// Address under which assets are held.
    pub fn custodian(&self) -> Address {
        self.custodian
    }

    pub fn exchange_address(&self) -> Address {
        self.orders.exchange_address()
    }

    pub fn vault_address(&self) -> Address {
        self.vault.vault_address()
    }

    pub fn custody_record(&self, asset: &AssetRef) -> Option<CustodyRecord> {
        self.read(|s| s.custody.get(asset).cloned())
    }

    pub fn liquidation_record(&self, asset: &AssetRef) -> Option<LiquidationRecord> {
        self.read(|s| s.liquidations.get(asset).cloned())
    }

    /// Lifecycle phase of `asset` at the current ledger time, or `None` if
    /// it was never deposited.
    pub fn phase(&self, asset: &AssetRef) -> Option<AssetPhase> {
        let now = self.clock.now();
        self.read(|s| match s.liquidations.get(asset) {
            Some(record) => Some(record.phase(now)),
            None if s.custody.is_held(asset) => Some(AssetPhase::Deposited),
            None => None,
        })
    }

    /// Every committed notification, oldest first.
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.read(|s| s.journal.records().to_vec())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Metrics in Prometheus text format.
    pub fn metrics_prometheus(&self) -> String {
        self.metrics.to_prometheus()
    }

    // --- Private methods ---

    fn read<T>(&self, f: impl FnOnce(&ManagerState) -> T) -> T {
        let core = self.core.lock();
        let state = core.state.borrow();
        f(&state)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.metrics.call_failed(e);
            warn!(error_code = e.error_code(), error = %e, "Call rejected");
        }
        result
    }

    fn authorize(&self, uow: &UnitOfWork<'_>, caller: &Address) -> Result<()> {
        if !uow.state().is_authority(caller) {
            return Err(CustodianError::NotAuthorized { caller: *caller });
        }
        Ok(())
    }

    /// The asset must be recorded as held and actually sit with the custodian.
    fn ensure_custody(&self, uow: &UnitOfWork<'_>, asset: &AssetRef) -> Result<()> {
        let held = uow.state().custody.is_held(asset);
        if !held || self.ledger.owner_of(asset) != Some(self.custodian) {
            return Err(CustodianError::NotOwner { asset: *asset });
        }
        Ok(())
    }

    fn commit(&self, state: &mut ManagerState, notification: Notification, at: Timestamp) {
        let record = state.journal.emit(notification, at);
        info!(
            sequence = record.sequence,
            event = record.notification.name(),
            "Notification emitted"
        );
        self.metrics.set_assets_held(state.custody.held_count() as u64);
    }

    fn run_deposit(&self, caller: Address, asset: AssetRef) -> Result<()> {
        let uow = UnitOfWork::enter(&self.core)?;
        let now = self.clock.now();

        {
            let state = uow.state();
            if caller == self.custodian || state.custody.is_held(&asset) {
                return Err(CustodianError::NotOwner { asset });
            }
            if state.liquidations.get(&asset).is_some_and(|r| !r.is_disposed()) {
                return Err(CustodianError::AlreadyLiquidated { asset });
            }
        }
        if self.ledger.owner_of(&asset) != Some(caller) {
            return Err(CustodianError::NotOwner { asset });
        }

        self.ledger
            .transfer_from(&self.custodian, &caller, &self.custodian, &asset)
            .map_err(|r| CustodianError::delegated(Collaborator::AssetLedger, r))?;

        let mut state = uow.state_mut();
        state.custody.record_deposit(asset, caller, now);
        state.liquidations.reset(&asset);
        self.commit(
            &mut state,
            Notification::Deposited {
                asset,
                depositor: caller,
            },
            now,
        );
        self.metrics.deposit();

        info!(asset = %asset, depositor = %caller, "Asset deposited");
        Ok(())
    }

    fn run_liquidate(&self, caller: Address, asset: AssetRef) -> Result<LiquidationRecord> {
        let uow = UnitOfWork::enter(&self.core)?;
        let now = self.clock.now();

        self.authorize(&uow, &caller)?;
        uow.state().liquidations.ensure_startable(&asset)?;
        self.ensure_custody(&uow, &asset)?;

        let mut state = uow.state_mut();
        let window_secs = state.window.secs();
        let record = state.liquidations.begin(asset, now, window_secs)?.clone();
        self.commit(
            &mut state,
            Notification::LiquidationStarted {
                asset,
                liquidated_at: now,
                window_secs,
            },
            now,
        );
        self.metrics.liquidation_started();

        info!(asset = %asset, liquidated_at = %now, window_secs, "Liquidation started");
        Ok(record)
    }

    fn run_fulfill(&self, caller: Address, asset: AssetRef, orders: &OrderPair, proof: &ProofBundle) -> Result<()> {
        let uow = UnitOfWork::enter(&self.core)?;
        let now = self.clock.now();

        self.authorize(&uow, &caller)?;
        uow.state().liquidations.pending(&asset)?;
        self.ensure_custody(&uow, &asset)?;
        uow.state().liquidations.ensure_window_open(&asset, now)?;

        self.orders.verify(&asset, orders)?;
        self.orders.forward(&asset, orders, proof)?;

        let mut state = uow.state_mut();
        let settled = state.liquidations.settle(&asset, Disposition::ViaExchange);
        let released = state.custody.release(&asset);
        debug_assert!(settled && released, "disposal guards admitted a settled asset");
        self.commit(&mut state, Notification::SoldViaExchange { asset }, now);
        self.metrics.exchange_sale();

        info!(asset = %asset, buyer = %orders.buy.maker, "Asset sold via exchange");
        Ok(())
    }

    fn run_dispose(&self, caller: Address, asset: AssetRef) -> Result<Shares> {
        let uow = UnitOfWork::enter(&self.core)?;
        let now = self.clock.now();

        self.authorize(&uow, &caller)?;
        uow.state().liquidations.pending(&asset)?;
        self.ensure_custody(&uow, &asset)?;
        uow.state().liquidations.ensure_window_lapsed(&asset, now)?;

        let proceeds = self.vault.dispose(&asset)?;

        let mut state = uow.state_mut();
        let settled = state.liquidations.settle(&asset, Disposition::ViaVault);
        let released = state.custody.release(&asset);
        debug_assert!(settled && released, "disposal guards admitted a settled asset");
        self.commit(&mut state, Notification::SoldViaVault { asset, proceeds }, now);
        self.metrics.vault_sale();

        info!(asset = %asset, proceeds = %proceeds, "Asset sold via vault");
        Ok(proceeds)
    }

    fn run_set_window(&self, caller: Address, window_secs: u64) -> Result<()> {
        let uow = UnitOfWork::enter(&self.core)?;
        let now = self.clock.now();

        self.authorize(&uow, &caller)?;

        let mut state = uow.state_mut();
        state.window.set(window_secs)?;
        self.commit(&mut state, Notification::WindowLengthChanged { window_secs }, now);
        self.metrics.window_changed();

        info!(window_secs, "Auction window changed");
        Ok(())
    }

    fn run_transfer_authority(&self, caller: Address, new_authority: Address) -> Result<()> {
        let uow = UnitOfWork::enter(&self.core)?;
        let now = self.clock.now();

        self.authorize(&uow, &caller)?;
        if new_authority.is_zero() {
            return Err(CustodianError::Configuration(
                "new authority is the zero address".to_string(),
            ));
        }

        let mut state = uow.state_mut();
        let previous = std::mem::replace(&mut state.authority, new_authority);
        self.commit(
            &mut state,
            Notification::AuthorityTransferred {
                previous,
                current: new_authority,
            },
            now,
        );

        info!(previous = %previous, current = %new_authority, "Authority transferred");
        Ok(())
    }
}
