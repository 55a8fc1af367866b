//! # Guard Engine Service
//!
//! Application service that implements the `GuardApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`GuardApi`)
//! - Drives the outbound ports (`TimeSource`, `GuardedCallee`, `EventForwarder`)
//! - Delegates authorization, verification and batching to the domain layer
//!
//! ## Locking
//!
//! All state lives behind one `parking_lot::Mutex`. Nonce consumption, status
//! transitions and batch commits each happen inside a single critical section.
//! External calls run with the lock released, after `EXECUTING` has been
//! committed, and a callee or forwarder that calls back into a mutating entry
//! point on the same thread is rejected with `ReentrantCall`.

use crate::config::EngineConfig;
use crate::domain::system::{self, MetaEntryPoint, SystemOperation};
use crate::domain::{
    ensure_approvable, ensure_cancellable, prepare_meta_tx, role_id, verify_envelope,
    Address, AuthorizationPath, BatchConfigExecutor, CallContext, CallFailure, ConfigAction,
    ConfigStore, ExecutionFailure, FunctionSchema, GuardError, Hash, MetaTransaction,
    MetaTxParams, NonceTable, ProtectedWallets, RegistrySnapshot, Role, RoleId, Selector,
    Timestamp, TxAction, TxId, TxParams, TxRecord, TxRequest, TxStatus, TxStore,
    VerificationContext, ZERO_ADDRESS, ZERO_SELECTOR,
};
use crate::ports::inbound::GuardApi;
use crate::ports::outbound::{EventForwarder, GuardedCall, GuardedCallee, TimeSource};
use guardian_telemetry::{
    metric_inc, register_metrics, BATCH_ABORTS, FORWARDER_FAILURES, META_TX_REJECTED, NONCES_CONSUMED,
    TRANSACTIONS_FINALIZED, TRANSACTIONS_REQUESTED,
};
use parking_lot::Mutex;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// =============================================================================
// REENTRANCY GUARD
// =============================================================================

thread_local! {
    static EXTERNAL_CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running callee or forwarder code.
struct ExternalCallScope;

impl ExternalCallScope {
    fn enter() -> Self {
        EXTERNAL_CALL_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for ExternalCallScope {
    fn drop(&mut self) {
        EXTERNAL_CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn ensure_not_reentrant() -> Result<(), GuardError> {
    if EXTERNAL_CALL_DEPTH.with(Cell::get) > 0 {
        warn!("reentrant call rejected");
        return Err(GuardError::ReentrantCall);
    }
    Ok(())
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

// =============================================================================
// STATE
// =============================================================================

/// Everything guarded by the engine lock.
#[derive(Debug)]
struct EngineState {
    store: ConfigStore,
    txs: TxStore,
    nonces: NonceTable,
    time_lock_period: u64,
}

/// What remains to do after `EXECUTING` has been committed.
enum Dispatch {
    /// Settled under the lock (engine operations, execution-time rejections).
    Finished(TxRecord),
    /// Needs the external callee.
    External(GuardedCall),
}

fn status_label(status: TxStatus) -> &'static str {
    match status {
        TxStatus::Pending => "pending",
        TxStatus::Executing => "executing",
        TxStatus::Completed => "completed",
        TxStatus::Failed => "failed",
        TxStatus::Cancelled => "cancelled",
    }
}

/// Time-delay permission: `action` on `selector`, with the permission listing
/// `selector` itself among the selectors it may drive.
fn require_permission(
    store: &ConfigStore,
    wallet: &Address,
    action: TxAction,
    selector: &Selector,
) -> Result<(), GuardError> {
    if store
        .registry
        .has_handler_permission(wallet, action, selector, selector)
    {
        return Ok(());
    }
    Err(GuardError::NoPermission {
        wallet: *wallet,
        action,
        selector: *selector,
    })
}

// =============================================================================
// ENGINE
// =============================================================================

/// Guard engine.
///
/// Owns the configuration store, the transaction records and the signer
/// nonces, and drives the guarded callee and the event forwarders.
pub struct GuardEngine<T: TimeSource, C: GuardedCallee> {
    config: EngineConfig,
    batches: BatchConfigExecutor,
    clock: T,
    callee: C,
    forwarders: Vec<Arc<dyn EventForwarder>>,
    state: Mutex<EngineState>,
}

impl<T: TimeSource, C: GuardedCallee> GuardEngine<T, C> {
    /// Create an engine with the protected roles seeded from `wallets`.
    pub fn new(
        config: EngineConfig,
        wallets: ProtectedWallets,
        clock: T,
        callee: C,
    ) -> Result<Self, GuardError> {
        config.validate()?;
        register_metrics().map_err(|e| GuardError::Internal(e.to_string()))?;
        let store = ConfigStore::bootstrap(config.store_limits(), wallets)?;
        info!(
            chain_id = config.chain_id,
            engine = %hex::encode(config.contract_address),
            time_lock_secs = config.time_lock_period_secs,
            "guard engine initialized"
        );
        Ok(Self {
            batches: BatchConfigExecutor::new(config.max_batch_size),
            state: Mutex::new(EngineState {
                store,
                txs: TxStore::new(),
                nonces: NonceTable::new(),
                time_lock_period: config.time_lock_period_secs,
            }),
            config,
            clock,
            callee,
            forwarders: Vec::new(),
        })
    }

    /// Append a forwarder. Forwarders run in insertion order.
    #[must_use]
    pub fn with_forwarder(mut self, forwarder: Arc<dyn EventForwarder>) -> Self {
        self.forwarders.push(forwarder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's own address.
    pub fn address(&self) -> Address {
        self.config.contract_address
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Checks shared by every path that creates a record.
    fn validate_request(&self, store: &ConfigStore, tx: &TxParams) -> Result<(), GuardError> {
        if tx.target == ZERO_ADDRESS {
            return Err(GuardError::ZeroAddress);
        }
        let selector = tx.execution_selector;
        if selector == ZERO_SELECTOR {
            return Err(GuardError::ZeroSelector);
        }
        if let Some(schema) = store.catalog.get(&selector) {
            if schema.operation_type != tx.operation_type {
                return Err(GuardError::OperationTypeMismatch { selector });
            }
        }

        if tx.target == self.address() {
            if !system::is_system_operation(&selector) {
                return Err(GuardError::UnknownOperation(selector));
            }
            if !tx.value.is_zero() {
                return Err(GuardError::InvalidArgument(
                    "engine operations carry no value".into(),
                ));
            }
            match SystemOperation::decode(&selector, &tx.execution_params)? {
                SystemOperation::RoleConfigBatch(actions) => self.batches.check_size(actions.len())?,
                SystemOperation::GuardConfigBatch(actions) => self.batches.check_size(actions.len())?,
                _ => {}
            }
        }

        store
            .whitelist
            .validate(&selector, &tx.target, &self.address(), &store.catalog)
    }

    /// Entry point binding, signed fields and nonce. Touches nothing.
    fn verify_signed(
        &self,
        state: &EngineState,
        ctx: &CallContext,
        meta: &MetaTransaction,
        entry: MetaEntryPoint,
    ) -> Result<(), GuardError> {
        entry.check(&meta.params.handler_selector, meta.params.action)?;
        let verification = VerificationContext {
            engine_address: self.address(),
            chain_id: self.config.chain_id,
            now: self.clock.now(),
            gas_price: ctx.gas_price,
        };
        verify_envelope(meta, &verification, &state.nonces)
    }

    /// Signer and broadcaster permissions on the entry point's handler.
    fn authorize_meta(
        state: &EngineState,
        ctx: &CallContext,
        meta: &MetaTransaction,
        entry: MetaEntryPoint,
    ) -> Result<(), GuardError> {
        let handler = entry.handler();
        let execution = meta.tx.execution_selector;

        let schema = state.store.catalog.require(&execution)?;
        if !schema.handles(&handler) {
            return Err(GuardError::HandlerRelationshipMismatch {
                selector: handler,
                related: execution,
            });
        }

        let registry = &state.store.registry;
        for (wallet, action) in [
            (meta.params.signer, entry.sign_action()),
            (ctx.caller, entry.execute_action()),
        ] {
            if !registry.has_handler_permission(&wallet, action, &handler, &execution) {
                return Err(GuardError::NoPermission {
                    wallet,
                    action,
                    selector: handler,
                });
            }
        }
        Ok(())
    }

    fn consume_nonce(state: &mut EngineState, meta: &MetaTransaction) -> Result<(), GuardError> {
        let signer = meta.params.signer;
        let next = state.nonces.consume(&signer, meta.params.nonce)?;
        metric_inc!(NONCES_CONSUMED);
        debug!(signer = %hex::encode(signer), next, "nonce consumed");
        Ok(())
    }

    fn rejected(meta: &MetaTransaction, error: GuardError) -> GuardError {
        metric_inc!(META_TX_REJECTED, &[error.category().label()]);
        warn!(
            signer = %hex::encode(meta.params.signer),
            nonce = meta.params.nonce,
            %error,
            "meta-transaction rejected"
        );
        error
    }

    /// Verify a request-and-approve envelope, burn its nonce and create the record.
    fn admit_new_meta(
        &self,
        state: &mut EngineState,
        ctx: &CallContext,
        meta: &MetaTransaction,
    ) -> Result<TxId, GuardError> {
        let entry = MetaEntryPoint::RequestAndApprove;
        if meta.tx_id != 0 {
            return Err(GuardError::TxRecordMismatch(meta.tx_id));
        }
        self.verify_signed(state, ctx, meta, entry)?;
        if meta.tx.requester != meta.params.signer {
            return Err(GuardError::InvalidArgument(
                "requester must be the envelope signer".into(),
            ));
        }
        self.validate_request(&state.store, &meta.tx)?;
        Self::authorize_meta(state, ctx, meta, entry)?;

        Self::consume_nonce(state, meta)?;
        let tx_id = state.txs.create(meta.tx.clone(), self.clock.now())?;
        metric_inc!(TRANSACTIONS_REQUESTED, &[AuthorizationPath::Meta.label()]);
        info!(tx_id, "meta transaction requested");
        Ok(tx_id)
    }

    /// Verify an approve or cancel envelope against its record and burn its nonce.
    fn admit_existing_meta(
        &self,
        state: &mut EngineState,
        ctx: &CallContext,
        meta: &MetaTransaction,
        entry: MetaEntryPoint,
    ) -> Result<(), GuardError> {
        self.verify_signed(state, ctx, meta, entry)?;

        let record = state.txs.get(meta.tx_id)?;
        if record.params != meta.tx {
            return Err(GuardError::TxRecordMismatch(meta.tx_id));
        }
        let now = self.clock.now();
        match entry {
            MetaEntryPoint::Cancel => ensure_cancellable(record, now, AuthorizationPath::Meta)?,
            _ => ensure_approvable(record, now, AuthorizationPath::Meta)?,
        }
        Self::authorize_meta(state, ctx, meta, entry)?;

        Self::consume_nonce(state, meta)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Commit `EXECUTING` and settle everything that does not need the callee.
    fn begin(&self, state: &mut EngineState, tx_id: TxId, approver: Address) -> Result<Dispatch, GuardError> {
        let record = state.txs.get_mut(tx_id)?;
        record.begin_execution(approver)?;
        let params = record.params.clone();
        debug!(tx_id, approver = %hex::encode(approver), "execution started");

        if params.target == self.address() {
            let outcome = self.execute_system(state, &params);
            return Self::finish(state, tx_id, outcome).map(Dispatch::Finished);
        }

        // The whitelist may have changed since the request.
        if let Err(error) = state.store.whitelist.validate(
            &params.execution_selector,
            &params.target,
            &self.address(),
            &state.store.catalog,
        ) {
            return Self::finish(state, tx_id, Err(error.into())).map(Dispatch::Finished);
        }

        Ok(Dispatch::External(GuardedCall {
            tx_id,
            caller: self.address(),
            target: params.target,
            value: params.value,
            gas_limit: params.gas_limit,
            selector: params.execution_selector,
            params: params.execution_params,
        }))
    }

    fn execute_system(&self, state: &mut EngineState, params: &TxParams) -> Result<Vec<u8>, ExecutionFailure> {
        let operation = SystemOperation::decode(&params.execution_selector, &params.execution_params)?;
        debug!(operation = operation.operation_name(), "running engine operation");

        match operation {
            SystemOperation::RoleConfigBatch(actions) => self.apply_batch(&mut state.store, &actions)?,
            SystemOperation::GuardConfigBatch(actions) => self.apply_batch(&mut state.store, &actions)?,
            SystemOperation::TransferOwnership(wallet) => {
                Self::replace_protected(&mut state.store, system::OWNER_ROLE, wallet)?
            }
            SystemOperation::UpdateBroadcaster(wallet) => {
                Self::replace_protected(&mut state.store, system::BROADCASTER_ROLE, wallet)?
            }
            SystemOperation::UpdateRecovery(wallet) => {
                Self::replace_protected(&mut state.store, system::RECOVERY_ROLE, wallet)?
            }
            SystemOperation::UpdateTimeLockPeriod(secs) => {
                if secs == 0 {
                    return Err(GuardError::InvalidArgument("time lock period must be non-zero".into()).into());
                }
                let previous = std::mem::replace(&mut state.time_lock_period, secs);
                info!(previous, secs, "time lock period updated");
            }
        }
        Ok(Vec::new())
    }

    fn apply_batch<A: ConfigAction>(&self, store: &mut ConfigStore, actions: &[A]) -> Result<(), GuardError> {
        self.batches.apply(store, actions).map_err(|error| {
            metric_inc!(BATCH_ABORTS);
            error
        })
    }

    fn replace_protected(store: &mut ConfigStore, role: &str, wallet: Address) -> Result<(), GuardError> {
        let previous = store
            .registry
            .replace_protected_members(&role_id(role), wallet)?;
        info!(
            role,
            new = %hex::encode(wallet),
            replaced = previous.len(),
            "protected role updated"
        );
        Ok(())
    }

    /// Record the outcome of an `EXECUTING` record.
    fn finish(
        state: &mut EngineState,
        tx_id: TxId,
        outcome: Result<Vec<u8>, ExecutionFailure>,
    ) -> Result<TxRecord, GuardError> {
        let record = state.txs.get_mut(tx_id)?;
        match outcome {
            Ok(data) => {
                record.complete(data)?;
                info!(tx_id, "transaction completed");
            }
            Err(failure) => {
                record.fail(&failure)?;
                warn!(tx_id, %failure, "transaction failed");
            }
        }
        metric_inc!(TRANSACTIONS_FINALIZED, &[status_label(record.status)]);
        Ok(record.clone())
    }

    fn call_external(&self, call: &GuardedCall) -> Result<Vec<u8>, ExecutionFailure> {
        let _scope = ExternalCallScope::enter();
        match panic::catch_unwind(AssertUnwindSafe(|| self.callee.invoke(call))) {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(failure)) => Err(failure.into()),
            Err(payload) => Err(CallFailure::Reverted {
                reason: format!("callee panicked: {}", panic_reason(payload.as_ref())),
            }
            .into()),
        }
    }

    /// Run the callee if needed, record the outcome and notify forwarders.
    fn settle(&self, dispatch: Dispatch) -> Result<TxRecord, GuardError> {
        let record = match dispatch {
            Dispatch::Finished(record) => record,
            Dispatch::External(call) => {
                let outcome = self.call_external(&call);
                let mut state = self.state.lock();
                Self::finish(&mut state, call.tx_id, outcome)?
            }
        };
        self.forward(&record);
        Ok(record)
    }

    /// Best-effort notification. Failures and panics are logged and counted.
    fn forward(&self, record: &TxRecord) {
        for forwarder in &self.forwarders {
            let _scope = ExternalCallScope::enter();
            let error = match panic::catch_unwind(AssertUnwindSafe(|| forwarder.forward(record))) {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error.to_string(),
                Err(payload) => format!("panicked: {}", panic_reason(payload.as_ref())),
            };
            metric_inc!(FORWARDER_FAILURES);
            warn!(
                forwarder = forwarder.name(),
                tx_id = record.tx_id,
                %error,
                "event forwarding failed"
            );
        }
    }

    fn cancelled(&self, record: TxRecord) -> TxRecord {
        metric_inc!(TRANSACTIONS_FINALIZED, &[status_label(record.status)]);
        info!(tx_id = record.tx_id, "transaction cancelled");
        self.forward(&record);
        record
    }

    fn protected_member(&self, role: &str) -> Result<Address, GuardError> {
        self.state
            .lock()
            .store
            .registry
            .wallets_in_role(&role_id(role))?
            .first()
            .copied()
            .ok_or_else(|| GuardError::Internal(format!("{role} has no member")))
    }
}

impl<T: TimeSource, C: GuardedCallee> GuardApi for GuardEngine<T, C> {
    #[instrument(skip(self, request), fields(caller = %hex::encode(ctx.caller)))]
    fn request(&self, ctx: CallContext, request: TxRequest) -> Result<TxRecord, GuardError> {
        ensure_not_reentrant()?;
        let params = request.into_params(ctx.caller);

        let record = {
            let mut state = self.state.lock();
            self.validate_request(&state.store, &params)?;
            require_permission(
                &state.store,
                &ctx.caller,
                TxAction::ExecuteTimeDelayRequest,
                &params.execution_selector,
            )?;
            let release_time = self.clock.now().saturating_add(state.time_lock_period);
            let tx_id = state.txs.create(params, release_time)?;
            state.txs.get(tx_id)?.clone()
        };

        metric_inc!(TRANSACTIONS_REQUESTED, &[AuthorizationPath::TimeDelay.label()]);
        info!(
            tx_id = record.tx_id,
            release_time = record.release_time,
            selector = %hex::encode(record.params.execution_selector),
            "transaction requested"
        );
        self.forward(&record);
        Ok(record)
    }

    #[instrument(skip(self), fields(caller = %hex::encode(ctx.caller)))]
    fn approve(&self, ctx: CallContext, tx_id: TxId) -> Result<TxRecord, GuardError> {
        ensure_not_reentrant()?;
        let dispatch = {
            let mut state = self.state.lock();
            let record = state.txs.get(tx_id)?;
            require_permission(
                &state.store,
                &ctx.caller,
                TxAction::ExecuteTimeDelayApprove,
                &record.params.execution_selector,
            )?;
            ensure_approvable(record, self.clock.now(), AuthorizationPath::TimeDelay)?;
            self.begin(&mut state, tx_id, ctx.caller)?
        };
        self.settle(dispatch)
    }

    #[instrument(skip(self), fields(caller = %hex::encode(ctx.caller)))]
    fn cancel(&self, ctx: CallContext, tx_id: TxId) -> Result<TxRecord, GuardError> {
        ensure_not_reentrant()?;
        let record = {
            let mut state = self.state.lock();
            let record = state.txs.get(tx_id)?;
            require_permission(
                &state.store,
                &ctx.caller,
                TxAction::ExecuteTimeDelayCancel,
                &record.params.execution_selector,
            )?;
            ensure_cancellable(record, self.clock.now(), AuthorizationPath::TimeDelay)?;
            let record = state.txs.get_mut(tx_id)?;
            record.cancel(ctx.caller)?;
            record.clone()
        };
        Ok(self.cancelled(record))
    }

    #[instrument(skip(self, meta), fields(signer = %hex::encode(meta.params.signer), nonce = meta.params.nonce))]
    fn request_and_approve_meta(
        &self,
        ctx: CallContext,
        meta: &MetaTransaction,
    ) -> Result<TxRecord, GuardError> {
        ensure_not_reentrant()?;
        let (pending, dispatch) = {
            let mut state = self.state.lock();
            let tx_id = self
                .admit_new_meta(&mut state, &ctx, meta)
                .map_err(|e| Self::rejected(meta, e))?;
            let pending = state.txs.get(tx_id)?.clone();
            (pending, self.begin(&mut state, tx_id, meta.params.signer)?)
        };
        self.forward(&pending);
        self.settle(dispatch)
    }

    #[instrument(skip(self, meta), fields(tx_id = meta.tx_id, signer = %hex::encode(meta.params.signer)))]
    fn approve_meta(&self, ctx: CallContext, meta: &MetaTransaction) -> Result<TxRecord, GuardError> {
        ensure_not_reentrant()?;
        let dispatch = {
            let mut state = self.state.lock();
            self.admit_existing_meta(&mut state, &ctx, meta, MetaEntryPoint::Approve)
                .map_err(|e| Self::rejected(meta, e))?;
            self.begin(&mut state, meta.tx_id, meta.params.signer)?
        };
        self.settle(dispatch)
    }

    #[instrument(skip(self, meta), fields(tx_id = meta.tx_id, signer = %hex::encode(meta.params.signer)))]
    fn cancel_meta(&self, ctx: CallContext, meta: &MetaTransaction) -> Result<TxRecord, GuardError> {
        ensure_not_reentrant()?;
        let record = {
            let mut state = self.state.lock();
            self.admit_existing_meta(&mut state, &ctx, meta, MetaEntryPoint::Cancel)
                .map_err(|e| Self::rejected(meta, e))?;
            let record = state.txs.get_mut(meta.tx_id)?;
            record.cancel(meta.params.signer)?;
            record.clone()
        };
        Ok(self.cancelled(record))
    }

    fn generate_unsigned_meta_tx_for_new(
        &self,
        request: TxRequest,
        params: MetaTxParams,
    ) -> Result<MetaTransaction, GuardError> {
        let tx = request.into_params(params.signer);
        prepare_meta_tx(&self.address(), self.config.chain_id, 0, tx, params)
    }

    fn generate_unsigned_meta_tx_for_existing(
        &self,
        tx_id: TxId,
        params: MetaTxParams,
    ) -> Result<MetaTransaction, GuardError> {
        let tx = self.get_transaction(tx_id)?.params;
        prepare_meta_tx(&self.address(), self.config.chain_id, tx_id, tx, params)
    }

    fn get_role(&self, role_id: &RoleId) -> Result<Role, GuardError> {
        self.state.lock().store.registry.role(role_id).cloned()
    }

    fn roles(&self) -> Vec<Role> {
        self.state.lock().store.registry.roles().cloned().collect()
    }

    fn wallets_in_role(&self, role_id: &RoleId) -> Result<Vec<Address>, GuardError> {
        self.state.lock().store.registry.wallets_in_role(role_id)
    }

    fn wallet_roles(&self, wallet: &Address) -> Vec<RoleId> {
        self.state.lock().store.registry.wallet_roles(wallet)
    }

    fn has_action_permission(&self, wallet: &Address, action: TxAction, selector: &Selector) -> bool {
        self.state
            .lock()
            .store
            .registry
            .has_action_permission(wallet, action, selector)
    }

    fn get_function_schema(&self, selector: &Selector) -> Result<FunctionSchema, GuardError> {
        self.state.lock().store.catalog.require(selector).cloned()
    }

    fn supported_functions(&self) -> Vec<Selector> {
        self.state.lock().store.catalog.supported_functions()
    }

    fn supported_operation_types(&self) -> Vec<(Hash, String)> {
        self.state.lock().store.catalog.operation_types()
    }

    fn get_function_whitelist(&self, selector: &Selector) -> Vec<Address> {
        self.state.lock().store.whitelist.targets(selector)
    }

    fn get_transaction(&self, tx_id: TxId) -> Result<TxRecord, GuardError> {
        self.state.lock().txs.get(tx_id).cloned()
    }

    fn get_transactions(&self, from: TxId, to: TxId) -> Result<Vec<TxRecord>, GuardError> {
        self.state.lock().txs.range(from, to)
    }

    fn pending_transactions(&self) -> Vec<TxId> {
        self.state.lock().txs.pending()
    }

    fn get_signer_nonce(&self, signer: &Address) -> u64 {
        self.state.lock().nonces.get(signer)
    }

    fn time_lock_period(&self) -> Timestamp {
        self.state.lock().time_lock_period
    }

    fn owner(&self) -> Result<Address, GuardError> {
        self.protected_member(system::OWNER_ROLE)
    }

    fn broadcasters(&self) -> Vec<Address> {
        self.wallets_in_role(&role_id(system::BROADCASTER_ROLE))
            .unwrap_or_default()
    }

    fn recovery(&self) -> Result<Address, GuardError> {
        self.protected_member(system::RECOVERY_ROLE)
    }

    fn config_snapshot(&self) -> Result<RegistrySnapshot, GuardError> {
        self.state.lock().store.snapshot()
    }
}
