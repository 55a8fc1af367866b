//! # Inbound Ports (Driving Ports / API)
//!
//! The mutation and query surface of the guard engine.
//!
//! Every mutation is itself gated by the permission system: configuration
//! changes are submitted as guarded transactions targeting the engine's own
//! address (see [`SystemOperation`]).
//!
//! [`SystemOperation`]: crate::domain::system::SystemOperation

use crate::domain::{
    Address, CallContext, FunctionSchema, GuardError, Hash, MetaTransaction, MetaTxParams,
    RegistrySnapshot, Role, RoleId, Selector, Timestamp, TxAction, TxId, TxRecord, TxRequest,
};

/// Primary guard engine API.
///
/// Implementations must be thread-safe (`Send + Sync`). Mutations are
/// serialized; queries observe only committed state.
pub trait GuardApi: Send + Sync {
    // =========================================================================
    // Time-delay path
    // =========================================================================

    /// Create a PENDING record releasing after the time lock.
    fn request(&self, ctx: CallContext, request: TxRequest) -> Result<TxRecord, GuardError>;

    /// Approve and dispatch a record whose time lock has elapsed.
    ///
    /// A failing guarded call is recorded as FAILED on the returned record,
    /// not raised.
    fn approve(&self, ctx: CallContext, tx_id: TxId) -> Result<TxRecord, GuardError>;

    /// Cancel a PENDING record before its release time.
    fn cancel(&self, ctx: CallContext, tx_id: TxId) -> Result<TxRecord, GuardError>;

    // =========================================================================
    // Meta-transaction path
    // =========================================================================

    /// Create and execute a record in one step from a signed envelope.
    fn request_and_approve_meta(
        &self,
        ctx: CallContext,
        meta: &MetaTransaction,
    ) -> Result<TxRecord, GuardError>;

    /// Approve an existing record from a signed envelope, ignoring the time lock.
    fn approve_meta(&self, ctx: CallContext, meta: &MetaTransaction) -> Result<TxRecord, GuardError>;

    /// Cancel an existing record from a signed envelope, ignoring the release time.
    fn cancel_meta(&self, ctx: CallContext, meta: &MetaTransaction) -> Result<TxRecord, GuardError>;

    /// Unsigned envelope creating a new record. `params.signer` becomes the requester.
    fn generate_unsigned_meta_tx_for_new(
        &self,
        request: TxRequest,
        params: MetaTxParams,
    ) -> Result<MetaTransaction, GuardError>;

    /// Unsigned envelope for an existing record.
    fn generate_unsigned_meta_tx_for_existing(
        &self,
        tx_id: TxId,
        params: MetaTxParams,
    ) -> Result<MetaTransaction, GuardError>;

    // =========================================================================
    // Queries
    // =========================================================================

    fn get_role(&self, role_id: &RoleId) -> Result<Role, GuardError>;

    fn roles(&self) -> Vec<Role>;

    fn wallets_in_role(&self, role_id: &RoleId) -> Result<Vec<Address>, GuardError>;

    fn wallet_roles(&self, wallet: &Address) -> Vec<RoleId>;

    fn has_action_permission(&self, wallet: &Address, action: TxAction, selector: &Selector) -> bool;

    fn get_function_schema(&self, selector: &Selector) -> Result<FunctionSchema, GuardError>;

    fn supported_functions(&self) -> Vec<Selector>;

    /// `(operation type, operation name)` pairs currently referenced by a schema.
    fn supported_operation_types(&self) -> Vec<(Hash, String)>;

    fn get_function_whitelist(&self, selector: &Selector) -> Vec<Address>;

    fn get_transaction(&self, tx_id: TxId) -> Result<TxRecord, GuardError>;

    /// Records `from..=to`.
    fn get_transactions(&self, from: TxId, to: TxId) -> Result<Vec<TxRecord>, GuardError>;

    fn pending_transactions(&self) -> Vec<TxId>;

    fn get_signer_nonce(&self, signer: &Address) -> u64;

    fn time_lock_period(&self) -> Timestamp;

    fn owner(&self) -> Result<Address, GuardError>;

    fn broadcasters(&self) -> Vec<Address>;

    fn recovery(&self) -> Result<Address, GuardError>;

    /// Deterministic bytes of roles, wallet index, catalog and whitelist.
    fn config_snapshot(&self) -> Result<RegistrySnapshot, GuardError>;
}
