//! Core domain entities for the guard engine.
//!
//! Roles, permissions, function schemas, transaction records and the
//! meta-transaction envelope.

use super::errors::{ExecutionFailure, GuardError};
use super::value_objects::{
    role_id, ActionBitmap, Address, Hash, RoleId, Selector, Timestamp, TxAction, TxId, TxStatus,
    U256,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PERMISSIONS & ROLES
// =============================================================================

/// Actions a role may perform on one function.
///
/// `handler_for_selectors` lists the execution selectors this permission may
/// be exercised for when `selector` is a handler. For a plain execution
/// function it lists the function itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPermission {
    pub selector: Selector,
    pub granted_actions: ActionBitmap,
    pub handler_for_selectors: BTreeSet<Selector>,
}

impl FunctionPermission {
    pub fn new(
        selector: Selector,
        granted_actions: ActionBitmap,
        handler_for_selectors: impl IntoIterator<Item = Selector>,
    ) -> Self {
        Self {
            selector,
            granted_actions,
            handler_for_selectors: handler_for_selectors.into_iter().collect(),
        }
    }

    /// Permission for an execution function that handles only itself.
    pub fn for_self(selector: Selector, granted_actions: ActionBitmap) -> Self {
        Self::new(selector, granted_actions, [selector])
    }

    /// Merge another permission on the same function into this one.
    pub fn merge(&mut self, other: &FunctionPermission) {
        self.granted_actions = self.granted_actions.union(other.granted_actions);
        self.handler_for_selectors
            .extend(other.handler_for_selectors.iter().copied());
    }
}

/// A named set of wallets sharing function permissions.
///
/// Fields are private: membership and permissions change only through the
/// [`PermissionRegistry`](super::registry::PermissionRegistry), which keeps
/// the reverse wallet index consistent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    name: String,
    id: RoleId,
    max_wallets: usize,
    members: BTreeSet<Address>,
    permissions: BTreeMap<Selector, FunctionPermission>,
    protected: bool,
}

impl Role {
    pub(crate) fn new(name: &str, max_wallets: usize, protected: bool) -> Self {
        Self {
            name: name.to_string(),
            id: role_id(name),
            max_wallets,
            members: BTreeSet::new(),
            permissions: BTreeMap::new(),
            protected,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> RoleId {
        self.id
    }

    pub fn max_wallets(&self) -> usize {
        self.max_wallets
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn members(&self) -> &BTreeSet<Address> {
        &self.members
    }

    pub fn has_member(&self, wallet: &Address) -> bool {
        self.members.contains(wallet)
    }

    pub fn permissions(&self) -> &BTreeMap<Selector, FunctionPermission> {
        &self.permissions
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_wallets
    }

    pub(crate) fn members_mut(&mut self) -> &mut BTreeSet<Address> {
        &mut self.members
    }

    pub(crate) fn permissions_mut(&mut self) -> &mut BTreeMap<Selector, FunctionPermission> {
        &mut self.permissions
    }
}

// =============================================================================
// FUNCTION SCHEMAS
// =============================================================================

/// Registered description of a guarded operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub selector: Selector,
    pub signature: String,
    pub operation_type: Hash,
    pub operation_name: String,
    pub supported_actions: ActionBitmap,
    pub protected: bool,
    pub handler_for_selectors: BTreeSet<Selector>,
}

impl FunctionSchema {
    /// True when this schema may act as a handler for `execution`.
    pub fn handles(&self, execution: &Selector) -> bool {
        self.handler_for_selectors.contains(execution)
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// The guarded call a transaction authorizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    pub requester: Address,
    pub target: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub operation_type: Hash,
    pub execution_selector: Selector,
    pub execution_params: Vec<u8>,
}

/// Caller-supplied body of a new transaction. The requester is taken from
/// the call context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    pub target: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub operation_type: Hash,
    pub execution_selector: Selector,
    pub execution_params: Vec<u8>,
}

impl TxRequest {
    pub fn into_params(self, requester: Address) -> TxParams {
        TxParams {
            requester,
            target: self.target,
            value: self.value,
            gas_limit: self.gas_limit,
            operation_type: self.operation_type,
            execution_selector: self.execution_selector,
            execution_params: self.execution_params,
        }
    }
}

/// Record of one guarded transaction.
///
/// Created PENDING; moves to exactly one terminal status and is then frozen.
/// `result` holds return data when COMPLETED and an encoded
/// [`ExecutionFailure`] when FAILED.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_id: TxId,
    pub release_time: Timestamp,
    pub status: TxStatus,
    pub params: TxParams,
    pub approver: Option<Address>,
    pub result: Vec<u8>,
}

impl TxRecord {
    pub fn new(tx_id: TxId, release_time: Timestamp, params: TxParams) -> Self {
        Self {
            tx_id,
            release_time,
            status: TxStatus::Pending,
            params,
            approver: None,
            result: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }

    /// Decoded failure payload, if the record FAILED.
    pub fn failure(&self) -> Option<ExecutionFailure> {
        if self.status != TxStatus::Failed {
            return None;
        }
        ExecutionFailure::decode(&self.result)
    }

    /// Fails with `StatusMismatch` unless the record is PENDING.
    pub fn ensure_pending(&self) -> Result<(), GuardError> {
        self.ensure_status(TxStatus::Pending)
    }

    fn ensure_status(&self, expected: TxStatus) -> Result<(), GuardError> {
        if self.status != expected {
            return Err(GuardError::StatusMismatch {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    /// PENDING -> EXECUTING. Committed before any call is dispatched.
    pub fn begin_execution(&mut self, approver: Address) -> Result<(), GuardError> {
        self.ensure_pending()?;
        self.status = TxStatus::Executing;
        self.approver = Some(approver);
        Ok(())
    }

    /// EXECUTING -> COMPLETED.
    pub fn complete(&mut self, return_data: Vec<u8>) -> Result<(), GuardError> {
        self.ensure_status(TxStatus::Executing)?;
        self.status = TxStatus::Completed;
        self.result = return_data;
        Ok(())
    }

    /// EXECUTING -> FAILED.
    pub fn fail(&mut self, failure: &ExecutionFailure) -> Result<(), GuardError> {
        self.ensure_status(TxStatus::Executing)?;
        self.status = TxStatus::Failed;
        self.result = failure.encode();
        Ok(())
    }

    /// PENDING -> CANCELLED.
    pub fn cancel(&mut self, canceller: Address) -> Result<(), GuardError> {
        self.ensure_pending()?;
        self.status = TxStatus::Cancelled;
        self.approver = Some(canceller);
        Ok(())
    }
}

// =============================================================================
// META-TRANSACTIONS
// =============================================================================

/// Authorization parameters signed alongside the transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTxParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub handler_selector: Selector,
    pub action: TxAction,
    pub deadline: Timestamp,
    /// Zero means no ceiling.
    pub max_gas_price: U256,
    pub signer: Address,
}

/// A signed authorization envelope.
///
/// `tx_id` is zero for request-and-approve envelopes and names the existing
/// record for approve/cancel envelopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransaction {
    pub tx_id: TxId,
    pub tx: TxParams,
    pub params: MetaTxParams,
    pub message: Hash,
    pub signature: Vec<u8>,
}

/// Caller-side context of an engine call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub gas_price: U256,
}

impl CallContext {
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            gas_price: U256::zero(),
        }
    }

    #[must_use]
    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }
}
