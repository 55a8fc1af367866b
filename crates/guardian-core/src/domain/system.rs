//! # System Operations
//!
//! Operations the engine implements on itself (target = the engine's own
//! address), their protected schemas, the meta-transaction entry points and
//! the default grants of the protected roles.
//!
//! | Operation | Signature | Operation name |
//! |-----------|-----------|----------------|
//! | Role config batch | `executeRoleConfigBatch((uint8,bytes)[])` | `ROLE_CONFIG_BATCH` |
//! | Guard config batch | `executeGuardConfigBatch((uint8,bytes)[])` | `GUARD_CONFIG_BATCH` |
//! | Transfer ownership | `transferOwnership(address)` | `OWNERSHIP_TRANSFER` |
//! | Update broadcaster | `updateBroadcaster(address)` | `BROADCASTER_UPDATE` |
//! | Update recovery | `updateRecovery(address)` | `RECOVERY_UPDATE` |
//! | Update time lock | `updateTimeLockPeriod(uint256)` | `TIMELOCK_UPDATE` |

use super::batch::{GuardConfigAction, RoleConfigAction};
use super::catalog::FunctionRegistration;
use super::entities::{FunctionPermission, TxRequest};
use super::errors::GuardError;
use super::value_objects::{
    operation_type, selector_of, ActionBitmap, Address, Selector, TxAction, U256,
};
use lazy_static::lazy_static;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeSet;

pub const OWNER_ROLE: &str = "OWNER_ROLE";
pub const BROADCASTER_ROLE: &str = "BROADCASTER_ROLE";
pub const RECOVERY_ROLE: &str = "RECOVERY_ROLE";

pub const ROLE_CONFIG_BATCH_SIG: &str = "executeRoleConfigBatch((uint8,bytes)[])";
pub const GUARD_CONFIG_BATCH_SIG: &str = "executeGuardConfigBatch((uint8,bytes)[])";
pub const TRANSFER_OWNERSHIP_SIG: &str = "transferOwnership(address)";
pub const UPDATE_BROADCASTER_SIG: &str = "updateBroadcaster(address)";
pub const UPDATE_RECOVERY_SIG: &str = "updateRecovery(address)";
pub const UPDATE_TIMELOCK_SIG: &str = "updateTimeLockPeriod(uint256)";

pub const REQUEST_AND_APPROVE_META_SIG: &str = "requestAndApproveExecution(bytes)";
pub const APPROVE_META_SIG: &str = "approveTimeLockExecutionWithMetaTx(bytes)";
pub const CANCEL_META_SIG: &str = "cancelTimeLockExecutionWithMetaTx(bytes)";

pub const ROLE_CONFIG_BATCH: &str = "ROLE_CONFIG_BATCH";
pub const GUARD_CONFIG_BATCH: &str = "GUARD_CONFIG_BATCH";
pub const OWNERSHIP_TRANSFER: &str = "OWNERSHIP_TRANSFER";
pub const BROADCASTER_UPDATE: &str = "BROADCASTER_UPDATE";
pub const RECOVERY_UPDATE: &str = "RECOVERY_UPDATE";
pub const TIMELOCK_UPDATE: &str = "TIMELOCK_UPDATE";

lazy_static! {
    pub static ref ROLE_CONFIG_BATCH_SELECTOR: Selector = selector_of(ROLE_CONFIG_BATCH_SIG);
    pub static ref GUARD_CONFIG_BATCH_SELECTOR: Selector = selector_of(GUARD_CONFIG_BATCH_SIG);
    pub static ref TRANSFER_OWNERSHIP_SELECTOR: Selector = selector_of(TRANSFER_OWNERSHIP_SIG);
    pub static ref UPDATE_BROADCASTER_SELECTOR: Selector = selector_of(UPDATE_BROADCASTER_SIG);
    pub static ref UPDATE_RECOVERY_SELECTOR: Selector = selector_of(UPDATE_RECOVERY_SIG);
    pub static ref UPDATE_TIMELOCK_SELECTOR: Selector = selector_of(UPDATE_TIMELOCK_SIG);

    pub static ref REQUEST_AND_APPROVE_META_SELECTOR: Selector = selector_of(REQUEST_AND_APPROVE_META_SIG);
    pub static ref APPROVE_META_SELECTOR: Selector = selector_of(APPROVE_META_SIG);
    pub static ref CANCEL_META_SELECTOR: Selector = selector_of(CANCEL_META_SIG);

    /// `(signature, operation name, selector)` of every engine operation.
    static ref OPERATIONS: Vec<(&'static str, &'static str, Selector)> = vec![
        (ROLE_CONFIG_BATCH_SIG, ROLE_CONFIG_BATCH, *ROLE_CONFIG_BATCH_SELECTOR),
        (GUARD_CONFIG_BATCH_SIG, GUARD_CONFIG_BATCH, *GUARD_CONFIG_BATCH_SELECTOR),
        (TRANSFER_OWNERSHIP_SIG, OWNERSHIP_TRANSFER, *TRANSFER_OWNERSHIP_SELECTOR),
        (UPDATE_BROADCASTER_SIG, BROADCASTER_UPDATE, *UPDATE_BROADCASTER_SELECTOR),
        (UPDATE_RECOVERY_SIG, RECOVERY_UPDATE, *UPDATE_RECOVERY_SELECTOR),
        (UPDATE_TIMELOCK_SIG, TIMELOCK_UPDATE, *UPDATE_TIMELOCK_SELECTOR),
    ];

    static ref SYSTEM_SELECTORS: BTreeSet<Selector> = OPERATIONS
        .iter()
        .map(|(_, _, selector)| *selector)
        .chain(MetaEntryPoint::ALL.iter().map(|entry| entry.handler()))
        .collect();
}

/// True for every selector the engine implements on itself, handlers included.
pub fn is_system_selector(selector: &Selector) -> bool {
    SYSTEM_SELECTORS.contains(selector)
}

/// True for the engine's own execution operations.
pub fn is_system_operation(selector: &Selector) -> bool {
    OPERATIONS.iter().any(|(_, _, s)| s == selector)
}

// =============================================================================
// META ENTRY POINTS
// =============================================================================

/// The three ways a signed envelope can be submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetaEntryPoint {
    RequestAndApprove,
    Approve,
    Cancel,
}

impl MetaEntryPoint {
    pub const ALL: [MetaEntryPoint; 3] = [
        MetaEntryPoint::RequestAndApprove,
        MetaEntryPoint::Approve,
        MetaEntryPoint::Cancel,
    ];

    /// Handler selector envelopes for this entry point must carry.
    pub fn handler(self) -> Selector {
        match self {
            Self::RequestAndApprove => *REQUEST_AND_APPROVE_META_SELECTOR,
            Self::Approve => *APPROVE_META_SELECTOR,
            Self::Cancel => *CANCEL_META_SELECTOR,
        }
    }

    /// Action the signer must hold on the handler.
    pub fn sign_action(self) -> TxAction {
        match self {
            Self::RequestAndApprove => TxAction::SignMetaRequestAndApprove,
            Self::Approve => TxAction::SignMetaApprove,
            Self::Cancel => TxAction::SignMetaCancel,
        }
    }

    /// Action the submitting broadcaster must hold on the handler.
    pub fn execute_action(self) -> TxAction {
        match self {
            Self::RequestAndApprove => TxAction::ExecuteMetaRequestAndApprove,
            Self::Approve => TxAction::ExecuteMetaApprove,
            Self::Cancel => TxAction::ExecuteMetaCancel,
        }
    }

    fn signature(self) -> &'static str {
        match self {
            Self::RequestAndApprove => REQUEST_AND_APPROVE_META_SIG,
            Self::Approve => APPROVE_META_SIG,
            Self::Cancel => CANCEL_META_SIG,
        }
    }

    fn operation_name(self) -> &'static str {
        match self {
            Self::RequestAndApprove => "META_REQUEST_AND_APPROVE",
            Self::Approve => "META_APPROVE",
            Self::Cancel => "META_CANCEL",
        }
    }

    /// Check the envelope's handler selector and signed action.
    pub fn check(self, handler_selector: &Selector, action: TxAction) -> Result<(), GuardError> {
        if *handler_selector != self.handler() {
            return Err(GuardError::InvalidHandlerSelector {
                expected: self.handler(),
                actual: *handler_selector,
            });
        }
        if action != self.sign_action() {
            return Err(GuardError::InvalidAction(action as u8));
        }
        Ok(())
    }
}

// =============================================================================
// SCHEMAS & DEFAULT GRANTS
// =============================================================================

/// Protected schemas, handlers first so execution schemas can list them.
pub fn system_registrations() -> Vec<FunctionRegistration> {
    let handlers = MetaEntryPoint::ALL.iter().map(|entry| {
        FunctionRegistration::new(
            entry.signature(),
            entry.operation_name(),
            ActionBitmap::from_actions(&[entry.sign_action(), entry.execute_action()]),
        )
    });
    let operations = OPERATIONS.iter().map(|(signature, name, _)| {
        FunctionRegistration::new(signature, name, ActionBitmap::ALL_TIME_DELAY)
            .with_handlers(MetaEntryPoint::ALL.iter().map(|entry| entry.handler()))
    });
    handlers.chain(operations).collect()
}

fn operations_except(excluded: &[Selector]) -> Vec<Selector> {
    OPERATIONS
        .iter()
        .map(|(_, _, selector)| *selector)
        .filter(|selector| !excluded.contains(selector))
        .collect()
}

/// Owner: time-delay control of every operation except requesting an
/// ownership transfer, and signing rights for the matching meta paths.
pub fn owner_permissions() -> Vec<FunctionPermission> {
    let transfer = *TRANSFER_OWNERSHIP_SELECTOR;
    let mut permissions: Vec<FunctionPermission> = operations_except(&[transfer])
        .into_iter()
        .map(|selector| FunctionPermission::for_self(selector, ActionBitmap::ALL_TIME_DELAY))
        .collect();
    permissions.push(FunctionPermission::for_self(
        transfer,
        ActionBitmap::TIME_DELAY_APPROVE.union(ActionBitmap::TIME_DELAY_CANCEL),
    ));

    permissions.push(FunctionPermission::new(
        MetaEntryPoint::RequestAndApprove.handler(),
        ActionBitmap::SIGN_META_REQUEST_AND_APPROVE,
        operations_except(&[transfer]),
    ));
    for entry in [MetaEntryPoint::Approve, MetaEntryPoint::Cancel] {
        permissions.push(FunctionPermission::new(
            entry.handler(),
            ActionBitmap::from_actions(&[entry.sign_action()]),
            operations_except(&[]),
        ));
    }
    permissions
}

/// Broadcaster: submits every signed meta path.
pub fn broadcaster_permissions() -> Vec<FunctionPermission> {
    MetaEntryPoint::ALL
        .iter()
        .map(|entry| {
            FunctionPermission::new(
                entry.handler(),
                ActionBitmap::from_actions(&[entry.execute_action()]),
                operations_except(&[]),
            )
        })
        .collect()
}

/// Recovery: full time-delay control of ownership transfer and signing rights
/// to approve or cancel it.
pub fn recovery_permissions() -> Vec<FunctionPermission> {
    let transfer = *TRANSFER_OWNERSHIP_SELECTOR;
    let mut permissions = vec![FunctionPermission::for_self(
        transfer,
        ActionBitmap::ALL_TIME_DELAY,
    )];
    for entry in [MetaEntryPoint::Approve, MetaEntryPoint::Cancel] {
        permissions.push(FunctionPermission::new(
            entry.handler(),
            ActionBitmap::from_actions(&[entry.sign_action()]),
            [transfer],
        ));
    }
    permissions
}

// =============================================================================
// OPERATION PAYLOADS
// =============================================================================

/// Decoded body of an engine operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemOperation {
    RoleConfigBatch(Vec<RoleConfigAction>),
    GuardConfigBatch(Vec<GuardConfigAction>),
    TransferOwnership(Address),
    UpdateBroadcaster(Address),
    UpdateRecovery(Address),
    UpdateTimeLockPeriod(u64),
}

fn decode_params<T: DeserializeOwned>(params: &[u8]) -> Result<T, GuardError> {
    bincode::deserialize(params).map_err(|e| GuardError::MalformedParams(e.to_string()))
}

fn encode_params<T: Serialize>(value: &T) -> Result<Vec<u8>, GuardError> {
    bincode::serialize(value).map_err(|e| GuardError::Internal(format!("params encoding failed: {e}")))
}

impl SystemOperation {
    pub fn selector(&self) -> Selector {
        match self {
            Self::RoleConfigBatch(_) => *ROLE_CONFIG_BATCH_SELECTOR,
            Self::GuardConfigBatch(_) => *GUARD_CONFIG_BATCH_SELECTOR,
            Self::TransferOwnership(_) => *TRANSFER_OWNERSHIP_SELECTOR,
            Self::UpdateBroadcaster(_) => *UPDATE_BROADCASTER_SELECTOR,
            Self::UpdateRecovery(_) => *UPDATE_RECOVERY_SELECTOR,
            Self::UpdateTimeLockPeriod(_) => *UPDATE_TIMELOCK_SELECTOR,
        }
    }

    pub fn operation_name(&self) -> &'static str {
        match self {
            Self::RoleConfigBatch(_) => ROLE_CONFIG_BATCH,
            Self::GuardConfigBatch(_) => GUARD_CONFIG_BATCH,
            Self::TransferOwnership(_) => OWNERSHIP_TRANSFER,
            Self::UpdateBroadcaster(_) => BROADCASTER_UPDATE,
            Self::UpdateRecovery(_) => RECOVERY_UPDATE,
            Self::UpdateTimeLockPeriod(_) => TIMELOCK_UPDATE,
        }
    }

    /// Encode the execution parameters for this operation.
    pub fn encode_params(&self) -> Result<Vec<u8>, GuardError> {
        match self {
            Self::RoleConfigBatch(actions) => encode_params(actions),
            Self::GuardConfigBatch(actions) => encode_params(actions),
            Self::TransferOwnership(wallet)
            | Self::UpdateBroadcaster(wallet)
            | Self::UpdateRecovery(wallet) => encode_params(wallet),
            Self::UpdateTimeLockPeriod(secs) => encode_params(secs),
        }
    }

    /// Decode the operation addressed by `selector`.
    pub fn decode(selector: &Selector, params: &[u8]) -> Result<Self, GuardError> {
        let op = if *selector == *ROLE_CONFIG_BATCH_SELECTOR {
            Self::RoleConfigBatch(decode_params(params)?)
        } else if *selector == *GUARD_CONFIG_BATCH_SELECTOR {
            Self::GuardConfigBatch(decode_params(params)?)
        } else if *selector == *TRANSFER_OWNERSHIP_SELECTOR {
            Self::TransferOwnership(decode_params(params)?)
        } else if *selector == *UPDATE_BROADCASTER_SELECTOR {
            Self::UpdateBroadcaster(decode_params(params)?)
        } else if *selector == *UPDATE_RECOVERY_SELECTOR {
            Self::UpdateRecovery(decode_params(params)?)
        } else if *selector == *UPDATE_TIMELOCK_SELECTOR {
            Self::UpdateTimeLockPeriod(decode_params(params)?)
        } else {
            return Err(GuardError::UnknownOperation(*selector));
        };
        Ok(op)
    }

    /// Build the request that runs this operation on the engine at `engine`.
    pub fn to_request(&self, engine: Address) -> Result<TxRequest, GuardError> {
        Ok(TxRequest {
            target: engine,
            value: U256::zero(),
            gas_limit: 0,
            operation_type: operation_type(self.operation_name()),
            execution_selector: self.selector(),
            execution_params: self.encode_params()?,
        })
    }
}
