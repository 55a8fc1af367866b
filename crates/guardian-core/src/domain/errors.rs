//! # Error Types
//!
//! All error conditions for the guard engine, plus the failure payload stored
//! on FAILED transaction records.

use super::value_objects::{Address, RoleId, Selector, Timestamp, TxAction, TxId, TxStatus, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifies the resource a parameterized error refers to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceId {
    Role(RoleId),
    Function(Selector),
    Wallet(Address),
    Target { selector: Selector, target: Address },
    Transaction(TxId),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(id) => write!(f, "role 0x{}", hex::encode(id)),
            Self::Function(selector) => write!(f, "function 0x{}", hex::encode(selector)),
            Self::Wallet(wallet) => write!(f, "wallet 0x{}", hex::encode(wallet)),
            Self::Target { selector, target } => write!(
                f,
                "target 0x{} for function 0x{}",
                hex::encode(target),
                hex::encode(selector)
            ),
            Self::Transaction(tx_id) => write!(f, "transaction {}", tx_id),
        }
    }
}

/// Coarse classification of [`GuardError`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input; the request could never have succeeded.
    Validation,
    /// The caller or signer lacks the right, or the target is protected.
    Authorization,
    /// Envelope binding, freshness or signature failure.
    ReplayIntegrity,
    /// The guarded operation itself failed.
    Execution,
    /// A configured capacity was hit.
    ResourceLimit,
}

impl ErrorCategory {
    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::ReplayIntegrity => "replay_integrity",
            Self::Execution => "execution",
            Self::ResourceLimit => "resource_limit",
        }
    }
}

// =============================================================================
// GUARD ERRORS
// =============================================================================

/// Errors raised by the guard engine.
///
/// Errors raised before any mutation are returned to the caller. Errors raised
/// while a guarded operation executes are stored in the transaction record as
/// an [`ExecutionFailure`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardError {
    // --- Validation ---
    #[error("zero address")]
    ZeroAddress,

    #[error("zero selector")]
    ZeroSelector,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid action: {0}")]
    InvalidAction(u8),

    #[error("invalid action bitmap: 0x{0:04x}")]
    InvalidActionBitmap(u16),

    #[error("operation type mismatch for function 0x{}", hex::encode(.selector))]
    OperationTypeMismatch { selector: Selector },

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("malformed parameters: {0}")]
    MalformedParams(String),

    #[error("not found: {0}")]
    NotFound(ResourceId),

    #[error("already exists: {0}")]
    AlreadyExists(ResourceId),

    #[error("function 0x{} does not support actions 0x{actions:04x}", hex::encode(.selector))]
    NotSupported { selector: Selector, actions: u16 },

    #[error("function 0x{} is still referenced by a role", hex::encode(.0))]
    ResourceStillReferenced(Selector),

    #[error("function 0x{} exists on the engine and must be protected", hex::encode(.0))]
    ContractFunctionMustBeProtected(Selector),

    #[error(
        "function 0x{} does not reference 0x{}",
        hex::encode(.related),
        hex::encode(.selector)
    )]
    HandlerRelationshipMismatch { selector: Selector, related: Selector },

    // --- Authorization ---
    #[error(
        "wallet 0x{} lacks {action} on function 0x{}",
        hex::encode(.wallet),
        hex::encode(.selector)
    )]
    NoPermission {
        wallet: Address,
        action: TxAction,
        selector: Selector,
    },

    #[error("cannot modify protected {0}")]
    CannotModifyProtected(ResourceId),

    #[error("reentrant call rejected")]
    ReentrantCall,

    #[error(
        "target 0x{} is not whitelisted for function 0x{}",
        hex::encode(.target),
        hex::encode(.selector)
    )]
    NotWhitelisted { selector: Selector, target: Address },

    // --- Replay / integrity ---
    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("deadline {deadline} is before now ({now})")]
    DeadlineInPast { deadline: Timestamp, now: Timestamp },

    #[error("gas price {actual} exceeds maximum {max}")]
    GasPriceExceedsMax { actual: U256, max: U256 },

    #[error("invalid signature length: {actual}, expected {expected}")]
    InvalidSignatureLength { actual: usize, expected: usize },

    #[error("signature s value is in the upper half of the curve order")]
    InvalidSValue,

    #[error("invalid signature v value: {0}")]
    InvalidVValue(u8),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid nonce: supplied {supplied}, expected {expected}")]
    InvalidNonce { supplied: u64, expected: u64 },

    #[error(
        "invalid handler selector: expected 0x{}, got 0x{}",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    InvalidHandlerSelector { expected: Selector, actual: Selector },

    #[error("envelope does not match transaction {0}")]
    TxRecordMismatch(TxId),

    // --- State machine ---
    #[error("status mismatch: expected {expected}, found {actual}")]
    StatusMismatch { expected: TxStatus, actual: TxStatus },

    #[error("time lock not elapsed: releases at {release_time}, now {now}")]
    TimeLockNotElapsed { release_time: Timestamp, now: Timestamp },

    #[error("release time {release_time} has passed (now {now})")]
    ReleaseTimeElapsed { release_time: Timestamp, now: Timestamp },

    // --- Execution ---
    #[error("unknown engine operation 0x{}", hex::encode(.0))]
    UnknownOperation(Selector),

    #[error("internal error: {0}")]
    Internal(String),

    // --- Resource limits ---
    #[error("limit reached: {current}/{max}")]
    LimitReached { current: usize, max: usize },

    #[error("batch size {supplied} exceeds maximum {max}")]
    BatchSizeExceeded { supplied: usize, max: usize },
}

impl GuardError {
    /// The category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoPermission { .. }
            | Self::CannotModifyProtected(_)
            | Self::NotWhitelisted { .. }
            | Self::ReentrantCall => ErrorCategory::Authorization,
            Self::ChainIdMismatch { .. }
            | Self::DeadlineInPast { .. }
            | Self::GasPriceExceedsMax { .. }
            | Self::InvalidSignatureLength { .. }
            | Self::InvalidSValue
            | Self::InvalidVValue(_)
            | Self::InvalidSignature
            | Self::InvalidNonce { .. }
            | Self::InvalidHandlerSelector { .. }
            | Self::TxRecordMismatch(_) => ErrorCategory::ReplayIntegrity,
            Self::UnknownOperation(_) | Self::Internal(_) => ErrorCategory::Execution,
            Self::LimitReached { .. } | Self::BatchSizeExceeded { .. } => ErrorCategory::ResourceLimit,
            _ => ErrorCategory::Validation,
        }
    }

    /// Shorthand for a missing transaction record.
    pub fn tx_not_found(tx_id: TxId) -> Self {
        Self::NotFound(ResourceId::Transaction(tx_id))
    }
}

// =============================================================================
// CALL FAILURES
// =============================================================================

/// Failure reported by a guarded callee.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallFailure {
    /// The callee reverted with a reason.
    #[error("reverted: {reason}")]
    Reverted { reason: String },

    /// The callee could not cover the transferred value.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    /// Nothing answers at the target for this selector.
    #[error("no callee at 0x{} for 0x{}", hex::encode(.target), hex::encode(.selector))]
    UnknownTarget { target: Address, selector: Selector },
}

/// Structured payload stored in `TxRecord::result` when a record is FAILED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionFailure {
    /// The engine rejected the operation while executing it.
    Engine(GuardError),
    /// The guarded callee failed.
    Callee(CallFailure),
}

impl ExecutionFailure {
    /// Encode for storage. Never returns an empty buffer.
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_else(|e| format!("unencodable failure: {e}").into_bytes())
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        bincode::deserialize(bytes).ok()
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine: {}", e),
            Self::Callee(e) => write!(f, "callee: {}", e),
        }
    }
}

impl From<GuardError> for ExecutionFailure {
    fn from(e: GuardError) -> Self {
        Self::Engine(e)
    }
}

impl From<CallFailure> for ExecutionFailure {
    fn from(e: CallFailure) -> Self {
        Self::Callee(e)
    }
}
