//! # Value Objects
//!
//! Primitive identifiers, the transaction action set and its bitmap.
//!
//! ## Data Types
//!
//! - Address: `[u8; 20]` (wallets, call targets, the engine's own identity)
//! - Hash: `[u8; 32]` (role ids, operation types, meta-transaction messages)
//! - Selector: `[u8; 4]` (function identifiers, `keccak256(signature)[..4]`)
//! - U256: values and gas prices

use super::errors::GuardError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

pub use primitive_types::U256;

/// A 20-byte account address.
pub type Address = [u8; 20];

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 4-byte function selector.
pub type Selector = [u8; 4];

/// Role identifier, `keccak256(role_name)`.
pub type RoleId = Hash;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Transaction identifier, assigned sequentially from 1.
pub type TxId = u64;

/// The all-zero address. Never a valid wallet or target.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// The all-zero selector. Never a valid function.
pub const ZERO_SELECTOR: Selector = [0u8; 4];

/// Keccak-256 hash function.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Derive a function selector from its canonical signature.
pub fn selector_of(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Derive a role id from its name.
pub fn role_id(name: &str) -> RoleId {
    keccak256(name.as_bytes())
}

/// Derive an operation type from its operation name.
pub fn operation_type(name: &str) -> Hash {
    keccak256(name.as_bytes())
}

// =============================================================================
// TRANSACTION ACTIONS
// =============================================================================

/// Actions a role may be granted on a function.
///
/// Discriminants are fixed: they are the bit positions in [`ActionBitmap`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TxAction {
    ExecuteTimeDelayRequest = 0,
    ExecuteTimeDelayApprove = 1,
    ExecuteTimeDelayCancel = 2,
    SignMetaRequestAndApprove = 3,
    SignMetaApprove = 4,
    SignMetaCancel = 5,
    ExecuteMetaRequestAndApprove = 6,
    ExecuteMetaApprove = 7,
    ExecuteMetaCancel = 8,
}

impl TxAction {
    /// Every action, in discriminant order.
    pub const ALL: [TxAction; 9] = [
        TxAction::ExecuteTimeDelayRequest,
        TxAction::ExecuteTimeDelayApprove,
        TxAction::ExecuteTimeDelayCancel,
        TxAction::SignMetaRequestAndApprove,
        TxAction::SignMetaApprove,
        TxAction::SignMetaCancel,
        TxAction::ExecuteMetaRequestAndApprove,
        TxAction::ExecuteMetaApprove,
        TxAction::ExecuteMetaCancel,
    ];

    /// The single bit this action occupies in an [`ActionBitmap`].
    pub const fn bit(self) -> u16 {
        1u16 << (self as u8)
    }

    /// True for the actions a meta-transaction signer holds.
    pub fn is_meta_sign(self) -> bool {
        matches!(
            self,
            TxAction::SignMetaRequestAndApprove | TxAction::SignMetaApprove | TxAction::SignMetaCancel
        )
    }
}

impl TryFrom<u8> for TxAction {
    type Error = GuardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TxAction::ALL
            .get(value as usize)
            .copied()
            .ok_or(GuardError::InvalidAction(value))
    }
}

impl fmt::Display for TxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// ACTION BITMAP
// =============================================================================

/// Fixed-width set of [`TxAction`]s.
///
/// Only the low nine bits are meaningful; construction from raw bits rejects
/// anything above them instead of masking it away.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct ActionBitmap(u16);

impl ActionBitmap {
    /// Mask of every defined action bit.
    pub const VALID_MASK: u16 = 0x01FF;

    pub const EMPTY: ActionBitmap = ActionBitmap(0);
    pub const TIME_DELAY_REQUEST: ActionBitmap = ActionBitmap(TxAction::ExecuteTimeDelayRequest.bit());
    pub const TIME_DELAY_APPROVE: ActionBitmap = ActionBitmap(TxAction::ExecuteTimeDelayApprove.bit());
    pub const TIME_DELAY_CANCEL: ActionBitmap = ActionBitmap(TxAction::ExecuteTimeDelayCancel.bit());
    pub const SIGN_META_REQUEST_AND_APPROVE: ActionBitmap =
        ActionBitmap(TxAction::SignMetaRequestAndApprove.bit());
    pub const SIGN_META_APPROVE: ActionBitmap = ActionBitmap(TxAction::SignMetaApprove.bit());
    pub const SIGN_META_CANCEL: ActionBitmap = ActionBitmap(TxAction::SignMetaCancel.bit());
    pub const EXECUTE_META_REQUEST_AND_APPROVE: ActionBitmap =
        ActionBitmap(TxAction::ExecuteMetaRequestAndApprove.bit());
    pub const EXECUTE_META_APPROVE: ActionBitmap = ActionBitmap(TxAction::ExecuteMetaApprove.bit());
    pub const EXECUTE_META_CANCEL: ActionBitmap = ActionBitmap(TxAction::ExecuteMetaCancel.bit());

    /// All three time-delay actions.
    pub const ALL_TIME_DELAY: ActionBitmap = ActionBitmap(0b000_000_111);
    /// All three signer-side meta actions.
    pub const ALL_META_SIGN: ActionBitmap = ActionBitmap(0b000_111_000);
    /// All three broadcaster-side meta actions.
    pub const ALL_META_EXECUTE: ActionBitmap = ActionBitmap(0b111_000_000);
    /// Every action.
    pub const ALL: ActionBitmap = ActionBitmap(Self::VALID_MASK);

    /// Build a bitmap from raw bits, rejecting undefined bits.
    pub fn from_bits(bits: u16) -> Result<Self, GuardError> {
        if bits & !Self::VALID_MASK != 0 {
            return Err(GuardError::InvalidActionBitmap(bits));
        }
        Ok(Self(bits))
    }

    /// Build a bitmap from a list of actions. Duplicates are harmless.
    pub fn from_actions(actions: &[TxAction]) -> Self {
        Self(actions.iter().fold(0u16, |acc, a| acc | a.bit()))
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, action: TxAction) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_subset_of(self, other: ActionBitmap) -> bool {
        self.0 & !other.0 == 0
    }

    #[must_use]
    pub fn union(self, other: ActionBitmap) -> ActionBitmap {
        ActionBitmap(self.0 | other.0)
    }

    /// The actions in this bitmap, in discriminant order.
    pub fn actions(self) -> Vec<TxAction> {
        TxAction::ALL
            .iter()
            .copied()
            .filter(|a| self.contains(*a))
            .collect()
    }
}

impl TryFrom<u16> for ActionBitmap {
    type Error = GuardError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl From<ActionBitmap> for u16 {
    fn from(bitmap: ActionBitmap) -> Self {
        bitmap.0
    }
}

// =============================================================================
// TRANSACTION STATUS
// =============================================================================

/// Lifecycle status of a [`TxRecord`](super::entities::TxRecord).
///
/// ```text
/// [Pending] ──approve──→ [Executing] ──→ [Completed | Failed]
///     │
///     └──── cancel ────→ [Cancelled]
/// ```
///
/// `Executing` only exists while an external call is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl TxStatus {
    /// True once the record can never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TxStatus::Completed | TxStatus::Failed | TxStatus::Cancelled
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Executing => "EXECUTING",
            TxStatus::Completed => "COMPLETED",
            TxStatus::Failed => "FAILED",
            TxStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}
