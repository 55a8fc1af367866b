//! # Transaction State Machine
//!
//! Record storage and the gating rules for approve and cancel.
//!
//! ```text
//! [PENDING] ──approve──→ [EXECUTING] ──→ [COMPLETED | FAILED]
//!     │
//!     └──── cancel ────→ [CANCELLED]
//! ```
//!
//! | Transition | Time-delay path | Meta path |
//! |------------|-----------------|-----------|
//! | approve | `now >= release_time` | no time gate |
//! | cancel | `now < release_time` | no time gate |
//!
//! Status is checked before any side effect, and `EXECUTING` is committed
//! before the guarded call is dispatched.

use super::entities::{TxParams, TxRecord};
use super::errors::GuardError;
use super::value_objects::{Timestamp, TxId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an approve or cancel was authorized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationPath {
    TimeDelay,
    Meta,
}

impl AuthorizationPath {
    pub fn label(self) -> &'static str {
        match self {
            Self::TimeDelay => "time_delay",
            Self::Meta => "meta",
        }
    }
}

/// Fails unless `record` may be approved at `now` on `path`.
pub fn ensure_approvable(record: &TxRecord, now: Timestamp, path: AuthorizationPath) -> Result<(), GuardError> {
    record.ensure_pending()?;
    if path == AuthorizationPath::TimeDelay && now < record.release_time {
        return Err(GuardError::TimeLockNotElapsed {
            release_time: record.release_time,
            now,
        });
    }
    Ok(())
}

/// Fails unless `record` may be cancelled at `now` on `path`.
pub fn ensure_cancellable(record: &TxRecord, now: Timestamp, path: AuthorizationPath) -> Result<(), GuardError> {
    record.ensure_pending()?;
    if path == AuthorizationPath::TimeDelay && now >= record.release_time {
        return Err(GuardError::ReleaseTimeElapsed {
            release_time: record.release_time,
            now,
        });
    }
    Ok(())
}

/// Transaction records keyed by id. Ids start at 1 and are never reused.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStore {
    records: BTreeMap<TxId, TxRecord>,
    last_id: TxId,
}

impl TxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a PENDING record and return its id.
    pub fn create(&mut self, params: TxParams, release_time: Timestamp) -> Result<TxId, GuardError> {
        let tx_id = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| GuardError::Internal("transaction id overflow".into()))?;
        self.records
            .insert(tx_id, TxRecord::new(tx_id, release_time, params));
        self.last_id = tx_id;
        Ok(tx_id)
    }

    pub fn get(&self, tx_id: TxId) -> Result<&TxRecord, GuardError> {
        self.records
            .get(&tx_id)
            .ok_or_else(|| GuardError::tx_not_found(tx_id))
    }

    pub fn get_mut(&mut self, tx_id: TxId) -> Result<&mut TxRecord, GuardError> {
        self.records
            .get_mut(&tx_id)
            .ok_or_else(|| GuardError::tx_not_found(tx_id))
    }

    /// Records `from..=to`.
    pub fn range(&self, from: TxId, to: TxId) -> Result<Vec<TxRecord>, GuardError> {
        if from == 0 || from > to {
            return Err(GuardError::InvalidArgument(format!(
                "invalid transaction range {from}..={to}"
            )));
        }
        if to > self.last_id {
            return Err(GuardError::tx_not_found(to));
        }
        Ok(self.records.range(from..=to).map(|(_, r)| r.clone()).collect())
    }

    /// Ids of PENDING records, ascending.
    pub fn pending(&self) -> Vec<TxId> {
        self.records
            .values()
            .filter(|r| r.is_pending())
            .map(|r| r.tx_id)
            .collect()
    }
}
