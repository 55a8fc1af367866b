//! Outbound (Driven) ports for the guard engine.
//!
//! These traits define the external collaborators the engine calls: the
//! clock, the guarded callee and event forwarders.

use crate::domain::{Address, CallFailure, Selector, Timestamp, TxId, TxRecord, U256};
use std::sync::Arc;
use thiserror::Error;

/// Time source for release times and deadlines.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in seconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// A guarded call dispatched to an external target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardedCall {
    pub tx_id: TxId,
    /// The engine's own address.
    pub caller: Address,
    pub target: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub selector: Selector,
    pub params: Vec<u8>,
}

/// The abstract "perform guarded call" capability.
///
/// Called without the engine lock held. A callee that re-enters the engine
/// from inside `invoke` is rejected.
pub trait GuardedCallee: Send + Sync {
    /// Perform the call and return its return data.
    fn invoke(&self, call: &GuardedCall) -> Result<Vec<u8>, CallFailure>;
}

impl<T: GuardedCallee + ?Sized> GuardedCallee for Arc<T> {
    fn invoke(&self, call: &GuardedCall) -> Result<Vec<u8>, CallFailure> {
        (**self).invoke(call)
    }
}

/// Errors reported by an event forwarder. Logged, never propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForwardError {
    #[error("forwarder unavailable: {0}")]
    Unavailable(String),

    #[error("forwarder rejected event: {0}")]
    Rejected(String),
}

/// Best-effort notification of committed state transitions.
pub trait EventForwarder: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Forward a record after its transition has been committed.
    fn forward(&self, record: &TxRecord) -> Result<(), ForwardError>;
}
