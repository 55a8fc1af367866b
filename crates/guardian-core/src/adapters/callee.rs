//! In-memory guarded callee.
//!
//! Stands in for the external contracts a guarded transaction calls. Each
//! `(target, selector)` pair is scripted with a [`CalleeBehavior`]; value
//! transfers draw from a single balance.

use crate::domain::{Address, CallFailure, Selector, U256};
use crate::ports::outbound::{GuardedCall, GuardedCallee};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Scripted reaction to a call.
pub type CallHook = Arc<dyn Fn(&GuardedCall) -> Result<Vec<u8>, CallFailure> + Send + Sync>;

#[derive(Clone)]
pub enum CalleeBehavior {
    /// Succeed with the given return data.
    Return(Vec<u8>),
    /// Revert with the given reason.
    Revert(String),
    /// Run arbitrary code.
    Hook(CallHook),
}

impl fmt::Debug for CalleeBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Return(data) => write!(f, "Return({} bytes)", data.len()),
            Self::Revert(reason) => write!(f, "Revert({reason:?})"),
            Self::Hook(_) => write!(f, "Hook"),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCallee {
    balance: Mutex<U256>,
    behaviors: Mutex<BTreeMap<(Address, Selector), CalleeBehavior>>,
    calls: Mutex<Vec<GuardedCall>>,
}

impl InMemoryCallee {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callee holding `balance` for value transfers.
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance: Mutex::new(balance),
            ..Self::default()
        }
    }

    /// Script the reaction to calls of `selector` on `target`.
    pub fn on(&self, target: Address, selector: Selector, behavior: CalleeBehavior) {
        self.behaviors.lock().insert((target, selector), behavior);
    }

    pub fn balance(&self) -> U256 {
        *self.balance.lock()
    }

    /// Every call received, including failed ones.
    pub fn calls(&self) -> Vec<GuardedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl GuardedCallee for InMemoryCallee {
    fn invoke(&self, call: &GuardedCall) -> Result<Vec<u8>, CallFailure> {
        self.calls.lock().push(call.clone());

        let behavior = self
            .behaviors
            .lock()
            .get(&(call.target, call.selector))
            .cloned()
            .ok_or(CallFailure::UnknownTarget {
                target: call.target,
                selector: call.selector,
            })?;

        {
            let available = *self.balance.lock();
            if call.value > available {
                return Err(CallFailure::InsufficientBalance {
                    required: call.value,
                    available,
                });
            }
        }

        let output = match behavior {
            CalleeBehavior::Return(data) => Ok(data),
            CalleeBehavior::Revert(reason) => Err(CallFailure::Reverted { reason }),
            CalleeBehavior::Hook(hook) => hook(call),
        }?;

        let mut balance = self.balance.lock();
        *balance = balance.saturating_sub(call.value);
        Ok(output)
    }
}
