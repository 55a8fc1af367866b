//! # Batch Configuration
//!
//! Ordered role and guard mutations applied as one all-or-nothing unit.
//!
//! Actions run against a staged copy of the [`ConfigStore`]. The copy replaces
//! the live store only when every action succeeded; on the first failure it
//! is dropped and the live store is untouched.

use super::catalog::FunctionRegistration;
use super::entities::FunctionPermission;
use super::errors::GuardError;
use super::store::ConfigStore;
use super::value_objects::{Address, RoleId, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Registry mutations carried by a role configuration batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleConfigAction {
    CreateRole {
        name: String,
        max_wallets: usize,
        permissions: Vec<FunctionPermission>,
    },
    RemoveRole {
        role_id: RoleId,
    },
    AddWallet {
        role_id: RoleId,
        wallet: Address,
    },
    RevokeWallet {
        role_id: RoleId,
        wallet: Address,
    },
    AddFunctionToRole {
        role_id: RoleId,
        permission: FunctionPermission,
    },
    RemoveFunctionFromRole {
        role_id: RoleId,
        selector: Selector,
    },
}

/// Catalog and whitelist mutations carried by a guard configuration batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardConfigAction {
    AddTargetToWhitelist { selector: Selector, target: Address },
    RemoveTargetFromWhitelist { selector: Selector, target: Address },
    RegisterFunction { registration: FunctionRegistration },
    UnregisterFunction { selector: Selector, safe: bool },
}

/// A single batch step.
pub trait ConfigAction {
    fn apply(&self, store: &mut ConfigStore) -> Result<(), GuardError>;

    /// Short name for logs.
    fn kind(&self) -> &'static str;
}

impl ConfigAction for RoleConfigAction {
    fn apply(&self, store: &mut ConfigStore) -> Result<(), GuardError> {
        match self {
            Self::CreateRole {
                name,
                max_wallets,
                permissions,
            } => store
                .registry
                .create_role(name, *max_wallets, permissions.clone(), &store.catalog)
                .map(|_| ()),
            Self::RemoveRole { role_id } => store.registry.remove_role(role_id).map(|_| ()),
            Self::AddWallet { role_id, wallet } => store.registry.add_wallet(role_id, *wallet),
            Self::RevokeWallet { role_id, wallet } => store.registry.revoke_wallet(role_id, *wallet),
            Self::AddFunctionToRole {
                role_id,
                permission,
            } => store
                .registry
                .add_function_to_role(role_id, permission.clone(), &store.catalog),
            Self::RemoveFunctionFromRole { role_id, selector } => store
                .registry
                .remove_function_from_role(role_id, selector)
                .map(|_| ()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::CreateRole { .. } => "create_role",
            Self::RemoveRole { .. } => "remove_role",
            Self::AddWallet { .. } => "add_wallet",
            Self::RevokeWallet { .. } => "revoke_wallet",
            Self::AddFunctionToRole { .. } => "add_function_to_role",
            Self::RemoveFunctionFromRole { .. } => "remove_function_from_role",
        }
    }
}

impl ConfigAction for GuardConfigAction {
    fn apply(&self, store: &mut ConfigStore) -> Result<(), GuardError> {
        match self {
            Self::AddTargetToWhitelist { selector, target } => {
                store.whitelist.add(*selector, *target, &store.catalog)
            }
            Self::RemoveTargetFromWhitelist { selector, target } => {
                store.whitelist.remove(selector, target)
            }
            Self::RegisterFunction { registration } => {
                store.register_function(registration.clone()).map(|_| ())
            }
            Self::UnregisterFunction { selector, safe } => {
                store.unregister_function(selector, *safe).map(|_| ())
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::AddTargetToWhitelist { .. } => "add_target_to_whitelist",
            Self::RemoveTargetFromWhitelist { .. } => "remove_target_from_whitelist",
            Self::RegisterFunction { .. } => "register_function",
            Self::UnregisterFunction { .. } => "unregister_function",
        }
    }
}

/// Applies configuration batches atomically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchConfigExecutor {
    max_batch_size: usize,
}

impl BatchConfigExecutor {
    pub fn new(max_batch_size: usize) -> Self {
        Self { max_batch_size }
    }

    pub fn check_size(&self, supplied: usize) -> Result<(), GuardError> {
        if supplied > self.max_batch_size {
            return Err(GuardError::BatchSizeExceeded {
                supplied,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }

    /// Apply `actions` in order. On error the store is unchanged and the
    /// failing action's error is returned as is.
    pub fn apply<A: ConfigAction>(&self, store: &mut ConfigStore, actions: &[A]) -> Result<(), GuardError> {
        self.check_size(actions.len())?;
        if actions.is_empty() {
            return Ok(());
        }

        let mut staged = store.clone();
        for (index, action) in actions.iter().enumerate() {
            if let Err(error) = action.apply(&mut staged) {
                warn!(index, kind = action.kind(), %error, "batch aborted");
                return Err(error);
            }
        }

        *store = staged;
        debug!(actions = actions.len(), "batch committed");
        Ok(())
    }
}
