//! # Configuration Store
//!
//! The injected state object holding the registry, the catalog and the
//! whitelist. Batches stage a clone of it; snapshots serialize it.

use super::catalog::{FunctionRegistration, FunctionSchemaCatalog};
use super::entities::FunctionSchema;
use super::errors::GuardError;
use super::registry::PermissionRegistry;
use super::system;
use super::value_objects::{Address, Selector};
use super::whitelist::GuardWhitelist;
use serde::{Deserialize, Serialize};

/// Capacity limits for a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_roles: usize,
    pub max_functions: usize,
    pub protected_role_max_wallets: usize,
}

impl StoreLimits {
    pub fn for_testing() -> Self {
        Self {
            max_roles: 16,
            max_functions: 32,
            protected_role_max_wallets: 1,
        }
    }
}

/// Initial members of the protected roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtectedWallets {
    pub owner: Address,
    pub broadcaster: Address,
    pub recovery: Address,
}

/// Deterministic serialization of a [`ConfigStore`].
///
/// Every collection in the store is ordered, so equal stores always produce
/// identical bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistrySnapshot(Vec<u8>);

impl RegistrySnapshot {
    /// Restore the store this snapshot was taken from.
    pub fn decode(&self) -> Result<ConfigStore, GuardError> {
        bincode::deserialize(&self.0).map_err(|e| GuardError::MalformedParams(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigStore {
    pub registry: PermissionRegistry,
    pub catalog: FunctionSchemaCatalog,
    pub whitelist: GuardWhitelist,
}

impl ConfigStore {
    pub fn empty(limits: StoreLimits) -> Self {
        Self {
            registry: PermissionRegistry::new(limits.max_roles),
            catalog: FunctionSchemaCatalog::new(limits.max_functions),
            whitelist: GuardWhitelist::new(),
        }
    }

    /// Empty store seeded with the engine's protected schemas and roles.
    pub fn bootstrap(limits: StoreLimits, wallets: ProtectedWallets) -> Result<Self, GuardError> {
        let mut store = Self::empty(limits);

        for registration in system::system_registrations() {
            store
                .catalog
                .register_function(registration, true, system::is_system_selector)?;
        }

        let seeds = [
            (system::OWNER_ROLE, wallets.owner, system::owner_permissions()),
            (
                system::BROADCASTER_ROLE,
                wallets.broadcaster,
                system::broadcaster_permissions(),
            ),
            (system::RECOVERY_ROLE, wallets.recovery, system::recovery_permissions()),
        ];
        for (name, member, permissions) in seeds {
            store.registry.create_protected_role(
                name,
                limits.protected_role_max_wallets,
                member,
                permissions,
                &store.catalog,
            )?;
        }
        Ok(store)
    }

    /// Register an unprotected schema.
    pub fn register_function(&mut self, registration: FunctionRegistration) -> Result<Selector, GuardError> {
        self.catalog
            .register_function(registration, false, system::is_system_selector)
    }

    /// Remove a schema and its whitelist entries.
    pub fn unregister_function(&mut self, selector: &Selector, safe: bool) -> Result<FunctionSchema, GuardError> {
        let registry = &self.registry;
        let removed = self
            .catalog
            .remove_function_schema(selector, safe, |s| registry.references(s))?;
        self.whitelist.clear(selector);
        Ok(removed)
    }

    pub fn snapshot(&self) -> Result<RegistrySnapshot, GuardError> {
        bincode::serialize(self)
            .map(RegistrySnapshot)
            .map_err(|e| GuardError::Internal(format!("snapshot encoding failed: {e}")))
    }
}
