//! # Permission Registry
//!
//! Roles, their member wallets and per-function action permissions.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Protected roles are never edited through the registry | every mutator checks `is_protected()` first |
//! | `members.len() <= max_wallets`, `max_wallets > 0` | `create_role`, `add_wallet` |
//! | Reverse wallet index mirrors role membership | `index_insert` / `index_remove` |
//! | Permissions reference existing schemas with a non-empty, supported bitmap | `validate_permission` |
//!
//! Permission checks OR across every role a wallet holds.

use super::catalog::FunctionSchemaCatalog;
use super::entities::{FunctionPermission, Role};
use super::errors::{GuardError, ResourceId};
use super::value_objects::{Address, RoleId, Selector, TxAction, ZERO_ADDRESS, ZERO_SELECTOR};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRegistry {
    roles: BTreeMap<RoleId, Role>,
    wallet_roles: BTreeMap<Address, BTreeSet<RoleId>>,
    max_roles: usize,
}

impl PermissionRegistry {
    pub fn new(max_roles: usize) -> Self {
        Self {
            roles: BTreeMap::new(),
            wallet_roles: BTreeMap::new(),
            max_roles,
        }
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create an unprotected role.
    pub fn create_role(
        &mut self,
        name: &str,
        max_wallets: usize,
        initial_permissions: Vec<FunctionPermission>,
        catalog: &FunctionSchemaCatalog,
    ) -> Result<RoleId, GuardError> {
        let mut role = self.prepare_role(name, max_wallets, false)?;

        for permission in initial_permissions {
            validate_permission(&permission, catalog)?;
            if role.permissions().contains_key(&permission.selector) {
                return Err(GuardError::AlreadyExists(ResourceId::Function(
                    permission.selector,
                )));
            }
            role.permissions_mut().insert(permission.selector, permission);
        }

        let id = role.id();
        self.roles.insert(id, role);
        Ok(id)
    }

    /// Create a protected role holding `member`. Only used when the engine
    /// seeds its built-in roles.
    pub(crate) fn create_protected_role(
        &mut self,
        name: &str,
        max_wallets: usize,
        member: Address,
        permissions: Vec<FunctionPermission>,
        catalog: &FunctionSchemaCatalog,
    ) -> Result<RoleId, GuardError> {
        if member == ZERO_ADDRESS {
            return Err(GuardError::ZeroAddress);
        }
        let mut role = self.prepare_role(name, max_wallets, true)?;
        for permission in permissions {
            validate_permission(&permission, catalog)?;
            match role.permissions_mut().get_mut(&permission.selector) {
                Some(existing) => existing.merge(&permission),
                None => {
                    role.permissions_mut().insert(permission.selector, permission);
                }
            }
        }
        role.members_mut().insert(member);

        let id = role.id();
        self.roles.insert(id, role);
        self.index_insert(member, id);
        Ok(id)
    }

    fn prepare_role(&self, name: &str, max_wallets: usize, protected: bool) -> Result<Role, GuardError> {
        if name.is_empty() {
            return Err(GuardError::InvalidArgument("empty role name".into()));
        }
        if max_wallets == 0 {
            return Err(GuardError::InvalidArgument(
                "max wallets must be greater than zero".into(),
            ));
        }
        let role = Role::new(name, max_wallets, protected);
        if self.roles.contains_key(&role.id()) {
            return Err(GuardError::AlreadyExists(ResourceId::Role(role.id())));
        }
        if self.roles.len() >= self.max_roles {
            return Err(GuardError::LimitReached {
                current: self.roles.len(),
                max: self.max_roles,
            });
        }
        Ok(role)
    }

    pub fn remove_role(&mut self, role_id: &RoleId) -> Result<Role, GuardError> {
        self.unprotected_role(role_id)?;
        let role = self
            .roles
            .remove(role_id)
            .ok_or(GuardError::NotFound(ResourceId::Role(*role_id)))?;
        for wallet in role.members() {
            self.index_remove(wallet, role_id);
        }
        Ok(role)
    }

    pub fn add_wallet(&mut self, role_id: &RoleId, wallet: Address) -> Result<(), GuardError> {
        let role = self.unprotected_role(role_id)?;
        if wallet == ZERO_ADDRESS {
            return Err(GuardError::ZeroAddress);
        }
        if role.has_member(&wallet) {
            return Err(GuardError::AlreadyExists(ResourceId::Wallet(wallet)));
        }
        if role.is_full() {
            return Err(GuardError::LimitReached {
                current: role.members().len(),
                max: role.max_wallets(),
            });
        }
        self.role_mut(role_id)?.members_mut().insert(wallet);
        self.index_insert(wallet, *role_id);
        Ok(())
    }

    pub fn revoke_wallet(&mut self, role_id: &RoleId, wallet: Address) -> Result<(), GuardError> {
        let role = self.unprotected_role(role_id)?;
        if !role.has_member(&wallet) {
            return Err(GuardError::NotFound(ResourceId::Wallet(wallet)));
        }
        self.role_mut(role_id)?.members_mut().remove(&wallet);
        self.index_remove(&wallet, role_id);
        Ok(())
    }

    pub fn add_function_to_role(
        &mut self,
        role_id: &RoleId,
        permission: FunctionPermission,
        catalog: &FunctionSchemaCatalog,
    ) -> Result<(), GuardError> {
        let role = self.unprotected_role(role_id)?;
        validate_permission(&permission, catalog)?;
        if role.permissions().contains_key(&permission.selector) {
            return Err(GuardError::AlreadyExists(ResourceId::Function(
                permission.selector,
            )));
        }
        self.role_mut(role_id)?
            .permissions_mut()
            .insert(permission.selector, permission);
        Ok(())
    }

    pub fn remove_function_from_role(
        &mut self,
        role_id: &RoleId,
        selector: &Selector,
    ) -> Result<FunctionPermission, GuardError> {
        self.unprotected_role(role_id)?;
        self.role_mut(role_id)?
            .permissions_mut()
            .remove(selector)
            .ok_or(GuardError::NotFound(ResourceId::Function(*selector)))
    }

    /// Replace every member of a protected role with `new_member`.
    ///
    /// This is the only way protected membership changes; it backs the
    /// ownership, broadcaster and recovery update operations.
    pub(crate) fn replace_protected_members(
        &mut self,
        role_id: &RoleId,
        new_member: Address,
    ) -> Result<BTreeSet<Address>, GuardError> {
        if new_member == ZERO_ADDRESS {
            return Err(GuardError::ZeroAddress);
        }
        let role = self.role(role_id)?;
        if !role.is_protected() {
            return Err(GuardError::InvalidArgument(
                "member replacement is reserved for protected roles".into(),
            ));
        }
        if role.has_member(&new_member) {
            return Err(GuardError::AlreadyExists(ResourceId::Wallet(new_member)));
        }

        let previous = std::mem::take(self.role_mut(role_id)?.members_mut());
        for wallet in &previous {
            self.index_remove(wallet, role_id);
        }
        self.role_mut(role_id)?.members_mut().insert(new_member);
        self.index_insert(new_member, *role_id);
        Ok(previous)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// True iff any role of `wallet` grants `action` on `selector`.
    pub fn has_action_permission(&self, wallet: &Address, action: TxAction, selector: &Selector) -> bool {
        self.permissions_of(wallet)
            .any(|p| p.selector == *selector && p.granted_actions.contains(action))
    }

    /// True iff any role of `wallet` grants `action` on `handler` for the
    /// execution selector `execution`.
    ///
    /// A permission on a handler that does not list the execution selector
    /// does not authorize it.
    pub fn has_handler_permission(
        &self,
        wallet: &Address,
        action: TxAction,
        handler: &Selector,
        execution: &Selector,
    ) -> bool {
        self.permissions_of(wallet).any(|p| {
            p.selector == *handler
                && p.granted_actions.contains(action)
                && p.handler_for_selectors.contains(execution)
        })
    }

    fn permissions_of<'a>(&'a self, wallet: &Address) -> impl Iterator<Item = &'a FunctionPermission> + 'a {
        self.wallet_roles
            .get(wallet)
            .into_iter()
            .flatten()
            .filter_map(|id| self.roles.get(id))
            .flat_map(|role| role.permissions().values())
    }

    /// True when any role still grants a permission on `selector` or lists it
    /// as a handled selector.
    pub fn references(&self, selector: &Selector) -> bool {
        self.roles.values().any(|role| {
            role.permissions()
                .values()
                .any(|p| p.selector == *selector || p.handler_for_selectors.contains(selector))
        })
    }

    pub fn get_role(&self, role_id: &RoleId) -> Option<&Role> {
        self.roles.get(role_id)
    }

    pub fn role(&self, role_id: &RoleId) -> Result<&Role, GuardError> {
        self.roles
            .get(role_id)
            .ok_or(GuardError::NotFound(ResourceId::Role(*role_id)))
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn role_ids(&self) -> Vec<RoleId> {
        self.roles.keys().copied().collect()
    }

    pub fn wallets_in_role(&self, role_id: &RoleId) -> Result<Vec<Address>, GuardError> {
        Ok(self.role(role_id)?.members().iter().copied().collect())
    }

    pub fn wallet_roles(&self, wallet: &Address) -> Vec<RoleId> {
        self.wallet_roles
            .get(wallet)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn role_mut(&mut self, role_id: &RoleId) -> Result<&mut Role, GuardError> {
        self.roles
            .get_mut(role_id)
            .ok_or(GuardError::NotFound(ResourceId::Role(*role_id)))
    }

    fn unprotected_role(&self, role_id: &RoleId) -> Result<&Role, GuardError> {
        let role = self.role(role_id)?;
        if role.is_protected() {
            return Err(GuardError::CannotModifyProtected(ResourceId::Role(*role_id)));
        }
        Ok(role)
    }

    fn index_insert(&mut self, wallet: Address, role_id: RoleId) {
        self.wallet_roles.entry(wallet).or_default().insert(role_id);
    }

    fn index_remove(&mut self, wallet: &Address, role_id: &RoleId) {
        if let Some(ids) = self.wallet_roles.get_mut(wallet) {
            ids.remove(role_id);
            if ids.is_empty() {
                self.wallet_roles.remove(wallet);
            }
        }
    }

    /// Check the reverse index against role membership. Test support.
    #[cfg(test)]
    pub(crate) fn index_is_consistent(&self) -> bool {
        let mut expected: BTreeMap<Address, BTreeSet<RoleId>> = BTreeMap::new();
        for role in self.roles.values() {
            for wallet in role.members() {
                expected.entry(*wallet).or_default().insert(role.id());
            }
        }
        expected == self.wallet_roles
    }
}

/// Check a permission against the catalog.
pub fn validate_permission(
    permission: &FunctionPermission,
    catalog: &FunctionSchemaCatalog,
) -> Result<(), GuardError> {
    let selector = permission.selector;
    if selector == ZERO_SELECTOR {
        return Err(GuardError::ZeroSelector);
    }
    let schema = catalog.require(&selector)?;

    let granted = permission.granted_actions;
    if granted.is_empty() || !granted.is_subset_of(schema.supported_actions) {
        return Err(GuardError::NotSupported {
            selector,
            actions: granted.bits(),
        });
    }

    if permission.handler_for_selectors.is_empty() {
        return Err(GuardError::OperationFailed(
            "permission must declare at least one handler selector".into(),
        ));
    }
    for related in &permission.handler_for_selectors {
        if *related == selector {
            continue;
        }
        let related_schema = catalog.require(related)?;
        if !related_schema.handles(&selector) {
            return Err(GuardError::HandlerRelationshipMismatch {
                selector,
                related: *related,
            });
        }
    }
    Ok(())
}
