//! # Guard Whitelist
//!
//! Per-selector allow-list of external call targets.
//!
//! A target is allowed when it is the engine itself, when it is listed for the
//! selector, or when the selector has no registered schema at all. An empty
//! list for a registered selector denies every external target.

use super::catalog::FunctionSchemaCatalog;
use super::errors::{GuardError, ResourceId};
use super::value_objects::{Address, Selector, ZERO_ADDRESS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardWhitelist {
    entries: BTreeMap<Selector, BTreeSet<Address>>,
}

impl GuardWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        selector: Selector,
        target: Address,
        catalog: &FunctionSchemaCatalog,
    ) -> Result<(), GuardError> {
        if target == ZERO_ADDRESS {
            return Err(GuardError::ZeroAddress);
        }
        catalog.require(&selector)?;
        if !self.entries.entry(selector).or_default().insert(target) {
            return Err(GuardError::AlreadyExists(ResourceId::Target { selector, target }));
        }
        Ok(())
    }

    pub fn remove(&mut self, selector: &Selector, target: &Address) -> Result<(), GuardError> {
        let missing = GuardError::NotFound(ResourceId::Target {
            selector: *selector,
            target: *target,
        });
        let targets = self.entries.get_mut(selector).ok_or_else(|| missing.clone())?;
        if !targets.remove(target) {
            return Err(missing);
        }
        if targets.is_empty() {
            self.entries.remove(selector);
        }
        Ok(())
    }

    /// Drop every entry for `selector`.
    pub fn clear(&mut self, selector: &Selector) {
        self.entries.remove(selector);
    }

    pub fn contains(&self, selector: &Selector, target: &Address) -> bool {
        self.entries
            .get(selector)
            .is_some_and(|targets| targets.contains(target))
    }

    pub fn targets(&self, selector: &Selector) -> Vec<Address> {
        self.entries
            .get(selector)
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check that `target` may be called with `selector`.
    pub fn validate(
        &self,
        selector: &Selector,
        target: &Address,
        engine_address: &Address,
        catalog: &FunctionSchemaCatalog,
    ) -> Result<(), GuardError> {
        if target == engine_address || !catalog.contains(selector) {
            return Ok(());
        }
        if self.contains(selector, target) {
            return Ok(());
        }
        Err(GuardError::NotWhitelisted {
            selector: *selector,
            target: *target,
        })
    }
}
