//! # Function Schema Catalog
//!
//! The set of guarded operations permissions can reference.
//!
//! ## Handler relationships
//!
//! `handler_for_selectors` on an execution schema lists the schema itself and
//! every handler allowed to drive it. On a handler schema it lists the handler
//! itself. A permission on a handler names the execution selectors it covers,
//! and each of those must list the handler back.

use super::entities::FunctionSchema;
use super::errors::{GuardError, ResourceId};
use super::value_objects::{operation_type, selector_of, ActionBitmap, Hash, Selector, ZERO_SELECTOR};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Registered operation type with its reference count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct OperationTypeEntry {
    name: String,
    references: usize,
}

/// Input for [`FunctionSchemaCatalog::register_function`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRegistration {
    pub signature: String,
    pub operation_name: String,
    pub supported_actions: ActionBitmap,
    pub handler_for_selectors: BTreeSet<Selector>,
}

impl FunctionRegistration {
    /// Registration for an execution function that only handles itself.
    pub fn new(signature: &str, operation_name: &str, supported_actions: ActionBitmap) -> Self {
        Self {
            signature: signature.to_string(),
            operation_name: operation_name.to_string(),
            supported_actions,
            handler_for_selectors: [selector_of(signature)].into_iter().collect(),
        }
    }

    /// Also allow the given handlers to drive this function.
    #[must_use]
    pub fn with_handlers(mut self, handlers: impl IntoIterator<Item = Selector>) -> Self {
        self.handler_for_selectors.extend(handlers);
        self
    }

    pub fn selector(&self) -> Selector {
        selector_of(&self.signature)
    }
}

/// Registry of function schemas keyed by selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchemaCatalog {
    schemas: BTreeMap<Selector, FunctionSchema>,
    operation_types: BTreeMap<Hash, OperationTypeEntry>,
    max_functions: usize,
}

impl FunctionSchemaCatalog {
    pub fn new(max_functions: usize) -> Self {
        Self {
            schemas: BTreeMap::new(),
            operation_types: BTreeMap::new(),
            max_functions,
        }
    }

    /// Register a new schema and return its selector.
    ///
    /// `is_engine_function` reports selectors the engine implements on
    /// itself; those must be registered `protected`.
    pub fn register_function(
        &mut self,
        registration: FunctionRegistration,
        protected: bool,
        is_engine_function: impl Fn(&Selector) -> bool,
    ) -> Result<Selector, GuardError> {
        let selector = registration.selector();

        if registration.signature.is_empty() {
            return Err(GuardError::InvalidArgument("empty function signature".into()));
        }
        if registration.operation_name.is_empty() {
            return Err(GuardError::InvalidArgument("empty operation name".into()));
        }
        if selector == ZERO_SELECTOR {
            return Err(GuardError::ZeroSelector);
        }
        if self.schemas.contains_key(&selector) {
            return Err(GuardError::AlreadyExists(ResourceId::Function(selector)));
        }
        if is_engine_function(&selector) && !protected {
            return Err(GuardError::ContractFunctionMustBeProtected(selector));
        }
        if registration.supported_actions.is_empty() {
            return Err(GuardError::NotSupported {
                selector,
                actions: 0,
            });
        }
        if registration.handler_for_selectors.is_empty() {
            return Err(GuardError::OperationFailed(
                "function schema must declare at least one handler selector".into(),
            ));
        }
        for handler in &registration.handler_for_selectors {
            if *handler != selector && !self.schemas.contains_key(handler) {
                return Err(GuardError::NotFound(ResourceId::Function(*handler)));
            }
        }
        if self.schemas.len() >= self.max_functions {
            return Err(GuardError::LimitReached {
                current: self.schemas.len(),
                max: self.max_functions,
            });
        }

        let op_type = operation_type(&registration.operation_name);
        self.operation_types
            .entry(op_type)
            .or_insert_with(|| OperationTypeEntry {
                name: registration.operation_name.clone(),
                references: 0,
            })
            .references += 1;

        self.schemas.insert(
            selector,
            FunctionSchema {
                selector,
                signature: registration.signature,
                operation_type: op_type,
                operation_name: registration.operation_name,
                supported_actions: registration.supported_actions,
                protected,
                handler_for_selectors: registration.handler_for_selectors,
            },
        );
        Ok(selector)
    }

    /// Remove a schema.
    ///
    /// With `safe`, fails while `still_referenced` reports a role permission on
    /// the selector, or while another schema lists it as a handler. The
    /// operation type entry is dropped with its last schema.
    pub fn remove_function_schema(
        &mut self,
        selector: &Selector,
        safe: bool,
        still_referenced: impl Fn(&Selector) -> bool,
    ) -> Result<FunctionSchema, GuardError> {
        let schema = self
            .schemas
            .get(selector)
            .ok_or(GuardError::NotFound(ResourceId::Function(*selector)))?;

        if schema.protected {
            return Err(GuardError::CannotModifyProtected(ResourceId::Function(*selector)));
        }
        if safe {
            let listed_elsewhere = self
                .schemas
                .values()
                .any(|other| other.selector != *selector && other.handles(selector));
            if listed_elsewhere || still_referenced(selector) {
                return Err(GuardError::ResourceStillReferenced(*selector));
            }
        }

        let removed = self
            .schemas
            .remove(selector)
            .ok_or(GuardError::NotFound(ResourceId::Function(*selector)))?;

        if let Some(entry) = self.operation_types.get_mut(&removed.operation_type) {
            entry.references = entry.references.saturating_sub(1);
            if entry.references == 0 {
                self.operation_types.remove(&removed.operation_type);
            }
        }
        Ok(removed)
    }

    pub fn get(&self, selector: &Selector) -> Option<&FunctionSchema> {
        self.schemas.get(selector)
    }

    /// Like [`get`](Self::get) but fails with `NotFound`.
    pub fn require(&self, selector: &Selector) -> Result<&FunctionSchema, GuardError> {
        self.get(selector)
            .ok_or(GuardError::NotFound(ResourceId::Function(*selector)))
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.schemas.contains_key(selector)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Every registered selector, in ascending order.
    pub fn supported_functions(&self) -> Vec<Selector> {
        self.schemas.keys().copied().collect()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &FunctionSchema> {
        self.schemas.values()
    }

    /// Registered operation types with their names.
    pub fn operation_types(&self) -> Vec<(Hash, String)> {
        self.operation_types
            .iter()
            .map(|(hash, entry)| (*hash, entry.name.clone()))
            .collect()
    }

    pub fn has_operation_type(&self, op_type: &Hash) -> bool {
        self.operation_types.contains_key(op_type)
    }
}
