//! # Guardian Core
//!
//! Guarded, time-locked transaction authorization: a role-based permission
//! registry with per-function action bitmaps, a transaction state machine,
//! signed meta-transactions with replay protection, and atomic configuration
//! batches.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Pure authorization logic, no I/O
//! - **Ports Layer** (`ports/`): Trait definitions for inbound/outbound interfaces
//! - **Service Layer** (`service.rs`): `GuardEngine`, wiring domain logic to ports
//! - **Adapters Layer** (`adapters/`): Clock, callee and forwarder implementations
//!
//! ## Authorization Paths
//!
//! | Path | Steps | Time lock | Gate |
//! |------|-------|-----------|------|
//! | Time delay | `request` then `approve`/`cancel` | enforced | caller's role permissions |
//! | Meta | `request_and_approve_meta`, `approve_meta`, `cancel_meta` | bypassed | signer + broadcaster permissions, nonce |
//!
//! ## Security Notes
//!
//! - **Protected roles**: Owner, Broadcaster and Recovery can never be removed
//!   or edited by a batch; their single member changes only through the
//!   dedicated update operations
//! - **Replay protection**: a verified envelope burns its signer nonce before
//!   execution, whatever the outcome
//! - **Malleability Prevention (EIP-2)**: Signatures with high S values are rejected
//! - **Effects before calls**: `EXECUTING` is committed before the guarded callee runs
//! - **Permissions accumulate**: a wallet holds the union of its roles' grants
//!
//! ## Telemetry
//!
//! `GuardEngine::new` registers the engine's counters with the
//! `guardian-telemetry` registry; hosts scrape them with
//! `guardian_telemetry::encode_metrics`. Log output needs a subscriber,
//! installed by `guardian_telemetry::init_telemetry`.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use config::EngineConfig;
pub use domain::system::{MetaEntryPoint, SystemOperation};
pub use domain::{
    keccak256, operation_type, role_id, selector_of, ActionBitmap, Address, AuthorizationPath,
    CallContext, CallFailure, ConfigStore, ErrorCategory, ExecutionFailure, FunctionPermission,
    FunctionRegistration, FunctionSchema, GuardConfigAction, GuardError, Hash, MetaTransaction,
    MetaTxParams, ProtectedWallets, RegistrySnapshot, ResourceId, Role, RoleConfigAction, RoleId,
    Selector, Timestamp, TxAction, TxId, TxParams, TxRecord, TxRequest, TxStatus, U256,
};
pub use ports::inbound::GuardApi;
pub use ports::outbound::{
    EventForwarder, ForwardError, GuardedCall, GuardedCallee, SystemTimeSource, TimeSource,
};
pub use service::GuardEngine;
