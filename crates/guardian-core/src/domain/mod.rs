//! # Domain Layer
//!
//! Pure authorization logic: no I/O, no clocks, no locks.
//!
//! ## Components
//!
//! - `value_objects`: identifiers, `TxAction`, `ActionBitmap`, `TxStatus`
//! - `entities`: roles, permissions, schemas, transaction records, envelopes
//! - `registry`: `PermissionRegistry` with the reverse wallet index
//! - `catalog`: `FunctionSchemaCatalog` with reference-counted operation types
//! - `whitelist`: `GuardWhitelist` of external call targets
//! - `store`: `ConfigStore` tying the three together, plus snapshots
//! - `batch`: atomic role and guard configuration batches
//! - `meta_tx`: envelope messages, verification and signer nonces
//! - `signature`: secp256k1 signer recovery
//! - `state_machine`: record storage and approve/cancel gating
//! - `system`: the engine's own protected operations and default grants
//! - `errors`: `GuardError` and the stored failure payload
//!
//! ## Data Types
//!
//! - Address: `[u8; 20]`
//! - Hash: `[u8; 32]`
//! - Selector: `[u8; 4]`
//! - U256: values and gas prices (from primitive-types)

pub mod batch;
pub mod catalog;
pub mod entities;
pub mod errors;
pub mod meta_tx;
pub mod registry;
pub mod signature;
pub mod state_machine;
pub mod store;
pub mod system;
pub mod value_objects;
pub mod whitelist;

pub use batch::*;
pub use catalog::*;
pub use entities::*;
pub use errors::*;
pub use meta_tx::*;
pub use registry::*;
pub use signature::*;
pub use state_machine::*;
pub use store::*;
pub use value_objects::*;
pub use whitelist::*;
