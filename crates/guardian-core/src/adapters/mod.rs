//! # Adapters Layer
//!
//! Implementations of the outbound ports.
//!
//! - `clock`: `ManualClock` for stepping time deterministically
//! - `callee`: `InMemoryCallee`, a scriptable guarded-call target
//! - `forwarder`: `TracingForwarder` and `RecordingForwarder`

pub mod callee;
pub mod clock;
pub mod forwarder;

pub use callee::{CallHook, CalleeBehavior, InMemoryCallee};
pub use clock::ManualClock;
pub use forwarder::{RecordingForwarder, TracingForwarder};
