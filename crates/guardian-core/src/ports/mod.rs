//! # Ports Layer
//!
//! - `inbound`: the `GuardApi` surface the engine exposes
//! - `outbound`: clock, guarded callee and event forwarders the engine drives

pub mod inbound;
pub mod outbound;

pub use inbound::GuardApi;
pub use outbound::{
    EventForwarder, ForwardError, GuardedCall, GuardedCallee, SystemTimeSource, TimeSource,
};
