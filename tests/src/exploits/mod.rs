//! # Exploit Simulations
//!
//! Adversarial scenarios against the authorization core. Each module attacks
//! one invariant and asserts that the attack is rejected with its exact cause
//! and leaves no trace in committed state.

mod races;
mod replay;
mod status_terminality;
mod whitelist_bypass;
