//! # Meta-Transaction Verification
//!
//! Message construction, envelope checks and the per-signer nonce table.
//!
//! ## Verification order
//!
//! | Step | Check | Error |
//! |------|-------|-------|
//! | 1 | `chain_id` equals the engine's chain id | `ChainIdMismatch` |
//! | 2 | `deadline >= now` | `DeadlineInPast` |
//! | 3 | `gas_price <= max_gas_price` when the ceiling is non-zero | `GasPriceExceedsMax` |
//! | 4 | signature well-formed and recovers `signer` | `InvalidSignatureLength`, `InvalidVValue`, `InvalidSValue`, `InvalidSignature` |
//! | 5 | `nonce` equals the signer's next nonce | `InvalidNonce` |
//!
//! The nonce is consumed by the engine after permission checks and before the
//! guarded operation runs, so a verified envelope can never be replayed even
//! when its execution fails.

use super::entities::{MetaTransaction, MetaTxParams, TxParams};
use super::errors::GuardError;
use super::signature::{sign_message, verify_signer};
use super::value_objects::{keccak256, Address, Hash, Timestamp, TxId, U256};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Domain tag prefixed to every meta-transaction message.
pub const META_TX_DOMAIN: &[u8] = b"GUARDIAN_META_TX_V1";

// =============================================================================
// MESSAGE
// =============================================================================

/// Deterministic message hash over every field of an envelope.
///
/// Every field is written at fixed width, big-endian, and the variable-length
/// execution parameters are length-prefixed and hashed, so two structurally
/// different envelopes never share an encoding.
pub fn message_hash(engine: &Address, tx_id: TxId, tx: &TxParams, params: &MetaTxParams) -> Hash {
    let mut buf = Vec::with_capacity(320);
    buf.extend_from_slice(&(META_TX_DOMAIN.len() as u64).to_be_bytes());
    buf.extend_from_slice(META_TX_DOMAIN);
    buf.extend_from_slice(engine);
    buf.extend_from_slice(&params.chain_id.to_be_bytes());

    buf.extend_from_slice(&tx_id.to_be_bytes());
    buf.extend_from_slice(&tx.requester);
    buf.extend_from_slice(&tx.target);
    buf.extend_from_slice(&u256_be(&tx.value));
    buf.extend_from_slice(&tx.gas_limit.to_be_bytes());
    buf.extend_from_slice(&tx.operation_type);
    buf.extend_from_slice(&tx.execution_selector);
    buf.extend_from_slice(&(tx.execution_params.len() as u64).to_be_bytes());
    buf.extend_from_slice(&keccak256(&tx.execution_params));

    buf.extend_from_slice(&params.nonce.to_be_bytes());
    buf.extend_from_slice(&params.handler_selector);
    buf.push(params.action as u8);
    buf.extend_from_slice(&params.deadline.to_be_bytes());
    buf.extend_from_slice(&u256_be(&params.max_gas_price));
    buf.extend_from_slice(&params.signer);

    keccak256(&buf)
}

fn u256_be(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Build an unsigned envelope for the engine at `engine` running on
/// `environment_chain_id`.
///
/// Fails with `ChainIdMismatch` when the parameters target another chain, so a
/// cross-chain envelope is never produced for signing.
pub fn prepare_meta_tx(
    engine: &Address,
    environment_chain_id: u64,
    tx_id: TxId,
    tx: TxParams,
    params: MetaTxParams,
) -> Result<MetaTransaction, GuardError> {
    if params.chain_id != environment_chain_id {
        return Err(GuardError::ChainIdMismatch {
            expected: environment_chain_id,
            actual: params.chain_id,
        });
    }
    let message = message_hash(engine, tx_id, &tx, &params);
    Ok(MetaTransaction {
        tx_id,
        tx,
        params,
        message,
        signature: Vec::new(),
    })
}

/// Sign a prepared envelope in place.
pub fn sign_meta_tx(mut meta: MetaTransaction, key: &SigningKey) -> Result<MetaTransaction, GuardError> {
    meta.signature = sign_message(&meta.message, key)?;
    Ok(meta)
}

// =============================================================================
// VERIFICATION
// =============================================================================

/// Environment an envelope is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationContext {
    pub engine_address: Address,
    pub chain_id: u64,
    pub now: Timestamp,
    pub gas_price: U256,
}

/// Run steps 1 to 5 without touching the nonce table.
pub fn verify_envelope(
    meta: &MetaTransaction,
    ctx: &VerificationContext,
    nonces: &NonceTable,
) -> Result<(), GuardError> {
    let params = &meta.params;

    if params.chain_id != ctx.chain_id {
        return Err(GuardError::ChainIdMismatch {
            expected: ctx.chain_id,
            actual: params.chain_id,
        });
    }
    if params.deadline < ctx.now {
        return Err(GuardError::DeadlineInPast {
            deadline: params.deadline,
            now: ctx.now,
        });
    }
    if !params.max_gas_price.is_zero() && ctx.gas_price > params.max_gas_price {
        return Err(GuardError::GasPriceExceedsMax {
            actual: ctx.gas_price,
            max: params.max_gas_price,
        });
    }

    let message = message_hash(&ctx.engine_address, meta.tx_id, &meta.tx, params);
    verify_signer(&message, &meta.signature, &params.signer)?;

    nonces.check(&params.signer, params.nonce)
}

// =============================================================================
// NONCES
// =============================================================================

/// Next expected nonce per signer. Absent signers start at zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceTable {
    nonces: BTreeMap<Address, u64>,
}

impl NonceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signer: &Address) -> u64 {
        self.nonces.get(signer).copied().unwrap_or(0)
    }

    pub fn check(&self, signer: &Address, supplied: u64) -> Result<(), GuardError> {
        let expected = self.get(signer);
        if supplied != expected {
            return Err(GuardError::InvalidNonce { supplied, expected });
        }
        Ok(())
    }

    /// Check and advance by exactly one. Returns the new next nonce.
    pub fn consume(&mut self, signer: &Address, supplied: u64) -> Result<u64, GuardError> {
        self.check(signer, supplied)?;
        let next = supplied
            .checked_add(1)
            .ok_or_else(|| GuardError::Internal("nonce overflow".into()))?;
        self.nonces.insert(*signer, next);
        Ok(next)
    }
}
