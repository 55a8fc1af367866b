//! # Signature Recovery (secp256k1)
//!
//! Recovers and checks the signer of a meta-transaction message.
//!
//! ## Security Notes
//!
//! - **Fixed length**: signatures are exactly 65 bytes, `r || s || v`
//! - **Recovery id**: `v` must be 27 or 28
//! - **Scalar range**: `r` and `s` must be in [1, n-1]
//! - **Malleability (EIP-2)**: `s` must be strictly below n/2
//! - Range and low-S comparisons are constant time via `subtle`

use super::errors::GuardError;
use super::value_objects::{keccak256, Address, Hash};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// Length of an encoded signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// secp256k1 curve order n.
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// n/2, the malleability bound.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

// =============================================================================
// RECOVERY
// =============================================================================

/// Recover the address that signed `message`.
pub fn recover_signer(message: &Hash, signature: &[u8]) -> Result<Address, GuardError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(GuardError::InvalidSignatureLength {
            actual: signature.len(),
            expected: SIGNATURE_LENGTH,
        });
    }

    let v = signature[64];
    let recovery_id = parse_recovery_id(v)?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature[..32]);
    s.copy_from_slice(&signature[32..64]);

    if !is_valid_scalar(&r) || !is_valid_scalar(&s) {
        return Err(GuardError::InvalidSignature);
    }
    if !is_low_s(&s) {
        return Err(GuardError::InvalidSValue);
    }

    let mut sig_bytes = [0u8; 64];
    sig_bytes.copy_from_slice(&signature[..64]);
    let parsed = Signature::from_slice(&sig_bytes);
    sig_bytes.zeroize();
    let sig = parsed.map_err(|_| GuardError::InvalidSignature)?;

    let recovered = VerifyingKey::recover_from_prehash(message, &sig, recovery_id)
        .map_err(|_| GuardError::InvalidSignature)?;

    Ok(address_from_pubkey(&recovered))
}

/// Recover the signer and require it to be `expected`.
pub fn verify_signer(message: &Hash, signature: &[u8], expected: &Address) -> Result<(), GuardError> {
    let recovered = recover_signer(message, signature)?;
    if recovered[..].ct_eq(&expected[..]).into() {
        Ok(())
    } else {
        Err(GuardError::InvalidSignature)
    }
}

/// Derive an account address from a public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    // Skip the 0x04 prefix.
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Address controlled by a signing key.
pub fn address_of(key: &SigningKey) -> Address {
    address_from_pubkey(key.verifying_key())
}

/// Sign a message hash, producing a low-S 65-byte signature with `v` in {27, 28}.
pub fn sign_message(message: &Hash, key: &SigningKey) -> Result<Vec<u8>, GuardError> {
    let (sig, recid) = key
        .sign_prehash_recoverable(message)
        .map_err(|e| GuardError::Internal(format!("signing failed: {e}")))?;

    let sig_bytes = sig.to_bytes();
    let mut s = [0u8; 32];
    s.copy_from_slice(&sig_bytes[32..]);

    let mut recovery = recid.to_byte() & 1;
    if !is_low_s(&s) {
        s = invert_s(&s);
        recovery ^= 1;
    }

    let mut out = Vec::with_capacity(SIGNATURE_LENGTH);
    out.extend_from_slice(&sig_bytes[..32]);
    out.extend_from_slice(&s);
    out.push(27 + recovery);
    Ok(out)
}

// =============================================================================
// HELPERS
// =============================================================================

fn parse_recovery_id(v: u8) -> Result<RecoveryId, GuardError> {
    let id = match v {
        27 => 0,
        28 => 1,
        _ => return Err(GuardError::InvalidVValue(v)),
    };
    RecoveryId::try_from(id).map_err(|_| GuardError::InvalidVValue(v))
}

/// Constant-time `a < b` over big-endian 32-byte values.
fn ct_less_than(a: &[u8; 32], b: &[u8; 32]) -> Choice {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let not_decided = !(less | greater);
        less |= not_decided & Choice::from((a[i] < b[i]) as u8);
        greater |= not_decided & Choice::from((a[i] > b[i]) as u8);
    }
    less
}

/// `s <= n/2` (EIP-2).
fn is_low_s(s: &[u8; 32]) -> bool {
    (!ct_less_than(&SECP256K1_HALF_ORDER, s)).into()
}

/// Scalar in [1, n-1].
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }
    (!is_zero & ct_less_than(scalar, &SECP256K1_ORDER)).into()
}

/// `n - s`, the high-S twin of a signature.
pub fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}
