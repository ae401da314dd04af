//! secp256k1 key and signature helpers.
//!
//! The keyring wants public keys as 65-byte uncompressed SEC1 points and
//! signatures as 65-byte `r || s || v` with `v` in `{0, 1}`. Devices report
//! `v` either way, so [`normalize_recovery_id`] folds the Ethereum-style
//! `27`/`28` encoding back to `0`/`1`.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::crypto::{public_key_to_uncompressed, parse_public_key};
//! use k256::ecdsa::SigningKey;
//!
//! let key = SigningKey::from_slice(&[0x11; 32]).unwrap();
//! let bytes = public_key_to_uncompressed(key.verifying_key());
//! assert_eq!(bytes[0], 0x04);
//! assert_eq!(parse_public_key(&bytes).unwrap(), *key.verifying_key());
//! ```

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::error::{Error, Result};

/// Length of an uncompressed SEC1 public key.
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;

/// Length of a recoverable `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Serializes a public key as an uncompressed SEC1 point (`0x04 || x || y`).
#[must_use]
pub fn public_key_to_uncompressed(
    public_key: &VerifyingKey,
) -> [u8; UNCOMPRESSED_PUBLIC_KEY_LEN] {
    let encoded = public_key.to_encoded_point(false);
    let mut out = [0u8; UNCOMPRESSED_PUBLIC_KEY_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Parses a compressed (33 bytes) or uncompressed (65 bytes) SEC1 public key.
///
/// # Errors
///
/// Returns [`Error::InvalidPublicKey`] if the bytes are not a point on the
/// curve.
pub fn parse_public_key(bytes: &[u8]) -> Result<VerifyingKey> {
    VerifyingKey::from_sec1_bytes(bytes).map_err(|e| Error::InvalidPublicKey(e.to_string()))
}

/// Maps an Ethereum-style `v` (`27`/`28`) to a raw recovery id (`0`/`1`).
#[must_use]
pub const fn normalize_recovery_id(v: u8) -> u8 {
    if v >= 27 { v - 27 } else { v }
}

/// Signs a 32-byte prehash and returns `r || s || v`.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if the signing primitive fails.
pub fn sign_prehash(key: &SigningKey, hash: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN]> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(hash)
        .map_err(|e| Error::InvalidSignature(e.to_string()))?;

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(signature.to_bytes().as_slice());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Recovers the signer's public key from a prehash and an `r || s || v`
/// signature.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if the signature is malformed or does
/// not recover to a valid key.
pub fn recover_public_key(hash: &[u8; 32], signature: &[u8]) -> Result<VerifyingKey> {
    if signature.len() != SIGNATURE_LEN {
        return Err(Error::InvalidSignature(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| Error::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(normalize_recovery_id(signature[64]))
        .ok_or_else(|| Error::InvalidSignature(format!("bad recovery id {}", signature[64])))?;

    VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
        .map_err(|e| Error::InvalidSignature(e.to_string()))
}
