//! Ethereum addresses and their bech32 (Cosmos) encoding.
//!
//! An Ethereum-compatible Cosmos chain uses the same 20 address bytes in two
//! encodings:
//!
//! 1. Hex, `keccak256(x || y)[12..]` of the uncompressed secp256k1 key
//! 2. Bech32, the same bytes under a human-readable prefix (`evmos1...`)
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::Address;
//!
//! let addr = Address::new([0x11; 20]);
//! let bech = addr.to_bech32("evmos").unwrap();
//! assert!(bech.starts_with("evmos1"));
//! assert_eq!(Address::from_bech32(&bech).unwrap().1, addr);
//! ```

use std::fmt;

use alloy_primitives::{Address as AlloyAddress, keccak256};
use bech32::{Bech32, Hrp};
use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::crypto::public_key_to_uncompressed;
use crate::error::{Error, Result};

/// An Ethereum address (20 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(AlloyAddress);

impl Address {
    /// The length of an address in bytes.
    pub const BYTE_LEN: usize = 20;

    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; Self::BYTE_LEN]) -> Self {
        Self(AlloyAddress::new(bytes))
    }

    /// Returns the zero address.
    #[must_use]
    pub const fn zero() -> Self {
        Self(AlloyAddress::ZERO)
    }

    /// Checks if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Derives the address of a secp256k1 public key.
    ///
    /// The uncompressed point is stripped of its `0x04` tag, hashed with
    /// Keccak-256, and the last 20 bytes are kept.
    #[must_use]
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let uncompressed = public_key_to_uncompressed(public_key);
        let hash = keccak256(&uncompressed[1..]);

        let mut address_bytes = [0u8; Self::BYTE_LEN];
        address_bytes.copy_from_slice(&hash[12..]);
        Self::new(address_bytes)
    }

    /// Returns the address bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::BYTE_LEN] {
        self.0.as_ref()
    }

    /// Returns the address as an EIP-55 checksummed hex string.
    #[must_use]
    pub fn to_checksum_hex(&self) -> String {
        self.0.to_checksum(None)
    }

    /// Returns the address as a lowercase hex string with `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.as_bytes()))
    }

    /// Parses an address from a hex string, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HexDecodeFailed`] for bad hex and
    /// [`Error::InvalidPublicKey`] if the length is not 20 bytes.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)?;

        let address_bytes: [u8; Self::BYTE_LEN] = bytes.as_slice().try_into().map_err(|_| {
            Error::InvalidPublicKey(format!(
                "expected {} address bytes, got {}",
                Self::BYTE_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self::new(address_bytes))
    }

    /// Encodes the address with a bech32 human-readable prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if the prefix is not a valid HRP.
    pub fn to_bech32(&self, hrp: &str) -> Result<String> {
        bech32ify(hrp, self.as_bytes())
    }

    /// Decodes a bech32 address into its prefix and address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if decoding fails or the payload is not
    /// 20 bytes.
    pub fn from_bech32(encoded: &str) -> Result<(String, Self)> {
        let (hrp, data) = bech32::decode(encoded).map_err(|e| Error::Encoding(e.to_string()))?;
        let address_bytes: [u8; Self::BYTE_LEN] = data.as_slice().try_into().map_err(|_| {
            Error::Encoding(format!("invalid address length {}", data.len()))
        })?;
        Ok((hrp.to_string(), Self::new(address_bytes)))
    }
}

/// Encodes raw address bytes as bech32 under `hrp`.
///
/// Empty input encodes to an empty string, matching the Cosmos SDK.
///
/// # Errors
///
/// Returns [`Error::Encoding`] carrying the encoder's own message when the
/// prefix is empty or invalid, or the data is too long.
pub fn bech32ify(hrp: &str, bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Ok(String::new());
    }

    let hrp = Hrp::parse(hrp).map_err(|e| Error::Encoding(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, bytes).map_err(|e| Error::Encoding(e.to_string()))
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum_hex())
    }
}

impl From<AlloyAddress> for Address {
    fn from(addr: AlloyAddress) -> Self {
        Self(addr)
    }
}

impl From<Address> for AlloyAddress {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::SigningKey;

    use super::*;

    #[test]
    fn address_from_known_key() {
        // Private key 1 maps to the well-known generator address.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = SigningKey::from_slice(&secret).unwrap();

        let addr = Address::from_public_key(key.verifying_key());
        assert_eq!(
            addr.to_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn address_hex_roundtrip() {
        let original = Address::new([0xab; 20]);
        let recovered = Address::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, recovered);
    }

    #[test]
    fn address_from_hex_bad_length() {
        let result = Address::from_hex("0x1234");
        assert!(matches!(result, Err(Error::InvalidPublicKey(_))));
    }

    #[test]
    fn address_display_is_checksummed() {
        let addr = Address::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            addr.to_string(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn bech32_prefix_and_roundtrip() {
        let addr = Address::new([0x5a; 20]);
        let encoded = addr.to_bech32("evmos").unwrap();
        assert!(encoded.starts_with("evmos1"));

        let (hrp, decoded) = Address::from_bech32(&encoded).unwrap();
        assert_eq!(hrp, "evmos");
        assert_eq!(decoded, addr);
    }

    #[test]
    fn bech32_same_bytes_different_prefix() {
        let addr = Address::new([0x01; 20]);
        let evmos = addr.to_bech32("evmos").unwrap();
        let cosmos = addr.to_bech32("cosmos").unwrap();
        assert_ne!(evmos, cosmos);
        assert_eq!(Address::from_bech32(&cosmos).unwrap().1, addr);
    }

    #[test]
    fn bech32_empty_prefix_fails() {
        let result = bech32ify("", &[0x01; 20]);
        assert!(matches!(result, Err(Error::Encoding(_))));
    }

    #[test]
    fn bech32_empty_bytes() {
        assert_eq!(bech32ify("evmos", &[]).unwrap(), "");
    }
}
