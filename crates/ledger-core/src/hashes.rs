//! EIP-712 hash computation and display.
//!
//! Before a Ledger signs typed data it shows the domain and message hashes on
//! its screen. [`render_signing_hashes`] prints the same two values on the
//! host so the operator can compare them before approving.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::console::BufferConsole;
//! use evmos_ledger_core::hashes::render_signing_hashes;
//! use evmos_ledger_core::{Eip712Domain, TypedData};
//! use serde_json::json;
//!
//! let typed_data = TypedData::new(
//!     Eip712Domain { name: Some("Evmos".into()), ..Default::default() },
//!     json!({"Tx": [{"name": "memo", "type": "string"}]}),
//!     "Tx".to_string(),
//!     json!({"memo": "hi"}),
//! );
//!
//! let console = BufferConsole::new();
//! render_signing_hashes(&typed_data, &console).unwrap();
//! assert_eq!(console.lines()[0], "Signing the following payload with EIP-712:");
//! assert!(console.lines()[1].starts_with("- Domain: 0x"));
//! ```

use alloy_primitives::B256;

use crate::console::Console;
use crate::eip712::{DOMAIN_TYPE, TypedData, signing_digest};
use crate::error::{Error, Result};

/// The two struct hashes a device displays for an EIP-712 request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigningHashes {
    /// `hashStruct("EIP712Domain", domain)`.
    pub domain: B256,
    /// `hashStruct(primaryType, message)`.
    pub message: B256,
}

impl SigningHashes {
    /// Computes both hashes, the domain first.
    ///
    /// # Errors
    ///
    /// Returns the typed-data error of whichever hash failed, unwrapped.
    pub fn compute(typed_data: &TypedData) -> Result<Self> {
        let domain = typed_data.hash_struct(DOMAIN_TYPE, &typed_data.domain_map()?)?;
        let message = typed_data.hash_struct(&typed_data.primary_type, &typed_data.message)?;
        Ok(Self { domain, message })
    }

    /// Returns `keccak256(0x19 0x01 || domain || message)`.
    #[must_use]
    pub fn digest(&self) -> B256 {
        signing_digest(&self.domain, &self.message)
    }
}

/// Computes the signing hashes and prints them for operator verification.
///
/// Prints exactly three lines: a preamble, the domain hash and the message
/// hash, each hash as [`bytes_to_hex_string`]. Nothing is printed on failure.
///
/// # Errors
///
/// Returns [`Error::HashComputation`] wrapping the typed-data error.
pub fn render_signing_hashes(
    typed_data: &TypedData,
    console: &dyn Console,
) -> Result<SigningHashes> {
    let hashes =
        SigningHashes::compute(typed_data).map_err(|e| Error::HashComputation(Box::new(e)))?;

    console.print_line("Signing the following payload with EIP-712:");
    console.print_line(&format!("- Domain: {}", bytes_to_hex_string(hashes.domain.as_slice())));
    console.print_line(&format!(
        "- Message: {}",
        bytes_to_hex_string(hashes.message.as_slice())
    ));

    Ok(hashes)
}

/// Formats bytes as `0x` followed by uppercase hex.
#[must_use]
pub fn bytes_to_hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode_upper(bytes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::console::BufferConsole;
    use crate::eip712::Eip712Domain;

    fn tx(message: serde_json::Value) -> TypedData {
        TypedData::new(
            Eip712Domain {
                name: Some("Cosmos Web3".to_string()),
                version: Some("1.0.0".to_string()),
                chain_id: Some(9001),
                verifying_contract: Some("cosmos".to_string()),
                salt: Some("0".to_string()),
            },
            json!({
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "string"},
                    {"name": "salt", "type": "string"}
                ],
                "Tx": [
                    {"name": "memo", "type": "string"},
                    {"name": "sequence", "type": "string"}
                ]
            }),
            "Tx".to_string(),
            message,
        )
    }

    #[test]
    fn hex_is_uppercase_with_prefix() {
        assert_eq!(bytes_to_hex_string(&[0xab, 0x01, 0xcd]), "0xAB01CD");
        assert_eq!(bytes_to_hex_string(&[]), "0x");
    }

    #[test]
    fn renders_three_lines_domain_first() {
        let typed_data = tx(json!({"memo": "", "sequence": "1"}));
        let console = BufferConsole::new();

        let hashes = render_signing_hashes(&typed_data, &console).unwrap();
        let lines = console.lines();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Signing the following payload with EIP-712:");
        assert_eq!(
            lines[1],
            format!("- Domain: {}", bytes_to_hex_string(hashes.domain.as_slice()))
        );
        assert_eq!(
            lines[2],
            format!("- Message: {}", bytes_to_hex_string(hashes.message.as_slice()))
        );
        assert_eq!(hashes.domain, typed_data.domain_separator().unwrap());
        assert_eq!(hashes.digest(), typed_data.signing_hash().unwrap());
    }

    #[test]
    fn rendering_is_deterministic() {
        let typed_data = tx(json!({"memo": "hello", "sequence": "7"}));
        let first = BufferConsole::new();
        let second = BufferConsole::new();

        render_signing_hashes(&typed_data, &first).unwrap();
        render_signing_hashes(&typed_data, &second).unwrap();
        assert_eq!(first.lines(), second.lines());
    }

    #[test]
    fn failure_prints_nothing() {
        let typed_data = tx(json!({"memo": "missing sequence"}));
        let console = BufferConsole::new();

        let err = render_signing_hashes(&typed_data, &console).unwrap_err();
        assert!(matches!(err, Error::HashComputation(_)));
        assert!(
            err.to_string()
                .starts_with("unable to generate EIP-712 hash for object: ")
        );
        assert!(console.lines().is_empty());
    }
}
