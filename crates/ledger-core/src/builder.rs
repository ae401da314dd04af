//! Turning a keyring sign document into [`TypedData`].

use std::fmt;

use crate::eip712::TypedData;
use crate::error::Result;

/// Builds the typed data a device signs from the raw bytes the keyring hands
/// to [`Secp256k1::sign`](crate::signer::Secp256k1::sign).
pub trait TypedDataBuilder: Send + Sync + fmt::Debug {
    /// Parses `sign_doc` into typed data.
    ///
    /// # Errors
    ///
    /// Any error is returned to the keyring unchanged.
    fn build(&self, sign_doc: &[u8]) -> Result<TypedData>;
}

/// Accepts sign documents that are already EIP-712 typed data in their
/// standard JSON form (`types`, `primaryType`, `domain`, `message`).
///
/// Amino `StdSignDoc` bytes are not converted. A keyring that hands over
/// amino documents must install its own [`TypedDataBuilder`] through
/// [`LedgerDerivation::with_builder`](crate::derivation::LedgerDerivation::with_builder).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTypedDataBuilder;

impl TypedDataBuilder for JsonTypedDataBuilder {
    fn build(&self, sign_doc: &[u8]) -> Result<TypedData> {
        TypedData::from_slice(sign_doc)
    }
}
