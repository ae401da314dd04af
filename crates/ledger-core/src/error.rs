//! Error types for the Ledger EIP-712 signer library.
//!
//! This module provides a single error type [`enum@Error`] covering every
//! failure mode of the signer, from hub enumeration down to EIP-712 hashing.
//!
//! # Error Categories
//!
//! - **Session errors**: what the keyring sees. These carry short,
//!   user-actionable messages instead of raw transport diagnostics.
//! - **Device errors**: what a [`Wallet`](crate::device::Wallet) or
//!   [`Transport`](crate::device::Transport) reports.
//! - **Data errors**: typed-data parsing, hashing and key decoding.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::Error;
//!
//! let err = Error::NoSession("sign with Ledger");
//! assert_eq!(err.to_string(), "unable to sign with Ledger: no wallet found");
//! ```

use core::result::Result as CoreResult;
use hex::FromHexError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// The main error type for the Ledger signer library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The adapter has no bound wallet (never connected or connect failed).
    #[error("unable to {0}: no wallet found")]
    NoSession(&'static str),

    /// The hub is missing or enumerated zero wallets.
    #[error("no hardware wallets detected")]
    NoWallet,

    /// The hub itself failed to initialize.
    #[error("failed to initialize hardware wallet hub: {0}")]
    HubInit(String),

    /// The first open of the primary wallet failed.
    #[error("failed to open hardware wallet: {0}")]
    WalletOpen(#[source] Box<Error>),

    /// Account derivation failed on the device. The message is generic on
    /// purpose; the device error is only logged.
    #[error("{0}")]
    Derivation(&'static str),

    /// The EIP-712 domain or message hash could not be computed.
    #[error("unable to generate EIP-712 hash for object: {0}")]
    HashComputation(#[source] Box<Error>),

    /// The device failed to produce a signature.
    #[error("error generating signature, please retry: {0}")]
    Signing(#[source] Box<Error>),

    /// Bech32 encoding failed; carries the encoder's message unchanged.
    #[error("{0}")]
    Encoding(String),

    // =========================================================================
    // Device Errors
    // =========================================================================
    /// The transport could not be established.
    #[error("failed to connect to Ledger: {0}")]
    ConnectionFailed(String),

    /// `open` was called on a wallet that is already open.
    #[error("wallet already open")]
    WalletAlreadyOpen,

    /// The wallet channel is closed.
    #[error("wallet closed")]
    WalletClosed,

    /// The device is locked (PIN not entered).
    #[error("Ledger device is locked")]
    DeviceLocked,

    /// The user rejected the request on the device.
    #[error("request denied by the user on the device")]
    UserDenied,

    /// The Ethereum app is not open on the device.
    #[error("Ethereum app is not open on the Ledger")]
    AppNotOpen,

    /// Failed to exchange an APDU with the device.
    #[error("APDU command failed: {0}")]
    ApduError(String),

    /// The device returned an unexpected status word.
    #[error("unexpected status word: SW1={0:#04x}, SW2={1:#04x}")]
    UnexpectedStatusWord(u8, u8),

    /// The device response was malformed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The derivation path cannot be used.
    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    // =========================================================================
    // Data Errors
    // =========================================================================
    /// The public key is invalid or malformed.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature is invalid or malformed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Software key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// The EIP-712 typed data is invalid.
    #[error("invalid EIP-712 typed data: {0}")]
    InvalidTypedData(String),

    /// A type referenced in the typed data is not defined.
    #[error("undefined type in EIP-712 data: {0}")]
    UndefinedType(String),

    /// Failed to parse hex data.
    #[error("hex decoding failed: {0}")]
    HexDecodeFailed(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    JsonError(String),
}

impl From<FromHexError> for Error {
    fn from(err: FromHexError) -> Self {
        Self::HexDecodeFailed(err.to_string())
    }
}

impl From<SerdeJsonError> for Error {
    fn from(err: SerdeJsonError) -> Self {
        Self::JsonError(err.to_string())
    }
}

/// A specialized [`Result`] type for signer operations.
pub type Result<T> = CoreResult<T, Error>;
