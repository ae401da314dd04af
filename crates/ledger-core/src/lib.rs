//! Evmos Ledger Signer Core Library
//!
//! This crate lets a Cosmos SDK keyring keep its secp256k1 keys on a Ledger
//! hardware wallet and sign with EIP-712 typed data, so the user can check
//! what is being signed on the device screen before approving.
//!
//! # Overview
//!
//! The keyring registers a derivation function and asks it for a signer when
//! it needs one. The signer:
//!
//! - **Connects once**: the first call enumerates devices, binds the first
//!   wallet and opens it; later calls share that session
//! - **Derives per call**: every request derives the account at the path it
//!   was given, nothing is cached
//! - **Shows the hashes**: before a signature is requested the EIP-712 domain
//!   and message hashes are printed, matching what the device displays
//! - **Speaks Cosmos**: addresses come back bech32-encoded under the
//!   keyring's prefix
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Keyring                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │   LedgerDerivation  ──►  LedgerSecp256k1 (Secp256k1 trait)  │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │        DeviceSession         │   EIP-712 hashing/display    │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                 Hub / Wallet abstraction                    │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │ LedgerWallet │  │ MemoryWallet │  │  Transport (APDU) │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────┘  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   USB HID (feature `hid`)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Getting a Signer
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use evmos_ledger_core::device::MemoryWallet;
//! use evmos_ledger_core::{DerivationPath, LedgerDerivation};
//!
//! // A software wallet stands in for the device here.
//! let wallet = MemoryWallet::from_mnemonic(
//!     "test test test test test test test test test test test junk",
//! )
//! .unwrap();
//!
//! let factory = Arc::new(LedgerDerivation::new(wallet.connector()));
//! let derive = factory.derivation_fn();
//!
//! let signer = derive().unwrap();
//! let (public_key, address) = signer
//!     .address_and_public_key(&DerivationPath::ethereum(0), "evmos")
//!     .unwrap();
//! assert_eq!(public_key.len(), 65);
//! assert!(address.starts_with("evmos1"));
//! ```
//!
//! ## Hashing EIP-712 Typed Data
//!
//! ```rust
//! use evmos_ledger_core::console::BufferConsole;
//! use evmos_ledger_core::hashes::render_signing_hashes;
//! use evmos_ledger_core::{Eip712Domain, TypedData};
//! use serde_json::json;
//!
//! let domain = Eip712Domain {
//!     name: Some("Evmos Web3".to_string()),
//!     version: Some("1.0.0".to_string()),
//!     chain_id: Some(9001),
//!     ..Eip712Domain::default()
//! };
//!
//! let types = json!({
//!     "Tx": [
//!         {"name": "account_number", "type": "string"},
//!         {"name": "memo", "type": "string"}
//!     ]
//! });
//!
//! let message = json!({"account_number": "1", "memo": "hello"});
//!
//! let typed_data = TypedData::new(domain, types, "Tx".to_string(), message);
//! let console = BufferConsole::new();
//! let hashes = render_signing_hashes(&typed_data, &console).unwrap();
//!
//! assert_eq!(console.lines().len(), 3);
//! assert_eq!(hashes.digest(), typed_data.signing_hash().unwrap());
//! ```
//!
//! ## Addresses
//!
//! ```rust
//! use evmos_ledger_core::Address;
//!
//! let address = Address::from_hex("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf").unwrap();
//! let bech32 = address.to_bech32("evmos").unwrap();
//! assert_eq!(Address::from_bech32(&bech32).unwrap().1, address);
//! ```
//!
//! # Devices
//!
//! The session only sees the [`device::Hub`] and [`device::Wallet`] traits.
//! [`device::LedgerWallet`] drives the Ethereum app over any
//! [`device::Transport`]; [`device::MemoryWallet`] derives keys from a
//! mnemonic and is meant for tests and development.
//!
//! ```ignore
//! use evmos_ledger_core::{SignerConfig, ledger_derivation};
//!
//! let factory = Arc::new(ledger_derivation(SignerConfig::default()));
//! keyring.register(factory.derivation_fn());
//! ```
//!
//! # Feature Flags
//!
//! - `hid`: USB HID transport and hub via `hidapi`
//!
//! # Security Considerations
//!
//! - Private keys never leave the Ledger
//! - Signing stops if the hashes cannot be computed, so nothing is signed
//!   that was not shown first
//! - The device checks that the address it reports matches the public key
//! - Derivation errors are reported with a generic message; details go to
//!   the `tracing` log only

// Modules
pub mod address;
pub mod builder;
pub mod config;
pub mod console;
pub mod crypto;
pub mod derivation;
pub mod device;
pub mod eip712;
pub mod error;
pub mod hashes;
pub mod path;
pub mod session;
pub mod signer;

// Re-exports for convenience
pub use address::{Address, bech32ify};
pub use builder::{JsonTypedDataBuilder, TypedDataBuilder};
pub use config::{HidConfig, SessionConfig, SignerConfig};
pub use console::{BufferConsole, Console, StdoutConsole};
#[cfg(feature = "hid")]
pub use derivation::ledger_derivation;
pub use derivation::{LedgerDerivation, Secp256k1DerivationFn};
pub use eip712::{Eip712Domain, TypeField, TypedData};
pub use error::{Error, Result};
pub use hashes::SigningHashes;
pub use path::DerivationPath;
pub use session::{DeviceSession, ReopenOutcome, SessionState};
pub use signer::{LedgerSecp256k1, Secp256k1};

// Re-export commonly used alloy types
pub use alloy_primitives::B256;
