//! The signing adapter the keyring talks to.
//!
//! This module provides the [`Secp256k1`] trait, the contract a keyring uses
//! for any secp256k1 signing backend, and [`LedgerSecp256k1`], the
//! implementation backed by a [`DeviceSession`].
//!
//! Every operation derives the account at the path it is given. Device errors
//! during derivation are replaced by a short instruction for the operator;
//! the original error is only logged.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::device::MemoryWallet;
//! use evmos_ledger_core::{LedgerSecp256k1, Secp256k1, SignerConfig};
//!
//! let wallet = MemoryWallet::from_seed(&[1u8; 32]).unwrap();
//! let signer = LedgerSecp256k1::connect(&mut wallet.connector(), SignerConfig::default()).unwrap();
//!
//! let (public_key, address) = signer
//!     .address_and_public_key(&[0x8000_002C, 0x8000_003C, 0x8000_0000, 0, 0], "evmos")
//!     .unwrap();
//! assert_eq!(public_key.len(), 65);
//! assert!(address.starts_with("evmos1"));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::address::bech32ify;
use crate::builder::{JsonTypedDataBuilder, TypedDataBuilder};
use crate::config::SignerConfig;
use crate::console::{Console, StdoutConsole};
use crate::crypto::public_key_to_uncompressed;
use crate::device::{Account, HubConnector};
use crate::error::{Error, Result};
use crate::hashes::render_signing_hashes;
use crate::path::DerivationPath;
use crate::session::{DeviceSession, ReopenOutcome};

/// Message for a failed derive when only the public key was asked for.
pub const DERIVE_PUBLIC_KEY_FAILED: &str = "unable to derive public key, please retry";

/// Message for a failed derive on address and signing requests.
pub const DERIVE_ADDRESS_FAILED: &str =
    "unable to derive Ledger address, please open the Ethereum app and retry";

/// Notice printed before a signing request reaches the device.
pub const SIGNING_NOTICE: &str = "Generating payload, please check your Ledger...";

/// A secp256k1 signing backend, addressed by HD path.
pub trait Secp256k1: Send + Sync + fmt::Debug {
    /// Releases the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] if the backend never connected.
    fn close(&self) -> Result<()>;

    /// Returns the 65-byte uncompressed public key at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] or [`Error::Derivation`].
    fn public_key(&self, path: &[u32]) -> Result<Vec<u8>>;

    /// Returns the public key at `path` and its bech32 address under `hrp`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`], [`Error::Derivation`] or the address
    /// encoder's [`Error::Encoding`].
    fn address_and_public_key(&self, path: &[u32], hrp: &str) -> Result<(Vec<u8>, String)>;

    /// Signs `sign_doc` with the key at `path` and returns the signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`], [`Error::Derivation`], the builder's
    /// error, [`Error::HashComputation`] or [`Error::Signing`].
    fn sign(&self, path: &[u32], sign_doc: &[u8]) -> Result<Vec<u8>>;
}

/// A [`Secp256k1`] backend driving a Ledger through a [`DeviceSession`].
///
/// The session sits behind a mutex, so concurrent callers take turns instead
/// of interleaving device commands.
pub struct LedgerSecp256k1 {
    session: Mutex<Option<DeviceSession>>,
    console: Arc<dyn Console>,
    builder: Arc<dyn TypedDataBuilder>,
    config: SignerConfig,
}

impl fmt::Debug for LedgerSecp256k1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerSecp256k1")
            .field("session", &*self.session.lock())
            .field("builder", &self.builder)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LedgerSecp256k1 {
    /// Creates an adapter with no session. Every operation fails with
    /// [`Error::NoSession`].
    #[must_use]
    pub fn disconnected() -> Self {
        Self::from_session(None)
    }

    /// Connects to the first wallet of the hub `connector` yields.
    ///
    /// # Errors
    ///
    /// See [`DeviceSession::connect`].
    pub fn connect(connector: &mut HubConnector, config: SignerConfig) -> Result<Self> {
        let session = DeviceSession::connect(connector, config.session.clone())?;
        Ok(Self::from_session(Some(session)).with_config(config))
    }

    /// Wraps an existing session.
    #[must_use]
    pub fn from_session(session: Option<DeviceSession>) -> Self {
        Self {
            session: Mutex::new(session),
            console: Arc::new(StdoutConsole),
            builder: Arc::new(JsonTypedDataBuilder),
            config: SignerConfig::default(),
        }
    }

    /// Replaces the operator console.
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Replaces the typed-data builder.
    #[must_use]
    pub fn with_builder(mut self, builder: Arc<dyn TypedDataBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Replaces the configuration used by [`Self::default_account`].
    ///
    /// The session keeps the settings it was connected with.
    #[must_use]
    pub fn with_config(mut self, config: SignerConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Returns the public key and bech32 address at the configured default
    /// path and prefix.
    ///
    /// # Errors
    ///
    /// See [`Secp256k1::address_and_public_key`].
    pub fn default_account(&self) -> Result<(Vec<u8>, String)> {
        self.address_and_public_key(&self.config.hd_path, &self.config.hrp)
    }

    /// Checks if a session is bound.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Runs `op` on the session after a best-effort reopen and a derive at
    /// `path`.
    fn with_account<T>(
        &self,
        operation: &'static str,
        path: &[u32],
        derive_failed: &'static str,
        op: impl FnOnce(&mut DeviceSession, Account) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(Error::NoSession(operation))?;

        match session.ensure_open() {
            ReopenOutcome::Failed(e) => debug!(error = %e, "ignoring reopen failure"),
            ReopenOutcome::Reopened | ReopenOutcome::AlreadyOpen => {}
        }

        let path = DerivationPath::from(path);
        let account = session.derive(&path).map_err(|e| {
            debug!(%path, error = %e, "derive failed");
            Error::Derivation(derive_failed)
        })?;

        op(session, account)
    }
}

impl Secp256k1 for LedgerSecp256k1 {
    fn close(&self) -> Result<()> {
        self.session
            .lock()
            .as_mut()
            .ok_or(Error::NoSession("close Ledger"))?
            .close()
    }

    fn public_key(&self, path: &[u32]) -> Result<Vec<u8>> {
        self.with_account(
            "get Ledger public key",
            path,
            DERIVE_PUBLIC_KEY_FAILED,
            |_, account| Ok(public_key_to_uncompressed(&account.public_key).to_vec()),
        )
    }

    fn address_and_public_key(&self, path: &[u32], hrp: &str) -> Result<(Vec<u8>, String)> {
        self.with_account(
            "get Ledger address",
            path,
            DERIVE_ADDRESS_FAILED,
            |_, account| {
                let address = bech32ify(hrp, account.address.as_bytes())?;
                let public_key = public_key_to_uncompressed(&account.public_key).to_vec();
                Ok((public_key, address))
            },
        )
    }

    fn sign(&self, path: &[u32], sign_doc: &[u8]) -> Result<Vec<u8>> {
        self.console.print_line(SIGNING_NOTICE);

        self.with_account(
            "sign with Ledger",
            path,
            DERIVE_ADDRESS_FAILED,
            |session, account| {
                let typed_data = self.builder.build(sign_doc)?;
                render_signing_hashes(&typed_data, self.console.as_ref())?;

                session
                    .sign_typed_data(&account, &typed_data)
                    .map_err(|e| Error::Signing(Box::new(e)))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::console::BufferConsole;
    use crate::device::memory::MemoryWallet;

    const PATH: [u32; 5] = [0x8000_002C, 0x8000_003C, 0x8000_0000, 0, 0];

    fn connected(wallet: &MemoryWallet, console: &BufferConsole) -> LedgerSecp256k1 {
        LedgerSecp256k1::connect(&mut wallet.connector(), SignerConfig::default())
            .unwrap()
            .with_console(Arc::new(console.clone()))
    }

    fn sign_doc() -> Vec<u8> {
        json!({
            "types": {"Tx": [{"name": "memo", "type": "string"}]},
            "primaryType": "Tx",
            "domain": {"name": "Evmos", "chainId": 9001},
            "message": {"memo": "adapter"}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn disconnected_reports_operation() {
        let signer = LedgerSecp256k1::disconnected();
        assert!(!signer.is_connected());

        let err = signer.public_key(&PATH).unwrap_err();
        assert_eq!(err.to_string(), "unable to get Ledger public key: no wallet found");
        let err = signer.close().unwrap_err();
        assert_eq!(err.to_string(), "unable to close Ledger: no wallet found");
        assert!(matches!(
            signer.address_and_public_key(&PATH, "evmos"),
            Err(Error::NoSession(_))
        ));
    }

    #[test]
    fn sign_on_disconnected_still_prints_notice() {
        let console = BufferConsole::new();
        let signer = LedgerSecp256k1::disconnected().with_console(Arc::new(console.clone()));

        let err = signer.sign(&PATH, &sign_doc()).unwrap_err();
        assert_eq!(err.to_string(), "unable to sign with Ledger: no wallet found");
        assert_eq!(console.lines(), vec![SIGNING_NOTICE]);
    }

    #[test]
    fn public_key_matches_address() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let signer = connected(&wallet, &BufferConsole::new());

        let public_key = signer.public_key(&PATH).unwrap();
        let (same_key, address) = signer.address_and_public_key(&PATH, "evmos").unwrap();
        assert_eq!(public_key, same_key);

        let key = crate::crypto::parse_public_key(&public_key).unwrap();
        let expected = crate::address::Address::from_public_key(&key);
        assert_eq!(address, expected.to_bech32("evmos").unwrap());
    }

    #[test]
    fn derive_failure_is_generic() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let signer = connected(&wallet, &BufferConsole::new());
        wallet.fail_derive(true);

        let err = signer.public_key(&PATH).unwrap_err();
        assert_eq!(err.to_string(), DERIVE_PUBLIC_KEY_FAILED);
        let err = signer.address_and_public_key(&PATH, "evmos").unwrap_err();
        assert_eq!(err.to_string(), DERIVE_ADDRESS_FAILED);
    }

    #[test]
    fn default_account_uses_config() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let config = SignerConfig {
            hrp: "cosmos".to_string(),
            ..SignerConfig::default()
        };
        let signer = LedgerSecp256k1::connect(&mut wallet.connector(), config).unwrap();

        let (public_key, address) = signer.default_account().unwrap();
        assert!(address.starts_with("cosmos1"));
        assert_eq!(public_key, signer.public_key(&PATH).unwrap());
    }

    #[test]
    fn encoding_error_passes_through() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let signer = connected(&wallet, &BufferConsole::new());

        let err = signer.address_and_public_key(&PATH, "").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn sign_prints_notice_then_hashes() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let console = BufferConsole::new();
        let signer = connected(&wallet, &console);

        let signature = signer.sign(&PATH, &sign_doc()).unwrap();
        assert_eq!(signature.len(), 65);

        let lines = console.lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], SIGNING_NOTICE);
        assert_eq!(lines[1], "Signing the following payload with EIP-712:");
        assert!(lines[2].starts_with("- Domain: 0x"));
        assert!(lines[3].starts_with("- Message: 0x"));
    }

    #[test]
    fn builder_error_is_verbatim() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let signer = connected(&wallet, &BufferConsole::new());

        let err = signer.sign(&PATH, b"not json").unwrap_err();
        assert!(matches!(err, Error::JsonError(_)));
        assert_eq!(wallet.counts().signs, 0);
    }

    #[test]
    fn undeclared_message_field_blocks_signing() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let console = BufferConsole::new();
        let signer = connected(&wallet, &console);

        let doc = json!({
            "types": {"Tx": [{"name": "memo", "type": "string"}]},
            "primaryType": "Tx",
            "domain": {"name": "Evmos", "chainId": 9001},
            "message": {"memo": "hi", "to_address": "evmos1recipient", "amount": "999999"}
        })
        .to_string();

        let err = signer.sign(&PATH, doc.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::HashComputation(_)));
        assert_eq!(wallet.counts().signs, 0);
        assert_eq!(console.lines(), vec![SIGNING_NOTICE]);
    }

    #[test]
    fn device_sign_failure_is_wrapped() {
        let wallet = MemoryWallet::from_seed(&[5u8; 32]).unwrap();
        let signer = connected(&wallet, &BufferConsole::new());
        wallet.fail_sign(true);

        let err = signer.sign(&PATH, &sign_doc()).unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
        assert!(
            err.to_string()
                .starts_with("error generating signature, please retry: ")
        );
    }
}
