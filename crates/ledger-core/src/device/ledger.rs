//! Ledger Ethereum-app wallet driver.
//!
//! This module provides [`LedgerWallet`], a [`Wallet`] that drives the
//! Ethereum app on a Ledger over any [`Transport`]. It handles:
//!
//! - Reading the app version on open
//! - Public key and address retrieval
//! - EIP-712 signing from precomputed hashes
//!
//! # Protocol
//!
//! | Command               | INS  | Data                          | Reply                           |
//! |-----------------------|------|-------------------------------|---------------------------------|
//! | GET_APP_CONFIGURATION | 0x06 | none                          | flags, major, minor, patch      |
//! | GET_PUBLIC_KEY        | 0x02 | path                          | len, key, len, ASCII address    |
//! | SIGN_EIP712_HASHED    | 0x0C | path, domain hash, msg hash   | v, r, s                         |
//!
//! A path is encoded as a component count followed by big-endian `u32`s.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use super::apdu::{Apdu, ins};
use super::{Account, Transport, Wallet};
use crate::address::Address;
use crate::crypto::{SIGNATURE_LEN, UNCOMPRESSED_PUBLIC_KEY_LEN, normalize_recovery_id, parse_public_key};
use crate::eip712::TypedData;
use crate::error::{Error, Result};
use crate::hashes::SigningHashes;
use crate::path::DerivationPath;

/// Longest path the Ethereum app accepts.
pub const MAX_PATH_COMPONENTS: usize = 10;

/// First app version that implements `SIGN_EIP712_HASHED`.
pub const MIN_EIP712_VERSION: AppVersion = AppVersion {
    major: 1,
    minor: 5,
    patch: 0,
};

/// Version of the Ethereum app running on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub patch: u8,
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A Ledger running the Ethereum app.
pub struct LedgerWallet<T: Transport> {
    transport: T,
    label: String,
    version: Option<AppVersion>,
    pinned: HashMap<Address, DerivationPath>,
}

impl<T: Transport> fmt::Debug for LedgerWallet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerWallet")
            .field("label", &self.label)
            .field("version", &self.version)
            .field("pinned", &self.pinned.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> LedgerWallet<T> {
    /// Creates a closed wallet over `transport`.
    #[must_use]
    pub fn new(transport: T, label: impl Into<String>) -> Self {
        Self {
            transport,
            label: label.into(),
            version: None,
            pinned: HashMap::new(),
        }
    }

    /// Returns the app version read at open, `None` while closed.
    #[must_use]
    pub const fn version(&self) -> Option<AppVersion> {
        self.version
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    fn ensure_open(&self) -> Result<AppVersion> {
        match self.version {
            Some(version) if self.transport.is_connected() => Ok(version),
            _ => Err(Error::WalletClosed),
        }
    }

    fn exchange(&mut self, apdu: &Apdu) -> Result<Vec<u8>> {
        self.transport.exchange(apdu)?.into_checked()
    }

    fn read_version(&mut self) -> Result<AppVersion> {
        let apdu = Apdu::ethereum(ins::GET_APP_CONFIGURATION, 0x00, 0x00, Vec::new())?;
        let reply = self.exchange(&apdu)?;

        match reply.as_slice() {
            [_flags, major, minor, patch, ..] => Ok(AppVersion {
                major: *major,
                minor: *minor,
                patch: *patch,
            }),
            _ => Err(Error::MalformedResponse(format!(
                "app configuration of {} bytes",
                reply.len()
            ))),
        }
    }
}

impl<T: Transport> Wallet for LedgerWallet<T> {
    fn label(&self) -> String {
        match self.version {
            Some(version) => format!("{} (Ethereum app {version})", self.label),
            None => self.label.clone(),
        }
    }

    fn open(&mut self, _passphrase: &str) -> Result<()> {
        // The PIN is entered on the device itself.
        if self.version.is_some() && self.transport.is_connected() {
            return Err(Error::WalletAlreadyOpen);
        }

        self.transport.open()?;
        match self.read_version() {
            Ok(version) => {
                info!(wallet = %self.label, %version, "opened Ledger");
                self.version = Some(version);
                Ok(())
            }
            Err(e) => {
                let _ = self.transport.close();
                Err(e)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.version = None;
        self.pinned.clear();
        self.transport.close()
    }

    fn derive(&mut self, path: &DerivationPath, pin: bool) -> Result<Account> {
        self.ensure_open()?;

        let apdu = Apdu::ethereum(ins::GET_PUBLIC_KEY, 0x00, 0x00, encode_path(path)?)?;
        let reply = self.exchange(&apdu)?;
        let (public_key, reported) = parse_public_key_reply(&reply)?;

        let account = Account::new(public_key, path.clone());
        if account.address != reported {
            return Err(Error::MalformedResponse(format!(
                "device reported address {reported} for key of {}",
                account.address
            )));
        }

        debug!(%path, address = %account.address, pin, "derived Ledger account");
        if pin {
            self.pinned.insert(account.address, path.clone());
        }
        Ok(account)
    }

    fn sign_typed_data(&mut self, account: &Account, typed_data: &TypedData) -> Result<Vec<u8>> {
        let version = self.ensure_open()?;
        if version < MIN_EIP712_VERSION {
            return Err(Error::ApduError(format!(
                "Ethereum app {version} cannot sign EIP-712, {MIN_EIP712_VERSION} or newer is required"
            )));
        }

        let path = self
            .pinned
            .get(&account.address)
            .unwrap_or(&account.path)
            .clone();
        let hashes = SigningHashes::compute(typed_data)?;

        let mut data = encode_path(&path)?;
        data.extend_from_slice(hashes.domain.as_slice());
        data.extend_from_slice(hashes.message.as_slice());

        let apdu = Apdu::ethereum(ins::SIGN_EIP712_HASHED, 0x00, 0x00, data)?;
        let reply = self.exchange(&apdu)?;
        debug!(%path, "Ledger returned EIP-712 signature");

        signature_from_reply(&reply)
    }
}

/// Encodes a path as the Ethereum app expects it.
///
/// # Errors
///
/// Returns [`Error::InvalidDerivationPath`] for an empty path or one longer
/// than [`MAX_PATH_COMPONENTS`].
pub fn encode_path(path: &DerivationPath) -> Result<Vec<u8>> {
    if path.is_empty() || path.len() > MAX_PATH_COMPONENTS {
        return Err(Error::InvalidDerivationPath(format!(
            "{path} has {} components, Ledger accepts 1 to {MAX_PATH_COMPONENTS}",
            path.len()
        )));
    }

    let mut out = Vec::with_capacity(1 + 4 * path.len());
    out.push(u8::try_from(path.len()).map_err(|_| Error::InvalidDerivationPath(path.to_string()))?);
    for index in path.iter() {
        out.extend_from_slice(&index.to_be_bytes());
    }
    Ok(out)
}

/// Parses `len || public key || len || ASCII hex address`.
fn parse_public_key_reply(reply: &[u8]) -> Result<(k256::ecdsa::VerifyingKey, Address)> {
    let malformed = || Error::MalformedResponse(format!("public key reply of {} bytes", reply.len()));

    let (&key_len, rest) = reply.split_first().ok_or_else(malformed)?;
    let key_len = usize::from(key_len);
    if key_len != UNCOMPRESSED_PUBLIC_KEY_LEN || rest.len() < key_len {
        return Err(malformed());
    }
    let (key_bytes, rest) = rest.split_at(key_len);

    let (&address_len, rest) = rest.split_first().ok_or_else(malformed)?;
    let address_ascii = rest.get(..usize::from(address_len)).ok_or_else(malformed)?;
    let address_str = std::str::from_utf8(address_ascii).map_err(|_| malformed())?;

    let public_key = parse_public_key(key_bytes)?;
    let address = Address::from_hex(address_str)
        .map_err(|e| Error::MalformedResponse(format!("device address: {e}")))?;
    Ok((public_key, address))
}

/// Turns the device's `v || r || s` into `r || s || v` with `v` in `{0, 1}`.
fn signature_from_reply(reply: &[u8]) -> Result<Vec<u8>> {
    let Some((&v, rs)) = reply.split_first() else {
        return Err(Error::InvalidSignature("empty signature reply".to_string()));
    };
    if reply.len() != SIGNATURE_LEN {
        return Err(Error::InvalidSignature(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            reply.len()
        )));
    }

    let mut signature = Vec::with_capacity(SIGNATURE_LEN);
    signature.extend_from_slice(rs);
    signature.push(normalize_recovery_id(v));
    Ok(signature)
}
