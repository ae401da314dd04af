//! Hardware wallet access.
//!
//! This module provides the capabilities the device session consumes and
//! their implementations:
//!
//! - [`Hub`]: enumerates attached wallets
//! - [`Wallet`]: open, close, derive and sign on one device
//! - [`Transport`]: raw APDU exchange, used by [`ledger::LedgerWallet`]
//!
//! # Architecture
//!
//! - [`apdu`]: APDU command/response types and Ethereum-app status words
//! - [`framing`]: the 64-byte HID packet format
//! - [`ledger`]: the Ethereum-app wallet driver over any [`Transport`]
//! - [`memory`]: a mnemonic-backed software wallet for tests and development
//! - `hid` (feature `hid`): USB discovery and transport via `hidapi`
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::DerivationPath;
//! use evmos_ledger_core::device::{Hub, Wallet, memory::{MemoryHub, MemoryWallet}};
//!
//! let hub = MemoryHub::new(vec![MemoryWallet::from_seed(&[7u8; 32]).unwrap()]);
//! let mut wallets = hub.wallets();
//! let wallet = &mut wallets[0];
//!
//! wallet.open("").unwrap();
//! let account = wallet.derive(&DerivationPath::ethereum(0), true).unwrap();
//! assert!(!account.address.is_zero());
//! ```

pub mod apdu;
pub mod framing;
pub mod ledger;
pub mod memory;

#[cfg(feature = "hid")]
pub mod hid;

pub use apdu::{Apdu, ApduResponse};
pub use ledger::LedgerWallet;
pub use memory::{MemoryHub, MemoryWallet};

#[cfg(feature = "hid")]
pub use hid::{HidTransport, LedgerHub};

use k256::ecdsa::VerifyingKey;

use crate::address::Address;
use crate::eip712::TypedData;
use crate::error::Result;
use crate::path::DerivationPath;

/// A transport layer for exchanging APDUs with a device.
///
/// This trait abstracts over the physical link (USB HID in production, a
/// scripted mock in tests) so the same wallet driver works over either.
pub trait Transport: Send {
    /// Opens the underlying channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`](crate::Error::ConnectionFailed) if
    /// the device cannot be reached.
    fn open(&mut self) -> Result<()>;

    /// Closes the underlying channel. Closing a closed channel is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the close.
    fn close(&mut self) -> Result<()>;

    /// Sends an APDU command and receives a response.
    ///
    /// # Errors
    ///
    /// Returns an error if communication fails. Status words are not
    /// interpreted here.
    fn exchange(&mut self, apdu: &Apdu) -> Result<ApduResponse>;

    /// Checks if the channel is open.
    fn is_connected(&self) -> bool;
}

/// The result of deriving a key at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// The secp256k1 public key.
    pub public_key: VerifyingKey,
    /// The Ethereum address of `public_key`.
    pub address: Address,
    /// The path the account was derived at.
    pub path: DerivationPath,
}

impl Account {
    /// Builds an account from a public key, computing its address.
    #[must_use]
    pub fn new(public_key: VerifyingKey, path: DerivationPath) -> Self {
        Self {
            address: Address::from_public_key(&public_key),
            public_key,
            path,
        }
    }
}

/// One signing device.
pub trait Wallet: Send {
    /// A short human-readable identifier for logs.
    fn label(&self) -> String;

    /// Opens the wallet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WalletAlreadyOpen`](crate::Error::WalletAlreadyOpen)
    /// if it is open already, or the device error.
    fn open(&mut self, passphrase: &str) -> Result<()>;

    /// Closes the wallet.
    ///
    /// # Errors
    ///
    /// Returns the device error.
    fn close(&mut self) -> Result<()>;

    /// Derives the account at `path`. With `pin` set the wallet remembers
    /// the account for later signing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WalletClosed`](crate::Error::WalletClosed) or the
    /// device error.
    fn derive(&mut self, path: &DerivationPath, pin: bool) -> Result<Account>;

    /// Signs EIP-712 typed data with `account`'s key and returns the device's
    /// signature bytes.
    ///
    /// # Errors
    ///
    /// Returns the device error, for example
    /// [`Error::UserDenied`](crate::Error::UserDenied).
    fn sign_typed_data(&mut self, account: &Account, typed_data: &TypedData) -> Result<Vec<u8>>;
}

/// Enumerates attached wallets.
pub trait Hub: Send {
    /// Returns every wallet the hub currently sees, in a stable order.
    fn wallets(&self) -> Vec<Box<dyn Wallet>>;
}

/// Initializes a hub. `Ok(None)` means the platform offers no hub at all.
pub type HubConnector = Box<dyn FnMut() -> Result<Option<Box<dyn Hub>>> + Send>;

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::Error;

    /// A transport that replays canned responses.
    struct MockTransport {
        responses: VecDeque<Vec<u8>>,
        open: bool,
    }

    impl Transport for MockTransport {
        fn open(&mut self) -> Result<()> {
            self.open = true;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.open = false;
            Ok(())
        }

        fn exchange(&mut self, _apdu: &Apdu) -> Result<ApduResponse> {
            let bytes = self
                .responses
                .pop_front()
                .ok_or_else(|| Error::ApduError("no response".to_string()))?;
            ApduResponse::from_bytes(bytes)
        }

        fn is_connected(&self) -> bool {
            self.open
        }
    }

    #[test]
    fn mock_transport() {
        let mut transport = MockTransport {
            responses: VecDeque::from([vec![0x90, 0x00]]),
            open: false,
        };
        transport.open().unwrap();

        let apdu = Apdu::ethereum(apdu::ins::GET_APP_CONFIGURATION, 0, 0, vec![]).unwrap();
        assert!(transport.exchange(&apdu).unwrap().is_success());
        assert!(transport.exchange(&apdu).is_err());
        assert!(transport.is_connected());
    }

    #[test]
    fn account_address_follows_key() {
        let key = k256::ecdsa::SigningKey::from_slice(&[0x24; 32]).unwrap();
        let account = Account::new(*key.verifying_key(), DerivationPath::ethereum(0));
        assert_eq!(
            account.address,
            Address::from_public_key(key.verifying_key())
        );
    }
}
