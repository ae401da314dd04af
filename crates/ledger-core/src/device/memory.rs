//! A software wallet backed by a BIP-39 mnemonic.
//!
//! [`MemoryWallet`] follows the same [`Wallet`] contract as a Ledger: it must
//! be opened before use, rejects a second open, derives BIP-32 secp256k1 keys
//! and signs the EIP-712 digest. Clones share state, so a test can hand one
//! clone to a hub and keep another to count calls, inject failures or pull
//! the virtual cable.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::DerivationPath;
//! use evmos_ledger_core::device::{MemoryWallet, Wallet};
//!
//! let mut wallet = MemoryWallet::from_mnemonic(
//!     "test test test test test test test test test test test junk",
//! )
//! .unwrap();
//! wallet.open("").unwrap();
//!
//! let account = wallet.derive(&DerivationPath::ethereum(0), true).unwrap();
//! assert_eq!(
//!     account.address.to_string(),
//!     "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
//! );
//! assert_eq!(wallet.counts().derives, 1);
//! ```

use std::sync::Arc;

use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use parking_lot::Mutex;
use sha2::Sha512;
use tracing::debug;

use super::{Account, Hub, HubConnector, Wallet};
use crate::crypto::sign_prehash;
use crate::eip712::TypedData;
use crate::error::{Error, Result};
use crate::path::{DerivationPath, HARDENED_OFFSET};

type HmacSha512 = Hmac<Sha512>;

/// HMAC key of the BIP-32 master node.
const MASTER_KEY_SALT: &[u8] = b"Bitcoin seed";

/// A BIP-32 private node.
#[derive(Clone)]
struct ExtendedKey {
    key: SigningKey,
    chain_code: [u8; 32],
}

impl ExtendedKey {
    fn master(seed: &[u8]) -> Result<Self> {
        let digest = hmac_sha512(MASTER_KEY_SALT, &[seed])?;
        Self::from_digest(&digest, None)
    }

    fn child(&self, index: u32) -> Result<Self> {
        let index_bytes = index.to_be_bytes();
        let digest = if index & HARDENED_OFFSET == 0 {
            let public = self.key.verifying_key().to_encoded_point(true);
            hmac_sha512(&self.chain_code, &[public.as_bytes(), &index_bytes])?
        } else {
            let secret = self.key.to_bytes();
            hmac_sha512(&self.chain_code, &[&[0x00], secret.as_slice(), &index_bytes])?
        };
        Self::from_digest(&digest, Some(&self.key))
    }

    /// Splits `I` into key material and chain code. With a parent the key is
    /// `parse256(I_L) + k_par (mod n)`.
    fn from_digest(digest: &[u8; 64], parent: Option<&SigningKey>) -> Result<Self> {
        let tweak = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(
            &digest[..32],
        )))
        .ok_or_else(|| Error::KeyDerivationFailed("I_L is not below the curve order".into()))?;

        let scalar = match parent {
            Some(parent) => tweak + **parent.as_nonzero_scalar(),
            None => tweak,
        };
        let key = SigningKey::from_bytes(&scalar.to_repr())
            .map_err(|_| Error::KeyDerivationFailed("derived key is zero".into()))?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&digest[32..]);
        Ok(Self { key, chain_code })
    }

    fn derive_path(&self, path: &DerivationPath) -> Result<SigningKey> {
        let mut node = self.clone();
        for index in path.iter() {
            node = node.child(*index)?;
        }
        Ok(node.key)
    }
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 64]> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let digest = mac.finalize().into_bytes();
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// How many times each wallet primitive has been called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Calls to `open`, successful or not.
    pub opens: usize,
    /// Calls to `close`.
    pub closes: usize,
    /// Calls to `derive`.
    pub derives: usize,
    /// Calls to `sign_typed_data`.
    pub signs: usize,
}

#[derive(Debug, Default)]
struct State {
    open: bool,
    unplugged: bool,
    fail_open: bool,
    fail_derive: bool,
    fail_sign: bool,
    counts: CallCounts,
    pinned: Vec<DerivationPath>,
}

struct Inner {
    label: String,
    master: ExtendedKey,
    state: Mutex<State>,
}

/// A mnemonic-backed wallet. Clones share the same device state.
#[derive(Clone)]
pub struct MemoryWallet {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryWallet")
            .field("label", &self.inner.label)
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

impl MemoryWallet {
    /// Creates a closed wallet from a BIP-39 phrase with an empty passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyDerivationFailed`] if the phrase is not a valid
    /// mnemonic.
    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        let mnemonic =
            Mnemonic::parse(phrase).map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;
        Self::from_seed(&mnemonic.to_seed(""))
    }

    /// Creates a closed wallet from a raw BIP-32 seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyDerivationFailed`] for an unusable seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                label: "memory".to_string(),
                master: ExtendedKey::master(seed)?,
                state: Mutex::new(State::default()),
            }),
        })
    }

    /// Returns a copy with a different label and fresh state.
    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                label: label.into(),
                master: self.inner.master.clone(),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Returns the call counters.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.inner.state.lock().counts
    }

    /// Checks if the wallet is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.state.lock().open
    }

    /// Returns the paths derived with `pin` set, in order.
    #[must_use]
    pub fn pinned_paths(&self) -> Vec<DerivationPath> {
        self.inner.state.lock().pinned.clone()
    }

    /// Makes every `open` fail.
    pub fn fail_open(&self, fail: bool) {
        self.inner.state.lock().fail_open = fail;
    }

    /// Makes every `derive` fail.
    pub fn fail_derive(&self, fail: bool) {
        self.inner.state.lock().fail_derive = fail;
    }

    /// Makes every `sign_typed_data` fail as if the user rejected it.
    pub fn fail_sign(&self, fail: bool) {
        self.inner.state.lock().fail_sign = fail;
    }

    /// Simulates unplugging the device: the channel closes and reopening
    /// fails until [`MemoryWallet::plug_in`].
    pub fn unplug(&self) {
        let mut state = self.inner.state.lock();
        state.open = false;
        state.unplugged = true;
    }

    /// Reverses [`MemoryWallet::unplug`]. The wallet stays closed.
    pub fn plug_in(&self) {
        self.inner.state.lock().unplugged = false;
    }

    /// Returns the hub connector of a hub holding only this wallet.
    #[must_use]
    pub fn connector(&self) -> HubConnector {
        MemoryHub::new(vec![self.clone()]).connector()
    }

    fn account_key(&self, path: &DerivationPath) -> Result<SigningKey> {
        self.inner.master.derive_path(path)
    }
}

impl Wallet for MemoryWallet {
    fn label(&self) -> String {
        self.inner.label.clone()
    }

    fn open(&mut self, _passphrase: &str) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.counts.opens += 1;

        if state.unplugged {
            return Err(Error::ConnectionFailed("device disconnected".to_string()));
        }
        if state.fail_open {
            return Err(Error::ConnectionFailed("simulated open failure".to_string()));
        }
        if state.open {
            return Err(Error::WalletAlreadyOpen);
        }
        state.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.counts.closes += 1;
        state.open = false;
        state.pinned.clear();
        Ok(())
    }

    fn derive(&mut self, path: &DerivationPath, pin: bool) -> Result<Account> {
        {
            let mut state = self.inner.state.lock();
            state.counts.derives += 1;
            if !state.open {
                return Err(Error::WalletClosed);
            }
            if state.fail_derive {
                return Err(Error::AppNotOpen);
            }
            if pin && !state.pinned.contains(path) {
                state.pinned.push(path.clone());
            }
        }

        let key = self.account_key(path)?;
        let account = Account::new(*key.verifying_key(), path.clone());
        debug!(wallet = %self.inner.label, %path, address = %account.address, "derived account");
        Ok(account)
    }

    fn sign_typed_data(&mut self, account: &Account, typed_data: &TypedData) -> Result<Vec<u8>> {
        {
            let mut state = self.inner.state.lock();
            state.counts.signs += 1;
            if !state.open {
                return Err(Error::WalletClosed);
            }
            if state.fail_sign {
                return Err(Error::UserDenied);
            }
        }

        let key = self.account_key(&account.path)?;
        if key.verifying_key() != &account.public_key {
            return Err(Error::InvalidPublicKey(format!(
                "account {} does not belong to this wallet",
                account.address
            )));
        }

        let digest = typed_data.signing_hash()?;
        Ok(sign_prehash(&key, &digest.0)?.to_vec())
    }
}

/// A hub that always lists the same memory wallets.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    wallets: Vec<MemoryWallet>,
}

impl MemoryHub {
    /// Creates a hub listing `wallets` in order.
    #[must_use]
    pub const fn new(wallets: Vec<MemoryWallet>) -> Self {
        Self { wallets }
    }

    /// Returns a connector that hands out this hub on every call.
    #[must_use]
    pub fn connector(self) -> HubConnector {
        Box::new(move || Ok(Some(Box::new(self.clone()) as Box<dyn Hub>)))
    }
}

impl Hub for MemoryHub {
    fn wallets(&self) -> Vec<Box<dyn Wallet>> {
        self.wallets
            .iter()
            .map(|w| Box::new(w.clone()) as Box<dyn Wallet>)
            .collect()
    }
}
