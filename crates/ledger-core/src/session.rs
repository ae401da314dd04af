//! The device session: one hub, one primary wallet.
//!
//! A [`DeviceSession`] is created by [`DeviceSession::connect`], which
//! initializes the hub, takes the **first** wallet it lists and opens it.
//! After that the session:
//!
//! 1. Reopens the wallet before each operation ([`DeviceSession::ensure_open`]),
//!    because a Ledger silently closes its channel when the user leaves the
//!    Ethereum app or the host sleeps
//! 2. Derives the account for the caller's path on every call; no account is
//!    cached
//! 3. Forwards signing requests to the wallet
//!
//! The reopen is best effort. A wallet that is already open refuses a second
//! open, and that refusal looks like any other open error, so the outcome is
//! reported as a [`ReopenOutcome`] for the caller to discard. A channel that is
//! really dead surfaces from the next derive.

use std::fmt;

use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::device::{Account, HubConnector, Wallet};
use crate::eip712::TypedData;
use crate::error::{Error, Result};
use crate::path::DerivationPath;

/// Whether the primary wallet was last seen open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Opened by `connect` or a successful reopen.
    Open,
    /// Closed by [`DeviceSession::close`].
    Closed,
}

/// Result of a best-effort reopen.
#[derive(Debug)]
#[must_use = "the reopen outcome should be discarded explicitly"]
pub enum ReopenOutcome {
    /// The wallet was closed and is open again.
    Reopened,
    /// The wallet refused the open because it is already open.
    AlreadyOpen,
    /// The open failed for another reason.
    Failed(Error),
}

/// An open connection to the primary wallet.
pub struct DeviceSession {
    wallet: Box<dyn Wallet>,
    label: String,
    state: SessionState,
    config: SessionConfig,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("wallet", &self.label)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Initializes the hub, binds its first wallet and opens it.
    ///
    /// # Arguments
    ///
    /// * `connector` - Initializes the hub
    /// * `config` - Passphrase and derive behavior
    ///
    /// # Errors
    ///
    /// - [`Error::HubInit`] if the connector fails
    /// - [`Error::NoWallet`] if there is no hub or it lists no wallets
    /// - [`Error::WalletOpen`] if the first open fails
    pub fn connect(connector: &mut HubConnector, config: SessionConfig) -> Result<Self> {
        let hub = connector()
            .map_err(|e| Error::HubInit(e.to_string()))?
            .ok_or(Error::NoWallet)?;

        let wallets = hub.wallets();
        info!(count = wallets.len(), "hardware wallets found");
        let mut wallet = wallets.into_iter().next().ok_or(Error::NoWallet)?;

        wallet
            .open(&config.passphrase)
            .map_err(|e| Error::WalletOpen(Box::new(e)))?;

        let label = wallet.label();
        info!(wallet = %label, "selected primary wallet");
        Ok(Self {
            wallet,
            label,
            state: SessionState::Open,
            config,
        })
    }

    /// Returns the session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the primary wallet's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reopens the primary wallet, best effort.
    pub fn ensure_open(&mut self) -> ReopenOutcome {
        match self.wallet.open(&self.config.passphrase) {
            Ok(()) => {
                debug!(wallet = %self.label, "reopened wallet");
                self.state = SessionState::Open;
                ReopenOutcome::Reopened
            }
            Err(Error::WalletAlreadyOpen) => ReopenOutcome::AlreadyOpen,
            Err(e) => {
                debug!(wallet = %self.label, error = %e, "reopen failed");
                ReopenOutcome::Failed(e)
            }
        }
    }

    /// Derives the account at `path`.
    ///
    /// # Errors
    ///
    /// Returns the wallet's error unchanged.
    pub fn derive(&mut self, path: &DerivationPath) -> Result<Account> {
        self.wallet.derive(path, self.config.pin_derivations)
    }

    /// Signs typed data with `account`.
    ///
    /// # Errors
    ///
    /// Returns the wallet's error unchanged.
    pub fn sign_typed_data(&mut self, account: &Account, typed_data: &TypedData) -> Result<Vec<u8>> {
        self.wallet.sign_typed_data(account, typed_data)
    }

    /// Closes the primary wallet. Closing a closed session does nothing.
    ///
    /// # Errors
    ///
    /// Returns the wallet's close error; the session counts as closed anyway.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        self.state = SessionState::Closed;
        info!(wallet = %self.label, "closing wallet");
        self.wallet.close()
    }
}
