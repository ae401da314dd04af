//! The derivation-function factory a keyring registers for Ledger keys.
//!
//! A keyring does not hold a signer directly. It holds a function that yields
//! one on demand. [`LedgerDerivation`] builds that function: the first call
//! connects to the device and every later call hands back the same adapter.
//! A failed connect is not cached, so plugging the device in and retrying is
//! enough to recover.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use evmos_ledger_core::LedgerDerivation;
//! use evmos_ledger_core::device::MemoryWallet;
//!
//! let wallet = MemoryWallet::from_seed(&[7u8; 32]).unwrap();
//! let factory = Arc::new(LedgerDerivation::new(wallet.connector()));
//! let derive = factory.derivation_fn();
//!
//! let first = derive().unwrap();
//! let second = derive().unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::builder::{JsonTypedDataBuilder, TypedDataBuilder};
use crate::config::SignerConfig;
use crate::console::{Console, StdoutConsole};
use crate::device::HubConnector;
use crate::error::Result;
use crate::signer::{LedgerSecp256k1, Secp256k1};

/// A function yielding the keyring's secp256k1 signing backend.
pub type Secp256k1DerivationFn = Arc<dyn Fn() -> Result<Arc<dyn Secp256k1>> + Send + Sync>;

/// Connects a [`LedgerSecp256k1`] lazily and shares it between callers.
pub struct LedgerDerivation {
    connector: Mutex<HubConnector>,
    signer: Mutex<Option<Arc<LedgerSecp256k1>>>,
    console: Arc<dyn Console>,
    builder: Arc<dyn TypedDataBuilder>,
    config: SignerConfig,
}

impl fmt::Debug for LedgerDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerDerivation")
            .field("connected", &self.is_connected())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LedgerDerivation {
    /// Creates a factory that connects through `connector`.
    #[must_use]
    pub fn new(connector: HubConnector) -> Self {
        Self {
            connector: Mutex::new(connector),
            signer: Mutex::new(None),
            console: Arc::new(StdoutConsole),
            builder: Arc::new(JsonTypedDataBuilder),
            config: SignerConfig::default(),
        }
    }

    /// Sets the console handed to the adapter.
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Sets the typed-data builder handed to the adapter.
    #[must_use]
    pub fn with_builder(mut self, builder: Arc<dyn TypedDataBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Sets the signer configuration.
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

    /// Returns the shared adapter, connecting on first use.
    ///
    /// # Errors
    ///
    /// Returns the connect error. Nothing is cached on failure.
    pub fn signer(&self) -> Result<Arc<LedgerSecp256k1>> {
        let mut slot = self.signer.lock();
        if let Some(signer) = slot.as_ref() {
            return Ok(Arc::clone(signer));
        }

        let mut connector = self.connector.lock();
        let signer = LedgerSecp256k1::connect(&mut *connector, self.config.clone())?
            .with_console(Arc::clone(&self.console))
            .with_builder(Arc::clone(&self.builder));

        info!("Ledger signer connected");
        let signer = Arc::new(signer);
        *slot = Some(Arc::clone(&signer));
        Ok(signer)
    }

    /// Closes and drops the shared adapter so the next call reconnects.
    ///
    /// Callers still holding the old adapter see a closed session, which
    /// reopens on their next operation.
    ///
    /// # Errors
    ///
    /// Returns the wallet's close error. The adapter is dropped anyway.
    pub fn reset(&self) -> Result<()> {
        let Some(signer) = self.signer.lock().take() else {
            return Ok(());
        };

        debug!("closing shared Ledger signer");
        signer.close()
    }

    /// Checks if an adapter is cached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.signer.lock().is_some()
    }

    /// Returns the keyring-facing derivation function.
    #[must_use]
    pub fn derivation_fn(self: &Arc<Self>) -> Secp256k1DerivationFn {
        let factory = Arc::clone(self);
        Arc::new(move || -> Result<Arc<dyn Secp256k1>> {
            let signer = factory.signer()?;
            Ok(signer)
        })
    }
}

/// Returns a factory for Ledger devices attached over USB HID.
#[cfg(feature = "hid")]
#[must_use]
pub fn ledger_derivation(config: SignerConfig) -> LedgerDerivation {
    let connector = crate::device::LedgerHub::connector(config.hid);
    LedgerDerivation::new(connector).with_config(config)
}
