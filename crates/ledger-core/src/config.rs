//! Signer configuration.
//!
//! Every field has a default, so an empty JSON object (or
//! [`SignerConfig::default`]) yields a working Evmos setup.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::SignerConfig;
//!
//! let config = SignerConfig::from_json(r#"{"hrp": "cosmos"}"#).unwrap();
//! assert_eq!(config.hrp, "cosmos");
//! assert_eq!(config.hid.vendor_id, 0x2C97);
//! assert!(config.session.pin_derivations);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::DerivationPath;

/// Ledger's USB vendor ID.
pub const LEDGER_VENDOR_ID: u16 = 0x2C97;

/// HID usage page of the Ledger APDU interface.
pub const LEDGER_USAGE_PAGE: u16 = 0xFFA0;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Bech32 human-readable prefix for account addresses.
    pub hrp: String,
    /// Default account path, used by callers that do not choose one.
    pub hd_path: DerivationPath,
    /// Device session behavior.
    pub session: SessionConfig,
    /// USB/HID discovery.
    pub hid: HidConfig,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            hrp: "evmos".to_string(),
            hd_path: DerivationPath::ethereum(0),
            session: SessionConfig::default(),
            hid: HidConfig::default(),
        }
    }
}

impl SignerConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`](crate::Error::JsonError) on malformed
    /// input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How the session talks to its wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Passphrase passed to `open`. Ledger PIN entry happens on the device,
    /// so this is normally empty.
    pub passphrase: String,
    /// Value of the `pin` flag passed to every derive.
    pub pin_derivations: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            pin_derivations: true,
        }
    }
}

/// USB/HID device discovery parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HidConfig {
    /// USB vendor ID to match.
    pub vendor_id: u16,
    /// HID usage page of the APDU interface.
    pub usage_page: u16,
    /// How long one read waits for the device, in milliseconds. User
    /// confirmation happens inside this window.
    pub read_timeout_ms: i32,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            vendor_id: LEDGER_VENDOR_ID,
            usage_page: LEDGER_USAGE_PAGE,
            read_timeout_ms: 30_000,
        }
    }
}
