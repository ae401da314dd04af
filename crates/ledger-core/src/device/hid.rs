//! USB HID transport for Ledger devices.
//!
//! This module provides a [`Transport`] over `hidapi`, which works on macOS,
//! Linux and Windows, and a [`Hub`] that lists every attached Ledger.
//!
//! # Example
//!
//! ```ignore
//! use evmos_ledger_core::config::HidConfig;
//! use evmos_ledger_core::device::{Hub, LedgerHub};
//!
//! let hub = LedgerHub::discover(&HidConfig::default())?;
//! let mut wallets = hub.wallets();
//! wallets[0].open("")?;
//! ```

use std::ffi::CString;
use std::fmt;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info};

use super::apdu::{Apdu, ApduResponse};
use super::framing::{self, CHANNEL, PACKET_SIZE, ResponseReader};
use super::{Hub, HubConnector, LedgerWallet, Transport, Wallet};
use crate::config::HidConfig;
use crate::error::{Error, Result};

/// A HID transport to one Ledger interface.
pub struct HidTransport {
    path: CString,
    read_timeout_ms: i32,
    device: Option<HidDevice>,
}

impl fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidTransport")
            .field("path", &self.path)
            .field("open", &self.device.is_some())
            .finish_non_exhaustive()
    }
}

impl HidTransport {
    /// Creates a closed transport for the HID interface at `path`.
    #[must_use]
    pub const fn new(path: CString, read_timeout_ms: i32) -> Self {
        Self {
            path,
            read_timeout_ms,
            device: None,
        }
    }

    fn device(&self) -> Result<&HidDevice> {
        self.device
            .as_ref()
            .ok_or_else(|| Error::ApduError("HID channel is closed".to_string()))
    }
}

impl Transport for HidTransport {
    fn open(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }

        let api = HidApi::new()
            .map_err(|e| Error::ConnectionFailed(format!("failed to initialize HID: {e}")))?;
        let device = api.open_path(&self.path).map_err(|e| {
            Error::ConnectionFailed(format!("failed to open {:?}: {e}", self.path))
        })?;

        debug!(path = ?self.path, "opened HID interface");
        self.device = Some(device);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.device.take().is_some() {
            debug!(path = ?self.path, "closed HID interface");
        }
        Ok(())
    }

    fn exchange(&mut self, apdu: &Apdu) -> Result<ApduResponse> {
        let device = self.device()?;

        for packet in framing::wrap_apdu(CHANNEL, &apdu.to_bytes())? {
            // hidapi expects the report ID in front.
            let mut report = [0u8; PACKET_SIZE + 1];
            report[1..].copy_from_slice(&packet);
            device
                .write(&report)
                .map_err(|e| Error::ApduError(format!("HID write failed: {e}")))?;
        }

        let mut reader = ResponseReader::new(CHANNEL);
        let mut buf = [0u8; PACKET_SIZE];
        loop {
            let read = device
                .read_timeout(&mut buf, self.read_timeout_ms)
                .map_err(|e| Error::ApduError(format!("HID read failed: {e}")))?;
            if read == 0 {
                return Err(Error::ApduError(
                    "timed out waiting for the Ledger".to_string(),
                ));
            }
            if let Some(response) = reader.push(&buf[..read])? {
                return ApduResponse::from_bytes(response);
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.device.is_some()
    }
}

/// An attached Ledger found during discovery.
#[derive(Debug, Clone)]
struct Candidate {
    path: CString,
    label: String,
}

/// Lists the Ledger devices that were attached at discovery time.
#[derive(Debug, Clone)]
pub struct LedgerHub {
    candidates: Vec<Candidate>,
    read_timeout_ms: i32,
}

impl LedgerHub {
    /// Enumerates USB HID devices matching `config`.
    ///
    /// Only the APDU interface of each device is kept: the one on
    /// `config.usage_page`, or interface 0 on platforms that do not report
    /// usage pages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the HID subsystem cannot be
    /// initialized. Finding no device is not an error.
    pub fn discover(config: &HidConfig) -> Result<Self> {
        let api = HidApi::new()
            .map_err(|e| Error::ConnectionFailed(format!("failed to initialize HID: {e}")))?;

        let candidates: Vec<Candidate> = api
            .device_list()
            .filter(|d| d.vendor_id() == config.vendor_id)
            .filter(|d| d.usage_page() == config.usage_page || d.interface_number() == 0)
            .map(|d| Candidate {
                path: d.path().to_owned(),
                label: format!(
                    "{} ({:04x}:{:04x})",
                    d.product_string().unwrap_or("Ledger"),
                    d.vendor_id(),
                    d.product_id()
                ),
            })
            .fold(Vec::new(), |mut acc, candidate| {
                if !acc.iter().any(|c: &Candidate| c.path == candidate.path) {
                    acc.push(candidate);
                }
                acc
            });

        info!(devices = candidates.len(), "discovered Ledger devices");
        Ok(Self {
            candidates,
            read_timeout_ms: config.read_timeout_ms,
        })
    }

    /// Returns a connector that rediscovers devices on every call.
    #[must_use]
    pub fn connector(config: HidConfig) -> HubConnector {
        Box::new(move || -> Result<Option<Box<dyn Hub>>> {
            let hub = Self::discover(&config)?;
            Ok(Some(Box::new(hub) as Box<dyn Hub>))
        })
    }
}

impl Hub for LedgerHub {
    fn wallets(&self) -> Vec<Box<dyn Wallet>> {
        self.candidates
            .iter()
            .map(|c| {
                let transport = HidTransport::new(c.path.clone(), self.read_timeout_ms);
                Box::new(LedgerWallet::new(transport, c.label.clone())) as Box<dyn Wallet>
            })
            .collect()
    }
}
