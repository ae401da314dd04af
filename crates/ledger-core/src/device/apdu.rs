//! APDU command and response types for the Ledger Ethereum app.
//!
//! Ledger apps speak a short-form subset of ISO 7816-4:
//!
//! ```text
//! | CLA | INS | P1 | P2 | Lc | Data   |
//! |-----|-----|----|----|----|--------|
//! | 1B  | 1B  | 1B | 1B | 1B | Lc B   |
//! ```
//!
//! `Lc` is always present, even for empty data, and there is no `Le`. A
//! response is the payload followed by a two-byte status word.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::device::{Apdu, ApduResponse};
//!
//! let apdu = Apdu::new(0xE0, 0x06, 0x00, 0x00, vec![]).unwrap();
//! assert_eq!(apdu.to_bytes(), vec![0xE0, 0x06, 0x00, 0x00, 0x00]);
//!
//! let response = ApduResponse::from_bytes(vec![0x01, 0x90, 0x00]).unwrap();
//! assert!(response.is_success());
//! assert_eq!(response.data(), &[0x01]);
//! ```

use crate::error::{Error, Result};

/// Class byte of every Ethereum-app command.
pub const CLA_ETHEREUM: u8 = 0xE0;

/// Ethereum-app instructions used by the wallet driver.
pub mod ins {
    /// Returns the public key and address at a path.
    pub const GET_PUBLIC_KEY: u8 = 0x02;
    /// Returns the app flags and version.
    pub const GET_APP_CONFIGURATION: u8 = 0x06;
    /// Signs an EIP-712 request given its domain and message hashes.
    pub const SIGN_EIP712_HASHED: u8 = 0x0C;
}

/// Status words the Ethereum app reports.
pub mod sw {
    /// Command succeeded.
    pub const OK: u16 = 0x9000;
    /// The user rejected the request.
    pub const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
    /// The device is locked.
    pub const SECURITY_STATUS: u16 = 0x6982;
    /// The device is locked (newer firmware).
    pub const LOCKED_DEVICE: u16 = 0x5515;
    /// The command data was rejected.
    pub const INVALID_DATA: u16 = 0x6A80;
    /// Instruction not supported, usually the dashboard is open.
    pub const INS_NOT_SUPPORTED: u16 = 0x6D00;
    /// Class not supported, usually another app is open.
    pub const CLA_NOT_SUPPORTED: u16 = 0x6E00;
    /// No app open.
    pub const APP_NOT_OPEN: u16 = 0x6E01;
    /// Wrong app open.
    pub const WRONG_APP: u16 = 0x6511;
}

/// A short-form APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
}

impl Apdu {
    /// Maximum data length of a short APDU.
    pub const MAX_DATA: usize = 255;

    /// Creates a command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ApduError`] if `data` exceeds [`Apdu::MAX_DATA`].
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Self> {
        if data.len() > Self::MAX_DATA {
            return Err(Error::ApduError(format!(
                "command data too long: {} > {}",
                data.len(),
                Self::MAX_DATA
            )));
        }
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    /// Creates an Ethereum-app command.
    ///
    /// # Errors
    ///
    /// See [`Apdu::new`].
    pub fn ethereum(ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Self> {
        Self::new(CLA_ETHEREUM, ins, p1, p2, data)
    }

    /// Returns the class byte.
    #[must_use]
    pub const fn cla(&self) -> u8 {
        self.cla
    }

    /// Returns the instruction byte.
    #[must_use]
    pub const fn ins(&self) -> u8 {
        self.ins
    }

    /// Returns parameter 1.
    #[must_use]
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Returns parameter 2.
    #[must_use]
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Returns the command data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serializes the command.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "data length is bounded by MAX_DATA at construction"
    )]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(5 + self.data.len());
        bytes.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        bytes.push(self.data.len() as u8);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// A response from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    data: Vec<u8>,
    sw1: u8,
    sw2: u8,
}

impl ApduResponse {
    /// Splits raw response bytes into payload and status word.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if fewer than two bytes arrive.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self> {
        let len = bytes.len();
        if len < 2 {
            return Err(Error::MalformedResponse(format!(
                "response of {len} bytes has no status word"
            )));
        }

        let sw2 = bytes[len - 1];
        let sw1 = bytes[len - 2];
        bytes.truncate(len - 2);
        Ok(Self {
            data: bytes,
            sw1,
            sw2,
        })
    }

    /// Returns the response data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the response and returns the data.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the full status word.
    #[must_use]
    pub const fn status_word(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Checks if the status word is `0x9000`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_word() == sw::OK
    }

    /// Returns the payload of a successful response.
    ///
    /// # Errors
    ///
    /// Returns the error [`ApduResponse::to_error`] maps the status word to.
    pub fn into_checked(self) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(self.to_error())
        }
    }

    /// Maps the status word to an error.
    #[must_use]
    pub fn to_error(&self) -> Error {
        match self.status_word() {
            sw::CONDITIONS_NOT_SATISFIED => Error::UserDenied,
            sw::SECURITY_STATUS | sw::LOCKED_DEVICE => Error::DeviceLocked,
            sw::INS_NOT_SUPPORTED | sw::CLA_NOT_SUPPORTED | sw::APP_NOT_OPEN | sw::WRONG_APP => {
                Error::AppNotOpen
            }
            sw::INVALID_DATA => Error::ApduError("invalid command data".to_string()),
            _ => Error::UnexpectedStatusWord(self.sw1, self.sw2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apdu_always_carries_lc() {
        let apdu = Apdu::ethereum(ins::GET_PUBLIC_KEY, 0x00, 0x00, vec![0x01, 0x02]).unwrap();
        assert_eq!(apdu.cla(), CLA_ETHEREUM);
        assert_eq!(apdu.ins(), 0x02);
        assert_eq!(apdu.to_bytes(), vec![0xE0, 0x02, 0x00, 0x00, 0x02, 0x01, 0x02]);

        let empty = Apdu::ethereum(ins::GET_APP_CONFIGURATION, 0x00, 0x00, vec![]).unwrap();
        assert_eq!(empty.to_bytes(), vec![0xE0, 0x06, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn apdu_rejects_long_data() {
        let result = Apdu::ethereum(ins::SIGN_EIP712_HASHED, 0, 0, vec![0; 256]);
        assert!(matches!(result, Err(Error::ApduError(_))));
    }

    #[test]
    fn response_split() {
        let response = ApduResponse::from_bytes(vec![0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
        assert_eq!(response.data(), &[0x01, 0x02, 0x03]);
        assert_eq!(response.status_word(), 0x9000);
        assert_eq!(response.into_checked().unwrap(), vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn response_too_short() {
        let result = ApduResponse::from_bytes(vec![0x90]);
        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn status_word_mapping() {
        let cases = [
            ([0x69, 0x85], "denied"),
            ([0x69, 0x82], "locked"),
            ([0x55, 0x15], "locked"),
            ([0x6D, 0x00], "app"),
            ([0x6E, 0x00], "app"),
            ([0x6E, 0x01], "app"),
            ([0x65, 0x11], "app"),
        ];

        for (bytes, kind) in cases {
            let err = ApduResponse::from_bytes(bytes.to_vec()).unwrap().to_error();
            match kind {
                "denied" => assert!(matches!(err, Error::UserDenied)),
                "locked" => assert!(matches!(err, Error::DeviceLocked)),
                _ => assert!(matches!(err, Error::AppNotOpen)),
            }
        }
    }

    #[test]
    fn unknown_status_word() {
        let response = ApduResponse::from_bytes(vec![0x6F, 0x42]).unwrap();
        assert!(matches!(
            response.into_checked(),
            Err(Error::UnexpectedStatusWord(0x6F, 0x42))
        ));
    }
}
