//! Hierarchical-deterministic derivation paths.
//!
//! A [`DerivationPath`] is an ordered list of `u32` indices. Hardened indices
//! carry the [`HARDENED_OFFSET`] bit. The keyring hands paths over as raw
//! `&[u32]`, so the type dereferences to a slice and performs no validation of
//! its own; device drivers enforce whatever limits they have.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::DerivationPath;
//!
//! let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
//! assert_eq!(path.len(), 5);
//! assert_eq!(path.to_string(), "m/44'/60'/0'/0/0");
//! ```

use core::result::Result as CoreResult;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Bit marking a hardened child index.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// An ordered sequence of child indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// The default Ethereum account path, `m/44'/60'/0'/0/{index}`.
    #[must_use]
    pub fn ethereum(index: u32) -> Self {
        Self(vec![
            44 | HARDENED_OFFSET,
            60 | HARDENED_OFFSET,
            HARDENED_OFFSET,
            0,
            index,
        ])
    }

    /// Returns the indices as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Consumes the path and returns the indices.
    #[must_use]
    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }
}

impl Deref for DerivationPath {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for DerivationPath {
    fn from(indices: Vec<u32>) -> Self {
        Self(indices)
    }
}

impl From<&[u32]> for DerivationPath {
    fn from(indices: &[u32]) -> Self {
        Self(indices.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for DerivationPath {
    fn from(indices: [u32; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            if index & HARDENED_OFFSET == 0 {
                write!(f, "/{index}")?;
            } else {
                write!(f, "/{}'", index & !HARDENED_OFFSET)?;
            }
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('/');
        if parts.next() != Some("m") {
            return Err(Error::InvalidDerivationPath(format!(
                "{s}: must start with \"m\""
            )));
        }

        let mut indices = Vec::new();
        for part in parts {
            let (digits, hardened) = match part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
            {
                Some(digits) => (digits, true),
                None => (part, false),
            };

            let index: u32 = digits
                .parse()
                .map_err(|_| Error::InvalidDerivationPath(format!("{s}: bad index {part:?}")))?;
            if index & HARDENED_OFFSET != 0 {
                return Err(Error::InvalidDerivationPath(format!(
                    "{s}: index {index} out of range"
                )));
            }

            indices.push(if hardened { index | HARDENED_OFFSET } else { index });
        }

        Ok(Self(indices))
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> CoreResult<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> CoreResult<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
