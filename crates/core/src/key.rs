//! Sector keys
//!
//! Every sector is protected by two independent 48-bit keys. Keys compare by
//! value; the textual sentinel [`NO_KEY`] stands for a key that is unknown.

use std::fmt;
use std::str::FromStr;

use derive_more::Display;

use crate::{Error, Result};

/// Length of a key in bytes
pub const KEY_LEN: usize = 6;

/// Length of a key rendered as hex
pub const KEY_HEX_LEN: usize = KEY_LEN * 2;

/// Placeholder written into a trailer for a key that could not be determined
pub const NO_KEY: &str = "------------";

/// A 48-bit MIFARE Classic key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Factory default key, `FFFFFFFFFFFF`
    pub const DEFAULT: Self = Self([0xFF; KEY_LEN]);

    /// All-zero key, `000000000000`
    pub const ZERO: Self = Self([0x00; KEY_LEN]);

    /// Create a key from raw bytes
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a key from a slice, which must be exactly 6 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::length(KEY_LEN, bytes.len()))?;
        Ok(Self(bytes))
    }

    /// Parse a key from exactly 12 hex characters
    pub fn from_hex(input: &str) -> Result<Self> {
        if !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::hex(input));
        }
        if input.len() != KEY_HEX_LEN {
            return Err(Error::length(KEY_HEX_LEN, input.len()));
        }
        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(input, &mut bytes).map_err(|_| Error::hex(input))?;
        Ok(Self(bytes))
    }

    /// Raw key bytes
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Upper-case hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Whether this is `FFFFFFFFFFFF`
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Whether this is `000000000000`
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.to_hex())
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s.trim())
    }
}

impl From<[u8; KEY_LEN]> for Key {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }
}

/// Which of the two sector keys an authentication uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum KeyRole {
    /// Key A
    #[display("A")]
    A,
    /// Key B
    #[display("B")]
    B,
}

impl KeyRole {
    /// Both roles, key A first
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// Index of this role in a `[A, B]` pair
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}
