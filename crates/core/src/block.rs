//! Blocks and sector trailers
//!
//! A block is 16 bytes, rendered as 32 upper-case hex digits. Parts of a block
//! may be unknown, in which case their digits are `-`. A block where every digit
//! is unknown is the [`NO_DATA`] sentinel.

use std::fmt::{self, Write};
use std::ops::Range;

use crate::key::{KEY_HEX_LEN, KEY_LEN, Key, NO_KEY};
use crate::{Error, Result};

/// Length of a block in bytes
pub const BLOCK_LEN: usize = 16;

/// Length of a block rendered as hex
pub const BLOCK_HEX_LEN: usize = BLOCK_LEN * 2;

/// Placeholder for a block that could not be read
pub const NO_DATA: &str = "--------------------------------";

/// Hex digits of key A within a trailer
pub const KEY_A_DIGITS: Range<usize> = 0..KEY_HEX_LEN;

/// Hex digits of the access bytes and the general purpose byte within a trailer
pub const ACCESS_DIGITS: Range<usize> = KEY_HEX_LEN..20;

/// Hex digits of key B within a trailer
pub const KEY_B_DIGITS: Range<usize> = 20..BLOCK_HEX_LEN;

/// Byte offsets of the three access-condition bytes within a trailer
pub const ACCESS_BYTES: Range<usize> = KEY_LEN..9;

const UNKNOWN: u8 = b'-';

/// One 16-byte block, possibly with unknown digits
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block([u8; BLOCK_HEX_LEN]);

impl Block {
    /// A block that could not be read
    pub const NO_DATA: Self = Self([UNKNOWN; BLOCK_HEX_LEN]);

    /// Create a block from raw bytes
    pub fn from_bytes(bytes: &[u8; BLOCK_LEN]) -> Self {
        let mut digits = [0u8; BLOCK_HEX_LEN];
        // Both buffers have fixed, matching sizes
        let _ = hex::encode_to_slice(bytes, &mut digits);
        digits.make_ascii_uppercase();
        Self(digits)
    }

    /// Parse 32 characters of hex digits or `-`
    pub fn parse(input: &str) -> Result<Self> {
        if !input.bytes().all(|c| c.is_ascii_hexdigit() || c == UNKNOWN) {
            return Err(Error::hex(input));
        }
        let digits: [u8; BLOCK_HEX_LEN] = input
            .as_bytes()
            .try_into()
            .map_err(|_| Error::length(BLOCK_HEX_LEN, input.len()))?;
        let mut block = Self(digits);
        block.0.make_ascii_uppercase();
        Ok(block)
    }

    /// Whether nothing of this block is known
    pub fn is_no_data(&self) -> bool {
        *self == Self::NO_DATA
    }

    /// The raw bytes, if every digit is known
    pub fn to_bytes(&self) -> Option<[u8; BLOCK_LEN]> {
        let mut bytes = [0u8; BLOCK_LEN];
        hex::decode_to_slice(self.0, &mut bytes).ok()?;
        Some(bytes)
    }

    /// Decode the bytes covered by a digit range, if all of them are known
    pub fn bytes_in(&self, digits: Range<usize>) -> Option<Vec<u8>> {
        hex::decode(self.0.get(digits)?).ok()
    }

    /// Key A of a trailer, if known
    pub fn key_a(&self) -> Option<Key> {
        Key::from_slice(&self.bytes_in(KEY_A_DIGITS)?).ok()
    }

    /// Key B of a trailer, if known
    pub fn key_b(&self) -> Option<Key> {
        Key::from_slice(&self.bytes_in(KEY_B_DIGITS)?).ok()
    }

    /// The three access-condition bytes of a trailer, if known
    pub fn access_bytes(&self) -> Option<[u8; 3]> {
        let digits = ACCESS_BYTES.start * 2..ACCESS_BYTES.end * 2;
        self.bytes_in(digits)?.try_into().ok()
    }

    /// Replace key A of a trailer; `None` writes the [`NO_KEY`] placeholder
    pub fn with_key_a(self, key: Option<&Key>) -> Self {
        self.with_key(KEY_A_DIGITS, key)
    }

    /// Replace key B of a trailer; `None` writes the [`NO_KEY`] placeholder
    pub fn with_key_b(self, key: Option<&Key>) -> Self {
        self.with_key(KEY_B_DIGITS, key)
    }

    fn with_key(mut self, digits: Range<usize>, key: Option<&Key>) -> Self {
        let text = key.map_or_else(|| NO_KEY.to_string(), Key::to_hex);
        self.0[digits].copy_from_slice(text.as_bytes());
        self
    }

    /// Copy the digits in `digits` from `other` into this block
    pub fn splice(mut self, other: &Self, digits: Range<usize>) -> Self {
        self.0[digits.clone()].copy_from_slice(&other.0[digits]);
        self
    }

    /// Offsets of the digits that differ between two blocks
    pub fn diff_offsets(&self, other: &Self) -> Vec<usize> {
        self.0
            .iter()
            .zip(other.0.iter())
            .enumerate()
            .filter_map(|(offset, (a, b))| (a != b).then_some(offset))
            .collect()
    }

    /// Whether the BCC in block 0 matches a 4-byte UID
    ///
    /// Returns `None` if the first five bytes are not known.
    pub fn has_valid_bcc(&self) -> Option<bool> {
        let head = self.bytes_in(0..10)?;
        Some(bcc(&head[..4]) == head[4])
    }
}

/// Block check character of a UID: the XOR of its bytes
pub fn bcc(uid: &[u8]) -> u8 {
    uid.iter().fold(0, |acc, byte| acc ^ byte)
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|&c| f.write_char(c as char))
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({self})")
    }
}

impl From<[u8; BLOCK_LEN]> for Block {
    fn from(bytes: [u8; BLOCK_LEN]) -> Self {
        Self::from_bytes(&bytes)
    }
}
