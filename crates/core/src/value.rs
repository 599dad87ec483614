//! Value blocks
//!
//! A value block stores a signed 32-bit value three times (plain, inverted,
//! plain, little endian) followed by a one-byte address stored four times
//! (plain, inverted, plain, inverted). Tags can increment, decrement and
//! transfer such blocks without reading them.

use crate::block::{BLOCK_LEN, Block};

/// A decoded value block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueBlock {
    /// The stored value
    pub value: i32,
    /// The address byte, free for applications to use
    pub addr: u8,
}

impl ValueBlock {
    /// Create a value block
    pub const fn new(value: i32, addr: u8) -> Self {
        Self { value, addr }
    }

    /// Decode raw block bytes, checking every redundant copy
    pub fn from_bytes(bytes: &[u8; BLOCK_LEN]) -> Option<Self> {
        let word = |offset: usize| -> Option<u32> {
            Some(u32::from_le_bytes(bytes.get(offset..offset + 4)?.try_into().ok()?))
        };
        let (value, inverted, copy) = (word(0)?, word(4)?, word(8)?);
        if value != copy || value != !inverted {
            return None;
        }

        let addr = bytes[12];
        if bytes[14] != addr || bytes[13] != !addr || bytes[15] != !addr {
            return None;
        }

        Some(Self {
            value: value as i32,
            addr,
        })
    }

    /// Decode a block, if it is fully known and in value block format
    pub fn decode(block: &Block) -> Option<Self> {
        Self::from_bytes(&block.to_bytes()?)
    }

    /// Encode to raw block bytes
    pub fn to_bytes(&self) -> [u8; BLOCK_LEN] {
        let value = self.value as u32;
        let mut bytes = [0u8; BLOCK_LEN];
        bytes[0..4].copy_from_slice(&value.to_le_bytes());
        bytes[4..8].copy_from_slice(&(!value).to_le_bytes());
        bytes[8..12].copy_from_slice(&value.to_le_bytes());
        bytes[12..16].copy_from_slice(&[self.addr, !self.addr, self.addr, !self.addr]);
        bytes
    }

    /// Encode to a block
    pub fn encode(&self) -> Block {
        Block::from_bytes(&self.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_encode() {
        let block = ValueBlock::new(100, 0x05).encode();
        assert_eq!(block.to_string(), "64000000 9BFFFFFF 64000000 05FA05FA".replace(' ', ""));

        let negative = ValueBlock::new(-1, 0).to_bytes();
        assert_eq!(negative, hex!("FFFFFFFF 00000000 FFFFFFFF 00FF00FF"));
    }

    #[test]
    fn test_decode() {
        let bytes = hex!("E8030000 17FCFFFF E8030000 11EE11EE");
        assert_eq!(
            ValueBlock::from_bytes(&bytes),
            Some(ValueBlock::new(1000, 0x11))
        );
        assert_eq!(
            ValueBlock::from_bytes(&ValueBlock::new(i32::MIN, 0xFF).to_bytes()),
            Some(ValueBlock::new(i32::MIN, 0xFF))
        );
    }

    #[test]
    fn test_decode_rejects_inconsistent_copies() {
        // Inverted value copy broken
        let bytes = hex!("E8030000 17FCFFFE E8030000 11EE11EE");
        assert_eq!(ValueBlock::from_bytes(&bytes), None);
        // Address copies broken
        let bytes = hex!("E8030000 17FCFFFF E8030000 11EE12EE");
        assert_eq!(ValueBlock::from_bytes(&bytes), None);
        // Plain data and unknown digits
        assert_eq!(ValueBlock::decode(&Block::from_bytes(&[0; BLOCK_LEN])), None);
        assert_eq!(ValueBlock::decode(&Block::NO_DATA), None);
    }
}
