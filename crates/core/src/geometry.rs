//! Sector geometry of MIFARE Classic tags
//!
//! Sectors 0..=31 hold 4 blocks, sectors 32 and above (4K tags only) hold 16.

use derive_more::Display;

use crate::{Error, Result};

/// Highest sector index a dump may contain
pub const MAX_SECTOR: usize = 39;

/// Sectors below this index are 4-block sectors
pub const SMALL_SECTOR_COUNT: usize = 32;

/// Blocks in a sector below index 32
pub const SMALL_SECTOR_BLOCKS: usize = 4;

/// Blocks in a sector at index 32 or above
pub const LARGE_SECTOR_BLOCKS: usize = 16;

/// Number of blocks in a sector
pub const fn block_count(sector: usize) -> usize {
    if sector < SMALL_SECTOR_COUNT {
        SMALL_SECTOR_BLOCKS
    } else {
        LARGE_SECTOR_BLOCKS
    }
}

/// Absolute index of the first block of a sector
pub const fn first_block(sector: usize) -> usize {
    if sector < SMALL_SECTOR_COUNT {
        sector * SMALL_SECTOR_BLOCKS
    } else {
        SMALL_SECTOR_COUNT * SMALL_SECTOR_BLOCKS
            + (sector - SMALL_SECTOR_COUNT) * LARGE_SECTOR_BLOCKS
    }
}

/// Absolute index of a sector's trailer
pub const fn trailer_block(sector: usize) -> usize {
    first_block(sector) + block_count(sector) - 1
}

/// Whether a block (relative to its sector) is the sector trailer
pub const fn is_trailer(sector: usize, block: usize) -> bool {
    block == block_count(sector) - 1
}

/// Index into the access-condition matrix governing a block
///
/// In 4-block sectors every block has its own column. In 16-block sectors
/// blocks 0..=4, 5..=9 and 10..=14 share columns 0, 1 and 2; block 15 is the
/// trailer in column 3.
pub const fn access_group(sector: usize, block: usize) -> Result<usize> {
    if block >= block_count(sector) {
        return Err(Error::BlockOutOfRange { sector, block });
    }
    if sector < SMALL_SECTOR_COUNT {
        return Ok(block);
    }
    Ok(match block {
        0..=4 => 0,
        5..=9 => 1,
        10..=14 => 2,
        _ => 3,
    })
}

/// Known MIFARE Classic tag sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TagSize {
    /// MIFARE Mini, 320 bytes
    #[display("MIFARE Mini")]
    Mini,
    /// MIFARE Classic 1K
    #[display("MIFARE Classic 1K")]
    Classic1K,
    /// MIFARE Classic 2K
    #[display("MIFARE Classic 2K")]
    Classic2K,
    /// MIFARE Classic 4K
    #[display("MIFARE Classic 4K")]
    Classic4K,
}

impl TagSize {
    /// Number of sectors on a tag of this size
    pub const fn sector_count(self) -> usize {
        match self {
            Self::Mini => 5,
            Self::Classic1K => 16,
            Self::Classic2K => 32,
            Self::Classic4K => 40,
        }
    }

    /// Total number of blocks on a tag of this size
    pub const fn block_count(self) -> usize {
        first_block(self.sector_count())
    }

    /// Tag size for a given sector count
    pub const fn from_sector_count(sectors: usize) -> Option<Self> {
        match sectors {
            5 => Some(Self::Mini),
            16 => Some(Self::Classic1K),
            32 => Some(Self::Classic2K),
            40 => Some(Self::Classic4K),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_layout() {
        assert_eq!(block_count(0), 4);
        assert_eq!(block_count(31), 4);
        assert_eq!(block_count(32), 16);
        assert_eq!(first_block(1), 4);
        assert_eq!(first_block(32), 128);
        assert_eq!(first_block(39), 240);
        assert_eq!(trailer_block(0), 3);
        assert_eq!(trailer_block(39), 255);
        assert_eq!(TagSize::Classic4K.block_count(), 256);
        assert_eq!(TagSize::Classic1K.block_count(), 64);
    }

    #[test]
    fn test_access_group() {
        assert_eq!(access_group(3, 2), Ok(2));
        assert_eq!(access_group(32, 4), Ok(0));
        assert_eq!(access_group(32, 5), Ok(1));
        assert_eq!(access_group(33, 14), Ok(2));
        assert_eq!(access_group(33, 15), Ok(3));
        assert_eq!(
            access_group(0, 4),
            Err(Error::BlockOutOfRange {
                sector: 0,
                block: 4
            })
        );
        assert!(access_group(32, 16).is_err());
    }

    #[test]
    fn test_is_trailer() {
        assert!(is_trailer(0, 3));
        assert!(!is_trailer(32, 3));
        assert!(is_trailer(32, 15));
    }
}
