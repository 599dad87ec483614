//! Sectors and sector merging

use std::ops::Index;

use crate::access::{self, AccessMatrix};
use crate::block::{Block, KEY_B_DIGITS};
use crate::geometry::{LARGE_SECTOR_BLOCKS, SMALL_SECTOR_BLOCKS};
use crate::{Error, Result};

/// The blocks of one sector, trailer last
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sector {
    blocks: Vec<Block>,
}

impl Sector {
    /// Create a sector from its blocks; there must be 4 or 16 of them
    pub fn new(blocks: Vec<Block>) -> Result<Self> {
        match blocks.len() {
            SMALL_SECTOR_BLOCKS | LARGE_SECTOR_BLOCKS => Ok(Self { blocks }),
            len => Err(Error::InvalidSectorSize(len)),
        }
    }

    /// A sector of `len` unreadable blocks
    pub fn no_data(len: usize) -> Result<Self> {
        Self::new(vec![Block::NO_DATA; len])
    }

    /// All blocks, trailer last
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; sectors hold at least 4 blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The sector trailer
    pub fn trailer(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Index of the sector trailer
    pub fn trailer_index(&self) -> usize {
        self.blocks.len() - 1
    }

    /// Replace the sector trailer
    pub fn set_trailer(&mut self, trailer: Block) {
        let last = self.trailer_index();
        self.blocks[last] = trailer;
    }

    /// Whether no block of this sector could be read
    pub fn is_no_data(&self) -> bool {
        self.blocks.iter().all(Block::is_no_data)
    }

    /// Decoded access conditions of the trailer, if readable and consistent
    pub fn access_matrix(&self) -> Option<AccessMatrix> {
        access::decode(self.trailer().access_bytes()?)
    }

    /// Consume the sector, returning its blocks
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

impl Index<usize> for Sector {
    type Output = Block;

    fn index(&self, index: usize) -> &Self::Output {
        &self.blocks[index]
    }
}

/// Reconcile two partial reads of the same sector
///
/// Data blocks come from `first` unless it could not read them. The trailer
/// keeps `first`'s key A and access bytes with `second`'s key B spliced in;
/// if `first` has no trailer, `second`'s is taken whole.
///
/// Fails if both reads are present but differ in block count.
pub fn merge(first: Option<&Sector>, second: Option<&Sector>) -> Result<Option<Sector>> {
    let len = match (first, second) {
        (None, None) => return Ok(None),
        (Some(a), Some(b)) if a.len() != b.len() => {
            return Err(Error::SectorSizeMismatch {
                first: a.len(),
                second: b.len(),
            });
        }
        (Some(a), _) => a.len(),
        (None, Some(b)) => b.len(),
    };

    let usable = |sector: Option<&Sector>, i: usize| {
        sector.map(|s| s[i]).filter(|block| !block.is_no_data())
    };

    let mut blocks: Vec<Block> = (0..len - 1)
        .map(|i| {
            usable(first, i)
                .or_else(|| usable(second, i))
                .unwrap_or(Block::NO_DATA)
        })
        .collect();

    let last = len - 1;
    let trailer = match (usable(first, last), usable(second, last)) {
        (Some(a), Some(b)) => a.splice(&b, KEY_B_DIGITS),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => Block::NO_DATA,
    };
    blocks.push(trailer);

    Sector::new(blocks).map(Some)
}
