//! Core error type for tag data handling
//!
//! Pure validators (dump and key file checks) report through their own
//! discriminated check values. This type covers constructor and parse failures.

use crate::dump::DumpCheck;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Input was not hexadecimal
    #[error("Invalid hex input: {0:?}")]
    InvalidHex(String),

    /// Input had the wrong length
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Access-condition matrix was not a 3x4 matrix of single bits
    #[error("Invalid access condition matrix: {0}")]
    InvalidAccessMatrix(&'static str),

    /// Sector index outside the tag's range
    #[error("Sector {sector} out of range (last sector is {last})")]
    SectorOutOfRange {
        /// Requested sector
        sector: usize,
        /// Last valid sector
        last: usize,
    },

    /// Block index outside the sector
    #[error("Block {block} out of range for sector {sector}")]
    BlockOutOfRange {
        /// Sector the block was looked up in
        sector: usize,
        /// Requested block within the sector
        block: usize,
    },

    /// A sector had a block count other than 4 or 16
    #[error("Invalid sector size: {0} blocks")]
    InvalidSectorSize(usize),

    /// Two sectors that should have the same shape do not
    #[error("Sector size mismatch: {first} vs {second} blocks")]
    SectorSizeMismatch {
        /// Block count of the first sector
        first: usize,
        /// Block count of the second sector
        second: usize,
    },

    /// Dump text failed validation
    #[error("Invalid dump: {0}")]
    InvalidDump(DumpCheck),

    /// Dump text ended before a sector was complete
    #[error("Sector {sector} is truncated: expected {expected} blocks, got {actual}")]
    TruncatedSector {
        /// Sector index
        sector: usize,
        /// Expected block count
        expected: usize,
        /// Blocks present
        actual: usize,
    },
}

impl Error {
    /// Create a new length error
    pub const fn length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Create a new hex error
    pub fn hex<S: Into<String>>(input: S) -> Self {
        Self::InvalidHex(input.into())
    }
}
