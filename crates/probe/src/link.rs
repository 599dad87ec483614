//! The tag link
//!
//! A [`TagLink`] carries single operations to a tag: authenticate a sector,
//! read or write one block, run value-block commands. It knows nothing about
//! key maps or dumps. Implementations must be usable from another thread, as
//! [`Tag`](crate::Tag) runs connection attempts off the calling thread.

use std::fmt;

use tagkit_core::block::BLOCK_LEN;
use tagkit_core::{Key, KeyRole, geometry};
use tracing::{debug, trace};

/// Result type for link operations
pub type LinkResult<T> = std::result::Result<T, LinkError>;

/// Link-level failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The tag is gone
    #[error("Tag lost")]
    TagLost,

    /// A single operation failed; the tag may still be present
    #[error("I/O error: {0}")]
    Io(String),

    /// A single operation did not complete in time
    #[error("Operation timed out")]
    Timeout,
}

impl LinkError {
    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }
}

/// Operations a tag supports
pub trait TagLink: Send + fmt::Debug {
    /// Authenticate to a sector with a key in the given role
    ///
    /// `Ok(false)` means the key was rejected. Errors mean the attempt did not
    /// complete.
    fn authenticate(&mut self, sector: usize, key: &Key, role: KeyRole) -> LinkResult<bool> {
        trace!(sector, role = %role, "Authenticating");
        let result = self.do_authenticate(sector, key, role);
        if let Err(e) = &result {
            debug!(sector, error = ?e, "Link error during authentication");
        }
        result
    }

    /// Internal implementation of authenticate
    fn do_authenticate(&mut self, sector: usize, key: &Key, role: KeyRole) -> LinkResult<bool>;

    /// Read one block by absolute block number
    fn read_block(&mut self, block: usize) -> LinkResult<[u8; BLOCK_LEN]> {
        let result = self.do_read_block(block);
        match &result {
            Ok(data) => trace!(block, data = ?data, "Read block"),
            Err(e) => debug!(block, error = ?e, "Link error during block read"),
        }
        result
    }

    /// Internal implementation of read_block
    fn do_read_block(&mut self, block: usize) -> LinkResult<[u8; BLOCK_LEN]>;

    /// Write one block by absolute block number
    fn write_block(&mut self, block: usize, data: &[u8; BLOCK_LEN]) -> LinkResult<()>;

    /// Increment a value block, keeping the result in the tag's transfer buffer
    fn increment(&mut self, block: usize, value: u32) -> LinkResult<()>;

    /// Decrement a value block, keeping the result in the tag's transfer buffer
    fn decrement(&mut self, block: usize, value: u32) -> LinkResult<()>;

    /// Write the transfer buffer to a block
    fn transfer(&mut self, block: usize) -> LinkResult<()>;

    /// Connect to the tag
    fn connect(&mut self) -> LinkResult<()>;

    /// Drop the connection
    fn close(&mut self);

    /// Whether a tag is connected
    fn is_connected(&self) -> bool;

    /// Number of sectors on the tag
    fn sector_count(&self) -> usize;

    /// Number of blocks in a sector
    fn block_count_in_sector(&self, sector: usize) -> usize {
        geometry::block_count(sector)
    }

    /// Absolute number of a sector's first block
    fn sector_to_block(&self, sector: usize) -> usize {
        geometry::first_block(sector)
    }
}
