//! Which key, if any, can write each block
//!
//! For data blocks the answer comes straight from the access policy. For
//! sector trailers two cases get their own outcome, because the plain answer
//! for writing the access bits would mislead: keys that can be changed while
//! the access bits are frozen, and access bits that key B can change while the
//! keys cannot be.

use std::collections::BTreeMap;

use derive_more::Display;
use tagkit_core::access::{self, Operation, Requirement};
use tagkit_core::{Block, KeyMap, geometry};
use tracing::{debug, warn};

use crate::link::TagLink;
use crate::tag::Tag;
use crate::{Error, Result};

/// Write permission of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WriteAccess {
    /// The policy answer for the block
    #[display("{_0}")]
    Requires(Requirement),
    /// Trailer keys can be written with the given key, the access bits never
    #[display("keys writable with {_0}, access bits fixed")]
    KeysOnly(Requirement),
    /// Trailer access bits can be written with key B, the keys never
    #[display("access bits writable with Key B, keys never")]
    AccessBitsOnly,
}

/// Write permissions of the requested blocks of one sector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorWritability {
    /// The trailer could not be read or its access bits are corrupt
    Dead,
    /// Block within the sector to its write permission
    Blocks(BTreeMap<usize, WriteAccess>),
}

/// Classify the trailer of a sector given its trailer access bits
fn trailer_access(bits: access::AccessBits, key_b_readable: bool) -> WriteAccess {
    let ac = access::requirement(bits, Operation::WriteAc, true, key_b_readable);
    let keys = access::requirement(bits, Operation::WriteKeyA, true, key_b_readable);
    match (ac, keys) {
        (Requirement::Never, Requirement::Never) => WriteAccess::Requires(Requirement::Never),
        (Requirement::Never, keys) => WriteAccess::KeysOnly(keys),
        (Requirement::KeyB, Requirement::Never) => WriteAccess::AccessBitsOnly,
        (ac, _) => WriteAccess::Requires(ac),
    }
}

/// Report write permissions for `targets`, sector to blocks within the sector
///
/// Only sectors with a key in `key_map` are analyzed. Each is authenticated
/// with its preferred key (A over B) and its trailer read. Fails if a target
/// block does not exist, before the tag is touched, and if a mapped key no
/// longer authenticates or the tag is lost.
pub fn analyze_writability<L: TagLink>(
    tag: &Tag<L>,
    key_map: &KeyMap,
    targets: &BTreeMap<usize, Vec<usize>>,
) -> Result<BTreeMap<usize, SectorWritability>> {
    for (&sector, blocks) in targets {
        for &block in blocks {
            geometry::access_group(sector, block)?;
        }
    }

    let mut result = BTreeMap::new();

    for (&sector, blocks) in targets {
        let Some((key, role)) = key_map.get(sector).and_then(|keys| keys.preferred()) else {
            debug!(sector, "No key for sector, skipping");
            continue;
        };
        if !tag.authenticate(sector, &key, role)? {
            return Err(Error::AuthFailed { sector, role });
        }

        let count = tag.block_count_in_sector(sector)?;
        let matrix = match tag.read_block(tag.sector_to_block(sector)? + count - 1) {
            Ok(trailer) => Block::from_bytes(&trailer)
                .access_bytes()
                .and_then(access::decode),
            Err(e) if e.is_tag_lost() => return Err(e),
            Err(e) => {
                debug!(sector, error = %e, "Trailer unreadable");
                None
            }
        };
        let Some(matrix) = matrix else {
            warn!(sector, "Access bits corrupt, sector is dead");
            result.insert(sector, SectorWritability::Dead);
            continue;
        };

        let key_b_readable = access::key_b_readable(matrix.trailer());
        let mut access_map = BTreeMap::new();
        for &block in blocks {
            let write = if block + 1 == count {
                trailer_access(matrix.trailer(), key_b_readable)
            } else {
                let group = geometry::access_group(sector, block)?;
                WriteAccess::Requires(access::requirement(
                    matrix.group(group),
                    Operation::Write,
                    false,
                    key_b_readable,
                ))
            };
            access_map.insert(block, write);
        }
        result.insert(sector, SectorWritability::Blocks(access_map));
    }

    Ok(result)
}
