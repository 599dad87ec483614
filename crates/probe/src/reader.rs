//! Reading sectors under known keys

use tagkit_core::access;
use tagkit_core::sector::merge;
use tagkit_core::{Block, Dump, Key, KeyMap, KeyRole, Sector};
use tracing::{debug, info};

use crate::link::TagLink;
use crate::tag::Tag;
use crate::{Error, Result};

/// Read every block of a sector with one key
///
/// A block whose read fails is recorded as [`Block::NO_DATA`] and the sector
/// is authenticated again before the next block. Returns `Ok(None)` if no
/// block could be read at all.
///
/// The trailer's key fields are rewritten with what is actually known: the
/// key used for `role`, key B as read when the access conditions make it
/// readable and `role` is A, and the unknown-key placeholder otherwise.
pub fn read_sector<L: TagLink>(
    tag: &Tag<L>,
    sector: usize,
    key: &Key,
    role: KeyRole,
) -> Result<Option<Sector>> {
    if !tag.authenticate(sector, key, role)? {
        return Err(Error::AuthFailed { sector, role });
    }

    let first = tag.sector_to_block(sector)?;
    let count = tag.block_count_in_sector(sector)?;
    let mut blocks = Vec::with_capacity(count);
    for block in first..first + count {
        match tag.read_block(block) {
            Ok(data) => blocks.push(Block::from_bytes(&data)),
            Err(Error::TagLost) => return Err(Error::TagLost),
            Err(e) => {
                debug!(sector, block, error = %e, "Block unreadable");
                if !tag.is_connected() {
                    return Err(Error::TagLost);
                }
                blocks.push(Block::NO_DATA);
                // A failed read drops the authentication
                if let Err(Error::TagLost) = tag.authenticate(sector, key, role) {
                    return Err(Error::TagLost);
                }
            }
        }
    }

    let mut sector_data = Sector::new(blocks)?;
    if sector_data.is_no_data() {
        debug!(sector, "Authenticated but no block was readable");
        return Ok(None);
    }

    let trailer = *sector_data.trailer();
    if !trailer.is_no_data() {
        let trailer = match role {
            KeyRole::A => {
                let key_b_known = sector_data
                    .access_matrix()
                    .is_some_and(|matrix| access::key_b_readable(matrix.trailer()));
                let trailer = trailer.with_key_a(Some(key));
                if key_b_known {
                    trailer
                } else {
                    trailer.with_key_b(None)
                }
            }
            KeyRole::B => trailer.with_key_a(None).with_key_b(Some(key)),
        };
        sector_data.set_trailer(trailer);
    }

    Ok(Some(sector_data))
}

/// Read every sector of a key map with key A and key B, merging the results
///
/// Sectors where neither key reads anything are marked unreadable. Losing the
/// tag aborts the whole read.
pub fn read_all<L: TagLink>(tag: &Tag<L>, key_map: &KeyMap) -> Result<Dump> {
    let mut dump = Dump::new();
    for (&sector, keys) in key_map {
        let mut reads = [None, None];
        for role in KeyRole::ALL {
            let Some(key) = keys.get(role) else {
                continue;
            };
            reads[role.index()] = match read_sector(tag, sector, &key, role) {
                Ok(read) => read,
                Err(Error::AuthFailed { .. }) => {
                    debug!(sector, role = %role, "Mapped key no longer authenticates");
                    None
                }
                Err(e) => return Err(e),
            };
        }

        let [a, b] = &reads;
        match merge(a.as_ref(), b.as_ref())? {
            Some(merged) => dump.insert(sector, merged)?,
            None => dump.mark_unreadable(sector),
        }
    }

    info!(
        sectors = dump.len(),
        unreadable = dump.unreadable().count(),
        "Read tag"
    );
    Ok(dump)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hex_literal::hex;
    use tagkit_core::KeyPair;

    use super::*;
    use crate::clock::ManualClock;
    use crate::link::LinkError;
    use crate::mock::MockTag;

    const K1: Key = Key::new(hex!("A0A1A2A3A4A5"));
    const K2: Key = Key::new(hex!("B0B1B2B3B4B5"));

    /// Trailer bits (0,1,1), data bits (0,0,0): key B cannot be read
    const KEY_B_ACCESS: [u8; 4] = hex!("7F078869");

    fn tag(mock: MockTag) -> Tag<MockTag> {
        Tag::with_clock(mock, Arc::new(ManualClock::new()))
    }

    fn data_block(byte: u8) -> [u8; 16] {
        [byte; 16]
    }

    #[test]
    fn test_read_with_key_a() {
        let mut mock = MockTag::with_sectors(2);
        mock.blocks[4] = data_block(0x11);
        mock.set_trailer(1, K1, hex!("FF078069"), K2);
        let tag = tag(mock);

        let sector = read_sector(&tag, 1, &K1, KeyRole::A).unwrap().unwrap();
        assert_eq!(sector[0], Block::from_bytes(&data_block(0x11)));
        // Transport access conditions leave key B readable
        assert_eq!(sector.trailer().to_string(), "A0A1A2A3A4A5FF078069B0B1B2B3B4B5");
    }

    #[test]
    fn test_read_hides_unreadable_key_b() {
        let mut mock = MockTag::with_sectors(1);
        mock.set_trailer(0, K1, KEY_B_ACCESS, K2);
        let tag = tag(mock);

        let sector = read_sector(&tag, 0, &K1, KeyRole::A).unwrap().unwrap();
        assert_eq!(sector.trailer().to_string(), "A0A1A2A3A4A57F078869------------");

        let sector = read_sector(&tag, 0, &K2, KeyRole::B).unwrap().unwrap();
        assert_eq!(sector.trailer().to_string(), "------------7F078869B0B1B2B3B4B5");
    }

    #[test]
    fn test_wrong_key() {
        let tag = tag(MockTag::with_sectors(1));
        assert!(matches!(
            read_sector(&tag, 0, &K1, KeyRole::A),
            Err(Error::AuthFailed { sector: 0, role: KeyRole::A })
        ));
    }

    #[test]
    fn test_unreadable_block_becomes_no_data() {
        let mut mock = MockTag::with_sectors(1);
        mock.read_errors.insert(1, LinkError::io("CRC error"));
        let tag = tag(mock);

        let sector = read_sector(&tag, 0, &Key::DEFAULT, KeyRole::A).unwrap().unwrap();
        assert!(sector[1].is_no_data());
        assert!(!sector[2].is_no_data());
        // Initial authentication, then one after the failed read
        let attempts = tag.with_link(|link| link.auth_log.len()).unwrap();
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_nothing_readable() {
        let mut mock = MockTag::with_sectors(1);
        for block in 0..4 {
            mock.read_errors.insert(block, LinkError::io("read failed"));
        }
        let tag = tag(mock);
        assert_eq!(read_sector(&tag, 0, &Key::DEFAULT, KeyRole::A).unwrap(), None);
    }

    #[test]
    fn test_tag_lost_during_read() {
        let mut mock = MockTag::with_sectors(1);
        mock.read_errors.insert(2, LinkError::TagLost);
        let tag = tag(mock);
        assert!(matches!(
            read_sector(&tag, 0, &Key::DEFAULT, KeyRole::A),
            Err(Error::TagLost)
        ));
    }

    #[test]
    fn test_read_all_merges_roles() {
        let mut mock = MockTag::with_sectors(3);
        mock.blocks[0] = data_block(0xAA);
        mock.set_trailer(0, K1, KEY_B_ACCESS, K2);
        let tag = tag(mock);

        let key_map: KeyMap = [
            (0, KeyPair::new(Some(K1), Some(K2))),
            (1, KeyPair::new(Some(Key::DEFAULT), None)),
            (2, KeyPair::new(Some(K1), None)),
        ]
        .into_iter()
        .collect();

        let dump = read_all(&tag, &key_map).unwrap();
        let sector = dump.get(0).unwrap();
        assert_eq!(sector[0], Block::from_bytes(&data_block(0xAA)));
        assert_eq!(sector.trailer().to_string(), "A0A1A2A3A4A57F078869B0B1B2B3B4B5");
        assert_eq!(
            dump.get(1).unwrap().trailer().to_string(),
            "FFFFFFFFFFFFFF078069FFFFFFFFFFFF"
        );
        assert_eq!(dump.unreadable().collect::<Vec<_>>(), vec![2]);
    }
}
