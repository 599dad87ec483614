//! Writing data and value blocks

use derive_more::Display;
use tagkit_core::block::BLOCK_LEN;
use tagkit_core::{Key, KeyRole};
use tracing::{info, warn};

use crate::link::TagLink;
use crate::tag::Tag;
use crate::{Error, Result};

/// Value block operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ValueOp {
    /// Add to the stored value
    #[display("increment")]
    Increment,
    /// Subtract from the stored value
    #[display("decrement")]
    Decrement,
}

/// Writes blocks addressed by sector and block-within-sector
#[derive(Debug)]
pub struct Writer<'a, L: TagLink> {
    tag: &'a Tag<L>,
    allow_manufacturer_block: bool,
}

impl<'a, L: TagLink> Writer<'a, L> {
    /// Create a writer that refuses to touch block 0 of sector 0
    pub const fn new(tag: &'a Tag<L>) -> Self {
        Self {
            tag,
            allow_manufacturer_block: false,
        }
    }

    /// Allow writing block 0 of sector 0, which only special tags accept
    pub const fn allow_manufacturer_block(mut self, allow: bool) -> Self {
        self.allow_manufacturer_block = allow;
        self
    }

    /// Resolve a block within a sector to its absolute number, after checks
    fn target(&self, sector: usize, block: usize) -> Result<usize> {
        let count = self.tag.sector_count()?;
        if sector >= count {
            return Err(match count.checked_sub(1) {
                Some(last) => tagkit_core::Error::SectorOutOfRange { sector, last }.into(),
                None => Error::InvalidRange {
                    first: sector,
                    last: sector,
                    count,
                },
            });
        }
        if block >= self.tag.block_count_in_sector(sector)? {
            return Err(tagkit_core::Error::BlockOutOfRange { sector, block }.into());
        }
        if sector == 0 && block == 0 && !self.allow_manufacturer_block {
            return Err(Error::ManufacturerBlock);
        }
        Ok(self.tag.sector_to_block(sector)? + block)
    }

    fn authenticate(&self, sector: usize, key: &Key, role: KeyRole) -> Result<()> {
        if self.tag.authenticate(sector, key, role)? {
            Ok(())
        } else {
            Err(Error::AuthFailed { sector, role })
        }
    }

    /// Write 16 bytes to a block
    pub fn write_block(
        &self,
        sector: usize,
        block: usize,
        data: &[u8; BLOCK_LEN],
        key: &Key,
        role: KeyRole,
    ) -> Result<()> {
        let target = self.target(sector, block)?;
        if block + 1 == self.tag.block_count_in_sector(sector)? {
            warn!(sector, "Writing a sector trailer");
        }
        self.authenticate(sector, key, role)?;
        self.tag.write_block(target, data)?;
        info!(sector, block, "Block written");
        Ok(())
    }

    /// Increment or decrement a value block by `delta`, then transfer the
    /// result back to the same block
    pub fn write_value_block(
        &self,
        sector: usize,
        block: usize,
        op: ValueOp,
        delta: u32,
        key: &Key,
        role: KeyRole,
    ) -> Result<()> {
        let target = self.target(sector, block)?;
        self.authenticate(sector, key, role)?;
        match op {
            ValueOp::Increment => self.tag.increment(target, delta)?,
            ValueOp::Decrement => self.tag.decrement(target, delta)?,
        }
        self.tag.transfer(target)?;
        info!(sector, block, %op, delta, "Value block updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tagkit_core::ValueBlock;

    use super::*;
    use crate::clock::ManualClock;
    use crate::mock::MockTag;

    fn tag() -> Tag<MockTag> {
        Tag::with_clock(MockTag::with_sectors(2), Arc::new(ManualClock::new()))
    }

    #[test]
    fn test_write_block() {
        let tag = tag();
        Writer::new(&tag)
            .write_block(1, 2, &[0x42; 16], &Key::DEFAULT, KeyRole::B)
            .unwrap();
        assert_eq!(tag.with_link(|link| link.blocks[6]).unwrap(), [0x42; 16]);
    }

    #[test]
    fn test_manufacturer_block_refused() {
        let tag = tag();
        let writer = Writer::new(&tag);
        assert!(matches!(
            writer.write_block(0, 0, &[0; 16], &Key::DEFAULT, KeyRole::A),
            Err(Error::ManufacturerBlock)
        ));

        let writer = writer.allow_manufacturer_block(true);
        writer
            .write_block(0, 0, &[1; 16], &Key::DEFAULT, KeyRole::A)
            .unwrap();
        assert_eq!(tag.with_link(|link| link.blocks[0]).unwrap(), [1; 16]);
    }

    #[test]
    fn test_write_checks_range_and_key() {
        let tag = tag();
        let writer = Writer::new(&tag);
        assert!(matches!(
            writer.write_block(1, 4, &[0; 16], &Key::DEFAULT, KeyRole::A),
            Err(Error::Core(tagkit_core::Error::BlockOutOfRange { sector: 1, block: 4 }))
        ));
        assert!(matches!(
            writer.write_block(2, 0, &[0; 16], &Key::DEFAULT, KeyRole::A),
            Err(Error::Core(tagkit_core::Error::SectorOutOfRange { .. }))
        ));
        assert!(matches!(
            writer.write_block(1, 0, &[0; 16], &Key::ZERO, KeyRole::A),
            Err(Error::AuthFailed { sector: 1, role: KeyRole::A })
        ));
    }

    #[test]
    fn test_write_to_tag_without_sectors() {
        let mut mock = MockTag::with_sectors(1);
        mock.sectors = 0;
        let tag = Tag::with_clock(mock, Arc::new(ManualClock::new()));
        assert!(matches!(
            Writer::new(&tag).write_block(0, 1, &[0; 16], &Key::DEFAULT, KeyRole::A),
            Err(Error::InvalidRange { count: 0, .. })
        ));
    }

    #[test]
    fn test_write_value_block() {
        let tag = tag();
        tag.with_link(|link| link.blocks[5] = ValueBlock::new(10, 5).to_bytes())
            .unwrap();

        let writer = Writer::new(&tag);
        writer
            .write_value_block(1, 1, ValueOp::Decrement, 3, &Key::DEFAULT, KeyRole::A)
            .unwrap();
        writer
            .write_value_block(1, 1, ValueOp::Increment, 100, &Key::DEFAULT, KeyRole::A)
            .unwrap();

        let stored = tag.with_link(|link| link.blocks[5]).unwrap();
        assert_eq!(ValueBlock::from_bytes(&stored), Some(ValueBlock::new(107, 5)));
    }
}
