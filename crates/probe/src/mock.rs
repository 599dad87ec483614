//! In-memory tag for tests

use std::collections::{BTreeMap, VecDeque};

use crossbeam_channel::Receiver;
use tagkit_core::block::BLOCK_LEN;
use tagkit_core::{Key, KeyRole, geometry};

use crate::link::{LinkError, LinkResult, TagLink};

/// Access bytes and GPB of a factory-fresh trailer
pub(crate) const TRANSPORT_ACCESS: [u8; 4] = [0xFF, 0x07, 0x80, 0x69];

/// A simulated MIFARE Classic tag
///
/// Authentication succeeds when the key matches the sector's key for the
/// role. Reading a trailer returns zeros in place of key A, like real tags.
#[derive(Debug)]
pub(crate) struct MockTag {
    pub(crate) sectors: usize,
    pub(crate) blocks: Vec<[u8; BLOCK_LEN]>,
    pub(crate) connected: bool,
    /// Sector and role of the current authentication
    pub(crate) authenticated: Option<(usize, KeyRole)>,
    /// Errors returned by the next authentication attempts, in order
    pub(crate) auth_errors: VecDeque<LinkError>,
    /// Number of upcoming authentication attempts that are rejected outright
    pub(crate) flaky_auths: usize,
    /// Errors returned every time a block is read
    pub(crate) read_errors: BTreeMap<usize, LinkError>,
    /// Error returned by `connect`
    pub(crate) connect_error: Option<LinkError>,
    /// Connect blocks until this channel is closed
    pub(crate) connect_gate: Option<Receiver<()>>,
    pub(crate) connect_calls: usize,
    /// Every authentication attempt
    pub(crate) auth_log: Vec<(usize, Key, KeyRole)>,
    /// Result of the last increment or decrement
    pub(crate) transfer_buffer: Option<[u8; BLOCK_LEN]>,
}

impl MockTag {
    /// A 1K tag with default keys and transport access conditions everywhere
    pub(crate) fn classic_1k() -> Self {
        Self::with_sectors(16)
    }

    pub(crate) fn with_sectors(sectors: usize) -> Self {
        let last = sectors - 1;
        let total = geometry::first_block(last) + geometry::block_count(last);
        let mut tag = Self {
            sectors,
            blocks: vec![[0; BLOCK_LEN]; total],
            connected: true,
            authenticated: None,
            auth_errors: VecDeque::new(),
            flaky_auths: 0,
            read_errors: BTreeMap::new(),
            connect_error: None,
            connect_gate: None,
            connect_calls: 0,
            auth_log: Vec::new(),
            transfer_buffer: None,
        };
        for sector in 0..sectors {
            tag.set_trailer(sector, Key::DEFAULT, TRANSPORT_ACCESS, Key::DEFAULT);
        }
        tag
    }

    /// Overwrite a sector trailer
    pub(crate) fn set_trailer(&mut self, sector: usize, a: Key, access: [u8; 4], b: Key) {
        let trailer = &mut self.blocks[geometry::trailer_block(sector)];
        trailer[..6].copy_from_slice(a.as_bytes());
        trailer[6..10].copy_from_slice(&access);
        trailer[10..].copy_from_slice(b.as_bytes());
    }

    /// Replace both keys of a sector, keeping its access bytes
    pub(crate) fn set_keys(&mut self, sector: usize, a: Key, b: Key) {
        let trailer = self.blocks[geometry::trailer_block(sector)];
        let mut access = [0; 4];
        access.copy_from_slice(&trailer[6..10]);
        self.set_trailer(sector, a, access, b);
    }

    fn key(&self, sector: usize, role: KeyRole) -> Key {
        let trailer = &self.blocks[geometry::trailer_block(sector)];
        let bytes = match role {
            KeyRole::A => &trailer[..6],
            KeyRole::B => &trailer[10..],
        };
        Key::from_slice(bytes).unwrap()
    }

    fn sector_of(block: usize) -> usize {
        if block < geometry::first_block(geometry::SMALL_SECTOR_COUNT) {
            block / geometry::SMALL_SECTOR_BLOCKS
        } else {
            geometry::SMALL_SECTOR_COUNT
                + (block - geometry::first_block(geometry::SMALL_SECTOR_COUNT))
                    / geometry::LARGE_SECTOR_BLOCKS
        }
    }

    fn check_access(&self, block: usize) -> LinkResult<()> {
        if !self.connected {
            return Err(LinkError::TagLost);
        }
        match self.authenticated {
            Some((sector, _)) if sector == Self::sector_of(block) => Ok(()),
            _ => Err(LinkError::io("not authenticated")),
        }
    }
}

impl TagLink for MockTag {
    fn do_authenticate(&mut self, sector: usize, key: &Key, role: KeyRole) -> LinkResult<bool> {
        self.auth_log.push((sector, *key, role));
        self.authenticated = None;
        if let Some(error) = self.auth_errors.pop_front() {
            if error == LinkError::TagLost {
                self.connected = false;
            }
            return Err(error);
        }
        if !self.connected {
            return Err(LinkError::TagLost);
        }
        if self.flaky_auths > 0 {
            self.flaky_auths -= 1;
            return Ok(false);
        }
        if self.key(sector, role) != *key {
            return Ok(false);
        }
        self.authenticated = Some((sector, role));
        Ok(true)
    }

    fn do_read_block(&mut self, block: usize) -> LinkResult<[u8; BLOCK_LEN]> {
        self.check_access(block)?;
        if let Some(error) = self.read_errors.get(&block) {
            if *error == LinkError::TagLost {
                self.connected = false;
            }
            // Failed reads drop the authentication, like real tags
            self.authenticated = None;
            return Err(error.clone());
        }
        let mut data = self.blocks[block];
        if block == geometry::trailer_block(Self::sector_of(block)) {
            data[..6].fill(0);
        }
        Ok(data)
    }

    fn write_block(&mut self, block: usize, data: &[u8; BLOCK_LEN]) -> LinkResult<()> {
        self.check_access(block)?;
        self.blocks[block] = *data;
        Ok(())
    }

    fn increment(&mut self, block: usize, value: u32) -> LinkResult<()> {
        self.check_access(block)?;
        self.transfer_buffer = Some(self.value_op(block, value as i32)?);
        Ok(())
    }

    fn decrement(&mut self, block: usize, value: u32) -> LinkResult<()> {
        self.check_access(block)?;
        self.transfer_buffer = Some(self.value_op(block, (value as i32).wrapping_neg())?);
        Ok(())
    }

    fn transfer(&mut self, block: usize) -> LinkResult<()> {
        self.check_access(block)?;
        let data = self
            .transfer_buffer
            .take()
            .ok_or_else(|| LinkError::io("empty transfer buffer"))?;
        self.blocks[block] = data;
        Ok(())
    }

    fn connect(&mut self) -> LinkResult<()> {
        self.connect_calls += 1;
        if let Some(gate) = self.connect_gate.take() {
            let _ = gate.recv();
        }
        if let Some(error) = self.connect_error.clone() {
            return Err(error);
        }
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) {
        self.connected = false;
        self.authenticated = None;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn sector_count(&self) -> usize {
        self.sectors
    }
}

impl MockTag {
    fn value_op(&self, block: usize, delta: i32) -> LinkResult<[u8; BLOCK_LEN]> {
        let current = tagkit_core::ValueBlock::from_bytes(&self.blocks[block])
            .ok_or_else(|| LinkError::io("not a value block"))?;
        let updated = tagkit_core::ValueBlock::new(current.value.wrapping_add(delta), current.addr);
        Ok(updated.to_bytes())
    }
}
