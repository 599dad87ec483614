//! Textual tag dumps
//!
//! A dump lists sectors in the form
//!
//! ```text
//! +Sector: 0
//! CD76928CA508040001B0BC9E3C2BF21D
//! ...
//! +Sector: 1
//! *No keys found or dead sector
//! ```
//!
//! Each sector header is followed by 4 (sectors 0..=31) or 16 (sectors 32..=39)
//! block lines of 32 hex digits, or by a single `*` line for a sector that could
//! not be read at all.

mod diff;
mod validate;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use tracing::debug;

pub use diff::{DiffResult, SectorDiff, diff};
pub use validate::{DumpCheck, SECTOR_HEADER, check_dump};

use crate::block::Block;
use crate::geometry::{self, MAX_SECTOR};
use crate::key::Key;
use crate::sector::Sector;
use crate::{Error, Result};

/// Line written for a sector that could not be read
pub const NO_KEYS_MARKER: &str = "*No keys found or dead sector";

/// A snapshot of a tag's sectors, ordered by sector index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dump {
    sectors: BTreeMap<usize, Sector>,
    unreadable: BTreeSet<usize>,
}

impl Dump {
    /// Create an empty dump
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sector, checking its index and block count
    pub fn insert(&mut self, index: usize, sector: Sector) -> Result<()> {
        if index > MAX_SECTOR {
            return Err(Error::SectorOutOfRange {
                sector: index,
                last: MAX_SECTOR,
            });
        }
        let expected = geometry::block_count(index);
        if sector.len() != expected {
            return Err(Error::TruncatedSector {
                sector: index,
                expected,
                actual: sector.len(),
            });
        }
        self.unreadable.remove(&index);
        self.sectors.insert(index, sector);
        Ok(())
    }

    /// Record a sector for which no key was found
    pub fn mark_unreadable(&mut self, index: usize) {
        if !self.sectors.contains_key(&index) {
            self.unreadable.insert(index);
        }
    }

    /// A sector's blocks, if it was read
    pub fn get(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(&index)
    }

    /// Read sectors in index order
    pub fn sectors(&self) -> impl Iterator<Item = (usize, &Sector)> {
        self.sectors.iter().map(|(index, sector)| (*index, sector))
    }

    /// Sectors that could not be read
    pub fn unreadable(&self) -> impl Iterator<Item = usize> + '_ {
        self.unreadable.iter().copied()
    }

    /// Number of read sectors
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Whether no sector was read
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Parse dump text
    ///
    /// The text must pass [`check_dump`] (with `*` lines allowed) and every
    /// sector must be complete.
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        let check = check_dump(&lines, true);
        if !check.is_valid() {
            return Err(Error::InvalidDump(check));
        }

        let mut dump = Self::new();
        let mut current: Option<(usize, Vec<Block>)> = None;
        for line in lines {
            if let Some(index) = validate::parse_header(line) {
                dump.finish(current.take())?;
                current = Some((index, Vec::with_capacity(geometry::block_count(index))));
            } else if line.starts_with('*') {
                if let Some((index, blocks)) = current.take() {
                    if !blocks.is_empty() {
                        return Err(Error::TruncatedSector {
                            sector: index,
                            expected: geometry::block_count(index),
                            actual: blocks.len(),
                        });
                    }
                    dump.mark_unreadable(index);
                }
            } else if let Some((_, blocks)) = current.as_mut() {
                blocks.push(Block::parse(line)?);
            }
        }
        dump.finish(current)?;

        debug!(sectors = dump.len(), "Parsed dump");
        Ok(dump)
    }

    fn finish(&mut self, sector: Option<(usize, Vec<Block>)>) -> Result<()> {
        let Some((index, blocks)) = sector else {
            return Ok(());
        };
        let expected = geometry::block_count(index);
        if blocks.len() != expected {
            return Err(Error::TruncatedSector {
                sector: index,
                expected,
                actual: blocks.len(),
            });
        }
        self.insert(index, Sector::new(blocks)?)
    }

    /// Render the dump as text
    pub fn to_text(&self) -> String {
        let indices: BTreeSet<usize> = self
            .sectors
            .keys()
            .chain(self.unreadable.iter())
            .copied()
            .collect();

        let mut text = String::new();
        for index in indices {
            let _ = writeln!(text, "{SECTOR_HEADER}{index}");
            match self.sectors.get(&index) {
                Some(sector) => {
                    for block in sector.blocks() {
                        let _ = writeln!(text, "{block}");
                    }
                }
                None => {
                    let _ = writeln!(text, "{NO_KEYS_MARKER}");
                }
            }
        }
        text
    }

    /// Distinct keys found in readable trailers, in sector order
    pub fn keys(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        for sector in self.sectors.values() {
            let trailer = sector.trailer();
            for key in [trailer.key_a(), trailer.key_b()].into_iter().flatten() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

impl std::str::FromStr for Dump {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
