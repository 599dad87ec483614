//! Comparing two dumps

use std::collections::BTreeMap;

use super::Dump;

/// How one sector differs between two dumps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorDiff {
    /// The sector was read only in the first dump
    OnlyInFirst,
    /// The sector was read only in the second dump
    OnlyInSecond,
    /// Per block, the offsets of the hex digits that differ
    Blocks(Vec<Vec<usize>>),
}

impl SectorDiff {
    /// Whether the sector is present and identical in both dumps
    pub fn is_identical(&self) -> bool {
        match self {
            Self::Blocks(blocks) => blocks.iter().all(Vec::is_empty),
            _ => false,
        }
    }
}

/// Differences between two dumps, keyed by sector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    sectors: BTreeMap<usize, SectorDiff>,
}

impl DiffResult {
    /// Difference for one sector
    pub fn get(&self, sector: usize) -> Option<&SectorDiff> {
        self.sectors.get(&sector)
    }

    /// All sectors in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SectorDiff)> {
        self.sectors.iter().map(|(sector, diff)| (*sector, diff))
    }

    /// Number of sectors compared
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Whether no sectors were compared
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Whether both dumps hold the same sectors with the same content
    pub fn is_identical(&self) -> bool {
        self.sectors.values().all(SectorDiff::is_identical)
    }
}

/// Compare two dumps sector by sector
///
/// Every sector of either dump gets an entry. Sectors present in both list the
/// differing digit offsets of each block, which is empty for identical blocks.
pub fn diff(first: &Dump, second: &Dump) -> DiffResult {
    let mut sectors = BTreeMap::new();

    for (index, a) in first.sectors() {
        let entry = match second.get(index) {
            None => SectorDiff::OnlyInFirst,
            Some(b) => SectorDiff::Blocks(
                a.blocks()
                    .iter()
                    .zip(b.blocks())
                    .map(|(x, y)| x.diff_offsets(y))
                    .collect(),
            ),
        };
        sectors.insert(index, entry);
    }
    for (index, _) in second.sectors() {
        sectors.entry(index).or_insert(SectorDiff::OnlyInSecond);
    }

    DiffResult { sectors }
}
