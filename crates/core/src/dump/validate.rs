//! Structural validation of dump text

use derive_more::Display;

use crate::block::BLOCK_HEX_LEN;
use crate::geometry::{self, MAX_SECTOR};

/// Prefix of a sector header line
pub const SECTOR_HEADER: &str = "+Sector: ";

/// Outcome of validating dump text
///
/// Line numbers are 1-based. Each outcome has a stable numeric [`code`](Self::code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DumpCheck {
    /// The dump is well formed
    #[display("valid")]
    Valid,
    /// A sector header was expected but the line is not one
    #[display("line {line}: expected a sector header")]
    MalformedHeader {
        /// Offending line
        line: usize,
    },
    /// A block line contains characters other than hex digits and `-`
    #[display("line {line}: block is not hex")]
    InvalidCharacters {
        /// Offending line
        line: usize,
    },
    /// A block line is not 32 characters long
    #[display("line {line}: block has {length} characters, expected 32")]
    InvalidLength {
        /// Offending line
        line: usize,
        /// Length of the line
        length: usize,
    },
    /// A sector header names a sector above 39
    #[display("line {line}: sector {sector} out of range")]
    SectorOutOfRange {
        /// Offending line
        line: usize,
        /// Sector in the header
        sector: usize,
    },
    /// A sector header repeats an earlier one
    #[display("line {line}: sector {sector} appears twice")]
    DuplicateSector {
        /// Offending line
        line: usize,
        /// Sector in the header
        sector: usize,
    },
    /// There are no lines at all
    #[display("dump is empty")]
    Empty,
}

impl DumpCheck {
    /// Numeric code of this outcome; 0 means valid
    pub const fn code(&self) -> u8 {
        match self {
            Self::Valid => 0,
            Self::MalformedHeader { .. } => 1,
            Self::InvalidCharacters { .. } => 2,
            Self::InvalidLength { .. } => 3,
            Self::SectorOutOfRange { .. } => 4,
            Self::DuplicateSector { .. } => 5,
            Self::Empty => 6,
        }
    }

    /// Whether the dump is well formed
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Parse a `+Sector: N` header with a one or two digit sector number
pub(crate) fn parse_header(line: &str) -> Option<usize> {
    let number = line.strip_prefix(SECTOR_HEADER)?;
    if number.is_empty() || number.len() > 2 || !number.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

/// Validate the lines of a dump
///
/// With `ignore_asterisk`, a line starting with `*` marks the current sector
/// as "no keys found" and the next line must be a header again.
pub fn check_dump<S: AsRef<str>>(lines: &[S], ignore_asterisk: bool) -> DumpCheck {
    if lines.is_empty() {
        return DumpCheck::Empty;
    }

    let mut seen = Vec::new();
    let mut expected = 0;
    let mut blocks = 0;

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let number = i + 1;

        if blocks == expected {
            let Some(sector) = parse_header(line) else {
                return DumpCheck::MalformedHeader { line: number };
            };
            if sector > MAX_SECTOR {
                return DumpCheck::SectorOutOfRange {
                    line: number,
                    sector,
                };
            }
            if seen.contains(&sector) {
                return DumpCheck::DuplicateSector {
                    line: number,
                    sector,
                };
            }
            seen.push(sector);
            expected = geometry::block_count(sector);
            blocks = 0;
            continue;
        }

        if ignore_asterisk && line.starts_with('*') {
            blocks = expected;
            continue;
        }
        if line.is_empty() || !line.bytes().all(|c| c.is_ascii_hexdigit() || c == b'-') {
            return DumpCheck::InvalidCharacters { line: number };
        }
        if line.len() != BLOCK_HEX_LEN {
            return DumpCheck::InvalidLength {
                line: number,
                length: line.len(),
            };
        }
        blocks += 1;
    }

    DumpCheck::Valid
}
