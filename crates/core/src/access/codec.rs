//! Bit-level codec for the access-condition bytes
//!
//! Layout of trailer bytes 6, 7 and 8 (`n` is the block group, `~` is inversion):
//!
//! | Byte | Bits 7..4 | Bits 3..0 |
//! |------|-----------|-----------|
//! | 6    | ~C2(3..0) | ~C1(3..0) |
//! | 7    | C1(3..0)  | ~C3(3..0) |
//! | 8    | C3(3..0)  | C2(3..0)  |
//!
//! Bytes that violate the inverted copies are rejected rather than guessed at.

use std::fmt;

use crate::{Error, Result};

/// Number of block groups covered by one set of access bytes
pub const GROUPS: usize = 4;

/// Column of the matrix that governs the sector trailer
pub const TRAILER_GROUP: usize = 3;

/// The C1/C2/C3 bits of one block group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessBits {
    /// C1
    pub c1: u8,
    /// C2
    pub c2: u8,
    /// C3
    pub c3: u8,
}

impl AccessBits {
    /// Create access bits from their three values
    pub const fn new(c1: u8, c2: u8, c3: u8) -> Self {
        Self { c1, c2, c3 }
    }

    /// Whether every value is a single bit
    pub const fn is_well_formed(&self) -> bool {
        self.c1 <= 1 && self.c2 <= 1 && self.c3 <= 1
    }
}

impl fmt::Display for AccessBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.c1, self.c2, self.c3)
    }
}

/// Access-condition matrix: rows C1, C2, C3 by block group 0..=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessMatrix {
    rows: [[u8; GROUPS]; 3],
}

impl AccessMatrix {
    /// Create a matrix from its rows, rejecting values other than 0 and 1
    pub fn new(rows: [[u8; GROUPS]; 3]) -> Result<Self> {
        if rows.iter().flatten().any(|&bit| bit > 1) {
            return Err(Error::InvalidAccessMatrix("values must be 0 or 1"));
        }
        Ok(Self { rows })
    }

    /// Create a matrix from rows of arbitrary shape, which must be 3x4
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        if rows.len() != 3 {
            return Err(Error::InvalidAccessMatrix("expected 3 rows"));
        }
        let mut matrix = [[0u8; GROUPS]; 3];
        for (target, row) in matrix.iter_mut().zip(rows) {
            *target = row
                .as_ref()
                .try_into()
                .map_err(|_| Error::InvalidAccessMatrix("expected 4 columns"))?;
        }
        Self::new(matrix)
    }

    /// Create a matrix from the bits of each block group
    pub fn from_groups(groups: [AccessBits; GROUPS]) -> Result<Self> {
        let mut rows = [[0u8; GROUPS]; 3];
        for (i, bits) in groups.iter().enumerate() {
            rows[0][i] = bits.c1;
            rows[1][i] = bits.c2;
            rows[2][i] = bits.c3;
        }
        Self::new(rows)
    }

    /// The rows C1, C2, C3
    pub const fn rows(&self) -> &[[u8; GROUPS]; 3] {
        &self.rows
    }

    /// The bits of one block group; `group` must be below 4
    pub const fn group(&self, group: usize) -> AccessBits {
        AccessBits::new(
            self.rows[0][group],
            self.rows[1][group],
            self.rows[2][group],
        )
    }

    /// The bits governing the sector trailer
    pub const fn trailer(&self) -> AccessBits {
        self.group(TRAILER_GROUP)
    }

    const fn nibble(row: &[u8; GROUPS]) -> u8 {
        row[0] | (row[1] << 1) | (row[2] << 2) | (row[3] << 3)
    }
}

/// Decode the three access-condition bytes of a trailer
///
/// Returns `None` if the inverted copies do not match.
pub fn decode(bytes: [u8; 3]) -> Option<AccessMatrix> {
    let [b6, b7, b8] = bytes;
    let c1 = b7 >> 4;
    let c2 = b8 & 0x0F;
    let c3 = b8 >> 4;
    if c1 != !b6 & 0x0F || c2 != (!b6 >> 4) & 0x0F || c3 != !b7 & 0x0F {
        return None;
    }

    let mut rows = [[0u8; GROUPS]; 3];
    for group in 0..GROUPS {
        rows[0][group] = (c1 >> group) & 0x01;
        rows[1][group] = (c2 >> group) & 0x01;
        rows[2][group] = (c3 >> group) & 0x01;
    }
    Some(AccessMatrix { rows })
}

/// Encode a matrix into the three access-condition bytes of a trailer
pub fn encode(matrix: &AccessMatrix) -> [u8; 3] {
    let c1 = AccessMatrix::nibble(&matrix.rows[0]);
    let c2 = AccessMatrix::nibble(&matrix.rows[1]);
    let c3 = AccessMatrix::nibble(&matrix.rows[2]);
    [
        ((!c2 & 0x0F) << 4) | (!c1 & 0x0F),
        (c1 << 4) | (!c3 & 0x0F),
        (c3 << 4) | c2,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_decode_transport_configuration() {
        let matrix = decode(hex!("FF0780")).unwrap();
        for group in 0..3 {
            assert_eq!(matrix.group(group), AccessBits::new(0, 0, 0));
        }
        assert_eq!(matrix.trailer(), AccessBits::new(0, 0, 1));
    }

    #[test]
    fn test_decode_known_configurations() {
        let matrix = decode(hex!("787788")).unwrap();
        assert_eq!(matrix.group(0), AccessBits::new(1, 0, 0));
        assert_eq!(matrix.trailer(), AccessBits::new(0, 1, 1));

        let matrix = decode(hex!("7F0788")).unwrap();
        assert_eq!(matrix.group(2), AccessBits::new(0, 0, 0));
        assert_eq!(matrix.trailer(), AccessBits::new(0, 1, 1));
    }

    #[test]
    fn test_decode_rejects_broken_redundancy() {
        assert_eq!(decode(hex!("FF0781")), None);
        assert_eq!(decode(hex!("FF0F80")), None);
        assert_eq!(decode(hex!("000000")), None);
    }

    #[test]
    fn test_encode() {
        let matrix = AccessMatrix::new([[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 1]]).unwrap();
        assert_eq!(encode(&matrix), hex!("FF0780"));
    }

    #[test]
    fn test_round_trip_all_matrices() {
        for value in 0u16..(1 << 12) {
            let mut rows = [[0u8; GROUPS]; 3];
            for (bit, cell) in rows.iter_mut().flatten().enumerate() {
                *cell = ((value >> bit) & 1) as u8;
            }
            let matrix = AccessMatrix::new(rows).unwrap();
            assert_eq!(decode(encode(&matrix)), Some(matrix));
        }
    }

    #[test]
    fn test_malformed_matrix() {
        assert!(AccessMatrix::new([[0, 0, 0, 2], [0; 4], [0; 4]]).is_err());
        assert!(AccessMatrix::from_rows(&[vec![0u8; 4], vec![0u8; 4]]).is_err());
        assert!(AccessMatrix::from_rows(&[vec![0u8; 4], vec![0u8; 3], vec![0u8; 4]]).is_err());
        assert!(AccessMatrix::from_rows(&[[0u8; 4], [1u8; 4], [0u8; 4]]).is_ok());
    }
}
