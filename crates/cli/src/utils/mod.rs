//! Utility functions and types for the tagkit CLI

pub mod reader;
pub mod session;

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use eyre::{WrapErr, bail};
use tagkit_core::access::codec::GROUPS;
use tagkit_core::block::BLOCK_LEN;
use tagkit_core::keyfile::{check_key_file, parse_key_file};
use tagkit_core::{Key, KeyRole};
use tracing::{debug, warn};

/// Keys tried when neither the command line nor the config names a key file
pub const BUILTIN_KEYS: [Key; 6] = [
    Key::DEFAULT,
    Key::ZERO,
    Key::new([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]),
    Key::new([0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5]),
    Key::new([0xD3, 0xF7, 0xD3, 0xF7, 0xD3, 0xF7]),
    Key::new([0x4D, 0x3A, 0x99, 0xC3, 0x51, 0xDD]),
];

/// Key role as a command-line value
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Key A
    A,
    /// Key B
    B,
}

impl From<Role> for KeyRole {
    fn from(role: Role) -> Self {
        match role {
            Role::A => Self::A,
            Role::B => Self::B,
        }
    }
}

/// Arguments naming the key for a sector
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Key as 12 hex digits
    #[arg(short, long, default_value = "FFFFFFFFFFFF")]
    pub key: Key,

    /// Whether the key is key A or key B
    #[arg(long, value_enum, default_value_t = Role::A)]
    pub role: Role,
}

/// Arguments for commands that probe keys first
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Key files to probe with (default: the configured key files)
    #[arg(short = 'f', long = "keys")]
    pub key_files: Vec<PathBuf>,

    /// Sectors to probe, as `N` or `FIRST-LAST` (default: the whole tag)
    #[arg(short, long, value_parser = parse_sector_range)]
    pub sectors: Option<(usize, usize)>,
}

/// Read a text file, naming it on failure
pub fn read_text(path: &Path) -> eyre::Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))
}

/// Load candidate keys from key files
///
/// Files with problems are still used; their invalid lines are skipped. With
/// no files at all, [`BUILTIN_KEYS`] are used.
pub fn load_keys(paths: &[PathBuf]) -> eyre::Result<Vec<Key>> {
    if paths.is_empty() {
        debug!("No key files, using built-in keys");
        return Ok(BUILTIN_KEYS.to_vec());
    }

    let mut keys = Vec::new();
    for path in paths {
        let text = read_text(path)?;
        let check = check_key_file(&text);
        if !check.is_valid() {
            warn!(file = %path.display(), %check, "Key file has problems");
        }
        keys.extend(parse_key_file(&text));
    }

    if keys.is_empty() {
        bail!("No valid keys in the given key files");
    }
    Ok(keys)
}

/// Parse `N` or `FIRST-LAST`
pub fn parse_sector_range(input: &str) -> Result<(usize, usize), String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| format!("'{s}' is not a sector number"))
    };
    let (first, last) = match input.split_once('-') {
        Some((first, last)) => (parse(first)?, parse(last)?),
        None => {
            let sector = parse(input)?;
            (sector, sector)
        }
    };
    if first > last {
        return Err(format!("first sector {first} is after last sector {last}"));
    }
    Ok((first, last))
}

/// Parse one block of data given as 32 hex digits
pub fn parse_block_data(input: &str) -> Result<[u8; BLOCK_LEN], String> {
    let mut data = [0u8; BLOCK_LEN];
    hex::decode_to_slice(input, &mut data)
        .map_err(|e| format!("expected {} hex digits: {e}", BLOCK_LEN * 2))?;
    Ok(data)
}

/// Parse the access-condition bytes, given as 6 hex digits
pub fn parse_access_bytes(input: &str) -> Result<[u8; 3], String> {
    let mut bytes = [0u8; 3];
    hex::decode_to_slice(input, &mut bytes).map_err(|e| format!("expected 6 hex digits: {e}"))?;
    Ok(bytes)
}

/// Parse one row of the access-condition matrix, four `0`/`1` digits for
/// block groups 0 to 3
pub fn parse_bit_row(input: &str) -> Result<[u8; GROUPS], String> {
    let bits: Vec<u8> = input
        .chars()
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            other => Err(format!("'{other}' is not a bit")),
        })
        .collect::<Result<_, _>>()?;
    bits.try_into()
        .map_err(|bits: Vec<u8>| format!("expected {GROUPS} bits, got {}", bits.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sector_range() {
        assert_eq!(parse_sector_range("5"), Ok((5, 5)));
        assert_eq!(parse_sector_range("0-15"), Ok((0, 15)));
        assert!(parse_sector_range("15-0").is_err());
        assert!(parse_sector_range("a-3").is_err());
    }

    #[test]
    fn test_parse_bit_row() {
        assert_eq!(parse_bit_row("0001"), Ok([0, 0, 0, 1]));
        assert!(parse_bit_row("0002").is_err());
        assert!(parse_bit_row("000").is_err());
    }

    #[test]
    fn test_parse_hex_arguments() {
        assert_eq!(parse_access_bytes("FF0780"), Ok([0xFF, 0x07, 0x80]));
        assert!(parse_access_bytes("FF07").is_err());
        assert_eq!(parse_block_data(&"00".repeat(16)), Ok([0; 16]));
        assert!(parse_block_data("00").is_err());
    }

    #[test]
    fn test_load_keys_without_files() {
        assert_eq!(load_keys(&[]).unwrap(), BUILTIN_KEYS);
    }
}
