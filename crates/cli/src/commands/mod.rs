use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

mod access_bits;
mod file_operations;
mod tag_operations;

pub use access_bits::*;
pub use file_operations::*;
pub use tag_operations::*;

use crate::utils::{KeyArgs, ProbeArgs, parse_access_bytes, parse_bit_row, parse_block_data};

/// Define subcommands for the CLI
#[derive(Subcommand)]
pub enum Commands {
    /// List available readers
    List,

    /// Find the keys of each sector by probing with key files
    MapKeys {
        #[command(flatten)]
        probe: ProbeArgs,
    },

    /// Map keys, then read as much of the tag as they allow
    Dump {
        #[command(flatten)]
        probe: ProbeArgs,

        /// Write the dump to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the keys found in the dump to a key file
        #[arg(long)]
        save_keys: Option<PathBuf>,
    },

    /// Validate a dump file
    CheckDump {
        /// Dump file
        file: PathBuf,

        /// Reject `*` lines for sectors without keys
        #[arg(long)]
        strict: bool,
    },

    /// Validate a key file
    CheckKeys {
        /// Key file
        file: PathBuf,
    },

    /// Compare two dump files block by block
    Diff {
        /// First dump file
        first: PathBuf,

        /// Second dump file
        second: PathBuf,
    },

    /// Explain the permissions granted by trailer access bytes
    DecodeAc {
        /// Access bytes 6 to 8 of the trailer, as 6 hex digits
        #[arg(value_parser = parse_access_bytes)]
        bytes: [u8; 3],
    },

    /// Build trailer access bytes from C1, C2 and C3
    EncodeAc {
        /// C1 for block groups 0 to 3, e.g. `0001`
        #[arg(value_parser = parse_bit_row)]
        c1: [u8; 4],

        /// C2 for block groups 0 to 3
        #[arg(value_parser = parse_bit_row)]
        c2: [u8; 4],

        /// C3 for block groups 0 to 3
        #[arg(value_parser = parse_bit_row)]
        c3: [u8; 4],
    },

    /// Map keys, then report which key can write each block
    Writable {
        #[command(flatten)]
        probe: ProbeArgs,
    },

    /// Write one block
    Write {
        /// Sector number
        sector: usize,

        /// Block within the sector
        block: usize,

        /// Block data, as 32 hex digits
        #[arg(value_parser = parse_block_data)]
        data: [u8; 16],

        #[command(flatten)]
        key: KeyArgs,

        /// Allow writing the manufacturer block
        #[arg(long)]
        allow_manufacturer_block: bool,
    },

    /// Read, increment or decrement a value block
    Value {
        /// What to do with the value block
        #[arg(value_enum)]
        action: ValueAction,

        /// Sector number
        sector: usize,

        /// Block within the sector
        block: usize,

        /// Amount to increment or decrement by
        #[arg(default_value_t = 1)]
        delta: u32,

        #[command(flatten)]
        key: KeyArgs,
    },
}

/// Value block actions
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueAction {
    /// Show the value
    Read,
    /// Add to the value
    Increment,
    /// Subtract from the value
    Decrement,
}
