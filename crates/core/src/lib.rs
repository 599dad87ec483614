//! Core types and decision logic for MIFARE Classic tags
//!
//! This crate contains everything about a MIFARE Classic tag that can be
//! expressed without talking to one:
//!
//! - Keys, blocks and the sector geometry of 1K/2K/4K/Mini tags
//! - The access-condition codec (trailer bytes 6..9 to a C1/C2/C3 matrix and back)
//! - The access policy table deciding which key an operation requires
//! - Sector merging, key maps and textual dumps (parse, render, validate, diff)
//! - Key file validation and parsing
//! - Value block and block 0 BCC helpers
//!
//! Tag-touching code lives in `tagkit-probe`.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod access;
pub mod block;
pub mod dump;
pub mod geometry;
pub mod key;
pub mod keyfile;
pub mod keymap;
pub mod sector;
pub mod value;

mod error;
pub use error::{Error, Result};

pub use access::{AccessBits, AccessMatrix, Operation, Requirement};
pub use block::{Block, NO_DATA};
pub use dump::{DiffResult, Dump, DumpCheck, SectorDiff};
pub use key::{Key, KeyRole, NO_KEY};
pub use keyfile::KeyFileCheck;
pub use keymap::{KeyMap, KeyPair};
pub use sector::Sector;
pub use value::ValueBlock;

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        AccessBits, AccessMatrix, Block, Dump, Error, Key, KeyMap, KeyPair, KeyRole, Operation,
        Requirement, Result, Sector, geometry,
    };
}
