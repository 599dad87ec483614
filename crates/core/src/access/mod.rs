//! Access conditions
//!
//! The three access-condition bytes of a sector trailer encode, redundantly,
//! three bits (C1, C2, C3) for each of the four block groups of a sector.
//! [`codec`] converts between the raw bytes and an [`AccessMatrix`];
//! [`policy`] turns one group's bits into the key an operation requires.

pub mod codec;
pub mod policy;

pub use codec::{AccessBits, AccessMatrix, decode, encode};
pub use policy::{Operation, Requirement, key_b_readable, requirement};
