//! Tag-touching engine for MIFARE Classic tags
//!
//! Everything here talks to a tag through the [`TagLink`] trait, wrapped in a
//! [`Tag`] handle that serializes access and bounds connection attempts.
//!
//! - [`KeyMapBuilder`] probes sectors with a dictionary of candidate keys
//! - [`read_sector`] and [`read_all`] read sectors under the keys found
//! - [`Writer`] writes data and value blocks
//! - [`analyze_writability`] reports which key each block write requires
//!
//! ```no_run
//! # fn run<L: tagkit_probe::TagLink + 'static>(link: L) -> tagkit_probe::Result<()> {
//! use tagkit_core::Key;
//! use tagkit_probe::{KeyMapBuilder, ProbeConfig, Tag, read_all};
//!
//! let mut tag = Tag::new(link);
//! tag.connect()?;
//!
//! let mut builder = KeyMapBuilder::new(ProbeConfig::default());
//! builder.set_candidate_keys([Key::DEFAULT, Key::ZERO]);
//! builder.set_range(0, tag.sector_count()? - 1, tag.sector_count()?)?;
//! let key_map = builder.run(&mut tag)?;
//!
//! let dump = read_all(&tag, key_map)?;
//! print!("{}", dump.to_text());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod builder;
mod cancel;
mod candidates;
mod clock;
mod config;
mod error;
pub mod link;
mod reader;
mod tag;
mod writability;
mod writer;

pub use builder::KeyMapBuilder;
pub use cancel::CancelToken;
pub use candidates::CandidateKeys;
pub use clock::{Clock, SystemClock};
pub use config::ProbeConfig;
pub use error::{Error, Result};
pub use link::{LinkError, TagLink};
pub use reader::{read_all, read_sector};
pub use tag::{ConnectState, Tag};
pub use writability::{SectorWritability, WriteAccess, analyze_writability};
pub use writer::{ValueOp, Writer};

#[cfg(test)]
pub(crate) mod mock;
