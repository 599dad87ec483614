//! PC/SC link for MIFARE Classic tags
//!
//! This crate implements [`TagLink`](tagkit_probe::TagLink) for contactless
//! readers reachable through PC/SC, using the storage-card commands of PC/SC
//! Part 3.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use tagkit_pcsc::PcscDeviceManager;
//! use tagkit_probe::Tag;
//!
//! let manager = PcscDeviceManager::new()?;
//! let readers = manager.list_readers()?;
//! let Some(reader) = readers.iter().find(|r| r.has_card()) else {
//!     println!("No tag found");
//!     return Ok(());
//! };
//!
//! let mut tag = Tag::new(manager.open_reader(reader.name())?);
//! tag.connect()?;
//! println!("{} sectors", tag.sector_count()?);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod error;
mod link;
mod manager;
mod reader;

pub use config::{ConnectStrategy, PcscConfig, ShareMode};
pub use error::PcscError;
pub use link::{PcscTagLink, apdu};
pub use manager::PcscDeviceManager;
pub use reader::{PcscReader, tag_size_from_atr};

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};
