//! Tag sessions for the tagkit CLI

use std::path::PathBuf;

use tagkit_core::KeyMap;
use tagkit_pcsc::{ConnectStrategy, PcscConfig, PcscDeviceManager, PcscTagLink};
use tagkit_probe::{KeyMapBuilder, ProbeConfig, Tag};
use tracing::info;

use super::load_keys;

/// A tag reached through a PC/SC reader
pub type PcscTag = Tag<PcscTagLink>;

/// Open and connect the tag in the named reader, or in the first reader
/// holding a card
pub fn open_tag(
    manager: &PcscDeviceManager,
    reader_name: Option<&str>,
    probe: &ProbeConfig,
) -> eyre::Result<PcscTag> {
    let strategy = reader_name.map_or(ConnectStrategy::AnyCard, |name| {
        ConnectStrategy::Reader(name.to_string())
    });
    let link = manager.connect_strategy(strategy, PcscConfig::default())?;
    info!("Using reader: {}", link.reader_name());

    let mut tag = Tag::new(link).with_connect_timeout(probe.connect_timeout);
    tag.connect()?;
    Ok(tag)
}

/// Probe the tag for keys, reporting progress on stderr
///
/// Returns the key map and the probed sector range.
pub fn map_keys(
    tag: &mut PcscTag,
    probe: ProbeConfig,
    key_files: &[PathBuf],
    sectors: Option<(usize, usize)>,
) -> eyre::Result<(KeyMap, (usize, usize))> {
    let keys = load_keys(key_files)?;
    let count = tag.sector_count()?;
    let (first, last) = sectors.unwrap_or((0, count.saturating_sub(1)));

    let mut builder = KeyMapBuilder::new(probe);
    builder.set_candidate_keys(keys);
    builder.set_range(first, last, count)?;
    info!(
        keys = builder.candidates().len(),
        first, last, "Mapping keys"
    );

    builder.run_with_progress(tag, |_, (done, total)| {
        eprint!("\rProbing sectors: {done}/{total}");
    })?;
    eprintln!();

    Ok((builder.into_key_map(), (first, last)))
}
